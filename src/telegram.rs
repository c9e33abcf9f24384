//! Telegram notifications for operators.
//!
//! Notifications are best-effort: every send returns a `NotificationOutcome`
//! and no transport or API failure is ever propagated to the caller.

use crate::i18n::Locale;
use crate::manager::{SyncReport, TranslationStats};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Telegram rejects messages longer than this many characters.
const TELEGRAM_CHAR_LIMIT: usize = 4096;

/// Limits on escaped dynamic parts, so templates stay under the message limit
/// without cutting through a tag or an entity.
const ERROR_DETAIL_LIMIT: usize = 2000;
const ERROR_CONTEXT_LIMIT: usize = 200;
const FAILURE_KEY_LIMIT: usize = 120;
const FAILURE_REASON_LIMIT: usize = 300;

/// Room kept free at the end of a sync report for the "and N more" line.
const SYNC_REPORT_TAIL: usize = 64;

/// Failures listed individually in a sync report message.
const SYNC_FAILURES_SHOWN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    MarkdownV2,
    Plain,
}

impl ParseMode {
    fn as_api_value(&self) -> Option<&'static str> {
        match self {
            ParseMode::Html => Some("HTML"),
            ParseMode::MarkdownV2 => Some("MarkdownV2"),
            ParseMode::Plain => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    /// Credentials are missing or notifications are switched off
    Disabled,
    Failed(String),
}

impl NotificationOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotifierStatus {
    pub enabled: bool,
    pub configured: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_url: String,
    /// Operator switch; credentials alone do not enable sending when this is false
    pub enabled: bool,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    settings: TelegramSettings,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, settings: TelegramSettings) -> Self {
        Self { client, settings }
    }

    pub fn get_status(&self) -> NotifierStatus {
        let configured = self.settings.bot_token.is_some() && self.settings.chat_id.is_some();
        NotifierStatus {
            enabled: configured && self.settings.enabled,
            configured,
        }
    }

    /// Send `text` to the configured chat.
    pub async fn send_message(&self, text: &str, mode: ParseMode) -> NotificationOutcome {
        let (Some(token), Some(chat_id)) = (&self.settings.bot_token, &self.settings.chat_id) else {
            debug!("Telegram notifications not configured, skipping message");
            return NotificationOutcome::Disabled;
        };
        if !self.settings.enabled {
            debug!("Telegram notifications disabled, skipping message");
            return NotificationOutcome::Disabled;
        }

        let text = match mode {
            ParseMode::Plain => truncate_chars(text, TELEGRAM_CHAR_LIMIT),
            // Cutting formatted text can break its markup; templates keep themselves in bounds
            _ if text.chars().count() > TELEGRAM_CHAR_LIMIT => {
                let reason = format!(
                    "Formatted message has {} characters, over Telegram's {} limit",
                    text.chars().count(),
                    TELEGRAM_CHAR_LIMIT
                );
                warn!("Telegram notification failed: {}", reason);
                return NotificationOutcome::Failed(reason);
            }
            _ => text.to_string(),
        };
        let url = format!(
            "{}/bot{}/sendMessage",
            self.settings.api_url.trim_end_matches('/'),
            token
        );
        let request = SendMessageRequest {
            chat_id,
            text: &text,
            parse_mode: mode.as_api_value(),
            disable_web_page_preview: true,
        };

        let outcome = match self.client.post(&url).json(&request).send().await {
            Err(e) => NotificationOutcome::Failed(format!("Failed to send request to Telegram API: {}", e)),
            Ok(response) => {
                let status = response.status();
                match response.json::<SendMessageResponse>().await {
                    Ok(body) if body.ok && status.is_success() => NotificationOutcome::Sent,
                    Ok(body) => NotificationOutcome::Failed(format!(
                        "Telegram API error ({}): {}",
                        status,
                        body.description.unwrap_or_else(|| "no description".to_string())
                    )),
                    Err(e) => NotificationOutcome::Failed(format!(
                        "Telegram API error ({}): unreadable response: {}",
                        status, e
                    )),
                }
            }
        };

        if let NotificationOutcome::Failed(reason) = &outcome {
            warn!("Telegram notification failed: {}", reason);
        }
        outcome
    }

    pub async fn send_translation_stats(&self, stats: &TranslationStats) -> NotificationOutcome {
        self.send_message(&format_translation_stats(stats), ParseMode::Html)
            .await
    }

    pub async fn send_error_notification(&self, error: &str, context: Option<&str>) -> NotificationOutcome {
        self.send_message(&format_error_notification(error, context), ParseMode::Html)
            .await
    }

    pub async fn send_sync_report(&self, report: &SyncReport) -> NotificationOutcome {
        self.send_message(&format_sync_report(report), ParseMode::Html)
            .await
    }

    pub async fn send_test_message(&self) -> NotificationOutcome {
        let message = format!(
            "✅ <b>Test notification</b>\nTelegram notifications are working.\n<i>{}</i>",
            timestamp()
        );
        self.send_message(&message, ParseMode::Html).await
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M UTC").to_string()
}

fn html_entity(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        _ => None,
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match html_entity(c) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    result
}

/// Escape `text`, shortening it so the escaped result has at most `max_chars`
/// characters. Cuts fall between source characters, never inside an entity.
fn escape_html_within(text: &str, max_chars: usize) -> String {
    let escaped = escape_html(text);
    if escaped.chars().count() <= max_chars {
        return escaped;
    }

    let budget = max_chars.saturating_sub(1);
    let mut result = String::new();
    let mut used = 0;
    for c in text.chars() {
        let width = html_entity(c).map_or(1, str::len);
        if used + width > budget {
            break;
        }
        match html_entity(c) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
        used += width;
    }
    result.push('…');
    result
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

fn locale_label(locale: Locale) -> String {
    format!("{} {}", locale.flag(), locale.name())
}

fn format_translation_stats(stats: &TranslationStats) -> String {
    let last_update = stats
        .last_update
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut message = format!(
        "📊 <b>Translation statistics</b>\n\n\
Keys: {}\n\
Languages: {}\n\
Cached strings: {}\n\
Last update: {}\n",
        stats.total_keys, stats.total_languages, stats.cache_size, last_update
    );

    if !stats.coverage.is_empty() {
        message.push('\n');
        for coverage in &stats.coverage {
            message.push_str(&format!(
                "{}: {}/{}\n",
                locale_label(coverage.locale),
                coverage.translated,
                coverage.translated + coverage.missing
            ));
        }
    }

    message.push_str(&format!("\n<i>{}</i>", timestamp()));
    message
}

fn format_error_notification(error: &str, context: Option<&str>) -> String {
    let mut message = String::from("🚨 <b>Error</b>\n\n");
    if let Some(context) = context {
        message.push_str(&format!(
            "<b>Context:</b> {}\n",
            escape_html_within(context, ERROR_CONTEXT_LIMIT)
        ));
    }
    message.push_str(&format!(
        "<code>{}</code>\n\n<i>{}</i>",
        escape_html_within(error, ERROR_DETAIL_LIMIT),
        timestamp()
    ));
    message
}

fn format_sync_report(report: &SyncReport) -> String {
    let icon = if report.is_clean() { "✅" } else { "⚠️" };
    let mut message = format!(
        "{} <b>Translation sync</b>\n\n\
Translated: {}\n\
Failed: {}\n\
Superseded: {}\n\
Duration: {} ms\n",
        icon,
        report.translated,
        report.failures.len(),
        report.superseded,
        report.duration_ms
    );

    if !report.failures.is_empty() {
        message.push('\n');
        let mut listed = 0;
        for failure in report.failures.iter().take(SYNC_FAILURES_SHOWN) {
            let line = format!(
                "• <code>{}</code> → {}: {}\n",
                escape_html_within(&failure.key, FAILURE_KEY_LIMIT),
                failure.locale,
                escape_html_within(&failure.reason, FAILURE_REASON_LIMIT)
            );
            if message.chars().count() + line.chars().count() > TELEGRAM_CHAR_LIMIT - SYNC_REPORT_TAIL {
                break;
            }
            message.push_str(&line);
            listed += 1;
        }
        let hidden = report.failures.len() - listed;
        if hidden > 0 {
            message.push_str(&format!("…and {} more\n", hidden));
        }
    }

    message
}
