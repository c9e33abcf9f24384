use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Locale dictionaries
    pub locales_dir: PathBuf,

    // Google Translate
    pub translate_api_key: Option<String>,
    pub translate_api_url: String,

    // Telegram
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_url: String,
    pub telegram_notifications_enabled: bool,
    pub notify_on_success: bool,

    // Translation manager
    pub stale_after_days: i64,
    pub translations_snapshot: Option<PathBuf>,

    // Auto-update (configuration only, run by an external cron-like caller)
    pub auto_update_enabled: bool,
    pub auto_update_interval_minutes: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            locales_dir: std::env::var("LOCALES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("locales")),

            // Google Translate - missing key leaves the gateway unconfigured
            translate_api_key: optional_var("GOOGLE_TRANSLATE_API_KEY"),
            translate_api_url: std::env::var("GOOGLE_TRANSLATE_API_URL").unwrap_or_else(|_| {
                "https://translation.googleapis.com/language/translate/v2".to_string()
            }),

            // Telegram - missing credentials disable notifications, not an error
            telegram_bot_token: optional_var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: optional_var("TELEGRAM_CHAT_ID"),
            telegram_api_url: std::env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            telegram_notifications_enabled: bool_var("TELEGRAM_NOTIFICATIONS_ENABLED", true)?,
            notify_on_success: bool_var("NOTIFY_ON_SUCCESS", false)?,

            stale_after_days: stale_after_days()?,
            translations_snapshot: optional_var("TRANSLATIONS_SNAPSHOT").map(PathBuf::from),

            auto_update_enabled: bool_var("AUTO_UPDATE_ENABLED", false)?,
            auto_update_interval_minutes: std::env::var("AUTO_UPDATE_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }
}

/// Days before a translation counts as stale. Must fit a `chrono::Duration`.
fn stale_after_days() -> Result<i64> {
    let days = std::env::var("STALE_AFTER_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);

    if days < 0 || chrono::Duration::try_days(days).is_none() {
        return Err(anyhow::anyhow!("{} is out of range", days))
            .context("STALE_AFTER_DAYS must be a non-negative number of days");
    }
    Ok(days)
}

/// Read an env var, treating unset and blank values the same way
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a boolean flag ("true"/"false"/"1"/"0"), falling back to `default` when unset
fn bool_var(name: &str, default: bool) -> Result<bool> {
    match optional_var(name) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(anyhow::anyhow!("expected a boolean, got '{}'", raw))
                .context(format!("{} is not a valid boolean", name)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "LOCALES_DIR",
        "GOOGLE_TRANSLATE_API_KEY",
        "GOOGLE_TRANSLATE_API_URL",
        "TELEGRAM_BOT_TOKEN",
        "TELEGRAM_CHAT_ID",
        "TELEGRAM_API_URL",
        "TELEGRAM_NOTIFICATIONS_ENABLED",
        "NOTIFY_ON_SUCCESS",
        "STALE_AFTER_DAYS",
        "TRANSLATIONS_SNAPSHOT",
        "AUTO_UPDATE_ENABLED",
        "AUTO_UPDATE_INTERVAL_MINUTES",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_env_is_empty() {
        clear_env();
        let config = Config::from_env().expect("Defaults should load");

        assert_eq!(config.locales_dir, PathBuf::from("locales"));
        assert!(config.translate_api_key.is_none());
        assert!(config.translate_api_url.starts_with("https://translation.googleapis.com"));
        assert!(config.telegram_bot_token.is_none());
        assert!(config.telegram_chat_id.is_none());
        assert_eq!(config.telegram_api_url, "https://api.telegram.org");
        assert!(config.telegram_notifications_enabled);
        assert!(!config.notify_on_success);
        assert_eq!(config.stale_after_days, 30);
        assert!(config.translations_snapshot.is_none());
        assert!(!config.auto_update_enabled);
        assert_eq!(config.auto_update_interval_minutes, 30);
    }

    #[test]
    #[serial]
    fn test_reads_values_from_env() {
        clear_env();
        std::env::set_var("LOCALES_DIR", "/srv/site/locales");
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "gt-key");
        std::env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
        std::env::set_var("TELEGRAM_CHAT_ID", "-100500");
        std::env::set_var("NOTIFY_ON_SUCCESS", "yes");
        std::env::set_var("STALE_AFTER_DAYS", "7");
        std::env::set_var("AUTO_UPDATE_INTERVAL_MINUTES", "15");

        let config = Config::from_env().expect("Should load");
        clear_env();

        assert_eq!(config.locales_dir, PathBuf::from("/srv/site/locales"));
        assert_eq!(config.translate_api_key.as_deref(), Some("gt-key"));
        assert_eq!(config.telegram_bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram_chat_id.as_deref(), Some("-100500"));
        assert!(config.notify_on_success);
        assert_eq!(config.stale_after_days, 7);
        assert_eq!(config.auto_update_interval_minutes, 15);
    }

    #[test]
    #[serial]
    fn test_blank_credentials_are_treated_as_missing() {
        clear_env();
        std::env::set_var("TELEGRAM_BOT_TOKEN", "   ");
        let config = Config::from_env().expect("Should load");
        clear_env();

        assert!(config.telegram_bot_token.is_none());
    }

    #[test]
    #[serial]
    fn test_invalid_boolean_is_an_error() {
        clear_env();
        std::env::set_var("AUTO_UPDATE_ENABLED", "sometimes");
        let result = Config::from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("AUTO_UPDATE_ENABLED"));
    }

    #[test]
    #[serial]
    fn test_unparseable_numbers_fall_back_to_defaults() {
        clear_env();
        std::env::set_var("STALE_AFTER_DAYS", "a month");
        let config = Config::from_env().expect("Should load");
        clear_env();

        assert_eq!(config.stale_after_days, 30);
    }

    #[test]
    #[serial]
    fn test_out_of_range_stale_days_is_an_error() {
        clear_env();
        std::env::set_var("STALE_AFTER_DAYS", "999999999999");
        let result = Config::from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("STALE_AFTER_DAYS"));
    }

    #[test]
    #[serial]
    fn test_negative_stale_days_is_an_error() {
        clear_env();
        std::env::set_var("STALE_AFTER_DAYS", "-5");
        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
    }
}
