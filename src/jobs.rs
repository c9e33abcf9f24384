//! Job entry points for external triggers (cron, an admin action).
//!
//! There is no timer loop here: a cron-like caller runs one job per invocation.

use crate::config::Config;
use crate::gateway::{GoogleTranslateGateway, TranslationGateway};
use crate::i18n::{Locale, LocaleStore};
use crate::manager::{
    BaseImport, ManagerSettings, SyncReport, TranslationError, TranslationManager,
    TranslationStats, ValidationIssue,
};
use crate::monitoring::{metric, LogLevel, MonitoringService, PerformanceReport, SystemStats};
use crate::retry::RetryConfig;
use crate::telegram::{NotificationOutcome, NotifierStatus, TelegramNotifier, TelegramSettings};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const JOB_LOG_CONTEXT: &str = "jobs";

/// Everything a job needs, constructed once per process.
pub struct Services<G> {
    pub monitoring: Arc<MonitoringService>,
    pub manager: TranslationManager<G>,
    pub notifier: TelegramNotifier,
    pub notify_on_success: bool,
    pub snapshot_path: Option<PathBuf>,
    /// Directory holding `<code>.json` dictionaries; the base one seeds the cache
    pub locales_dir: Option<PathBuf>,
}

impl Services<GoogleTranslateGateway> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let stale_after = chrono::Duration::try_days(config.stale_after_days)
            .with_context(|| format!("STALE_AFTER_DAYS={} is out of range", config.stale_after_days))?;

        let client = reqwest::Client::new();
        let monitoring = Arc::new(MonitoringService::new());

        let gateway = GoogleTranslateGateway::new(
            client.clone(),
            config.translate_api_key.clone(),
            config.translate_api_url.clone(),
        );
        let manager = TranslationManager::new(
            gateway,
            Arc::clone(&monitoring),
            ManagerSettings {
                stale_after,
                retry: RetryConfig::api_call(),
            },
        );
        let notifier = TelegramNotifier::new(
            client,
            TelegramSettings {
                bot_token: config.telegram_bot_token.clone(),
                chat_id: config.telegram_chat_id.clone(),
                api_url: config.telegram_api_url.clone(),
                enabled: config.telegram_notifications_enabled,
            },
        );

        Ok(Self {
            monitoring,
            manager,
            notifier,
            notify_on_success: config.notify_on_success,
            snapshot_path: config.translations_snapshot.clone(),
            locales_dir: Some(config.locales_dir.clone()),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncJobOutcome {
    pub seeded: BaseImport,
    pub report: SyncReport,
    pub validation_issues: usize,
    pub stats: TranslationStats,
    pub notified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissingString {
    pub key: String,
    pub locale: Locale,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportJobOutcome {
    pub performance: PerformanceReport,
    pub system: SystemStats,
    pub translations: TranslationStats,
    pub validation_issues: Vec<ValidationIssue>,
    pub missing_in_locale_files: Vec<MissingString>,
    pub gateway_health: String,
    pub notifier: NotifierStatus,
}

impl<G: TranslationGateway> Services<G> {
    /// Load the snapshot if one is configured. A missing file means a fresh start.
    pub async fn load_snapshot(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        match self.manager.load_from(path).await {
            Ok(count) => {
                info!("Loaded {} translation keys from {}", count, path.display());
                Ok(())
            }
            Err(TranslationError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", path.display());
                Ok(())
            }
            Err(e) => Err(e).context(format!("Failed to load translation snapshot {}", path.display())),
        }
    }

    /// Merge the base-locale dictionary file into the cache. A missing file is skipped.
    pub async fn seed_from_locales(&self) -> Result<BaseImport> {
        let Some(dir) = &self.locales_dir else {
            return Ok(BaseImport::default());
        };
        let path = dir.join(format!("{}.json", Locale::base().code()));

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No base dictionary at {}, nothing to seed", path.display());
                return Ok(BaseImport::default());
            }
            Err(e) => {
                return Err(e).context(format!("Failed to read base dictionary {}", path.display()))
            }
        };
        let dictionary: serde_json::Value = serde_json::from_str(&content)
            .context(format!("Failed to parse base dictionary {}", path.display()))?;

        Ok(self.manager.import_base_dictionary(&dictionary))
    }

    pub async fn save_snapshot(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        self.manager
            .save_to(path)
            .await
            .context(format!("Failed to save translation snapshot {}", path.display()))
    }

    /// Record a notification outcome. Failures are logged, never escalated.
    fn record_notification(&self, what: &str, outcome: &NotificationOutcome) -> bool {
        match outcome {
            NotificationOutcome::Sent => {
                self.monitoring.increment(metric::NOTIFICATIONS_SENT);
                true
            }
            NotificationOutcome::Disabled => false,
            NotificationOutcome::Failed(reason) => {
                self.monitoring.increment(metric::NOTIFICATIONS_FAILED);
                self.monitoring.log(
                    LogLevel::Warn,
                    &format!("Could not send {} notification: {}", what, reason),
                    Some(JOB_LOG_CONTEXT),
                    None,
                );
                false
            }
        }
    }

    /// Report a job failure to operators (best-effort).
    pub async fn notify_failure(&self, error: &anyhow::Error) -> bool {
        let outcome = self
            .notifier
            .send_error_notification(&format!("{:#}", error), Some("translation sync job"))
            .await;
        self.record_notification("error", &outcome)
    }
}

/// Run one translation sweep: load state, seed base strings, sync, validate, persist, notify.
pub async fn run_sync_job<G: TranslationGateway>(services: &Services<G>) -> Result<SyncJobOutcome> {
    info!("Starting translation sync job");

    services.load_snapshot().await?;
    let seeded = services.seed_from_locales().await?;

    let report = services.manager.sync_translations().await;
    let issues = services.manager.validate_translations();
    if !issues.is_empty() {
        services.monitoring.log(
            LogLevel::Warn,
            &format!("{} translation issues after sync", issues.len()),
            Some(JOB_LOG_CONTEXT),
            None,
        );
    }

    services.save_snapshot().await?;

    let stats = services.manager.get_stats();
    let mut notified = false;
    if !report.is_clean() || services.notify_on_success {
        let outcome = services.notifier.send_sync_report(&report).await;
        notified |= services.record_notification("sync report", &outcome);
    }
    if services.notify_on_success {
        let outcome = services.notifier.send_translation_stats(&stats).await;
        notified |= services.record_notification("translation stats", &outcome);
    }

    info!(
        "✓ Translation sync job completed: {} translated, {} failed",
        report.translated,
        report.failures.len()
    );

    Ok(SyncJobOutcome {
        seeded,
        report,
        validation_issues: issues.len(),
        stats,
        notified,
    })
}

/// Find keys whose string is absent from a locale's dictionary file.
pub async fn find_missing_strings(locales: &LocaleStore, keys: &[String]) -> Vec<MissingString> {
    // Sentinel that no real dictionary value contains
    const MISSING: &str = "\u{0}missing\u{0}";

    let mut missing = Vec::new();
    for key in keys {
        for locale in Locale::all() {
            if locales.resolve(locale, key, Some(MISSING)).await == MISSING {
                missing.push(MissingString {
                    key: key.clone(),
                    locale,
                });
            }
        }
    }
    missing
}

/// Collect monitoring, translation and locale-file health into one report.
pub async fn run_report_job<G: TranslationGateway>(
    services: &Services<G>,
    locales: &LocaleStore,
) -> Result<ReportJobOutcome> {
    services.load_snapshot().await?;

    let gateway_health = match services.manager.gateway().health_check().await {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    };

    let keys = services.manager.list_keys();
    let missing_in_locale_files = find_missing_strings(locales, &keys).await;

    Ok(ReportJobOutcome {
        performance: services.monitoring.generate_performance_report(),
        system: services.monitoring.get_system_stats(),
        translations: services.manager.get_stats(),
        validation_issues: services.manager.validate_translations(),
        missing_in_locale_files,
        gateway_health,
        notifier: services.notifier.get_status(),
    })
}
