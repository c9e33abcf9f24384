//! Translation manager: translation keys and their per-locale strings.
//!
//! Base-locale strings are written by administrators; the other locales are
//! filled lazily by `sync_translations`, which machine-translates whatever is
//! missing or older than the base string. Each key's locale map sits behind
//! its own mutex, so writes to one key are serialized while distinct keys
//! proceed independently. No lock is held across a gateway call.

use crate::gateway::{GatewayError, TranslationGateway};
use crate::i18n::{Locale, TranslationValidator};
use crate::monitoring::{metric, LogLevel, MonitoringService};
use crate::retry::{with_retry_if, RetryConfig};
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use thiserror::Error;

const LOG_CONTEXT: &str = "translation_manager";
const SYNC_LOG_CONTEXT: &str = "translation_sync";

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("invalid translation key '{0}': expected dot-separated segments of letters, digits, '_' or '-'")]
    InvalidKey(String),

    #[error("translation key '{0}' already exists")]
    KeyExists(String),

    #[error("translation key '{0}' not found")]
    KeyNotFound(String),

    #[error("failed to read or write translation snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid translation snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("translation snapshot entry '{key}' is stamped in the future ({timestamp})")]
    FutureTimestamp { key: String, timestamp: DateTime<Utc> },
}

/// One locale's string for a key. Absence of an entry means "not yet translated".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A key as seen by the back office: its base-locale value and optional context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationKey {
    pub key: String,
    pub value: String,
    pub context: Option<String>,
}

/// Everything stored for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTranslations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub translations: BTreeMap<Locale, TranslationEntry>,
}

/// Serializable copy of the whole cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSnapshot {
    pub exported_at: DateTime<Utc>,
    pub keys: BTreeMap<String, KeyTranslations>,
}

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Translations older than this are reported as stale
    pub stale_after: Duration,
    /// Retry policy applied by the sync sweep to retryable gateway errors
    pub retry: RetryConfig,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            stale_after: Duration::days(30),
            retry: RetryConfig::api_call(),
        }
    }
}

/// A data-quality problem. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    MissingLocale { key: String, locale: Locale },
    EmptyValue { key: String, locale: Locale },
    /// The base string changed after this translation was written
    Outdated { key: String, locale: Locale },
    Stale { key: String, locale: Locale, age_days: i64 },
    /// Placeholders, URLs or markup differ from the base string
    Quality { key: String, locale: Locale, detail: String },
}

impl ValidationIssue {
    pub fn key(&self) -> &str {
        match self {
            ValidationIssue::MissingLocale { key, .. }
            | ValidationIssue::EmptyValue { key, .. }
            | ValidationIssue::Outdated { key, .. }
            | ValidationIssue::Stale { key, .. }
            | ValidationIssue::Quality { key, .. } => key,
        }
    }

    pub fn locale(&self) -> Locale {
        match self {
            ValidationIssue::MissingLocale { locale, .. }
            | ValidationIssue::EmptyValue { locale, .. }
            | ValidationIssue::Outdated { locale, .. }
            | ValidationIssue::Stale { locale, .. }
            | ValidationIssue::Quality { locale, .. } => *locale,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::MissingLocale { key, locale } => write!(f, "{}: missing {}", key, locale),
            ValidationIssue::EmptyValue { key, locale } => write!(f, "{}: empty {}", key, locale),
            ValidationIssue::Outdated { key, locale } => write!(f, "{}: {} is outdated", key, locale),
            ValidationIssue::Stale { key, locale, age_days } => {
                write!(f, "{}: {} not updated for {} days", key, locale, age_days)
            }
            ValidationIssue::Quality { key, locale, detail } => write!(f, "{}: {}: {}", key, locale, detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub key: String,
    pub locale: Locale,
    pub reason: String,
}

/// Outcome of one sweep. Failures are collected here, not raised.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub attempted: usize,
    pub translated: usize,
    /// Translations dropped because the base string changed during the call
    pub superseded: usize,
    pub failures: Vec<SyncFailure>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleCoverage {
    pub locale: Locale,
    pub translated: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationStats {
    pub total_keys: usize,
    pub total_languages: usize,
    pub last_update: Option<DateTime<Utc>>,
    /// Number of (key, locale) entries held, base locale included
    pub cache_size: usize,
    pub coverage: Vec<LocaleCoverage>,
}

/// Result of merging a base-locale dictionary into the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BaseImport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Dictionary paths that are not valid translation keys
    pub skipped: Vec<String>,
}

/// A (key, locale) pair the sweep needs to translate.
struct PendingTranslation {
    key: String,
    locale: Locale,
    source_text: String,
    source_stamp: DateTime<Utc>,
}

/// Snapshot timestamps may run ahead of the local clock by at most this much.
const MAX_CLOCK_SKEW_HOURS: i64 = 24;

static KEY_REGEX: OnceLock<Regex> = OnceLock::new();

fn validate_key(key: &str) -> Result<(), TranslationError> {
    let regex = KEY_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").expect("key pattern is valid")
    });
    if regex.is_match(key) {
        Ok(())
    } else {
        Err(TranslationError::InvalidKey(key.to_string()))
    }
}

/// Collect string leaves of a nested dictionary under their dotted paths.
fn flatten_strings(value: &Value, prefix: &str, out: &mut BTreeMap<String, String>) {
    let child = |segment: &str| {
        if prefix.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", prefix, segment)
        }
    };

    match value {
        Value::Object(map) => {
            for (segment, nested) in map {
                flatten_strings(nested, &child(segment), out);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_strings(nested, &child(&index.to_string()), out);
            }
        }
        Value::String(text) if !prefix.is_empty() => {
            out.insert(prefix.to_string(), text.clone());
        }
        _ => {}
    }
}

pub struct TranslationManager<G> {
    gateway: G,
    monitoring: Arc<MonitoringService>,
    settings: ManagerSettings,
    keys: RwLock<BTreeMap<String, Arc<Mutex<KeyTranslations>>>>,
    last_stamp: Mutex<DateTime<Utc>>,
}

impl<G: TranslationGateway> TranslationManager<G> {
    pub fn new(gateway: G, monitoring: Arc<MonitoringService>, settings: ManagerSettings) -> Self {
        Self {
            gateway,
            monitoring,
            settings,
            keys: RwLock::new(BTreeMap::new()),
            last_stamp: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn monitoring(&self) -> &Arc<MonitoringService> {
        &self.monitoring
    }

    /// Strictly increasing write timestamps, so "older than the base string"
    /// is decided by write order even within one clock tick.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self.last_stamp.lock();
        let now = Utc::now();
        let stamp = if now > *last {
            now
        } else {
            // Saturates at the end of chrono's range instead of overflowing
            last.checked_add_signed(Duration::microseconds(1))
                .unwrap_or(*last)
        };
        *last = stamp;
        stamp
    }

    fn record(&self, key: &str) -> Option<Arc<Mutex<KeyTranslations>>> {
        self.keys.read().get(key).cloned()
    }

    // ==================== Mutations ====================

    pub fn add_key(&self, key: &str, text: &str) -> Result<(), TranslationError> {
        self.add_key_with_context(key, text, None)
    }

    /// Create a key with its base-locale string. Other locales are left for the sweep.
    pub fn add_key_with_context(
        &self,
        key: &str,
        text: &str,
        context: Option<&str>,
    ) -> Result<(), TranslationError> {
        validate_key(key)?;

        {
            let mut keys = self.keys.write();
            if keys.contains_key(key) {
                return Err(TranslationError::KeyExists(key.to_string()));
            }

            let mut record = KeyTranslations {
                context: context.map(str::to_string),
                translations: BTreeMap::new(),
            };
            record.translations.insert(
                Locale::base(),
                TranslationEntry {
                    text: text.to_string(),
                    timestamp: self.next_timestamp(),
                },
            );
            keys.insert(key.to_string(), Arc::new(Mutex::new(record)));
        }

        self.monitoring.increment(metric::TRANSLATION_KEYS_ADDED);
        self.monitoring.log(
            LogLevel::Info,
            &format!("Added translation key '{}'", key),
            Some(LOG_CONTEXT),
            None,
        );
        Ok(())
    }

    /// Rewrite the base-locale string. Existing translations become outdated.
    pub fn update_key(&self, key: &str, text: &str) -> Result<(), TranslationError> {
        let record = self
            .record(key)
            .ok_or_else(|| TranslationError::KeyNotFound(key.to_string()))?;

        record.lock().translations.insert(
            Locale::base(),
            TranslationEntry {
                text: text.to_string(),
                timestamp: self.next_timestamp(),
            },
        );

        self.monitoring.increment(metric::TRANSLATION_KEYS_UPDATED);
        self.monitoring.log(
            LogLevel::Info,
            &format!("Updated translation key '{}'", key),
            Some(LOG_CONTEXT),
            None,
        );
        Ok(())
    }

    /// Manually set one locale's string (an administrator's edit).
    pub fn set_translation(&self, key: &str, locale: Locale, text: &str) -> Result<(), TranslationError> {
        if locale.is_base() {
            return self.update_key(key, text);
        }

        let record = self
            .record(key)
            .ok_or_else(|| TranslationError::KeyNotFound(key.to_string()))?;

        record.lock().translations.insert(
            locale,
            TranslationEntry {
                text: text.to_string(),
                timestamp: self.next_timestamp(),
            },
        );

        self.monitoring.log(
            LogLevel::Info,
            &format!("Set {} translation for '{}'", locale, key),
            Some(LOG_CONTEXT),
            None,
        );
        Ok(())
    }

    pub fn remove_key(&self, key: &str) -> Result<(), TranslationError> {
        if self.keys.write().remove(key).is_none() {
            return Err(TranslationError::KeyNotFound(key.to_string()));
        }

        self.monitoring.increment(metric::TRANSLATION_KEYS_REMOVED);
        self.monitoring.log(
            LogLevel::Info,
            &format!("Removed translation key '{}'", key),
            Some(LOG_CONTEXT),
            None,
        );
        Ok(())
    }

    // ==================== Reads ====================

    pub fn get_key(&self, key: &str) -> Option<TranslationKey> {
        let record = self.record(key)?;
        let record = record.lock();
        let base = record.translations.get(&Locale::base())?;
        Some(TranslationKey {
            key: key.to_string(),
            value: base.text.clone(),
            context: record.context.clone(),
        })
    }

    pub fn get_translation(&self, key: &str, locale: Locale) -> Option<String> {
        self.get_entry(key, locale).map(|entry| entry.text)
    }

    pub fn get_entry(&self, key: &str, locale: Locale) -> Option<TranslationEntry> {
        let record = self.record(key)?;
        let entry = record.lock().translations.get(&locale).cloned();
        entry
    }

    /// All keys in sorted order.
    pub fn list_keys(&self) -> Vec<String> {
        self.keys.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Merge the base-locale dictionary into the cache.
    ///
    /// Every string leaf becomes a dot-path key (array items by index). New
    /// paths are added, changed texts go through `update_key` so their
    /// translations become outdated, and keys absent from the dictionary are
    /// left alone.
    pub fn import_base_dictionary(&self, dictionary: &Value) -> BaseImport {
        let mut strings = BTreeMap::new();
        flatten_strings(dictionary, "", &mut strings);

        let base = Locale::base();
        let mut import = BaseImport::default();
        for (key, text) in strings {
            if validate_key(&key).is_err() {
                import.skipped.push(key);
                continue;
            }

            let current = self.record(&key).map(|record| {
                let record = record.lock();
                record.translations.get(&base).map(|e| e.text.clone())
            });
            let result = match current {
                None => self.add_key(&key, &text).map(|()| import.added += 1),
                Some(Some(existing)) if existing == text => {
                    import.unchanged += 1;
                    Ok(())
                }
                Some(_) => self.update_key(&key, &text).map(|()| import.updated += 1),
            };
            if let Err(e) = result {
                self.monitoring.log(
                    LogLevel::Warn,
                    &format!("Skipped base string '{}': {}", key, e),
                    Some(LOG_CONTEXT),
                    None,
                );
                import.skipped.push(key);
            }
        }

        self.monitoring.log(
            LogLevel::Info,
            &format!(
                "Imported base dictionary: {} added, {} updated, {} unchanged, {} skipped",
                import.added,
                import.updated,
                import.unchanged,
                import.skipped.len()
            ),
            Some(LOG_CONTEXT),
            None,
        );
        import
    }

    // ==================== Sync ====================

    /// Translate every (key, locale) pair that is missing or outdated.
    ///
    /// Each failure is logged once as an error and collected in the report;
    /// the previous entry for that pair is left as it was and the sweep moves on.
    pub async fn sync_translations(&self) -> SyncReport {
        let started = Instant::now();
        let base = Locale::base();
        let pending = self.pending_translations();
        let mut report = SyncReport::default();

        self.monitoring.log(
            LogLevel::Info,
            &format!("Starting translation sync: {} pending", pending.len()),
            Some(SYNC_LOG_CONTEXT),
            None,
        );

        for job in pending {
            report.attempted += 1;
            self.monitoring.increment(metric::TRANSLATION_API_CALLS);

            let result = with_retry_if(
                &self.settings.retry,
                &format!("Translate '{}' to {}", job.key, job.locale),
                || self.gateway.translate(&job.source_text, job.locale, base),
                GatewayError::is_retryable,
            )
            .await;

            match result {
                Ok(text) => {
                    if self.store_synced(&job, text) {
                        report.translated += 1;
                        self.monitoring.increment(metric::TRANSLATIONS_WRITTEN);
                    } else {
                        report.superseded += 1;
                        self.monitoring.log(
                            LogLevel::Debug,
                            &format!(
                                "Discarded {} translation for '{}': base string changed during sync",
                                job.locale, job.key
                            ),
                            Some(SYNC_LOG_CONTEXT),
                            None,
                        );
                    }
                }
                Err(e) => {
                    self.monitoring.increment(metric::TRANSLATION_API_FAILURES);
                    self.monitoring.log(
                        LogLevel::Error,
                        &format!("Failed to translate '{}' to {}: {}", job.key, job.locale, e),
                        Some(SYNC_LOG_CONTEXT),
                        Some(json!({
                            "key": job.key,
                            "locale": job.locale,
                            "error": e.to_string(),
                            "retryable": e.is_retryable(),
                        })),
                    );
                    report.failures.push(SyncFailure {
                        key: job.key,
                        locale: job.locale,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        self.monitoring.increment(metric::SYNC_RUNS);
        self.monitoring
            .set_metric(metric::LAST_SYNC_DURATION_MS, report.duration_ms as f64);

        let level = if report.is_clean() {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };
        self.monitoring.log(
            level,
            &format!(
                "Translation sync finished: {} translated, {} failed, {} superseded",
                report.translated,
                report.failures.len(),
                report.superseded
            ),
            Some(SYNC_LOG_CONTEXT),
            Some(json!({ "duration_ms": report.duration_ms })),
        );

        report
    }

    fn pending_translations(&self) -> Vec<PendingTranslation> {
        let base = Locale::base();
        let targets = Locale::auto_translate_targets();
        let keys = self.keys.read();
        let mut pending = Vec::new();

        for (key, record) in keys.iter() {
            let record = record.lock();
            let Some(source) = record.translations.get(&base) else {
                continue;
            };
            if source.text.trim().is_empty() {
                continue;
            }

            for &locale in &targets {
                let needs_translation = match record.translations.get(&locale) {
                    None => true,
                    Some(entry) => entry.timestamp < source.timestamp,
                };
                if needs_translation {
                    pending.push(PendingTranslation {
                        key: key.clone(),
                        locale,
                        source_text: source.text.clone(),
                        source_stamp: source.timestamp,
                    });
                }
            }
        }

        pending
    }

    /// Write a sweep result unless the key was removed or its base string changed.
    fn store_synced(&self, job: &PendingTranslation, text: String) -> bool {
        let Some(record) = self.record(&job.key) else {
            return false;
        };
        let mut record = record.lock();

        let base_unchanged = record
            .translations
            .get(&Locale::base())
            .is_some_and(|base| base.timestamp == job.source_stamp);
        if !base_unchanged {
            return false;
        }

        record.translations.insert(
            job.locale,
            TranslationEntry {
                text,
                timestamp: self.next_timestamp(),
            },
        );
        true
    }

    // ==================== Validation & Stats ====================

    pub fn validate_translations(&self) -> Vec<ValidationIssue> {
        self.validate_at(Utc::now())
    }

    /// Report data-quality issues as of `now`, ordered by key then locale.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Vec<ValidationIssue> {
        let base = Locale::base();
        let targets = Locale::targets();
        let keys = self.keys.read();
        let mut issues = Vec::new();

        for (key, record) in keys.iter() {
            let record = record.lock();
            let source = record.translations.get(&base);

            match source {
                None => issues.push(ValidationIssue::MissingLocale {
                    key: key.clone(),
                    locale: base,
                }),
                Some(entry) if entry.text.trim().is_empty() => issues.push(ValidationIssue::EmptyValue {
                    key: key.clone(),
                    locale: base,
                }),
                Some(_) => {}
            }

            for &locale in &targets {
                let Some(entry) = record.translations.get(&locale) else {
                    issues.push(ValidationIssue::MissingLocale {
                        key: key.clone(),
                        locale,
                    });
                    continue;
                };

                if entry.text.trim().is_empty() {
                    issues.push(ValidationIssue::EmptyValue {
                        key: key.clone(),
                        locale,
                    });
                    continue;
                }

                if let Some(source) = source {
                    if entry.timestamp < source.timestamp {
                        issues.push(ValidationIssue::Outdated {
                            key: key.clone(),
                            locale,
                        });
                    }
                }

                let age = now - entry.timestamp;
                if age > self.settings.stale_after {
                    issues.push(ValidationIssue::Stale {
                        key: key.clone(),
                        locale,
                        age_days: age.num_days(),
                    });
                }

                if let Some(source) = source {
                    let quality = TranslationValidator::validate(&source.text, &entry.text);
                    for detail in quality.errors.into_iter().chain(quality.warnings) {
                        issues.push(ValidationIssue::Quality {
                            key: key.clone(),
                            locale,
                            detail,
                        });
                    }
                }
            }
        }

        issues
    }

    pub fn get_stats(&self) -> TranslationStats {
        let base = Locale::base();
        let targets = Locale::targets();
        let keys = self.keys.read();

        let mut last_update: Option<DateTime<Utc>> = None;
        let mut cache_size = 0;
        let mut translated = vec![0usize; targets.len()];

        for record in keys.values() {
            let record = record.lock();
            cache_size += record.translations.len();

            if let Some(latest) = record.translations.values().map(|e| e.timestamp).max() {
                last_update = Some(last_update.map_or(latest, |current| current.max(latest)));
            }

            let source_stamp = record.translations.get(&base).map(|e| e.timestamp);
            for (count, locale) in translated.iter_mut().zip(&targets) {
                let current = record.translations.get(locale).is_some_and(|entry| {
                    !entry.text.trim().is_empty()
                        && source_stamp.map_or(true, |stamp| entry.timestamp >= stamp)
                });
                if current {
                    *count += 1;
                }
            }
        }

        let total_keys = keys.len();
        TranslationStats {
            total_keys,
            total_languages: Locale::all().len(),
            last_update,
            cache_size,
            coverage: targets
                .into_iter()
                .zip(translated)
                .map(|(locale, translated)| LocaleCoverage {
                    locale,
                    translated,
                    missing: total_keys - translated,
                })
                .collect(),
        }
    }

    // ==================== Persistence ====================

    pub fn export_snapshot(&self) -> TranslationSnapshot {
        let keys = self.keys.read();
        TranslationSnapshot {
            exported_at: Utc::now(),
            keys: keys
                .iter()
                .map(|(key, record)| (key.clone(), record.lock().clone()))
                .collect(),
        }
    }

    /// Replace the cache with `snapshot`. Returns the number of keys loaded.
    pub fn import_snapshot(&self, snapshot: TranslationSnapshot) -> Result<usize, TranslationError> {
        let latest_allowed = Utc::now() + Duration::hours(MAX_CLOCK_SKEW_HOURS);
        for (key, record) in &snapshot.keys {
            validate_key(key)?;
            if let Some(entry) = record.translations.values().find(|e| e.timestamp > latest_allowed) {
                return Err(TranslationError::FutureTimestamp {
                    key: key.clone(),
                    timestamp: entry.timestamp,
                });
            }
        }

        let newest = snapshot
            .keys
            .values()
            .flat_map(|record| record.translations.values().map(|e| e.timestamp))
            .max();
        if let Some(newest) = newest {
            let mut last = self.last_stamp.lock();
            *last = (*last).max(newest);
        }

        let count = snapshot.keys.len();
        *self.keys.write() = snapshot
            .keys
            .into_iter()
            .map(|(key, record)| (key, Arc::new(Mutex::new(record))))
            .collect();

        self.monitoring.log(
            LogLevel::Info,
            &format!("Imported {} translation keys", count),
            Some(LOG_CONTEXT),
            None,
        );
        Ok(count)
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), TranslationError> {
        let json = serde_json::to_string_pretty(&self.export_snapshot())?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load_from(&self, path: &Path) -> Result<usize, TranslationError> {
        let content = tokio::fs::read_to_string(path).await?;
        let snapshot: TranslationSnapshot = serde_json::from_str(&content)?;
        self.import_snapshot(snapshot)
    }
}
