//! Process-level monitoring: a batch-pruned log buffer and named metrics.
//!
//! A `MonitoringService` is constructed explicitly and shared through an
//! `Arc`. Every entry logged here is mirrored to `tracing`, so the buffer is
//! an in-memory view for reports and notifications, not the primary log sink.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Once the buffer holds more than this many entries it is pruned.
pub const MAX_LOGS: usize = 1000;

/// Number of most recent entries kept after pruning.
pub const TRIM_TO: usize = 500;

/// How many endpoints the performance report ranks.
const TOP_ENDPOINTS: usize = 5;

/// How many error entries the performance report includes.
const RECENT_ERRORS: usize = 10;

/// Well-known metric names.
pub mod metric {
    pub const TOTAL_REQUESTS: &str = "total_requests";
    pub const TOTAL_RESPONSE_TIME: &str = "total_response_time";
    pub const TOTAL_ERRORS: &str = "total_errors";

    /// Prefix for per-endpoint request counters (`endpoint:/api/leads`)
    pub const ENDPOINT_PREFIX: &str = "endpoint:";

    pub const TRANSLATION_API_CALLS: &str = "translation_api_calls";
    pub const TRANSLATION_API_FAILURES: &str = "translation_api_failures";
    pub const TRANSLATIONS_WRITTEN: &str = "translations_written";
    pub const TRANSLATION_KEYS_ADDED: &str = "translation_keys_added";
    pub const TRANSLATION_KEYS_UPDATED: &str = "translation_keys_updated";
    pub const TRANSLATION_KEYS_REMOVED: &str = "translation_keys_removed";
    pub const SYNC_RUNS: &str = "sync_runs";
    pub const LAST_SYNC_DURATION_MS: &str = "last_sync_duration_ms";
    pub const NOTIFICATIONS_SENT: &str = "notifications_sent";
    pub const NOTIFICATIONS_FAILED: &str = "notifications_failed";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown log level: '{0}'")]
pub struct UnknownLogLevel(pub String);

impl std::str::FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

/// One buffered log entry. `data` carries arbitrary structured context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub total_logs: usize,
    pub logs_by_level: BTreeMap<LogLevel, usize>,
    pub metrics_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub total_requests: f64,
    /// Milliseconds; 0 when no requests were tracked
    pub average_response_time: f64,
    /// Percentage (0-100); 0 when no requests were tracked
    pub error_rate: f64,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStat {
    pub endpoint: String,
    pub count: f64,
}

/// Translation API health, derived from the translation counters.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationApiSummary {
    pub api_calls: f64,
    pub api_failures: f64,
    /// Percentage (0-100); 0 when no calls were made
    pub api_success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    pub summary: PerformanceSummary,
    pub top_endpoints: Vec<EndpointStat>,
    pub translation: TranslationApiSummary,
    pub recent_errors: Vec<LogEntry>,
}

pub struct MonitoringService {
    started_at: DateTime<Utc>,
    started: Instant,
    logs: Mutex<Vec<LogEntry>>,
    metrics: Mutex<HashMap<String, f64>>,
}

impl Default for MonitoringService {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitoringService {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            logs: Mutex::new(Vec::with_capacity(MAX_LOGS + 1)),
            metrics: Mutex::new(HashMap::new()),
        }
    }

    /// Append an entry and mirror it to `tracing`.
    pub fn log(&self, level: LogLevel, message: &str, context: Option<&str>, data: Option<Value>) {
        let ctx = context.unwrap_or("-");
        match level {
            LogLevel::Debug => debug!(context = ctx, "{}", message),
            LogLevel::Info => info!(context = ctx, "{}", message),
            LogLevel::Warn => warn!(context = ctx, "{}", message),
            LogLevel::Error => error!(context = ctx, "{}", message),
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            context: context.map(str::to_string),
            data,
        };

        let mut logs = self.logs.lock();
        logs.push(entry);
        if logs.len() > MAX_LOGS {
            let excess = logs.len() - TRIM_TO;
            logs.drain(..excess);
        }
    }

    pub fn info(&self, message: &str, context: Option<&str>) {
        self.log(LogLevel::Info, message, context, None);
    }

    pub fn warn(&self, message: &str, context: Option<&str>) {
        self.log(LogLevel::Warn, message, context, None);
    }

    pub fn error(&self, message: &str, context: Option<&str>, data: Option<Value>) {
        self.log(LogLevel::Error, message, context, data);
    }

    pub fn increment_metric(&self, name: &str, delta: f64) {
        *self.metrics.lock().entry(name.to_string()).or_insert(0.0) += delta;
    }

    pub fn increment(&self, name: &str) {
        self.increment_metric(name, 1.0);
    }

    pub fn set_metric(&self, name: &str, value: f64) {
        self.metrics.lock().insert(name.to_string(), value);
    }

    /// Current value; absent metrics read as 0.
    pub fn get_metric(&self, name: &str) -> f64 {
        self.metrics.lock().get(name).copied().unwrap_or(0.0)
    }

    pub fn get_all_metrics(&self) -> BTreeMap<String, f64> {
        self.metrics
            .lock()
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }

    /// Record one handled request for the performance report.
    pub fn track_request(&self, endpoint: &str, duration_ms: f64, is_error: bool) {
        let mut metrics = self.metrics.lock();
        *metrics.entry(metric::TOTAL_REQUESTS.to_string()).or_insert(0.0) += 1.0;
        *metrics
            .entry(metric::TOTAL_RESPONSE_TIME.to_string())
            .or_insert(0.0) += duration_ms;
        if is_error {
            *metrics.entry(metric::TOTAL_ERRORS.to_string()).or_insert(0.0) += 1.0;
        }
        *metrics
            .entry(format!("{}{}", metric::ENDPOINT_PREFIX, endpoint))
            .or_insert(0.0) += 1.0;
    }

    /// The most recent `limit` entries (optionally of one level), oldest first.
    pub fn get_logs(&self, level: Option<LogLevel>, limit: usize) -> Vec<LogEntry> {
        let logs = self.logs.lock();
        let mut selected: Vec<LogEntry> = logs
            .iter()
            .rev()
            .filter(|entry| level.map_or(true, |l| entry.level == l))
            .take(limit)
            .cloned()
            .collect();
        selected.reverse();
        selected
    }

    pub fn log_count(&self) -> usize {
        self.logs.lock().len()
    }

    pub fn clear_logs(&self) {
        self.logs.lock().clear();
    }

    pub fn clear_metrics(&self) {
        self.metrics.lock().clear();
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn get_system_stats(&self) -> SystemStats {
        let (total_logs, logs_by_level) = {
            let logs = self.logs.lock();
            let mut by_level = BTreeMap::new();
            for entry in logs.iter() {
                *by_level.entry(entry.level).or_insert(0) += 1;
            }
            (logs.len(), by_level)
        };

        SystemStats {
            started_at: self.started_at,
            uptime_secs: self.uptime_secs(),
            total_logs,
            logs_by_level,
            metrics_count: self.metrics.lock().len(),
        }
    }

    pub fn generate_performance_report(&self) -> PerformanceReport {
        let metrics = self.get_all_metrics();
        let value = |name: &str| metrics.get(name).copied().unwrap_or(0.0);

        let total_requests = value(metric::TOTAL_REQUESTS);
        let (average_response_time, error_rate) = if total_requests > 0.0 {
            (
                value(metric::TOTAL_RESPONSE_TIME) / total_requests,
                value(metric::TOTAL_ERRORS) / total_requests * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        let mut top_endpoints: Vec<EndpointStat> = metrics
            .iter()
            .filter_map(|(name, count)| {
                name.strip_prefix(metric::ENDPOINT_PREFIX)
                    .map(|endpoint| EndpointStat {
                        endpoint: endpoint.to_string(),
                        count: *count,
                    })
            })
            .collect();
        // Ties keep name order (metrics come from a BTreeMap)
        top_endpoints.sort_by(|a, b| b.count.total_cmp(&a.count));
        top_endpoints.truncate(TOP_ENDPOINTS);

        let api_calls = value(metric::TRANSLATION_API_CALLS);
        let api_failures = value(metric::TRANSLATION_API_FAILURES);
        let api_success_rate = if api_calls > 0.0 {
            (api_calls - api_failures) / api_calls * 100.0
        } else {
            0.0
        };

        PerformanceReport {
            generated_at: Utc::now(),
            summary: PerformanceSummary {
                total_requests,
                average_response_time,
                error_rate,
                uptime_secs: self.uptime_secs(),
            },
            top_endpoints,
            translation: TranslationApiSummary {
                api_calls,
                api_failures,
                api_success_rate,
            },
            recent_errors: self.get_logs(Some(LogLevel::Error), RECENT_ERRORS),
        }
    }
}
