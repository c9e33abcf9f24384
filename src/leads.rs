//! Lead records and the back-office CSV export.

use crate::i18n::Locale;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Column order of the export. Changing it breaks spreadsheets built on top of it.
pub const CSV_COLUMNS: [&str; 15] = [
    "ID",
    "Name",
    "Email",
    "Phone",
    "Telegram",
    "Status",
    "Priority",
    "Source",
    "Language",
    "DepositAmount",
    "AssignedTo",
    "Message",
    "Notes",
    "CreatedAt",
    "UpdatedAt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Rejected,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl LeadPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadPriority::Low => "low",
            LeadPriority::Medium => "medium",
            LeadPriority::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: u64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub telegram: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub priority: LeadPriority,
    pub source: Option<String>,
    pub language: Option<Locale>,
    pub deposit_amount: Option<f64>,
    pub assigned_to: Option<String>,
    pub message: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// A lead with only the required fields set; timestamps are now.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            email: None,
            phone: None,
            telegram: None,
            status: LeadStatus::default(),
            priority: LeadPriority::default(),
            source: None,
            language: None,
            deposit_amount: None,
            assigned_to: None,
            message: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn csv_fields(&self) -> [String; 15] {
        let opt = |value: &Option<String>| value.clone().unwrap_or_default();
        [
            self.id.to_string(),
            self.name.clone(),
            opt(&self.email),
            opt(&self.phone),
            opt(&self.telegram),
            self.status.as_str().to_string(),
            self.priority.as_str().to_string(),
            opt(&self.source),
            self.language.map(|l| l.code().to_string()).unwrap_or_default(),
            self.deposit_amount.map(|a| a.to_string()).unwrap_or_default(),
            opt(&self.assigned_to),
            opt(&self.message),
            opt(&self.notes),
            self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ]
    }
}

/// Quote a field when it contains a delimiter, quote or line break; embedded quotes are doubled.
pub fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_row<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|field| escape_csv_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Export leads as CSV: a header row, then one row per lead, `\n`-separated.
pub fn export_csv(leads: &[Lead]) -> String {
    let mut out = csv_row(CSV_COLUMNS);
    out.push('\n');
    for lead in leads {
        out.push_str(&csv_row(lead.csv_fields()));
        out.push('\n');
    }
    out
}
