use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity labels exactly as the backend emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        };
        f.write_str(label)
    }
}

/// One page of a paginated catalog, the inner `data` of the list envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total_count: i64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total_count: 0,
        }
    }
}

/// Catalog row for the vulnerability list. A snapshot, replaced wholesale on
/// every successful fetch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VulnerabilitySummary {
    pub id: i64,
    #[serde(default)]
    pub key: String,
    pub title: String,
    pub severity: Severity,
    #[serde(default)]
    pub cve: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub pushed: bool,
    pub updated_at: DateTime<Utc>,
}

/// Full record behind `GET /vulns/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VulnerabilityDetail {
    pub id: i64,
    #[serde(default)]
    pub key: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub cve: String,
    #[serde(default)]
    pub disclosure: String,
    #[serde(default)]
    pub solutions: String,
    #[serde(default)]
    pub reference_links: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub github_search: Vec<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub reasons: Vec<String>,
    pub pushed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog row for the security-notice list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NoticeSummary {
    pub id: i64,
    #[serde(default)]
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub is_zero_day: bool,
    #[serde(default)]
    pub publish_time: String,
    #[serde(default)]
    pub detail_link: String,
    pub pushed: bool,
    pub updated_at: DateTime<Utc>,
}

/// Singleton periodic data-sync configuration. The backend holds the
/// authoritative copy; this is the client's editable draft shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTaskConfig {
    pub name: String,
    pub interval_minutes: u32,
    pub status: bool,
}

impl Default for SyncTaskConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            interval_minutes: 60,
            status: false,
        }
    }
}

/// Singleton push-notification bot configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DingBotConfig {
    pub access_token: String,
    pub secret_token: String,
    pub status: bool,
}

/// Pluggable data-source adapter, also the option set for the source filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub display_name: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub expires_in: u64,
}

/// Acknowledgement for config saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SaveReceipt {
    pub id: i64,
}
