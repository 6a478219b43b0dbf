use crate::graph::{NeighborMode, DEFAULT_CHUNK_SIZE};
use serde::Deserialize;
use std::fmt;

/// Main configuration structure for trawl
///
/// Every section is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub crawler: CrawlerConfig,
    pub retry: RetryConfig,
    pub api: ApiConfig,
    pub output: OutputConfig,
}

/// Date window for timeline runs
///
/// Accepts RFC 3339 instants or plain `YYYY-MM-DD` dates; a date bound
/// covers the whole day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Crawl pipeline behavior
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Items per timeline page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Fixed delay between successive timeline page fetches (milliseconds)
    #[serde(rename = "pacing-delay-ms")]
    pub pacing_delay_ms: u64,

    /// Ids per batch lookup
    #[serde(rename = "chunk-size")]
    pub chunk_size: usize,

    /// How neighbor ids are paged
    #[serde(rename = "neighbor-mode")]
    pub neighbor_mode: NeighborMode,

    /// Resolve neighbor ids to screen names before emitting edges
    #[serde(rename = "resolve-names")]
    pub resolve_names: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            pacing_delay_ms: 5000,
            chunk_size: DEFAULT_CHUNK_SIZE,
            neighbor_mode: NeighborMode::Cursor,
            resolve_names: true,
        }
    }
}

/// Retry budget and delays shared by all remote calls
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum retries per unit of work, counted separately for rate limits
    pub budget: u32,

    /// Delay before retrying a transient failure (milliseconds)
    #[serde(rename = "network-delay-ms")]
    pub network_delay_ms: u64,

    /// Seconds added to rate-limit waits of page-index requests
    #[serde(rename = "page-index-slack-secs")]
    pub page_index_slack_secs: u64,

    /// Seconds added to rate-limit waits of cursor requests
    #[serde(rename = "cursor-slack-secs")]
    pub cursor_slack_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            budget: 5,
            network_delay_ms: 5000,
            page_index_slack_secs: 10,
            cursor_slack_secs: 1,
        }
    }
}

/// Remote API endpoint and client identification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL the endpoint paths are appended to
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Name of the environment variable holding a bearer token
    #[serde(rename = "token-env")]
    pub token_env: Option<String>,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/1.1/".to_string(),
            user_agent: format!("trawl/{}", env!("CARGO_PKG_VERSION")),
            token_env: None,
            timeout_secs: 30,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Where records are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated files
    #[default]
    Tsv,

    /// A SQLite database
    Sqlite,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tsv => f.write_str("tsv"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}
