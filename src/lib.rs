//! trawl: date-window timeline and social-graph retrieval
//!
//! This crate pulls a bounded date window of each entity's activity feed, or
//! each entity's social-graph edges, from a paginated and rate-limited REST
//! API, and writes normalized records to TSV files or a SQLite database.
//!
//! The interesting parts are the boundary search that finds the first page
//! of a window without walking the whole feed ([`timeline::BoundaryLocator`])
//! and the retry engine every remote call goes through
//! ([`resilience::ResilienceEngine`]).

pub mod api;
pub mod config;
pub mod crawler;
pub mod graph;
pub mod input;
pub mod output;
pub mod resilience;
pub mod state;
pub mod storage;
pub mod timeline;

use thiserror::Error;

/// Main error type for trawl operations
///
/// Per-entity API failures never surface here; they end up in the run
/// report. Only setup, input and output failures stop a run.
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input error: {0}")]
    Input(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Result type alias for trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use api::{DateWindow, Entity};
pub use config::Config;
pub use state::{EntityOutcome, EntityReport};
