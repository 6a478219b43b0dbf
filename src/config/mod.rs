//! Configuration module for trawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use trawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawl.toml")).unwrap();
//! println!("Retry budget: {}", config.retry.budget);
//! ```

mod parser;
mod types;
mod validation;
mod window;

// Re-export types
pub use types::{
    ApiConfig, Config, CrawlerConfig, OutputConfig, OutputFormat, RetryConfig, WindowConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config};
pub use window::{parse_bound, Bound};
