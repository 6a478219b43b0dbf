use crate::config::types::{ApiConfig, Config, CrawlerConfig, RetryConfig};
use crate::graph::MAX_CHUNK_SIZE;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_api_config(&config.api)?;
    config.window.resolve()?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page-size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.chunk_size < 1 || config.chunk_size > MAX_CHUNK_SIZE {
        return Err(ConfigError::Validation(format!(
            "chunk-size must be between 1 and {}, got {}",
            MAX_CHUNK_SIZE, config.chunk_size
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.budget < 1 {
        return Err(ConfigError::Validation(format!(
            "retry budget must be >= 1, got {}",
            config.budget
        )));
    }

    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url cannot be used as a base: {}",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if let Some(var) = &config.token_env {
        if var.is_empty() || var.contains('=') {
            return Err(ConfigError::Validation(format!(
                "token-env must name an environment variable, got '{}'",
                var
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;

    fn create_test_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_valid_config() {
        let config = create_test_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_page_size() {
        let mut config = create_test_config();
        config.crawler.page_size = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_chunk_size_bounds() {
        let mut config = create_test_config();

        config.crawler.chunk_size = 0;
        assert!(validate(&config).is_err());

        config.crawler.chunk_size = 101;
        assert!(validate(&config).is_err());

        config.crawler.chunk_size = 100;
        assert!(validate(&config).is_ok());

        config.crawler.chunk_size = 1;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_retry_budget() {
        let mut config = create_test_config();
        config.retry.budget = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = create_test_config();

        config.api.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "ftp://api.example.com/".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.api.base_url = "mailto:admin@example.com".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_user_agent() {
        let mut config = create_test_config();
        config.api.user_agent = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_token_env() {
        let mut config = create_test_config();
        config.api.token_env = Some("A=B".to_string());
        assert!(validate(&config).is_err());

        config.api.token_env = Some("TRAWL_TOKEN".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_reversed_window() {
        let mut config = create_test_config();
        config.window = WindowConfig {
            start: Some("2011-05-07".to_string()),
            end: Some("2011-05-03".to_string()),
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unparseable_window() {
        let mut config = create_test_config();
        config.window.end = Some("tomorrow".to_string());
        config.window.start = Some("2011-05-03".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidDate(_))));
    }
}
