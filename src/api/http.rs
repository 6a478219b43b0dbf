//! HTTP implementation of the feed capabilities
//!
//! This module handles all HTTP requests against the remote API, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - Bearer authentication from an environment variable
//! - Mapping HTTP status codes and transport errors onto [`ApiError`]
//! - Reading the server-advertised rate-limit reset delay

use crate::api::{ApiError, Cursor, Entity, FeedItem, IdPage, NeighborSource, PagedFeed, Profile, ProfileLookup};
use crate::config::ApiConfig;
use crate::TrawlError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Wait assumed when a throttled response advertises no reset time
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The API configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// JSON REST client for the feed API
///
/// # Endpoints
///
/// | Capability | Request |
/// |------------|---------|
/// | Timeline page | `GET {base}/timeline/{entity}?page=P&count=N` |
/// | Neighbor ids | `GET {base}/neighbors/{entity}/ids?cursor=C` |
/// | Batch lookup | `GET {base}/users/lookup?ids=1,2,3` |
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdsResponse {
    ids: Vec<u64>,
    next_cursor: Cursor,
}

impl HttpApi {
    /// Creates a client from the API configuration
    ///
    /// The bearer token, if any, is read from the environment variable named
    /// by `token_env` at construction time.
    pub fn new(config: &ApiConfig) -> Result<Self, TrawlError> {
        let client = build_http_client(config)?;
        let base_url = Url::parse(&config.base_url)?;
        let token = config
            .token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());

        if config.token_env.is_some() && token.is_none() {
            tracing::warn!("API token variable is set in config but missing from the environment");
        }

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Malformed(format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::trace!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, response.headers()));
        }

        response.json::<T>().await.map_err(classify_transport)
    }
}

#[async_trait]
impl PagedFeed for HttpApi {
    async fn fetch_page(
        &self,
        entity: &Entity,
        page: u32,
        count: u32,
    ) -> Result<Vec<FeedItem>, ApiError> {
        let mut url = self.endpoint(&["timeline", entity.as_str()])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("count", &count.to_string());
        self.get_json(url).await
    }
}

#[async_trait]
impl NeighborSource for HttpApi {
    async fn neighbor_ids(&self, entity: &Entity, cursor: Cursor) -> Result<IdPage, ApiError> {
        let mut url = self.endpoint(&["neighbors", entity.as_str(), "ids"])?;
        url.query_pairs_mut()
            .append_pair("cursor", &cursor.to_string());
        let body: IdsResponse = self.get_json(url).await?;
        Ok(IdPage::new(body.ids, body.next_cursor))
    }
}

#[async_trait]
impl ProfileLookup for HttpApi {
    async fn lookup(&self, ids: &[u64]) -> Result<Vec<Profile>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.endpoint(&["users", "lookup"])?;
        url.query_pairs_mut().append_pair("ids", &joined);
        self.get_json(url).await
    }
}

/// Maps a non-success status onto the failure taxonomy
fn classify_status(status: StatusCode, headers: &HeaderMap) -> ApiError {
    match status.as_u16() {
        // 420 is the legacy "enhance your calm" throttle code
        420 | 429 => ApiError::RateLimited {
            retry_after: advertised_wait(headers, Utc::now().timestamp()),
        },
        404 => ApiError::NotFound,
        403 => ApiError::Forbidden,
        401 => ApiError::Unauthorized,
        code => ApiError::Other(code),
    }
}

fn classify_transport(error: reqwest::Error) -> ApiError {
    if error.is_decode() {
        ApiError::Malformed(error.to_string())
    } else if error.is_timeout() {
        ApiError::Network("request timeout".to_string())
    } else if error.is_connect() {
        ApiError::Network("connection refused".to_string())
    } else {
        ApiError::Network(error.to_string())
    }
}

/// Reads the server-advertised wait from `Retry-After` or `x-rate-limit-reset`
fn advertised_wait(headers: &HeaderMap, now_epoch: i64) -> Duration {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
    };

    if let Some(secs) = header("retry-after").and_then(|v| v.parse::<u64>().ok()) {
        return Duration::from_secs(secs);
    }

    if let Some(reset) = header("x-rate-limit-reset").and_then(|v| v.parse::<i64>().ok()) {
        return Duration::from_secs(reset.saturating_sub(now_epoch).max(0) as u64);
    }

    DEFAULT_RETRY_AFTER
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn create_test_config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            user_agent: "trawl-test/0.1".to_string(),
            token_env: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config("https://api.example.com/1.1/");
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn test_endpoint_encodes_entity() {
        let api = HttpApi::new(&create_test_config("https://api.example.com/1.1/")).unwrap();
        let url = api.endpoint(&["timeline", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/1.1/timeline/a%20b%2Fc");
    }

    #[test]
    fn test_classify_status() {
        let headers = HeaderMap::new();
        assert_eq!(classify_status(StatusCode::NOT_FOUND, &headers), ApiError::NotFound);
        assert_eq!(classify_status(StatusCode::FORBIDDEN, &headers), ApiError::Forbidden);
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, &headers),
            ApiError::Unauthorized
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, &headers),
            ApiError::Other(502)
        );
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, &headers),
            ApiError::RateLimited { .. }
        ));
    }

    #[test]
    fn test_advertised_wait_prefers_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        headers.insert("x-rate-limit-reset", HeaderValue::from_static("1000"));
        assert_eq!(advertised_wait(&headers, 900), Duration::from_secs(3));
    }

    #[test]
    fn test_advertised_wait_from_reset_epoch() {
        let mut headers = HeaderMap::new();
        headers.insert("x-rate-limit-reset", HeaderValue::from_static("1000"));
        assert_eq!(advertised_wait(&headers, 925), Duration::from_secs(75));

        // Reset already passed
        assert_eq!(advertised_wait(&headers, 2000), Duration::ZERO);
    }

    #[test]
    fn test_advertised_wait_default() {
        assert_eq!(advertised_wait(&HeaderMap::new(), 0), DEFAULT_RETRY_AFTER);
    }
}
