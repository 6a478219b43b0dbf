//! Integration tests for trawl
//!
//! These tests use wiremock to stand in for the remote API and drive the HTTP
//! client and both pipelines end to end.

mod http_tests;
mod pipeline_tests;

use serde_json::{json, Value};
use trawl::config::ApiConfig;
use wiremock::{Request, Respond, ResponseTemplate};

/// API configuration pointing at a mock server
pub fn api_config(server_uri: &str) -> ApiConfig {
    ApiConfig {
        base_url: format!("{}/1.1/", server_uri),
        user_agent: "trawl-test/0.1".to_string(),
        token_env: None,
        timeout_secs: 5,
    }
}

/// JSON feed item created at noon on `day` of May 2011
pub fn feed_item(id: u64, author: &str, day: u32) -> Value {
    json!({
        "id": id,
        "author": author,
        "created_at": format!("2011-05-{:02}T12:00:00Z", day),
        "text": format!("item {}", id),
    })
}

/// Serves a fixed newest-first feed honoring the `page` and `count` parameters
pub struct FeedResponder {
    pub items: Vec<Value>,
}

impl Respond for FeedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let param = |name: &str| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse::<usize>().ok())
        };
        let (page, count) = match (param("page"), param("count")) {
            (Some(page), Some(count)) if page >= 1 => (page, count),
            _ => return ResponseTemplate::new(400),
        };

        let start = (page - 1) * count;
        let body: Vec<Value> = self.items.iter().skip(start).take(count).cloned().collect();
        ResponseTemplate::new(200).set_body_json(body)
    }
}

/// Resolves every requested id to `user<id>`, except the ids in `unknown`
pub struct LookupResponder {
    pub unknown: Vec<u64>,
}

impl Respond for LookupResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ids = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "ids")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();

        let profiles: Vec<Value> = ids
            .split(',')
            .filter_map(|id| id.parse::<u64>().ok())
            .filter(|id| !self.unknown.contains(id))
            .map(|id| json!({ "id": id, "screen_name": format!("user{}", id) }))
            .collect();
        ResponseTemplate::new(200).set_body_json(profiles)
    }
}
