//! HTTP client behavior against a mock API

use crate::{api_config, feed_item, FeedResponder};
use std::time::Duration;
use trawl::api::{ApiError, Cursor, HttpApi, NeighborSource, PagedFeed, ProfileLookup};
use trawl::Entity;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_page_sends_page_and_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1.1/timeline/alice"))
        .and(query_param("page", "2"))
        .and(query_param("count", "3"))
        .respond_with(FeedResponder {
            items: (1..=6).rev().map(|d| feed_item(d as u64, "alice", d)).collect(),
        })
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(&api_config(&server.uri())).unwrap();
    let items = api.fetch_page(&Entity::new("alice"), 2, 3).await.unwrap();

    let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert_eq!(items[0].author, "alice");
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1.1/timeline/alice"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let api = HttpApi::new(&api_config(&server.uri())).unwrap();
    let err = api.fetch_page(&Entity::new("alice"), 1, 1).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::RateLimited {
            retry_after: Duration::from_secs(7)
        }
    );
}

#[tokio::test]
async fn test_denied_statuses() {
    let server = MockServer::start().await;
    Mock::given(path("/1.1/timeline/private"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(path("/1.1/timeline/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(path("/1.1/timeline/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = HttpApi::new(&api_config(&server.uri())).unwrap();

    let private = api.fetch_page(&Entity::new("private"), 1, 1).await;
    assert_eq!(private.unwrap_err(), ApiError::Forbidden);

    let gone = api.fetch_page(&Entity::new("gone"), 1, 1).await;
    assert_eq!(gone.unwrap_err(), ApiError::NotFound);

    let flaky = api.fetch_page(&Entity::new("flaky"), 1, 1).await;
    assert_eq!(flaky.unwrap_err(), ApiError::Other(503));
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(path("/1.1/timeline/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let api = HttpApi::new(&api_config(&server.uri())).unwrap();
    let err = api.fetch_page(&Entity::new("alice"), 1, 1).await.unwrap_err();

    assert!(matches!(err, ApiError::Malformed(_)));
}

#[tokio::test]
async fn test_neighbor_ids_follow_cursor() {
    let server = MockServer::start().await;
    Mock::given(path("/1.1/neighbors/alice/ids"))
        .and(query_param("cursor", "-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ids": [1, 2], "next_cursor": 42 })),
        )
        .mount(&server)
        .await;
    Mock::given(path("/1.1/neighbors/alice/ids"))
        .and(query_param("cursor", "42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ids": [3], "next_cursor": 0 })),
        )
        .mount(&server)
        .await;

    let api = HttpApi::new(&api_config(&server.uri())).unwrap();
    let alice = Entity::new("alice");

    let first = api.neighbor_ids(&alice, Cursor::START).await.unwrap();
    assert_eq!(first.ids, vec![1, 2]);
    assert!(first.has_more);

    let second = api.neighbor_ids(&alice, first.next_cursor).await.unwrap();
    assert_eq!(second.ids, vec![3]);
    assert!(!second.has_more);
}

#[tokio::test]
async fn test_lookup_joins_ids() {
    let server = MockServer::start().await;
    Mock::given(path("/1.1/users/lookup"))
        .and(query_param("ids", "5,6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 5, "screen_name": "bob" },
            { "id": 6, "screen_name": "carol" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpApi::new(&api_config(&server.uri())).unwrap();
    let profiles = api.lookup(&[5, 6]).await.unwrap();

    let names: Vec<&str> = profiles.iter().map(|p| p.screen_name.as_str()).collect();
    assert_eq!(names, vec!["bob", "carol"]);

    // Empty batches never reach the server
    assert!(api.lookup(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bearer_token_from_environment() {
    let server = MockServer::start().await;
    Mock::given(path("/1.1/timeline/alice"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    std::env::set_var("TRAWL_TEST_BEARER_TOKEN", "s3cret");
    let mut config = api_config(&server.uri());
    config.token_env = Some("TRAWL_TEST_BEARER_TOKEN".to_string());

    let api = HttpApi::new(&config).unwrap();
    let items = api.fetch_page(&Entity::new("alice"), 1, 1).await.unwrap();
    assert!(items.is_empty());
}
