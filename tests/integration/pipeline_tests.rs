//! Both pipelines end to end over HTTP

use crate::{api_config, feed_item, FeedResponder, LookupResponder};
use chrono::{TimeZone, Utc};
use std::time::Duration;
use trawl::api::HttpApi;
use trawl::config::RetryConfig;
use trawl::crawler::{Coordinator, GraphSettings, TimelineSettings};
use trawl::graph::NeighborMode;
use trawl::output::{TsvCorpusWriter, TsvEdgeWriter};
use trawl::resilience::{FailureCode, RecordingSleeper, ResilienceEngine, RetryPolicy};
use trawl::storage::{RunStatus, SqliteSink, SqliteStorage, Storage};
use trawl::{DateWindow, Entity, EntityOutcome};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE_SIZE: u32 = 2;

fn coordinator() -> Coordinator<RecordingSleeper> {
    let policy = RetryPolicy::new(&RetryConfig::default());
    Coordinator::new(ResilienceEngine::new(policy, RecordingSleeper::new()))
}

fn may_window() -> DateWindow {
    DateWindow::new(
        Utc.with_ymd_and_hms(2011, 5, 3, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2011, 5, 7, 23, 59, 59).unwrap(),
    )
}

fn timeline_settings() -> TimelineSettings {
    TimelineSettings {
        page_size: PAGE_SIZE,
        pacing: Duration::from_secs(5),
    }
}

/// Mounts alice's ten-day feed, newest first, one item per day
async fn mount_ten_day_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/1.1/timeline/alice"))
        .respond_with(FeedResponder {
            items: (1..=10u32)
                .rev()
                .map(|day| feed_item(day as u64, "alice", day))
                .collect(),
        })
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_timeline_run_writes_window_to_tsv() {
    let server = MockServer::start().await;

    // The first request is throttled once
    Mock::given(method("GET"))
        .and(path("/1.1/timeline/alice"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_ten_day_feed(&server).await;
    Mock::given(path("/1.1/timeline/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let api = HttpApi::new(&api_config(&server.uri())).unwrap();
    let mut sink = TsvCorpusWriter::create(dir.path()).unwrap();
    let mut coordinator = coordinator();
    let entities = vec![Entity::new("alice"), Entity::new("ghost")];

    let report = coordinator
        .run_timeline(&api, &entities, &may_window(), &timeline_settings(), &mut sink)
        .await
        .unwrap();

    assert_eq!(report.entities.len(), 2);
    assert_eq!(report.entities[0].outcome, EntityOutcome::Done);
    assert_eq!(report.entities[0].records, 5);
    assert_eq!(report.entities[1].outcome, EntityOutcome::Skipped);
    assert_eq!(report.tally.count(FailureCode::Http(429)), 1);
    assert_eq!(report.tally.count(FailureCode::Http(404)), 1);

    // Advertised reset plus page-index slack
    let waits = coordinator.engine().sleeper().waits();
    assert_eq!(waits[0], Duration::from_secs(17));

    let contents = std::fs::read_to_string(sink.path_for(&entities[0])).unwrap();
    let ids: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.split('\t').next())
        .collect();
    assert_eq!(ids, vec!["7", "6", "5", "4", "3"]);
    assert!(contents.lines().all(|line| line.split('\t').count() == 4));
}

#[tokio::test]
async fn test_timeline_run_into_sqlite() {
    let server = MockServer::start().await;
    mount_ten_day_feed(&server).await;

    let api = HttpApi::new(&api_config(&server.uri())).unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let mut sink = SqliteSink::start(storage, "hash", "timeline").unwrap();
    let mut coordinator = coordinator();

    let report = coordinator
        .run_timeline(
            &api,
            &[Entity::new("alice")],
            &may_window(),
            &timeline_settings(),
            &mut sink,
        )
        .await
        .unwrap();
    sink.finish(&report).unwrap();

    let run_id = sink.run_id();
    assert_eq!(sink.storage().count_feed_items(run_id).unwrap(), 5);
    assert_eq!(
        sink.storage().get_run(run_id).unwrap().status,
        RunStatus::Completed
    );
    let outcomes = sink.storage().load_entity_outcomes(run_id).unwrap();
    assert_eq!(outcomes[0].outcome, EntityOutcome::Done);
    assert_eq!(outcomes[0].records, 5);
}

#[tokio::test]
async fn test_graph_run_writes_edges() {
    let server = MockServer::start().await;

    // The first neighbor page and the first lookup are each throttled once
    Mock::given(path("/1.1/neighbors/alice/ids"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/1.1/users/lookup"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/1.1/neighbors/alice/ids"))
        .and(query_param("cursor", "-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ids": [1, 2, 3], "next_cursor": 9 })),
        )
        .mount(&server)
        .await;
    Mock::given(path("/1.1/neighbors/alice/ids"))
        .and(query_param("cursor", "9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ids": [4], "next_cursor": 0 })),
        )
        .mount(&server)
        .await;
    Mock::given(path("/1.1/neighbors/locked/ids"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(path("/1.1/users/lookup"))
        .respond_with(LookupResponder { unknown: vec![3] })
        .expect(2)
        .mount(&server)
        .await;

    let api = HttpApi::new(&api_config(&server.uri())).unwrap();
    let mut sink = TsvEdgeWriter::new(Vec::new());
    let settings = GraphSettings {
        mode: NeighborMode::Cursor,
        chunk_size: 2,
        resolve_names: true,
    };
    let mut coordinator = coordinator();
    let entities = vec![Entity::new("alice"), Entity::new("locked")];

    let report = coordinator
        .run_graph(&api, &api, &entities, &settings, &mut sink)
        .await
        .unwrap();

    assert_eq!(report.entities[0].outcome, EntityOutcome::Done);
    assert_eq!(report.entities[0].records, 3);
    assert_eq!(report.entities[1].outcome, EntityOutcome::Skipped);
    assert_eq!(report.tally.count(FailureCode::Http(401)), 1);
    assert_eq!(report.tally.count(FailureCode::Http(429)), 2);

    // Cursor slack for the neighbor page, page-index slack for the lookup
    assert_eq!(
        coordinator.engine().sleeper().waits(),
        vec![Duration::from_secs(3), Duration::from_secs(12)]
    );

    assert_eq!(sink.edges_written(), 3);
    let written = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(written, "alice\tuser1\nalice\tuser2\nalice\tuser4\n");
}
