//! Forward walk over the pages of a date window

use crate::api::{DateWindow, Entity, PagedFeed};
use crate::output::{OutputError, TimelineSink};
use crate::resilience::{
    AbortCause, FailureCode, Pagination, ResilienceEngine, SleepOutcome, Sleeper,
};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Why a window crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An item older than the window start was seen
    ReachedWindowStart,

    /// The feed returned an empty page
    Exhausted,

    /// A page fetch was abandoned by the resilience engine
    Aborted(AbortCause),

    /// The feed returned items out of reverse-chronological order
    Unordered { page: u32 },

    /// Shutdown was requested while pacing
    Shutdown,
}

/// What a window crawl produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCrawl {
    pub items_emitted: u64,
    pub pages_fetched: u32,
    /// Items newer than the window end that were not emitted
    pub newer_skipped: u64,
    pub stop: StopReason,
}

impl WindowCrawl {
    /// True if the crawl reached the natural end of the window
    pub fn is_complete(&self) -> bool {
        matches!(
            self.stop,
            StopReason::ReachedWindowStart | StopReason::Exhausted
        )
    }
}

/// Emits every item of a window, page by page, starting at a located page
pub struct WindowCrawler<'a, F: ?Sized> {
    feed: &'a F,
    page_size: u32,
    pacing: Duration,
}

impl<'a, F: PagedFeed + ?Sized> WindowCrawler<'a, F> {
    pub fn new(feed: &'a F, page_size: u32, pacing: Duration) -> Self {
        Self {
            feed,
            page_size,
            pacing,
        }
    }

    /// Streams the items of `window` to `sink`, starting at `start_page`
    ///
    /// Items are written in feed order down to, but not including, the first
    /// item older than `window.start`. The sink is flushed after every page,
    /// before the pacing delay. Only sink failures are returned as errors.
    pub async fn crawl<S: Sleeper>(
        &self,
        engine: &mut ResilienceEngine<S>,
        entity: &Entity,
        start_page: u32,
        window: &DateWindow,
        sink: &mut dyn TimelineSink,
    ) -> Result<WindowCrawl, OutputError> {
        let mut result = WindowCrawl {
            items_emitted: 0,
            pages_fetched: 0,
            newer_skipped: 0,
            stop: StopReason::Exhausted,
        };
        let mut previous: Option<DateTime<Utc>> = None;
        let mut page = start_page.max(1);
        let feed = self.feed;
        let page_size = self.page_size;
        let pagination = Pagination::PageIndex { page_size };

        loop {
            if result.pages_fetched > 0
                && engine.sleeper().sleep(self.pacing).await == SleepOutcome::Interrupted
            {
                result.stop = StopReason::Shutdown;
                break;
            }

            let label = format!("{} page {}", entity, page);
            let items = match engine
                .run(&label, pagination, move || feed.fetch_page(entity, page, page_size))
                .await
            {
                Ok(items) => items,
                Err(AbortCause::Shutdown) => {
                    result.stop = StopReason::Shutdown;
                    break;
                }
                Err(cause) => {
                    result.stop = StopReason::Aborted(cause);
                    break;
                }
            };
            result.pages_fetched += 1;
            tracing::info!("{}: page {} returned {} items", entity, page, items.len());

            if items.is_empty() {
                result.stop = StopReason::Exhausted;
                break;
            }

            let mut stop = None;
            for item in &items {
                if previous.is_some_and(|prev| item.created_at > prev) {
                    stop = Some(StopReason::Unordered { page });
                    break;
                }
                previous = Some(item.created_at);

                if window.is_before_start(item.created_at) {
                    stop = Some(StopReason::ReachedWindowStart);
                    break;
                }
                if window.is_after_end(item.created_at) {
                    result.newer_skipped += 1;
                    continue;
                }

                sink.write_item(entity, item)?;
                result.items_emitted += 1;
            }
            sink.flush()?;

            if let Some(reason) = stop {
                if let StopReason::Unordered { page } = reason {
                    engine.record(FailureCode::Unordered);
                    tracing::error!("{}: feed out of order on page {}, stopping", entity, page);
                }
                result.stop = reason;
                break;
            }

            page += 1;
        }

        tracing::debug!(
            "{}: crawl stopped ({:?}) after {} pages",
            entity,
            result.stop,
            result.pages_fetched
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, FeedItem};
    use crate::output::{OutputResult, RecordSink};
    use crate::resilience::{RecordingSleeper, RetryPolicy};
    use crate::timeline::BoundaryLocator;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    struct VecFeed {
        items: Vec<FeedItem>,
        fail_page: Option<u32>,
        fetched: Mutex<Vec<u32>>,
    }

    impl VecFeed {
        fn new(stamps: Vec<DateTime<Utc>>) -> Self {
            let items = stamps
                .into_iter()
                .enumerate()
                .map(|(i, at)| FeedItem {
                    id: i as u64 + 1,
                    author: "alice".to_string(),
                    created_at: at,
                    text: format!("item {}", i + 1),
                })
                .collect();
            Self {
                items,
                fail_page: None,
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PagedFeed for VecFeed {
        async fn fetch_page(
            &self,
            _entity: &Entity,
            page: u32,
            count: u32,
        ) -> Result<Vec<FeedItem>, ApiError> {
            if self.fail_page == Some(page) {
                return Err(ApiError::Other(500));
            }
            self.fetched.lock().unwrap().push(page);
            let start = ((page - 1) * count) as usize;
            Ok(self
                .items
                .iter()
                .skip(start)
                .take(count as usize)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        items: Vec<FeedItem>,
        flushes: usize,
    }

    impl RecordSink for MemorySink {
        fn flush(&mut self) -> OutputResult<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    impl TimelineSink for MemorySink {
        fn write_item(&mut self, _entity: &Entity, item: &FeedItem) -> OutputResult<()> {
            self.items.push(item.clone());
            Ok(())
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 5, d, 12, 0, 0).unwrap()
    }

    fn ten_days() -> Vec<DateTime<Utc>> {
        (1..=10).rev().map(day).collect()
    }

    fn engine(sleeper: RecordingSleeper) -> ResilienceEngine<RecordingSleeper> {
        ResilienceEngine::new(RetryPolicy::default(), sleeper)
    }

    #[tokio::test]
    async fn test_ten_day_scenario_end_to_end() {
        let feed = VecFeed::new(ten_days());
        let window = DateWindow::new(day(3), day(7));
        let entity = Entity::new("alice");
        let mut engine = engine(RecordingSleeper::new());
        let mut sink = MemorySink::default();

        let start = BoundaryLocator::new(&feed, 1)
            .locate(&mut engine, &entity, &window)
            .await
            .unwrap();
        feed.fetched.lock().unwrap().clear();
        let crawl = WindowCrawler::new(&feed, 1, Duration::from_secs(5))
            .crawl(&mut engine, &entity, start, &window, &mut sink)
            .await
            .unwrap();

        assert_eq!(start, 4);
        let emitted: Vec<_> = sink.items.iter().map(|i| i.created_at).collect();
        assert_eq!(emitted, vec![day(7), day(6), day(5), day(4), day(3)]);
        assert_eq!(crawl.stop, StopReason::ReachedWindowStart);
        // Page 8 holds day 3; page 9 holds the first too-old item
        assert_eq!(*feed.fetched.lock().unwrap(), vec![4, 5, 6, 7, 8, 9]);
        assert!(crawl.is_complete());
    }

    #[tokio::test]
    async fn test_emits_exactly_the_window_with_large_pages() {
        let stamps: Vec<_> = (0..250)
            .map(|i| day(31) - chrono::Duration::hours(i))
            .collect();
        let window = DateWindow::new(stamps[180], stamps[37]);
        let feed = VecFeed::new(stamps.clone());
        let entity = Entity::new("alice");
        let mut engine = engine(RecordingSleeper::new());
        let mut sink = MemorySink::default();

        let start = BoundaryLocator::new(&feed, 20)
            .locate(&mut engine, &entity, &window)
            .await
            .unwrap();
        let crawl = WindowCrawler::new(&feed, 20, Duration::from_secs(5))
            .crawl(&mut engine, &entity, start, &window, &mut sink)
            .await
            .unwrap();

        let expected: Vec<_> = stamps[37..=180].to_vec();
        let emitted: Vec<_> = sink.items.iter().map(|i| i.created_at).collect();
        assert_eq!(emitted, expected);
        assert_eq!(crawl.newer_skipped, 37 - 20);
        assert_eq!(sink.flushes as u32, crawl.pages_fetched);
    }

    #[tokio::test]
    async fn test_empty_feed_emits_nothing() {
        let feed = VecFeed::new(vec![]);
        let sleeper = RecordingSleeper::new();
        let mut engine = engine(sleeper.clone());
        let mut sink = MemorySink::default();
        let window = DateWindow::new(day(3), day(7));

        let crawl = WindowCrawler::new(&feed, 100, Duration::from_secs(5))
            .crawl(&mut engine, &Entity::new("alice"), 1, &window, &mut sink)
            .await
            .unwrap();

        assert!(sink.items.is_empty());
        assert_eq!(crawl.stop, StopReason::Exhausted);
        assert_eq!(crawl.pages_fetched, 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_pacing_between_pages() {
        let feed = VecFeed::new(ten_days());
        let sleeper = RecordingSleeper::new();
        let mut engine = engine(sleeper.clone());
        let mut sink = MemorySink::default();
        let window = DateWindow::new(day(1), day(10));

        let crawl = WindowCrawler::new(&feed, 4, Duration::from_secs(5))
            .crawl(&mut engine, &Entity::new("alice"), 1, &window, &mut sink)
            .await
            .unwrap();

        // Pages of 4, 4, 2, then an empty page
        assert_eq!(crawl.pages_fetched, 4);
        assert_eq!(crawl.items_emitted, 10);
        assert_eq!(sleeper.waits(), vec![Duration::from_secs(5); 3]);
    }

    #[tokio::test]
    async fn test_abort_keeps_emitted_items() {
        let mut feed = VecFeed::new(ten_days());
        feed.fail_page = Some(2);
        let mut engine = engine(RecordingSleeper::new());
        let mut sink = MemorySink::default();
        let window = DateWindow::new(day(1), day(10));

        let crawl = WindowCrawler::new(&feed, 3, Duration::from_secs(5))
            .crawl(&mut engine, &Entity::new("alice"), 1, &window, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.items.len(), 3);
        assert_eq!(
            crawl.stop,
            StopReason::Aborted(AbortCause::RetriesExhausted(FailureCode::Http(500)))
        );
        assert!(!crawl.is_complete());
    }

    #[tokio::test]
    async fn test_unordered_page_is_flagged() {
        let mut stamps = ten_days();
        stamps.swap(4, 5);
        let feed = VecFeed::new(stamps);
        let mut engine = engine(RecordingSleeper::new());
        let mut sink = MemorySink::default();
        let window = DateWindow::new(day(1), day(10));

        let crawl = WindowCrawler::new(&feed, 10, Duration::from_secs(5))
            .crawl(&mut engine, &Entity::new("alice"), 1, &window, &mut sink)
            .await
            .unwrap();

        assert_eq!(crawl.stop, StopReason::Unordered { page: 1 });
        assert_eq!(sink.items.len(), 5);
        assert_eq!(engine.tally().count(FailureCode::Unordered), 1);
    }

    #[tokio::test]
    async fn test_shutdown_during_pacing() {
        let token = CancellationToken::new();
        let feed = VecFeed::new(ten_days());
        let mut engine = engine(RecordingSleeper::with_shutdown(token.clone()));
        let mut sink = MemorySink::default();
        let window = DateWindow::new(day(1), day(10));
        token.cancel();

        let crawl = WindowCrawler::new(&feed, 2, Duration::from_secs(5))
            .crawl(&mut engine, &Entity::new("alice"), 1, &window, &mut sink)
            .await
            .unwrap();

        // Shutdown before the first fetch aborts the unit without a request
        assert_eq!(crawl.stop, StopReason::Shutdown);
        assert_eq!(crawl.pages_fetched, 0);
        assert!(sink.items.is_empty());
    }
}
