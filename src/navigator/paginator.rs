//! Page-by-page loading of the thumbnail list
//!
//! One fetch is in flight at a time. Results come back over the paginator's
//! own channel tagged with a generation, so a page that lands after a reset
//! is dropped instead of leaking into the fresh list.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::mpsc;

use crate::api::{ApiClient, ApiError, ThumbnailPage, ThumbnailRecord};

/// Where thumbnail pages come from
pub trait ThumbnailSource: Clone + Send + Sync + 'static {
    fn fetch_page(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<ThumbnailPage, ApiError>> + Send;
}

impl ThumbnailSource for ApiClient {
    fn fetch_page(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<ThumbnailPage, ApiError>> + Send {
        self.fetch_thumbnails(page, limit)
    }
}

/// Navigator-level load state, drives the empty/failed placeholders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Reset load succeeded with no records
    Empty,
    /// Reset load failed; nothing to show
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Next page to request (1-based)
    pub page_number: u32,
    pub items_per_page: u32,
    pub has_more: bool,
}

/// Result of one page fetch, delivered back to the owning paginator
#[derive(Debug)]
pub struct PageEvent {
    generation: u64,
    page: u32,
    reset: bool,
    result: Result<ThumbnailPage, ApiError>,
}

pub struct ThumbnailPaginator<S> {
    source: S,
    cursor: PageCursor,
    records: Vec<ThumbnailRecord>,
    /// task_id -> position in `records`
    index: HashMap<String, usize>,
    generation: u64,
    in_flight: bool,
    /// Set when an append load failed; growth stops until `retry()`
    stalled: bool,
    status: LoadStatus,
    total_tasks: usize,
    last_error: Option<String>,
    event_tx: mpsc::UnboundedSender<PageEvent>,
    event_rx: mpsc::UnboundedReceiver<PageEvent>,
}

impl<S: ThumbnailSource> ThumbnailPaginator<S> {
    pub fn new(source: S, items_per_page: u32) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            source,
            cursor: PageCursor {
                page_number: 1,
                items_per_page: items_per_page.max(1),
                has_more: true,
            },
            records: Vec::new(),
            index: HashMap::new(),
            generation: 0,
            in_flight: false,
            stalled: false,
            status: LoadStatus::Idle,
            total_tasks: 0,
            last_error: None,
            event_tx,
            event_rx,
        }
    }

    pub fn records(&self) -> &[ThumbnailRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// More pages can be requested right now
    pub fn has_more(&self) -> bool {
        self.cursor.has_more && !self.stalled
    }

    pub fn total_tasks(&self) -> usize {
        self.total_tasks
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.index.get(task_id).copied()
    }

    pub fn get(&self, task_id: &str) -> Option<&ThumbnailRecord> {
        self.position(task_id).map(|i| &self.records[i])
    }

    /// Request the next page, or page 1 after clearing everything when
    /// `reset` is set. Returns false when nothing was dispatched.
    pub fn load_page(&mut self, reset: bool) -> bool {
        if self.in_flight {
            tracing::debug!("Navigator: page load already in flight, ignoring");
            return false;
        }

        if reset {
            self.generation += 1;
            self.records.clear();
            self.index.clear();
            self.cursor.page_number = 1;
            self.cursor.has_more = true;
            self.stalled = false;
            self.last_error = None;
            self.status = LoadStatus::Loading;
        } else if !self.has_more() {
            return false;
        }

        self.in_flight = true;
        let page = self.cursor.page_number;
        let limit = self.cursor.items_per_page;
        let generation = self.generation;
        let source = self.source.clone();
        let tx = self.event_tx.clone();

        tracing::debug!("Navigator: requesting page {} (reset={})", page, reset);
        tokio::spawn(async move {
            let result = source.fetch_page(page, limit).await;
            // Receiver gone means the paginator was dropped
            let _ = tx.send(PageEvent {
                generation,
                page,
                reset,
                result,
            });
        });

        true
    }

    /// Drop whatever is in flight and reload from page 1
    pub fn refresh(&mut self) -> bool {
        self.in_flight = false;
        self.load_page(true)
    }

    /// Explicit retry after a failure: reloads from scratch after a failed
    /// reset, or resumes appending after a stalled append.
    pub fn retry(&mut self) -> bool {
        match self.status {
            LoadStatus::Failed => self.load_page(true),
            _ if self.stalled => {
                self.stalled = false;
                self.load_page(false)
            }
            _ => false,
        }
    }

    /// Fold a fetch result into the list. Returns false for stale results.
    pub fn apply(&mut self, event: PageEvent) -> bool {
        if event.generation != self.generation {
            tracing::debug!(
                "Navigator: discarding page {} from stale generation {}",
                event.page,
                event.generation
            );
            return false;
        }
        self.in_flight = false;

        match event.result {
            Ok(page) => {
                let before = self.records.len();
                for record in page.thumbnails {
                    if self.index.contains_key(&record.task_id) {
                        continue;
                    }
                    self.index.insert(record.task_id.clone(), self.records.len());
                    self.records.push(record);
                }
                self.cursor.page_number += 1;
                self.cursor.has_more = page.has_more;
                self.total_tasks = page.total_tasks;
                self.last_error = None;
                self.status = if self.records.is_empty() {
                    LoadStatus::Empty
                } else {
                    LoadStatus::Ready
                };
                tracing::debug!(
                    "Navigator: page {} added {} records ({} loaded, has_more={})",
                    event.page,
                    self.records.len() - before,
                    self.records.len(),
                    self.cursor.has_more
                );
            }
            Err(e) => {
                tracing::warn!("Navigator: page {} failed: {}", event.page, e);
                self.last_error = Some(e.to_string());
                if event.reset {
                    self.status = LoadStatus::Failed;
                } else {
                    self.stalled = true;
                }
            }
        }

        true
    }

    /// Apply every result that has arrived. Returns true if anything changed.
    pub fn drain_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.event_rx.try_recv() {
            changed |= self.apply(event);
        }
        changed
    }

    #[cfg(test)]
    pub async fn next_event(&mut self) -> PageEvent {
        self.event_rx
            .recv()
            .await
            .expect("paginator holds its own sender")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(task_id: &str) -> ThumbnailRecord {
        ThumbnailRecord {
            task_id: task_id.to_string(),
            batch_id: None,
            poster_url: Some(format!("/posters/{}.jpg", task_id)),
            batch_completed: None,
            batch_total: None,
            media: None,
            video_path: None,
        }
    }

    fn page(ids: &[&str], has_more: bool) -> ThumbnailPage {
        ThumbnailPage {
            success: true,
            message: None,
            thumbnails: ids.iter().map(|id| record(id)).collect(),
            has_more,
            total_tasks: 100,
        }
    }

    /// Serves queued responses in order and records requested page numbers
    #[derive(Clone, Default)]
    struct ScriptedSource {
        responses: Arc<Mutex<VecDeque<Result<ThumbnailPage, ApiError>>>>,
        requested: Arc<Mutex<Vec<u32>>>,
    }

    impl ScriptedSource {
        fn push(&self, response: Result<ThumbnailPage, ApiError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl ThumbnailSource for ScriptedSource {
        fn fetch_page(
            &self,
            page: u32,
            _limit: u32,
        ) -> impl Future<Output = Result<ThumbnailPage, ApiError>> + Send {
            self.requested.lock().unwrap().push(page);
            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Decode("no scripted response".into())));
            std::future::ready(response)
        }
    }

    async fn load_and_apply(paginator: &mut ThumbnailPaginator<ScriptedSource>, reset: bool) {
        assert!(paginator.load_page(reset));
        let event = paginator.next_event().await;
        assert!(paginator.apply(event));
    }

    #[tokio::test]
    async fn test_pages_append_in_order() {
        let source = ScriptedSource::default();
        source.push(Ok(page(&["a", "b"], true)));
        source.push(Ok(page(&["c"], false)));
        let mut paginator = ThumbnailPaginator::new(source.clone(), 2);

        load_and_apply(&mut paginator, false).await;
        load_and_apply(&mut paginator, false).await;

        let ids: Vec<_> = paginator.records().iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(source.requested(), vec![1, 2]);
        assert_eq!(paginator.cursor().page_number, 3);
        assert_eq!(paginator.status(), LoadStatus::Ready);
    }

    #[tokio::test]
    async fn test_load_more_is_noop_when_exhausted() {
        let source = ScriptedSource::default();
        source.push(Ok(page(&["a"], false)));
        let mut paginator = ThumbnailPaginator::new(source.clone(), 50);

        load_and_apply(&mut paginator, false).await;
        assert!(!paginator.cursor().has_more);
        assert!(!paginator.load_page(false));
        assert_eq!(source.requested(), vec![1]);
    }

    #[tokio::test]
    async fn test_reset_starts_over_from_page_one() {
        let source = ScriptedSource::default();
        source.push(Ok(page(&["a", "b"], true)));
        source.push(Ok(page(&["c", "d"], true)));
        source.push(Ok(page(&["new", "a"], true)));
        let mut paginator = ThumbnailPaginator::new(source.clone(), 2);

        load_and_apply(&mut paginator, false).await;
        load_and_apply(&mut paginator, false).await;
        assert_eq!(paginator.len(), 4);

        assert!(paginator.load_page(true));
        assert_eq!(paginator.len(), 0);
        assert_eq!(paginator.cursor().page_number, 1);
        let event = paginator.next_event().await;
        paginator.apply(event);

        assert_eq!(source.requested(), vec![1, 2, 1]);
        assert_eq!(paginator.len(), 2);
        assert_eq!(paginator.position("new"), Some(0));
        assert_eq!(paginator.cursor().page_number, 2);
    }

    #[tokio::test]
    async fn test_duplicates_from_shifted_pages_are_dropped() {
        let source = ScriptedSource::default();
        source.push(Ok(page(&["a", "b"], true)));
        // A new job was prepended server-side, so "b" shows up again
        source.push(Ok(page(&["b", "c"], true)));
        let mut paginator = ThumbnailPaginator::new(source, 2);

        load_and_apply(&mut paginator, false).await;
        load_and_apply(&mut paginator, false).await;

        let ids: Vec<_> = paginator.records().iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(paginator.position("c"), Some(2));
    }

    #[tokio::test]
    async fn test_append_failure_stalls_and_retry_refetches_same_page() {
        let source = ScriptedSource::default();
        source.push(Ok(page(&["a"], true)));
        source.push(Err(ApiError::Status {
            status: 503,
            body: String::new(),
        }));
        source.push(Ok(page(&["b"], false)));
        let mut paginator = ThumbnailPaginator::new(source.clone(), 1);

        load_and_apply(&mut paginator, false).await;
        load_and_apply(&mut paginator, false).await;

        assert!(paginator.is_stalled());
        assert!(!paginator.has_more());
        assert_eq!(paginator.cursor().page_number, 2);
        assert!(paginator.cursor().has_more);
        assert_eq!(paginator.status(), LoadStatus::Ready);
        assert!(!paginator.load_page(false));

        assert!(paginator.retry());
        let event = paginator.next_event().await;
        paginator.apply(event);

        assert_eq!(source.requested(), vec![1, 2, 2]);
        assert_eq!(paginator.len(), 2);
        assert!(!paginator.is_stalled());
    }

    #[tokio::test]
    async fn test_reset_failure_and_empty_states() {
        let source = ScriptedSource::default();
        source.push(Err(ApiError::Rejected("cache unavailable".into())));
        source.push(Ok(page(&[], false)));
        let mut paginator = ThumbnailPaginator::new(source, 50);

        load_and_apply(&mut paginator, true).await;
        assert_eq!(paginator.status(), LoadStatus::Failed);
        assert!(paginator.last_error().is_some());

        assert!(paginator.retry());
        let event = paginator.next_event().await;
        paginator.apply(event);
        assert_eq!(paginator.status(), LoadStatus::Empty);
    }

    #[tokio::test]
    async fn test_refresh_discards_stale_page() {
        let source = ScriptedSource::default();
        source.push(Ok(page(&["old"], true)));
        source.push(Ok(page(&["fresh"], true)));
        let mut paginator = ThumbnailPaginator::new(source, 50);

        assert!(paginator.load_page(false));
        assert!(paginator.refresh());
        let stale = paginator.next_event().await;
        let fresh = paginator.next_event().await;

        assert!(!paginator.apply(stale));
        assert!(paginator.is_loading());
        assert!(paginator.apply(fresh));
        assert_eq!(paginator.records()[0].task_id, "fresh");
        assert_eq!(paginator.len(), 1);
    }

    #[tokio::test]
    async fn test_rapid_loads_issue_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/video-thumbnails"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "success": true,
                        "thumbnails": [{"task_id": "t1"}],
                        "has_more": true,
                        "total_tasks": 1
                    }))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(
            server.uri(),
            crate::api::ResourceKind::Video,
            Duration::from_secs(5),
        )
        .unwrap();
        let mut paginator = ThumbnailPaginator::new(client, 50);

        assert!(paginator.load_page(false));
        assert!(!paginator.load_page(false));

        let event = paginator.next_event().await;
        assert!(paginator.apply(event));
        assert_eq!(paginator.len(), 1);

        server.verify().await;
    }
}
