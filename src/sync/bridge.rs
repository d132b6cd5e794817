//! Scroll-sync bridge between the navigator and the primary list

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::Instant;

use super::{ElementIndex, ElementRef, ListCapability, ListError, TaskLocator};
use crate::api::ThumbnailRecord;
use crate::constants::{HIGHLIGHT_MS, MAX_FALLBACK_ATTEMPTS, SYNC_DEBOUNCE_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    pub sync_debounce: Duration,
    pub highlight: Duration,
    pub max_fallback_attempts: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sync_debounce: Duration::from_millis(SYNC_DEBOUNCE_MS),
            highlight: Duration::from_millis(HIGHLIGHT_MS),
            max_fallback_attempts: MAX_FALLBACK_ATTEMPTS,
        }
    }
}

/// How a jump attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpOutcome {
    /// Element revealed. `page_loaded` is set when the locator drove the
    /// primary list to a specific page first.
    Found {
        element: ElementRef,
        page_loaded: Option<u32>,
    },
    /// Not revealed yet, but the list is still loading
    StillLoading,
    NotFound,
}

/// Debounced tracking of which primary-list element sits at the viewport center
#[derive(Debug)]
pub struct ActiveTracker {
    debounce: Duration,
    pending_since: Option<Instant>,
    active: Option<ElementRef>,
}

impl ActiveTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending_since: None,
            active: None,
        }
    }

    /// Each scroll restarts the debounce
    pub fn on_primary_scroll(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Once the debounce has elapsed, pick the element closest to the
    /// viewport center. Returns it only if the active element changed.
    pub fn sync_if_due(&mut self, now: Instant, index: &impl ElementIndex) -> Option<ElementRef> {
        let since = self.pending_since?;
        if now.saturating_duration_since(since) < self.debounce {
            return None;
        }
        self.pending_since = None;

        let center = index.viewport().center_x2();
        // min_by_key keeps the first of equally distant elements
        let closest = index
            .elements()
            .into_iter()
            .min_by_key(|element| element.center_x2().abs_diff(center))?;

        if self.active.as_ref() == Some(&closest) {
            return None;
        }
        self.active = Some(closest.clone());
        Some(closest)
    }
}

/// Clears the fallback flag when the owning attempt finishes or is dropped
struct FallbackGuard(Arc<AtomicBool>);

impl FallbackGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for FallbackGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ScrollSyncBridge<L, T> {
    list: L,
    locator: T,
    config: BridgeConfig,
    fallback_running: Arc<AtomicBool>,
    tracker: ActiveTracker,
}

impl<L, T> ScrollSyncBridge<L, T>
where
    L: ListCapability + ElementIndex + Clone + 'static,
    T: TaskLocator,
{
    pub fn new(list: L, locator: T, config: BridgeConfig) -> Self {
        Self {
            list,
            locator,
            config,
            fallback_running: Arc::new(AtomicBool::new(false)),
            tracker: ActiveTracker::new(config.sync_debounce),
        }
    }

    pub fn on_primary_scroll(&mut self, now: Instant) {
        self.tracker.on_primary_scroll(now);
    }

    pub fn sync_pending(&self) -> bool {
        self.tracker.is_pending()
    }

    /// Newly active primary-list element, once the scroll debounce settles
    pub fn sync_active(&mut self, now: Instant) -> Option<ElementRef> {
        self.tracker.sync_if_due(now, &self.list)
    }

    /// Reveal a task in the primary list, loading pages as needed.
    ///
    /// A missing `batch_id` is taken from the navigator's loaded records.
    pub fn jump_to_task(
        &self,
        task_id: &str,
        batch_id: Option<&str>,
        loaded: &[ThumbnailRecord],
    ) -> BoxFuture<'static, JumpOutcome> {
        let task_id = task_id.to_string();
        let mut batch_id = batch_id.map(str::to_string).or_else(|| {
            loaded
                .iter()
                .find(|record| record.task_id == task_id)
                .and_then(|record| record.batch_id.clone())
        });
        let list = self.list.clone();
        let locator = self.locator.clone();
        let flag = Arc::clone(&self.fallback_running);
        let config = self.config;

        async move {
            if let Some(element) = reveal(&list, &task_id, batch_id.as_deref(), config.highlight) {
                return JumpOutcome::Found {
                    element,
                    page_loaded: None,
                };
            }

            match locator.locate_task(&task_id).await {
                Ok(Some(location)) => {
                    tracing::debug!("Jump: {} is on page {}", task_id, location.page);
                    if batch_id.is_none() {
                        batch_id = location.batch_id.clone();
                    }
                    match list.load_to_page(location.page).await {
                        Ok(()) => {
                            if let Some(element) =
                                reveal(&list, &task_id, batch_id.as_deref(), config.highlight)
                            {
                                return JumpOutcome::Found {
                                    element,
                                    page_loaded: Some(location.page),
                                };
                            }
                        }
                        Err(ListError::Unsupported) => {
                            tracing::debug!("Jump: page loading unsupported, falling back");
                        }
                        Err(e) => tracing::warn!("Jump: loading page {} failed: {}", location.page, e),
                    }
                }
                Ok(None) => tracing::debug!("Jump: locator does not know {}", task_id),
                Err(e) => tracing::warn!("Jump: locator failed for {}: {}", task_id, e),
            }

            let Some(guard) = FallbackGuard::acquire(&flag) else {
                tracing::debug!("Jump: fallback already running, not starting another");
                return JumpOutcome::StillLoading;
            };

            let mut attempts = 0;
            while attempts < config.max_fallback_attempts && list.has_more() {
                attempts += 1;
                if let Err(e) = list.load_more().await {
                    tracing::warn!("Jump: load more failed: {}", e);
                    break;
                }
                if let Some(element) =
                    reveal(&list, &task_id, batch_id.as_deref(), config.highlight)
                {
                    tracing::debug!("Jump: found {} after {} extra loads", task_id, attempts);
                    return JumpOutcome::Found {
                        element,
                        page_loaded: None,
                    };
                }
            }
            drop(guard);

            if list.is_loading() {
                JumpOutcome::StillLoading
            } else {
                tracing::info!("Jump: {} not found after {} extra loads", task_id, attempts);
                JumpOutcome::NotFound
            }
        }
        .boxed()
    }
}

fn reveal<L: ElementIndex>(
    list: &L,
    task_id: &str,
    batch_id: Option<&str>,
    highlight: Duration,
) -> Option<ElementRef> {
    let element = list.find(task_id, batch_id)?;
    list.scroll_into_view(&element);
    list.highlight(&element, highlight);
    Some(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, TaskLocation};
    use crate::sync::Viewport;
    use std::future::Future;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    const ROW: usize = 3;

    #[derive(Default)]
    struct FakeState {
        /// Server pages of (task_id, batch_id)
        pages: Vec<Vec<(String, Option<String>)>>,
        loaded_pages: usize,
        loading: bool,
        load_delay: Duration,
        load_more_calls: usize,
        loaded_to: Vec<u32>,
        scroll_top: usize,
        highlight: Option<(String, Instant)>,
    }

    #[derive(Clone, Default)]
    struct FakeList(Arc<Mutex<FakeState>>);

    impl FakeList {
        fn with_pages(pages: &[&[&str]]) -> Self {
            let list = FakeList::default();
            list.0.lock().unwrap().pages = pages
                .iter()
                .map(|ids| ids.iter().map(|id| (id.to_string(), None)).collect())
                .collect();
            list
        }

        fn loaded(&self, pages: usize) -> Self {
            self.0.lock().unwrap().loaded_pages = pages;
            self.clone()
        }

        fn highlighted(&self, now: Instant) -> Option<String> {
            self.0
                .lock()
                .unwrap()
                .highlight
                .as_ref()
                .filter(|(_, until)| *until > now)
                .map(|(id, _)| id.clone())
        }

        fn load_more_calls(&self) -> usize {
            self.0.lock().unwrap().load_more_calls
        }
    }

    impl ListCapability for FakeList {
        fn load_more(&self) -> impl Future<Output = Result<(), ListError>> + Send {
            let state = Arc::clone(&self.0);
            async move {
                let delay = state.lock().unwrap().load_delay;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let mut state = state.lock().unwrap();
                state.load_more_calls += 1;
                if state.loaded_pages < state.pages.len() {
                    state.loaded_pages += 1;
                }
                Ok(())
            }
        }

        fn load_to_page(&self, page: u32) -> impl Future<Output = Result<(), ListError>> + Send {
            let mut state = self.0.lock().unwrap();
            state.loaded_to.push(page);
            state.loaded_pages = state.loaded_pages.max((page as usize).min(state.pages.len()));
            std::future::ready(Ok(()))
        }

        fn has_more(&self) -> bool {
            let state = self.0.lock().unwrap();
            state.loaded_pages < state.pages.len()
        }
    }

    impl ElementIndex for FakeList {
        fn find(&self, task_id: &str, batch_id: Option<&str>) -> Option<ElementRef> {
            self.elements().into_iter().find(|element| {
                element.task_id == task_id
                    || (batch_id.is_some() && element.batch_id.as_deref() == batch_id)
            })
        }

        fn elements(&self) -> Vec<ElementRef> {
            let state = self.0.lock().unwrap();
            state.pages[..state.loaded_pages]
                .iter()
                .flatten()
                .enumerate()
                .map(|(i, (task_id, batch_id))| ElementRef {
                    task_id: task_id.clone(),
                    batch_id: batch_id.clone(),
                    top: i * ROW,
                    height: ROW,
                    sub_index: None,
                })
                .collect()
        }

        fn viewport(&self) -> Viewport {
            Viewport {
                top: self.0.lock().unwrap().scroll_top,
                height: 9,
            }
        }

        fn scroll_into_view(&self, element: &ElementRef) {
            self.0.lock().unwrap().scroll_top = element.top.saturating_sub(3);
        }

        fn highlight(&self, element: &ElementRef, duration: Duration) {
            self.0.lock().unwrap().highlight =
                Some((element.task_id.clone(), Instant::now() + duration));
        }

        fn is_loading(&self) -> bool {
            self.0.lock().unwrap().loading
        }
    }

    /// A list that only offers "load more"
    #[derive(Clone)]
    struct LoadMoreOnly(FakeList);

    impl ListCapability for LoadMoreOnly {
        fn load_more(&self) -> impl Future<Output = Result<(), ListError>> + Send {
            self.0.load_more()
        }

        fn has_more(&self) -> bool {
            self.0.has_more()
        }
    }

    impl ElementIndex for LoadMoreOnly {
        fn find(&self, task_id: &str, batch_id: Option<&str>) -> Option<ElementRef> {
            self.0.find(task_id, batch_id)
        }
        fn elements(&self) -> Vec<ElementRef> {
            self.0.elements()
        }
        fn viewport(&self) -> Viewport {
            self.0.viewport()
        }
        fn scroll_into_view(&self, element: &ElementRef) {
            self.0.scroll_into_view(element)
        }
        fn highlight(&self, element: &ElementRef, duration: Duration) {
            self.0.highlight(element, duration)
        }
        fn is_loading(&self) -> bool {
            self.0.is_loading()
        }
    }

    #[derive(Clone, Default)]
    struct FakeLocator {
        page: Option<u32>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl TaskLocator for FakeLocator {
        fn locate_task(
            &self,
            _task_id: &str,
        ) -> impl Future<Output = Result<Option<TaskLocation>, ApiError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail {
                Err(ApiError::Status {
                    status: 500,
                    body: String::new(),
                })
            } else {
                Ok(self.page.map(|page| TaskLocation {
                    page,
                    index_in_page: None,
                    batch_id: None,
                }))
            };
            std::future::ready(result)
        }
    }

    fn pages() -> FakeList {
        FakeList::with_pages(&[&["t1", "t2"], &["t3", "t4"], &["t41", "t42"], &["t5", "t6"]])
    }

    #[tokio::test]
    async fn test_visible_task_is_revealed_without_locator() {
        let list = pages().loaded(2);
        let locator = FakeLocator::default();
        let bridge = ScrollSyncBridge::new(list.clone(), locator.clone(), BridgeConfig::default());

        let outcome = bridge.jump_to_task("t4", None, &[]).await;

        assert!(matches!(
            outcome,
            JumpOutcome::Found { ref element, page_loaded: None } if element.task_id == "t4"
        ));
        assert_eq!(locator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(list.highlighted(Instant::now()).as_deref(), Some("t4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_located_task_loads_through_page_then_highlight_expires() {
        let list = pages().loaded(1);
        let locator = FakeLocator {
            page: Some(3),
            ..Default::default()
        };
        let bridge = ScrollSyncBridge::new(list.clone(), locator, BridgeConfig::default());

        let outcome = bridge.jump_to_task("t42", None, &[]).await;

        assert!(matches!(
            outcome,
            JumpOutcome::Found { page_loaded: Some(3), .. }
        ));
        assert_eq!(list.0.lock().unwrap().loaded_to, vec![3]);
        assert_eq!(list.load_more_calls(), 0);
        // t42 is the sixth element: rows 15..18, centered in a 9-row viewport
        assert_eq!(list.0.lock().unwrap().scroll_top, 12);

        let start = Instant::now();
        assert_eq!(list.highlighted(start).as_deref(), Some("t42"));
        tokio::time::advance(Duration::from_millis(1499)).await;
        assert!(list.highlighted(Instant::now()).is_some());
        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(list.highlighted(Instant::now()), None);
    }

    #[tokio::test]
    async fn test_unknown_to_locator_falls_back_to_load_more() {
        let list = pages().loaded(1);
        let bridge = ScrollSyncBridge::new(list.clone(), FakeLocator::default(), BridgeConfig::default());

        let outcome = bridge.jump_to_task("t41", None, &[]).await;

        assert!(matches!(outcome, JumpOutcome::Found { page_loaded: None, .. }));
        assert_eq!(list.load_more_calls(), 2);
    }

    #[tokio::test]
    async fn test_locator_failure_and_unsupported_page_loading_degrade_to_fallback() {
        let list = LoadMoreOnly(pages().loaded(1));
        let locator = FakeLocator {
            page: Some(3),
            ..Default::default()
        };
        let bridge = ScrollSyncBridge::new(list.clone(), locator, BridgeConfig::default());
        assert!(matches!(
            bridge.jump_to_task("t42", None, &[]).await,
            JumpOutcome::Found { page_loaded: None, .. }
        ));
        assert_eq!(list.0.load_more_calls(), 2);

        let list = pages().loaded(1);
        let locator = FakeLocator {
            fail: true,
            ..Default::default()
        };
        let bridge = ScrollSyncBridge::new(list.clone(), locator, BridgeConfig::default());
        assert!(matches!(
            bridge.jump_to_task("t5", None, &[]).await,
            JumpOutcome::Found { .. }
        ));
        assert_eq!(list.load_more_calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_search_reports_not_found_or_still_loading() {
        let list = pages().loaded(1);
        let bridge = ScrollSyncBridge::new(list.clone(), FakeLocator::default(), BridgeConfig::default());
        assert_eq!(
            bridge.jump_to_task("nope", None, &[]).await,
            JumpOutcome::NotFound
        );
        assert_eq!(list.load_more_calls(), 3);

        list.0.lock().unwrap().loading = true;
        assert_eq!(
            bridge.jump_to_task("nope", None, &[]).await,
            JumpOutcome::StillLoading
        );
    }

    #[tokio::test]
    async fn test_fallback_attempts_are_bounded() {
        let many: Vec<Vec<String>> = (0..50).map(|i| vec![format!("p{}", i)]).collect();
        let refs: Vec<Vec<&str>> = many
            .iter()
            .map(|page| page.iter().map(String::as_str).collect())
            .collect();
        let slices: Vec<&[&str]> = refs.iter().map(Vec::as_slice).collect();
        let list = FakeList::with_pages(&slices).loaded(1);
        let config = BridgeConfig {
            max_fallback_attempts: 5,
            ..Default::default()
        };
        let bridge = ScrollSyncBridge::new(list.clone(), FakeLocator::default(), config);

        assert_eq!(
            bridge.jump_to_task("p40", None, &[]).await,
            JumpOutcome::NotFound
        );
        assert_eq!(list.load_more_calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_jumps_share_one_fallback() {
        let list = pages().loaded(1);
        list.0.lock().unwrap().load_delay = Duration::from_millis(100);
        let bridge = ScrollSyncBridge::new(list.clone(), FakeLocator::default(), BridgeConfig::default());

        let first = tokio::spawn(bridge.jump_to_task("missing", None, &[]));
        let second = tokio::spawn(bridge.jump_to_task("missing", None, &[]));

        assert_eq!(second.await.unwrap(), JumpOutcome::StillLoading);
        assert_eq!(first.await.unwrap(), JumpOutcome::NotFound);
        assert_eq!(list.load_more_calls(), 3);
        assert!(!bridge.fallback_running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_batch_id_comes_from_loaded_records() {
        let list = FakeList::default();
        {
            let mut state = list.0.lock().unwrap();
            state.pages = vec![vec![("t9".to_string(), Some("b2".to_string()))]];
            state.loaded_pages = 1;
        }
        let bridge = ScrollSyncBridge::new(list.clone(), FakeLocator::default(), BridgeConfig::default());
        let loaded = vec![ThumbnailRecord {
            task_id: "t7".into(),
            batch_id: Some("b2".into()),
            poster_url: None,
            batch_completed: Some(2),
            batch_total: Some(3),
            media: None,
            video_path: None,
        }];

        match bridge.jump_to_task("t7", None, &loaded).await {
            JumpOutcome::Found { element, .. } => {
                assert_eq!(element.batch_id.as_deref(), Some("b2"))
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_active_element_is_debounced_and_closest_to_center() {
        let list = pages().loaded(2);
        let mut tracker = ActiveTracker::new(Duration::from_millis(100));
        let start = Instant::now();

        assert_eq!(tracker.sync_if_due(start, &list), None);

        tracker.on_primary_scroll(start);
        assert_eq!(tracker.sync_if_due(start + Duration::from_millis(50), &list), None);

        // Viewport 0..9 has center 4.5; t2 spans 3..6 with center 4.5
        let active = tracker
            .sync_if_due(start + Duration::from_millis(100), &list)
            .unwrap();
        assert_eq!(active.task_id, "t2");

        // Unchanged position does not re-report
        tracker.on_primary_scroll(start);
        assert_eq!(tracker.sync_if_due(start + Duration::from_secs(1), &list), None);

        // Viewport 3..12 has center 7.5, the center of t3
        list.0.lock().unwrap().scroll_top = 3;
        tracker.on_primary_scroll(start);
        let active = tracker
            .sync_if_due(start + Duration::from_secs(1), &list)
            .unwrap();
        assert_eq!(active.task_id, "t3");
    }

    #[tokio::test]
    async fn test_equal_distance_prefers_first_element() {
        let list = pages().loaded(2);
        // Center 6 sits exactly between t2 (4.5) and t3 (7.5)
        let tracker_list = ViewportOverride {
            inner: list,
            viewport: Viewport { top: 0, height: 12 },
        };
        let mut tracker = ActiveTracker::new(Duration::ZERO);
        tracker.on_primary_scroll(Instant::now());
        let active = tracker.sync_if_due(Instant::now(), &tracker_list).unwrap();
        assert_eq!(active.task_id, "t2");
    }

    struct ViewportOverride {
        inner: FakeList,
        viewport: Viewport,
    }

    impl ElementIndex for ViewportOverride {
        fn find(&self, task_id: &str, batch_id: Option<&str>) -> Option<ElementRef> {
            self.inner.find(task_id, batch_id)
        }
        fn elements(&self) -> Vec<ElementRef> {
            self.inner.elements()
        }
        fn viewport(&self) -> Viewport {
            self.viewport
        }
        fn scroll_into_view(&self, _element: &ElementRef) {}
        fn highlight(&self, _element: &ElementRef, _duration: Duration) {}
        fn is_loading(&self) -> bool {
            false
        }
    }
}
