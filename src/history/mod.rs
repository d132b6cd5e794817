//! Primary task history list.
//!
//! Owns the detailed, batch-grouped task list shown in the primary pane and
//! the authoritative task/batch -> element index the scroll-sync bridge
//! searches. Cloning shares the same list.
//!
//! This module is split into:
//! - `mod.rs` - Loading, viewport, highlight and the sync capability impls
//! - `groups.rs` - Batch grouping and row layout

mod groups;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::api::{ApiClient, TaskSummary};
use crate::sync::{ElementIndex, ElementRef, ListCapability, ListError, Viewport};
use groups::GroupedTasks;

#[derive(Debug, Clone)]
struct Highlight {
    task_id: String,
    batch_id: Option<String>,
    until: Instant,
}

#[derive(Debug)]
struct HistoryState {
    list: GroupedTasks,
    next_page: u32,
    /// Server-reported task count
    total_tasks: usize,
    has_more: bool,
    loading: bool,
    /// A refresh is running; later requests fold into `refresh_again`
    refreshing: bool,
    refresh_again: bool,
    scroll_top: usize,
    viewport_height: usize,
    highlight: Option<Highlight>,
    /// Bumped on every visible change
    revision: u64,
    last_error: Option<String>,
}

impl HistoryState {
    fn max_scroll(&self) -> usize {
        self.list
            .total_height()
            .saturating_sub(self.viewport_height)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_top = self.scroll_top.min(self.max_scroll());
    }

    fn element(&self, group_index: usize, task_id: Option<&str>) -> Option<ElementRef> {
        let group = self.list.groups().get(group_index)?;
        let sub_index = match (task_id, group.is_batch()) {
            (Some(task_id), true) => group.position(task_id),
            _ => None,
        };
        let task_id = task_id
            .filter(|id| group.position(id).is_some())
            .unwrap_or(group.representative());

        Some(ElementRef {
            task_id: task_id.to_string(),
            batch_id: group.batch_id.clone(),
            top: group.top,
            height: group.height(),
            sub_index,
        })
    }
}

/// Render snapshot of one realized group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub top: usize,
    pub batch_id: Option<String>,
    pub tasks: Vec<TaskSummary>,
    pub completed: usize,
    pub highlighted: bool,
    /// Highlighted task inside a batch
    pub highlighted_task: Option<usize>,
}

/// Render snapshot of the primary pane: visible groups only
#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    pub groups: Vec<GroupView>,
    pub scroll_top: usize,
    pub total_height: usize,
    pub loaded_tasks: usize,
    pub total_tasks: usize,
    pub loading: bool,
    pub has_more: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct TaskHistory {
    client: ApiClient,
    page_size: u32,
    state: Arc<Mutex<HistoryState>>,
    /// Serializes page loads; held across the fetch
    load_lock: Arc<tokio::sync::Mutex<()>>,
}

impl TaskHistory {
    pub fn new(client: ApiClient, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            state: Arc::new(Mutex::new(HistoryState {
                list: GroupedTasks::default(),
                next_page: 1,
                total_tasks: 0,
                has_more: true,
                loading: false,
                refreshing: false,
                refresh_again: false,
                scroll_top: 0,
                viewport_height: 0,
                highlight: None,
                revision: 0,
                last_error: None,
            })),
            load_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn state(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn revision(&self) -> u64 {
        self.state().revision
    }

    #[cfg(test)]
    pub fn loaded_tasks(&self) -> usize {
        self.state().list.task_count()
    }

    /// Fetch the next page. Caller must hold `load_lock`.
    async fn load_next_page(&self) -> Result<bool, ListError> {
        let page = {
            let mut state = self.state();
            if !state.has_more {
                return Ok(false);
            }
            state.loading = true;
            state.revision += 1;
            state.next_page
        };

        let result = self.client.fetch_tasks(page, self.page_size).await;

        let mut state = self.state();
        state.loading = false;
        state.revision += 1;
        match result {
            Ok(body) => {
                tracing::debug!(
                    "History: page {} brought {} tasks (has_more={})",
                    page,
                    body.tasks.len(),
                    body.has_more
                );
                state.list.append(body.tasks);
                state.total_tasks = body.total;
                state.next_page += 1;
                state.has_more = body.has_more;
                state.last_error = None;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("History: page {} failed: {}", page, e);
                state.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Reload the pages that cover the viewport, keeping scroll position and
    /// highlight. Pages below it are dropped and load again on scroll. A
    /// request made while a refresh runs is folded into one more pass after
    /// it. On failure the current list is kept.
    pub async fn refresh(&self) -> Result<(), ListError> {
        {
            let mut state = self.state();
            if state.refreshing {
                state.refresh_again = true;
                return Ok(());
            }
            state.refreshing = true;
        }

        loop {
            let result = self.refresh_once().await;
            let mut state = self.state();
            if result.is_err() || !state.refresh_again {
                state.refreshing = false;
                state.refresh_again = false;
                return result;
            }
            state.refresh_again = false;
        }
    }

    async fn refresh_once(&self) -> Result<(), ListError> {
        let _guard = self.load_lock.lock().await;
        let pages = {
            let mut state = self.state();
            state.loading = true;
            state.revision += 1;
            let loaded_pages = state.next_page.saturating_sub(1).max(1);
            let viewport_bottom = state.scroll_top + state.viewport_height.max(1);
            let needed = state
                .list
                .tasks_above(viewport_bottom)
                .div_ceil(self.page_size as usize)
                .max(1);
            loaded_pages.min(needed as u32)
        };

        let mut fresh = GroupedTasks::default();
        let mut fetched = 0;
        let mut has_more = true;
        let mut total_tasks = 0;
        let mut failure = None;
        while fetched < pages && has_more {
            match self.client.fetch_tasks(fetched + 1, self.page_size).await {
                Ok(body) => {
                    fresh.append(body.tasks);
                    has_more = body.has_more;
                    total_tasks = body.total;
                    fetched += 1;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let mut state = self.state();
        state.loading = false;
        state.revision += 1;
        if let Some(e) = failure {
            tracing::warn!("History: refresh failed: {}", e);
            state.last_error = Some(e.to_string());
            return Err(e.into());
        }
        tracing::debug!("History: refreshed {} pages", fetched);
        state.list = fresh;
        state.total_tasks = total_tasks;
        state.next_page = fetched + 1;
        state.has_more = has_more;
        state.last_error = None;
        state.clamp_scroll();
        Ok(())
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    pub fn set_viewport_height(&self, height: usize) {
        let mut state = self.state();
        if state.viewport_height != height {
            state.viewport_height = height;
            state.clamp_scroll();
            state.revision += 1;
        }
    }

    /// Scroll by `delta` rows. Returns true if the position changed.
    pub fn scroll_by(&self, delta: isize) -> bool {
        let mut state = self.state();
        let target = state
            .scroll_top
            .saturating_add_signed(delta)
            .min(state.max_scroll());
        if target == state.scroll_top {
            return false;
        }
        state.scroll_top = target;
        state.revision += 1;
        true
    }

    /// Whether the viewport bottom is within `rows` of the list end and
    /// another page can be loaded. A failed page blocks this until a load
    /// succeeds.
    pub fn near_bottom(&self, rows: usize) -> bool {
        let state = self.state();
        state.has_more
            && !state.loading
            && state.last_error.is_none()
            && state.scroll_top + state.viewport_height + rows >= state.list.total_height()
    }

    /// Drop an expired highlight. Returns true if one was cleared.
    pub fn expire_highlight(&self, now: Instant) -> bool {
        let mut state = self.state();
        if state.highlight.as_ref().is_some_and(|h| h.until <= now) {
            state.highlight = None;
            state.revision += 1;
            return true;
        }
        false
    }

    #[cfg(test)]
    pub fn highlight_deadline(&self) -> Option<Instant> {
        self.state().highlight.as_ref().map(|h| h.until)
    }

    pub fn view(&self) -> HistoryView {
        let state = self.state();
        let highlight = state.highlight.as_ref();

        let groups = state
            .list
            .visible(state.scroll_top, state.viewport_height.max(1))
            .iter()
            .map(|group| {
                let highlighted = highlight.is_some_and(|h| {
                    group.position(&h.task_id).is_some()
                        || (h.batch_id.is_some() && group.batch_id == h.batch_id)
                });
                let highlighted_task = highlight
                    .filter(|_| highlighted && group.is_batch())
                    .and_then(|h| group.position(&h.task_id));
                GroupView {
                    top: group.top,
                    batch_id: group.batch_id.clone(),
                    tasks: group.tasks.clone(),
                    completed: group.completed(),
                    highlighted,
                    highlighted_task,
                }
            })
            .collect();

        HistoryView {
            groups,
            scroll_top: state.scroll_top,
            total_height: state.list.total_height(),
            loaded_tasks: state.list.task_count(),
            total_tasks: state.total_tasks,
            loading: state.loading,
            has_more: state.has_more,
            error: state.last_error.clone(),
        }
    }
}

impl ListCapability for TaskHistory {
    fn load_more(&self) -> impl Future<Output = Result<(), ListError>> + Send {
        async move {
            let _guard = self.load_lock.lock().await;
            self.load_next_page().await.map(|_| ())
        }
    }

    fn load_to_page(&self, page: u32) -> impl Future<Output = Result<(), ListError>> + Send {
        async move {
            let _guard = self.load_lock.lock().await;
            loop {
                let next = {
                    let state = self.state();
                    (state.has_more && state.next_page <= page).then_some(state.next_page)
                };
                if next.is_none() || !self.load_next_page().await? {
                    return Ok(());
                }
            }
        }
    }

    fn has_more(&self) -> bool {
        self.state().has_more
    }
}

impl ElementIndex for TaskHistory {
    fn find(&self, task_id: &str, batch_id: Option<&str>) -> Option<ElementRef> {
        let state = self.state();
        match state.list.group_of_task(task_id) {
            Some(group) => state.element(group, Some(task_id)),
            None => {
                let group = state.list.group_of_batch(batch_id?)?;
                state.element(group, None)
            }
        }
    }

    fn elements(&self) -> Vec<ElementRef> {
        let state = self.state();
        (0..state.list.groups().len())
            .filter_map(|group| state.element(group, None))
            .collect()
    }

    fn viewport(&self) -> Viewport {
        let state = self.state();
        Viewport {
            top: state.scroll_top,
            height: state.viewport_height,
        }
    }

    fn scroll_into_view(&self, element: &ElementRef) {
        let mut state = self.state();
        let center = element.top + element.height / 2;
        state.scroll_top = center.saturating_sub(state.viewport_height / 2);
        state.clamp_scroll();
        state.revision += 1;
    }

    fn highlight(&self, element: &ElementRef, duration: Duration) {
        let mut state = self.state();
        state.highlight = Some(Highlight {
            task_id: element.task_id.clone(),
            batch_id: element.batch_id.clone(),
            until: Instant::now() + duration,
        });
        state.revision += 1;
    }

    fn is_loading(&self) -> bool {
        self.state().loading
    }
}
