//! Quick-jump thumbnail navigator.
//!
//! This module is split into:
//! - `mod.rs` - The `Navigator` composition: scroll position, cursor, active mark, view snapshot
//! - `paginator.rs` - Page-by-page loading with dedupe and stale-result rejection
//! - `window.rs` - Visible range computation and prefetch policy
//! - `images.rs` - Staggered, concurrency-capped poster loading

pub mod images;
pub mod paginator;
pub mod window;

use std::time::Duration;

use tokio::time::Instant;

use crate::api::{MediaType, ThumbnailRecord};
use crate::constants::{FALLBACK_CONTAINER_HEIGHT, POSTER_RETAIN_MARGIN};
use crate::sync::ElementRef;
use images::{LazyImageLoader, PosterSource, SlotState};
use paginator::{LoadStatus, ThumbnailPaginator, ThumbnailSource};
use window::{RenderPlan, VirtualWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorConfig {
    pub item_height: usize,
    pub buffer_size: usize,
    pub page_size: u32,
    pub max_concurrent_images: usize,
    pub image_stagger: Duration,
}

/// Poster state as shown in the pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosterView {
    Pending,
    Loading,
    Ready(String),
    Placeholder,
}

/// One realized navigator entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorItem {
    pub index: usize,
    pub task_id: String,
    pub batch_counter: Option<String>,
    pub media: Option<MediaType>,
    pub poster: PosterView,
    pub active: bool,
    pub selected: bool,
}

/// Render snapshot: only the realized slice, never the whole list
#[derive(Debug, Clone, Default)]
pub struct NavigatorView {
    pub items: Vec<NavigatorItem>,
    pub item_height: usize,
    pub scroll_top: usize,
    pub total_extent: usize,
    pub slice_offset: usize,
    pub loaded: usize,
    pub total_tasks: usize,
    pub status: LoadStatus,
    pub loading: bool,
    pub stalled: bool,
    pub error: Option<String>,
}

pub struct Navigator<S, P> {
    paginator: ThumbnailPaginator<S>,
    window: VirtualWindow,
    images: LazyImageLoader<P>,
    scroll_top: usize,
    container_height: Option<usize>,
    cursor: usize,
    /// task_id of the record mirroring the primary list's centered element
    active: Option<String>,
    plan: Option<RenderPlan>,
}

impl<S: ThumbnailSource, P: PosterSource> Navigator<S, P> {
    pub fn new(source: S, posters: P, config: NavigatorConfig) -> Self {
        Self {
            paginator: ThumbnailPaginator::new(source, config.page_size),
            window: VirtualWindow::new(config.item_height, config.buffer_size),
            images: LazyImageLoader::new(
                posters,
                config.max_concurrent_images,
                config.image_stagger,
            ),
            scroll_top: 0,
            container_height: None,
            cursor: 0,
            active: None,
            plan: None,
        }
    }

    /// Initial load of page 1
    pub fn init(&mut self) -> bool {
        self.paginator.load_page(true)
    }

    /// Reset to page 1, dropping everything loaded so far
    pub fn refresh(&mut self) -> bool {
        self.images.clear();
        self.window.invalidate();
        self.plan = None;
        self.paginator.refresh()
    }

    pub fn retry(&mut self) -> bool {
        self.paginator.retry()
    }

    pub fn records(&self) -> &[ThumbnailRecord] {
        self.paginator.records()
    }

    #[cfg(test)]
    pub fn paginator(&self) -> &ThumbnailPaginator<S> {
        &self.paginator
    }

    pub fn selected(&self) -> Option<&ThumbnailRecord> {
        self.paginator.records().get(self.cursor)
    }

    #[cfg(test)]
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    #[cfg(test)]
    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    /// Fold in page and poster results. Returns true if a redraw is needed.
    pub fn drain_events(&mut self, now: Instant) -> bool {
        let pages_changed = self.paginator.drain_events();
        if pages_changed {
            self.clamp_positions();
            self.rerender(true, now);
        }
        let images_changed = self.images.drain_events();
        pages_changed || images_changed
    }

    /// Re-evaluate prefetch once scrolling settles. Returns true if a page
    /// load started.
    pub fn tick(&mut self, now: Instant) -> bool {
        let was_loading = self.paginator.is_loading();
        self.rerender(false, now);
        self.paginator.is_loading() && !was_loading
    }

    pub fn set_container_height(&mut self, height: usize, now: Instant) {
        if self.container_height == Some(height) {
            return;
        }
        self.container_height = Some(height);
        self.clamp_positions();
        self.rerender(true, now);
    }

    /// Scroll the pane by `delta` rows
    pub fn scroll_by(&mut self, delta: isize, now: Instant) -> bool {
        let target = self.scroll_top.saturating_add_signed(delta).min(self.max_scroll());
        if target == self.scroll_top {
            return false;
        }
        self.scroll_top = target;
        self.rerender(false, now);
        true
    }

    /// Move the selection cursor, scrolling just enough to keep it in view
    pub fn move_cursor(&mut self, delta: isize, now: Instant) -> bool {
        let len = self.paginator.len();
        if len == 0 {
            return false;
        }
        let target = self.cursor.saturating_add_signed(delta).min(len - 1);
        if target == self.cursor {
            return false;
        }
        self.cursor = target;

        let item_height = self.window.item_height();
        let height = self.viewport_height();
        let top = target * item_height;
        if top < self.scroll_top {
            self.scroll_top = top;
        } else if top + item_height > self.scroll_top + height {
            self.scroll_top = (top + item_height).saturating_sub(height);
        }
        self.scroll_top = self.scroll_top.min(self.max_scroll());
        self.rerender(false, now);
        true
    }

    pub fn cursor_to_start(&mut self, now: Instant) -> bool {
        self.move_cursor(-(self.cursor as isize), now)
    }

    pub fn cursor_to_end(&mut self, now: Instant) -> bool {
        let len = self.paginator.len() as isize;
        self.move_cursor(len - 1 - self.cursor as isize, now)
    }

    /// Mark the record matching a primary-list element as active, clearing
    /// the previous mark. Batch containers match by batch id.
    pub fn set_active(&mut self, element: &ElementRef) -> bool {
        let records = self.paginator.records();
        let matched = element
            .batch_id
            .as_deref()
            .and_then(|batch_id| {
                records
                    .iter()
                    .find(|r| r.batch_id.as_deref() == Some(batch_id))
            })
            .or_else(|| self.paginator.get(&element.task_id))
            .map(|r| r.task_id.clone());

        if matched.is_none() || matched == self.active {
            return false;
        }
        self.active = matched;
        true
    }

    fn viewport_height(&self) -> usize {
        self.container_height
            .filter(|h| *h > 0)
            .unwrap_or(FALLBACK_CONTAINER_HEIGHT)
    }

    fn max_scroll(&self) -> usize {
        (self.paginator.len() * self.window.item_height()).saturating_sub(self.viewport_height())
    }

    fn clamp_positions(&mut self) {
        self.scroll_top = self.scroll_top.min(self.max_scroll());
        self.cursor = self.cursor.min(self.paginator.len().saturating_sub(1));
    }

    fn rerender(&mut self, force: bool, now: Instant) {
        let total = self.paginator.len();
        if let Some(plan) = self
            .window
            .update(self.scroll_top, self.container_height, total, force, now)
        {
            let records = self.paginator.records();
            self.images
                .evict_outside(records, plan.range.as_range(), POSTER_RETAIN_MARGIN);
            self.images.load_visible(records, plan.range.as_range());
            self.plan = Some(plan);
        }

        // Until the first page lands there is nothing to prefetch after
        if self.paginator.status() == LoadStatus::Ready
            && self
                .window
                .should_prefetch(total, self.paginator.has_more(), now)
        {
            self.paginator.load_page(false);
        }
    }

    pub fn view(&self) -> NavigatorView {
        let records = self.paginator.records();
        let plan = self
            .plan
            .unwrap_or_else(|| self.window.plan_for(Default::default(), records.len()));
        let range = plan.range.start.min(records.len())..plan.range.end.min(records.len());

        let items = records[range.clone()]
            .iter()
            .zip(range)
            .map(|(record, index)| NavigatorItem {
                index,
                task_id: record.task_id.clone(),
                batch_counter: record.batch_counter(),
                media: record.media,
                poster: match self.images.slot(&record.task_id) {
                    None | Some(SlotState::Empty) => PosterView::Pending,
                    Some(SlotState::Loading) => PosterView::Loading,
                    Some(SlotState::Ready(poster)) => PosterView::Ready(poster.describe()),
                    Some(SlotState::Placeholder) => PosterView::Placeholder,
                },
                active: self.active.as_deref() == Some(record.task_id.as_str()),
                selected: index == self.cursor,
            })
            .collect();

        NavigatorView {
            items,
            item_height: self.window.item_height(),
            scroll_top: self.scroll_top,
            total_extent: plan.total_extent,
            slice_offset: plan.slice_offset,
            loaded: records.len(),
            total_tasks: self.paginator.total_tasks(),
            status: self.paginator.status(),
            loading: self.paginator.is_loading(),
            stalled: self.paginator.is_stalled(),
            error: self.paginator.last_error().map(str::to_string),
        }
    }
}
