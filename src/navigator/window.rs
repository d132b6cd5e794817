//! Virtual window over the loaded thumbnail list
//!
//! Only the records inside the visible range (plus a buffer) are realized.
//! Geometry is in terminal rows; the full list keeps its extent so the
//! scrollbar position stays stable as records are realized and dropped.

use std::ops::Range;
use std::time::Duration;

use tokio::time::Instant;

use crate::constants::{
    FALLBACK_CONTAINER_HEIGHT, MIN_VISIBLE_ITEMS, PREFETCH_ACTIVE_THRESHOLD,
    PREFETCH_SETTLED_THRESHOLD, PREFETCH_UPWARD_THRESHOLD, SCROLLING_WINDOW_MS,
};

/// Half-open range of record indices, `start <= end`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Compute which records to realize for a scroll position.
///
/// An unmeasured (or zero) container height falls back to a fixed height so
/// the first render is never empty.
pub fn compute_visible_range(
    scroll_top: usize,
    container_height: Option<usize>,
    item_height: usize,
    buffer_size: usize,
    total_items: usize,
) -> VisibleRange {
    let item_height = item_height.max(1);
    let container_height = container_height
        .filter(|height| *height > 0)
        .unwrap_or(FALLBACK_CONTAINER_HEIGHT);

    let first_visible = scroll_top / item_height;
    let visible_count = container_height.div_ceil(item_height).max(MIN_VISIBLE_ITEMS);

    let end = (first_visible + visible_count + buffer_size).min(total_items);
    let start = first_visible.saturating_sub(buffer_size).min(end);

    VisibleRange { start, end }
}

/// What the navigator pane should draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPlan {
    pub range: VisibleRange,
    /// Height of the whole list, realized or not
    pub total_extent: usize,
    /// Row at which the realized slice begins
    pub slice_offset: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollDirection {
    #[default]
    None,
    Down,
    Up,
}

/// Tracks the last rendered range and the scroll motion that led to it
#[derive(Debug)]
pub struct VirtualWindow {
    item_height: usize,
    buffer_size: usize,
    last_range: Option<VisibleRange>,
    last_scroll_top: usize,
    direction: ScrollDirection,
    last_scroll_at: Option<Instant>,
}

impl VirtualWindow {
    pub fn new(item_height: usize, buffer_size: usize) -> Self {
        Self {
            item_height: item_height.max(1),
            buffer_size,
            last_range: None,
            last_scroll_top: 0,
            direction: ScrollDirection::None,
            last_scroll_at: None,
        }
    }

    pub fn item_height(&self) -> usize {
        self.item_height
    }

    #[cfg(test)]
    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }

    /// Recompute the window. Returns `None` when the range is unchanged and
    /// no forced refresh was requested.
    pub fn update(
        &mut self,
        scroll_top: usize,
        container_height: Option<usize>,
        total_items: usize,
        force: bool,
        now: Instant,
    ) -> Option<RenderPlan> {
        if scroll_top != self.last_scroll_top {
            self.direction = if scroll_top > self.last_scroll_top {
                ScrollDirection::Down
            } else {
                ScrollDirection::Up
            };
            self.last_scroll_top = scroll_top;
            self.last_scroll_at = Some(now);
        }

        let range = compute_visible_range(
            scroll_top,
            container_height,
            self.item_height,
            self.buffer_size,
            total_items,
        );

        if !force && self.last_range == Some(range) {
            return None;
        }
        self.last_range = Some(range);

        Some(self.plan_for(range, total_items))
    }

    pub fn plan_for(&self, range: VisibleRange, total_items: usize) -> RenderPlan {
        RenderPlan {
            range,
            total_extent: total_items * self.item_height,
            slice_offset: range.start * self.item_height,
        }
    }

    /// Forget the last range so the next update always renders
    pub fn invalidate(&mut self) {
        self.last_range = None;
    }

    /// Whether the rendered range is close enough to the end of the loaded
    /// list that the next page should be requested.
    pub fn should_prefetch(&self, total_items: usize, has_more: bool, now: Instant) -> bool {
        if !has_more {
            return false;
        }
        let end = self.last_range.map(|range| range.end).unwrap_or(0);
        end + self.prefetch_threshold(now) >= total_items
    }

    fn prefetch_threshold(&self, now: Instant) -> usize {
        let actively_scrolling = self.last_scroll_at.is_some_and(|at| {
            now.saturating_duration_since(at) < Duration::from_millis(SCROLLING_WINDOW_MS)
        });

        match self.direction {
            ScrollDirection::Down if actively_scrolling => PREFETCH_ACTIVE_THRESHOLD,
            ScrollDirection::Up => PREFETCH_UPWARD_THRESHOLD,
            ScrollDirection::Down | ScrollDirection::None => PREFETCH_SETTLED_THRESHOLD,
        }
    }
}
