//! Navigator / primary list synchronization.
//!
//! This module is split into:
//! - `mod.rs` - Capability interfaces the primary list implements
//! - `bridge.rs` - Active-mark tracking and jump-to-task
//! - `locator.rs` - Server lookup of the page holding a task

mod bridge;
mod locator;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::api::ApiError;

pub use bridge::{BridgeConfig, JumpOutcome, ScrollSyncBridge};
pub use locator::TaskLocator;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("loading through a specific page is not supported")]
    Unsupported,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Page loading the primary list offers to the bridge
pub trait ListCapability: Send + Sync {
    /// Load the next page, if any
    fn load_more(&self) -> impl Future<Output = Result<(), ListError>> + Send;

    /// Load every page up to and including `page`
    fn load_to_page(&self, page: u32) -> impl Future<Output = Result<(), ListError>> + Send {
        let _ = page;
        async { Err(ListError::Unsupported) }
    }

    fn has_more(&self) -> bool;
}

/// Entry in the primary list's element index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub task_id: String,
    /// Set when the element is a batch container
    pub batch_id: Option<String>,
    pub top: usize,
    pub height: usize,
    /// Position of `task_id` inside its batch container
    pub sub_index: Option<usize>,
}

impl ElementRef {
    /// Vertical center, doubled to stay in integers
    pub(crate) fn center_x2(&self) -> usize {
        self.top * 2 + self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub top: usize,
    pub height: usize,
}

impl Viewport {
    pub(crate) fn center_x2(&self) -> usize {
        self.top * 2 + self.height
    }
}

/// Lookup and presentation hooks on the primary list
pub trait ElementIndex: Send + Sync {
    /// Element for a task, or for its batch container
    fn find(&self, task_id: &str, batch_id: Option<&str>) -> Option<ElementRef>;

    /// All elements in document order
    fn elements(&self) -> Vec<ElementRef>;

    fn viewport(&self) -> Viewport;

    /// Scroll so the element is centered
    fn scroll_into_view(&self, element: &ElementRef);

    /// Highlight the element (and its sub-item) for `duration`
    fn highlight(&self, element: &ElementRef, duration: Duration);

    fn is_loading(&self) -> bool;
}
