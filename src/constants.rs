//! Application-wide constants for tuning and configuration
//!
//! Centralizes magic numbers to make them discoverable and configurable.

/// Minimum number of navigator items treated as visible, regardless of pane height.
pub const MIN_VISIBLE_ITEMS: usize = 5;

/// Container height used before the navigator pane has been measured.
/// Roughly three and a half default-sized items.
pub const FALLBACK_CONTAINER_HEIGHT: usize = 12;

/// A scroll update within this window counts as "actively scrolling".
pub const SCROLLING_WINDOW_MS: u64 = 200;

/// Prefetch lookahead (items before the end) while actively scrolling down.
/// Small: fetch just in time to avoid a burst of requests mid-scroll.
pub const PREFETCH_ACTIVE_THRESHOLD: usize = 8;

/// Prefetch lookahead once downward scrolling has settled.
pub const PREFETCH_SETTLED_THRESHOLD: usize = 30;

/// Prefetch lookahead while scrolling upward.
pub const PREFETCH_UPWARD_THRESHOLD: usize = 15;

/// Hard cap on concurrently downloading posters.
pub const MAX_CONCURRENT_IMAGE_LOADS: usize = 6;

/// Per-slot dispatch delay for posters that become visible together.
pub const IMAGE_STAGGER_MS: u64 = 25;

/// Records on each side of the realized range whose poster slots are kept.
/// Slots further away are evicted and refetched through the poster cache.
pub const POSTER_RETAIN_MARGIN: usize = 20;

/// Maximum number of poster images kept in memory.
pub const POSTER_CACHE_CAPACITY: u64 = 512;

/// Number of thumbnail records requested per page (server caps at 100).
pub const THUMBNAIL_PAGE_SIZE: u32 = 50;

/// Number of task batches requested per primary-list page.
pub const HISTORY_PAGE_SIZE: u32 = 10;

/// Number of tasks inspected by the status probe on each poll.
pub const PROBE_PAGE_SIZE: u32 = 20;

/// Debounce for syncing the navigator's active mark to the primary list.
pub const SYNC_DEBOUNCE_MS: u64 = 100;

/// How long a jump target stays highlighted in the primary list.
pub const HIGHLIGHT_MS: u64 = 1500;

/// Upper bound on "load more" calls during a jump fallback.
pub const MAX_FALLBACK_ATTEMPTS: u32 = 20;

/// Rows from the bottom of the primary list at which the next page is loaded.
pub const HISTORY_LOAD_AHEAD_ROWS: usize = 10;

/// Error message display duration in seconds before auto-dismiss.
pub const ERROR_TTL_SECS: u64 = 5;

/// Spinner animation frame duration in milliseconds.
pub const SPINNER_FRAME_MS: u128 = 80;

/// Event loop input poll timeout while background work is pending.
pub const BUSY_POLL_MS: u64 = 50;

/// Event loop input poll timeout when idle.
pub const IDLE_POLL_MS: u64 = 150;

/// Fixed width of the navigator pane in columns.
pub const NAVIGATOR_WIDTH: u16 = 34;

/// Minimum terminal width to show both panes side by side.
pub const MIN_SPLIT_VIEW_WIDTH: u16 = 70;
