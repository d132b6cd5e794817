//! Render snapshot and UI status
//!
//! `AppState` is what the render thread draws. It only carries the realized
//! slices of both panes, so cloning it per frame stays cheap.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::api::ResourceKind;
use crate::constants::ERROR_TTL_SECS;
use crate::history::HistoryView;
use crate::input::KeybindingEntry;
use crate::navigator::NavigatorView;
use crate::scheduler::{SchedulerPhase, SchedulerState};

/// Which pane receives navigation keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Navigator,
    History,
}

impl Focus {
    pub fn toggle(self) -> Self {
        match self {
            Self::Navigator => Self::History,
            Self::History => Self::Navigator,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub error: Option<String>,
    pub error_time: Option<Instant>,
    pub message: String,
    /// Persists after the error bar expires, shown as an indicator
    pub has_unacknowledged_error: bool,
}

impl StatusState {
    pub fn set_error(&mut self, error: impl ToString) {
        self.error = Some(error.to_string());
        self.error_time = Some(Instant::now());
        self.has_unacknowledged_error = true;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.error_time = None;
    }

    /// Call on user input to dismiss the status bar indicator
    pub fn acknowledge_error(&mut self) {
        self.has_unacknowledged_error = false;
    }

    /// Clear error if TTL expired. Returns true if error was cleared.
    pub fn clear_error_if_expired(&mut self, now: Instant) -> bool {
        if let Some(time) = self.error_time
            && now.saturating_duration_since(time).as_secs() >= ERROR_TTL_SECS
        {
            self.clear_error();
            true
        } else {
            false
        }
    }

    pub fn set_message(&mut self, msg: impl ToString) {
        self.message = msg.to_string();
    }
}

/// Scheduler state as the status bar shows it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollStatus {
    pub running: Option<usize>,
    pub interval: Duration,
    pub phase: SchedulerPhase,
    pub polling: bool,
    pub polls: u64,
}

impl From<&SchedulerState> for PollStatus {
    fn from(state: &SchedulerState) -> Self {
        Self {
            running: state.running_task_count,
            interval: state.current_interval,
            phase: state.phase,
            polling: state.is_polling,
            polls: state.polls,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub kind: ResourceKind,
    pub server: String,
    pub focus: Focus,
    pub show_help: bool,
    pub help_scroll: usize,
    pub status: StatusState,
    pub poll: PollStatus,
    pub navigator: NavigatorView,
    pub history: HistoryView,
    pub keybindings: Arc<[KeybindingEntry]>,
    /// (key, description) pairs for the bottom hint bar
    pub hints: Arc<[(String, &'static str)]>,
}

impl AppState {
    pub fn new(
        kind: ResourceKind,
        server: impl Into<String>,
        keybindings: Vec<KeybindingEntry>,
        hints: Vec<(String, &'static str)>,
    ) -> Self {
        Self {
            kind,
            server: server.into(),
            focus: Focus::default(),
            show_help: false,
            help_scroll: 0,
            status: StatusState::default(),
            poll: PollStatus::default(),
            navigator: NavigatorView::default(),
            history: HistoryView::default(),
            keybindings: keybindings.into(),
            hints: hints.into(),
        }
    }

    /// Anything in flight that warrants the spinner
    pub fn is_busy(&self) -> bool {
        self.navigator.loading
            || self.history.loading
            || self.poll.phase == SchedulerPhase::Executing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_error_expires_after_ttl() {
        let mut status = StatusState::default();
        status.set_error("boom");
        let set_at = Instant::now();

        assert!(!status.clear_error_if_expired(set_at + Duration::from_secs(ERROR_TTL_SECS - 1)));
        assert!(status.error.is_some());

        assert!(status.clear_error_if_expired(set_at + Duration::from_secs(ERROR_TTL_SECS)));
        assert!(status.error.is_none());
        // The indicator outlives the bar until acknowledged
        assert!(status.has_unacknowledged_error);
        status.acknowledge_error();
        assert!(!status.has_unacknowledged_error);
    }

    #[test]
    fn test_poll_status_from_scheduler_state() {
        let state = SchedulerState::new(Default::default());
        let poll = PollStatus::from(&state);
        assert_eq!(poll.running, None);
        assert_eq!(poll.interval, Duration::from_millis(3000));
        assert!(!poll.polling);
    }

    #[test]
    fn test_focus_toggles() {
        assert_eq!(Focus::Navigator.toggle(), Focus::History);
        assert_eq!(Focus::History.toggle().toggle(), Focus::History);
    }
}
