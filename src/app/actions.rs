//! Action handlers for user input

use tokio::time::Instant;

use crate::constants::{MIN_SPLIT_VIEW_WIDTH, NAVIGATOR_WIDTH};
use crate::input::Action;

use super::state::Focus;
use super::{App, BackgroundEvent};

/// Rows per scroll step
const SCROLL_STEP: isize = 3;

impl App {
    pub(crate) fn handle_action(&mut self, action: Action, now: Instant) {
        match action {
            // Focused pane
            Action::Up => self.move_by(-1, now),
            Action::Down => self.move_by(1, now),
            Action::PageUp => self.move_page(-1, now),
            Action::PageDown => self.move_page(1, now),
            Action::Top => match self.state.focus {
                Focus::Navigator => {
                    self.navigator.cursor_to_start(now);
                }
                Focus::History => self.scroll_history(isize::MIN / 2, now),
            },
            Action::Bottom => match self.state.focus {
                Focus::Navigator => {
                    self.navigator.cursor_to_end(now);
                }
                Focus::History => self.scroll_history(isize::MAX / 2, now),
            },

            // History pane, regardless of focus
            Action::ScrollUp => self.scroll_history(-SCROLL_STEP, now),
            Action::ScrollDown => self.scroll_history(SCROLL_STEP, now),

            Action::Jump => self.jump_to_selected(),
            Action::Refresh => {
                self.navigator.refresh();
                self.spawn_history_refresh();
                self.scheduler.poll_now();
                self.state.status.set_message("Refreshing...");
            }
            Action::PollNow => {
                self.scheduler.poll_now();
                self.state.status.set_message("Checking status...");
            }
            Action::TogglePolling => {
                if self.state.poll.polling {
                    self.scheduler.stop();
                    self.state.status.set_message("Polling paused");
                } else {
                    self.scheduler.start();
                    self.state.status.set_message("Polling resumed");
                }
            }
            Action::Retry => self.retry(),
            Action::SwitchFocus => self.state.focus = self.state.focus.toggle(),
            Action::OpenMedia => self.open_selected_media(),
            Action::Help => {
                self.state.show_help = !self.state.show_help;
                self.state.help_scroll = 0;
            }
            Action::Back => {
                self.state.show_help = false;
                self.state.status.clear_error();
            }
            Action::Quit => {} // Handled in event loop
        }
    }

    fn move_by(&mut self, delta: isize, now: Instant) {
        if self.state.show_help {
            self.state.help_scroll = self.state.help_scroll.saturating_add_signed(delta);
            return;
        }
        match self.state.focus {
            Focus::Navigator => {
                self.navigator.move_cursor(delta, now);
            }
            Focus::History => self.scroll_history(delta, now),
        }
    }

    fn move_page(&mut self, direction: isize, now: Instant) {
        let page = (self.pane_rows.max(1) / 2).max(1) as isize;
        match self.state.focus {
            Focus::Navigator => {
                let items = (page / self.config.navigator.item_height.max(1) as isize).max(1);
                self.navigator.move_cursor(direction * items, now);
            }
            Focus::History => self.scroll_history(direction * page, now),
        }
    }

    /// Mouse wheel scrolls whichever pane is under the pointer
    pub(crate) fn handle_wheel(&mut self, column: u16, down: bool, now: Instant) {
        let over_navigator = if self.terminal_width >= MIN_SPLIT_VIEW_WIDTH {
            column < NAVIGATOR_WIDTH
        } else {
            self.state.focus == Focus::Navigator
        };
        let step = if down {
            SCROLL_STEP
        } else {
            -SCROLL_STEP
        };
        if over_navigator {
            self.navigator.scroll_by(step, now);
        } else {
            self.scroll_history(step, now);
        }
    }

    fn scroll_history(&mut self, delta: isize, now: Instant) {
        if self.history.scroll_by(delta) {
            self.bridge.on_primary_scroll(now);
        }
    }

    /// Reveal the navigator's selected record in the history pane
    fn jump_to_selected(&mut self) {
        let Some(record) = self.navigator.selected() else {
            return;
        };
        let task_id = record.task_id.clone();
        tracing::debug!("Jump requested for {}", task_id);

        let jump = self.bridge.jump_to_task(
            &task_id,
            record.batch_id.as_deref(),
            self.navigator.records(),
        );
        let tx = self.background_tx.clone();
        tokio::spawn(async move {
            let outcome = jump.await;
            let _ = tx.send(BackgroundEvent::Jumped { task_id, outcome });
        });
        self.state.status.set_message("Locating task...");
    }

    fn retry(&mut self) {
        let navigator = self.navigator.retry();
        let history = self.history.last_error().is_some();
        if history {
            self.spawn_history_load();
        }
        if navigator || history {
            self.state.status.clear_error();
            self.state.status.set_message("Retrying...");
        }
    }

    fn open_selected_media(&mut self) {
        let Some(url) = self
            .navigator
            .selected()
            .and_then(|record| self.client.media_url(record))
        else {
            self.state.status.set_error("Nothing to open for this task");
            return;
        };
        match open::that_detached(&url) {
            Ok(()) => self.state.status.set_message(format!("Opened {}", url)),
            Err(e) => {
                tracing::warn!("Failed to open {}: {}", url, e);
                self.state.status.set_error(format!("Failed to open media: {}", e));
            }
        }
    }
}
