//! Main event loop and background event processing

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use crossterm::event;
use tokio::time::Instant;

use crate::constants::{BUSY_POLL_MS, HISTORY_LOAD_AHEAD_ROWS, IDLE_POLL_MS};
use crate::input::{InputResult, handle_input};
use crate::probe::ProbeEvent;
use crate::sync::{JumpOutcome, ListCapability};

use super::render_thread::RenderThread;
use super::{App, BackgroundEvent};

impl App {
    pub(crate) async fn event_loop(&mut self, render_thread: &RenderThread) -> Result<()> {
        loop {
            // Fold in background results FIRST (non-blocking)
            if self.tick(Instant::now()) {
                self.dirty = true;
            }

            // Keep the spinner moving while anything is in flight
            if self.state.is_busy() {
                self.dirty = true;
            }

            // Render only when dirty (non-blocking - sends to render thread)
            if self.dirty {
                self.refresh_views();
                render_thread.render(self.state.clone());
                self.dirty = false;
            }

            // Adaptive timeout: faster while loading or waiting on the sync debounce
            let poll_timeout = if self.state.is_busy() || self.bridge.sync_pending() {
                BUSY_POLL_MS
            } else {
                IDLE_POLL_MS
            };
            if event::poll(Duration::from_millis(poll_timeout))? {
                let evt = event::read()?;
                // Any input event (including resize) requires re-render
                self.dirty = true;
                match handle_input(evt, &self.state, &self.bindings) {
                    InputResult::Quit => break,
                    InputResult::Action(action) => {
                        self.state.status.acknowledge_error();
                        self.handle_action(action, Instant::now());
                    }
                    InputResult::Wheel { column, down } => {
                        self.state.status.acknowledge_error();
                        self.handle_wheel(column, down, Instant::now());
                    }
                    InputResult::Resize { width, height } => self.resize(width, height),
                    InputResult::Continue => {}
                }
            }
        }

        Ok(())
    }

    /// Process everything that happened off the event loop.
    /// Returns true if a redraw is needed.
    pub(crate) fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.navigator.drain_events(now);
        changed |= self.navigator.tick(now);
        changed |= self.process_probe_events();
        changed |= self.process_background_events();
        changed |= self.sync_poll_status();

        if let Some(element) = self.bridge.sync_active(now) {
            changed |= self.navigator.set_active(&element);
        }
        changed |= self.history.expire_highlight(now);
        changed |= self.state.status.clear_error_if_expired(now);

        // Load more history if the viewport is near the bottom
        if self.history.near_bottom(HISTORY_LOAD_AHEAD_ROWS) {
            self.spawn_history_load();
        }

        let revision = self.history.revision();
        if revision != self.history_revision {
            self.history_revision = revision;
            changed = true;
        }
        changed
    }

    /// Copy the realized slices of both panes into the render snapshot
    pub(crate) fn refresh_views(&mut self) {
        self.state.navigator = self.navigator.view();
        self.state.history = self.history.view();
    }

    /// Handle status probe reports. Returns true if any were processed.
    pub(crate) fn process_probe_events(&mut self) -> bool {
        let mut had_events = false;
        while let Ok(event) = self.probe_rx.try_recv() {
            had_events = true;
            match event {
                ProbeEvent::Report {
                    running,
                    has_changes,
                    finished,
                    all_done,
                } => {
                    if has_changes {
                        tracing::info!("Job status changed ({} running), reloading", running);
                        self.navigator.refresh();
                        self.spawn_history_refresh();
                    }
                    if all_done {
                        self.state.status.set_message("All jobs finished");
                        #[cfg(feature = "notifications")]
                        crate::notification::notify_all_done(
                            &self.config,
                            self.client.kind(),
                            finished,
                        );
                    } else if finished > 0 {
                        self.state
                            .status
                            .set_message(format!("{} finished, {} running", finished, running));
                    } else if running > 0 {
                        self.state.status.set_message(format!("{} running", running));
                    }
                }
                ProbeEvent::Failed(error) => {
                    self.state
                        .status
                        .set_error(format!("Status check failed: {}", error));
                }
            }
        }
        had_events
    }

    /// Handle results of spawned jumps and loads. Returns true if any were processed.
    pub(crate) fn process_background_events(&mut self) -> bool {
        let mut had_events = false;
        while let Ok(event) = self.background_rx.try_recv() {
            had_events = true;
            match event {
                BackgroundEvent::Jumped { task_id, outcome } => match outcome {
                    JumpOutcome::Found {
                        element,
                        page_loaded,
                    } => {
                        self.navigator.set_active(&element);
                        match page_loaded {
                            Some(page) => self
                                .state
                                .status
                                .set_message(format!("Showing {} (page {})", task_id, page)),
                            None => self.state.status.set_message(format!("Showing {}", task_id)),
                        }
                    }
                    JumpOutcome::StillLoading => {
                        self.state
                            .status
                            .set_message(format!("{} is still loading, try again", task_id));
                    }
                    JumpOutcome::NotFound => {
                        self.state
                            .status
                            .set_error(format!("Task {} not found in history", task_id));
                    }
                },
                BackgroundEvent::HistoryFailed(error) => {
                    self.state
                        .status
                        .set_error(format!("Failed to load history: {}", error));
                }
            }
        }
        had_events
    }

    /// Load the next history page in the background (at most one at a time)
    pub(crate) fn spawn_history_load(&self) {
        let flag = Arc::clone(&self.history_loading);
        if flag.swap(true, Ordering::AcqRel) {
            return;
        }
        let history = self.history.clone();
        let tx = self.background_tx.clone();
        tokio::spawn(async move {
            let result = history.load_more().await;
            flag.store(false, Ordering::Release);
            if let Err(e) = result {
                let _ = tx.send(BackgroundEvent::HistoryFailed(e.to_string()));
            }
        });
    }

    pub(crate) fn spawn_history_refresh(&self) {
        let history = self.history.clone();
        let tx = self.background_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = history.refresh().await {
                let _ = tx.send(BackgroundEvent::HistoryFailed(e.to_string()));
            }
        });
    }
}
