//! Application core - owns both panes, the bridge and the scheduler

mod actions;
mod event_loop;
pub mod render_thread;
pub mod state;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use render_thread::RenderThread;

use crate::api::ApiClient;
use crate::config::Config;
use crate::constants::PROBE_PAGE_SIZE;
use crate::history::TaskHistory;
use crate::input::{Action, KeyBindings};
use crate::navigator::Navigator;
use crate::probe::{ProbeEvent, StatusProbe};
use crate::scheduler::{SchedulerHandle, SchedulerState, spawn_scheduler};
use crate::sync::{JumpOutcome, ScrollSyncBridge};
use state::{AppState, PollStatus};

/// Results of work spawned off the event loop
#[derive(Debug)]
pub enum BackgroundEvent {
    Jumped {
        task_id: String,
        outcome: JumpOutcome,
    },
    HistoryFailed(String),
}

/// Actions shown in the bottom hint bar, in order
const HINT_ACTIONS: &[Action] = &[
    Action::Jump,
    Action::SwitchFocus,
    Action::Refresh,
    Action::PollNow,
    Action::OpenMedia,
    Action::Help,
    Action::Quit,
];

pub struct App {
    pub(crate) config: Config,
    pub(crate) client: ApiClient,
    pub(crate) state: AppState,
    pub(crate) bindings: KeyBindings,
    pub(crate) navigator: Navigator<ApiClient, ApiClient>,
    pub(crate) history: TaskHistory,
    pub(crate) bridge: ScrollSyncBridge<TaskHistory, ApiClient>,
    pub(crate) scheduler: SchedulerHandle,
    pub(crate) scheduler_rx: watch::Receiver<SchedulerState>,
    pub(crate) probe_rx: mpsc::UnboundedReceiver<ProbeEvent>,
    pub(crate) background_tx: mpsc::UnboundedSender<BackgroundEvent>,
    pub(crate) background_rx: mpsc::UnboundedReceiver<BackgroundEvent>,
    /// Set while a spawned history page load is in flight
    pub(crate) history_loading: Arc<AtomicBool>,
    /// Last history revision that was rendered
    pub(crate) history_revision: u64,
    /// Rows of one pane's content area
    pub(crate) pane_rows: usize,
    pub(crate) terminal_width: u16,
    /// Dirty flag: when true, UI needs re-render. Skips renders when nothing changed.
    pub(crate) dirty: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = ApiClient::new(
            config.server.base_url.clone(),
            config.server.kind,
            config.request_timeout(),
        )?;

        let bindings = KeyBindings::new(&config.ui.keybinding_mode);
        let hints = HINT_ACTIONS
            .iter()
            .filter_map(|action| {
                let key = bindings.key_for(*action)?;
                Some((key, hint_label(*action)))
            })
            .collect();
        let state = AppState::new(
            config.server.kind,
            config.server.base_url.clone(),
            bindings.all_bindings(),
            hints,
        );

        let navigator = Navigator::new(client.clone(), client.clone(), config.navigator());
        let history = TaskHistory::new(client.clone(), config.history.page_size);
        let bridge = ScrollSyncBridge::new(history.clone(), client.clone(), config.bridge());

        let (probe_tx, probe_rx) = mpsc::unbounded_channel();
        let probe = Arc::new(StatusProbe::new(client.clone(), PROBE_PAGE_SIZE, probe_tx));
        let scheduler = spawn_scheduler(config.scheduler(), probe.into_poll_fn());
        let scheduler_rx = scheduler.subscribe();

        let (background_tx, background_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            client,
            state,
            bindings,
            navigator,
            history,
            bridge,
            scheduler,
            scheduler_rx,
            probe_rx,
            background_tx,
            background_rx,
            history_loading: Arc::new(AtomicBool::new(false)),
            history_revision: 0,
            pane_rows: 0,
            terminal_width: 0,
            dirty: true, // Start dirty for initial render
        })
    }

    /// Kick off the first page of both panes and start polling
    pub(crate) fn start(&mut self) {
        self.navigator.init();
        self.spawn_history_load();
        self.scheduler.start();
        self.state.status.set_message("Loading...");
    }

    pub async fn run(&mut self) -> Result<()> {
        let (width, height) = crossterm::terminal::size()?;
        self.resize(width, height);

        // Spawn background render thread (owns terminal setup/teardown)
        let render_thread = RenderThread::spawn()?;

        self.start();
        let result = self.event_loop(&render_thread).await;

        // Shutdown render thread (handles terminal cleanup)
        render_thread.shutdown();
        self.scheduler.shutdown();

        result
    }

    /// Recompute pane sizes after a terminal resize
    pub(crate) fn resize(&mut self, width: u16, height: u16) {
        self.terminal_width = width;
        let rows = crate::ui::pane_rows(height);
        if rows == self.pane_rows {
            return;
        }
        self.pane_rows = rows;
        self.navigator.set_container_height(rows, Instant::now());
        self.history.set_viewport_height(rows);
    }

    /// Copy scheduler state into the render snapshot
    pub(crate) fn sync_poll_status(&mut self) -> bool {
        let poll = PollStatus::from(&*self.scheduler_rx.borrow_and_update());
        if poll == self.state.poll {
            return false;
        }
        self.state.poll = poll;
        true
    }
}

fn hint_label(action: Action) -> &'static str {
    match action {
        Action::Jump => "jump",
        Action::SwitchFocus => "pane",
        Action::Refresh => "refresh",
        Action::PollNow => "poll",
        Action::OpenMedia => "open",
        Action::Help => "help",
        Action::Quit => "quit",
        _ => "",
    }
}
