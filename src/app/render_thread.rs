//! Render thread.
//!
//! Drawing both panes happens off the tokio runtime so a slow terminal cannot
//! delay scheduler ticks, page results or poster events. The event loop sends
//! `AppState` snapshots; at most one waits in the channel and the rest are
//! skipped, since the next dirty tick carries newer job status anyway.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use super::state::AppState;

/// Frames slower than this are logged; usually a remote or overloaded terminal
const SLOW_FRAME: Duration = Duration::from_millis(100);

pub enum RenderCommand {
    Render(Box<AppState>),
    Shutdown,
}

/// Raw mode, alternate screen and mouse capture for the wheel scrolling.
/// Dropping it restores the terminal, also when a draw panics.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            disable_raw_mode().ok();
            return Err(e);
        }
        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen).ok();
                disable_raw_mode().ok();
                Err(e)
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        disable_raw_mode().ok();
        execute!(
            self.terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        )
        .ok();
        self.terminal.show_cursor().ok();
    }
}

pub struct RenderThread {
    cmd_tx: SyncSender<RenderCommand>,
    handle: Option<JoinHandle<()>>,
    /// Snapshots dropped because a frame was still being drawn
    skipped: Arc<AtomicU64>,
}

impl RenderThread {
    /// Spawn the thread. It sets up the terminal itself and restores it on exit.
    pub fn spawn() -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::sync_channel::<RenderCommand>(1);
        let handle = thread::Builder::new()
            .name("genwatch-render".into())
            .spawn(move || run(cmd_rx))?;

        Ok(Self {
            cmd_tx,
            handle: Some(handle),
            skipped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Queue a snapshot without blocking the event loop
    pub fn render(&self, state: AppState) {
        match self.cmd_tx.try_send(RenderCommand::Render(Box::new(state))) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Render thread busy, skipping frame");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::error!("Render thread disconnected");
            }
        }
    }

    /// Stop drawing, restore the terminal and wait for the thread
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(RenderCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
        tracing::debug!(
            "Render thread stopped ({} frames skipped)",
            self.skipped.load(Ordering::Relaxed)
        );
    }
}

fn run(cmd_rx: Receiver<RenderCommand>) {
    let mut guard = match TerminalGuard::enter() {
        Ok(guard) => guard,
        Err(e) => {
            tracing::error!("Failed to set up terminal: {}", e);
            return;
        }
    };

    while let Ok(cmd) = cmd_rx.recv() {
        let RenderCommand::Render(state) = cmd else {
            break;
        };
        let started = Instant::now();
        if let Err(e) = guard.terminal.draw(|f| crate::ui::render(f, &state)) {
            tracing::error!("Render error: {}", e);
        }
        let elapsed = started.elapsed();
        if elapsed > SLOW_FRAME {
            tracing::debug!("Slow frame: {:?}", elapsed);
        }
    }
}
