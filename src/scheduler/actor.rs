//! Scheduler actor: owns the timer and runs the poll function

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};

use super::{PollReport, SchedulerConfig, SchedulerPhase, SchedulerState};

/// The caller's status check. Each invocation performs one poll and reports
/// what it saw; the scheduler folds the report back into its own state.
pub type PollFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<PollReport>> + Send + Sync>;

#[derive(Debug)]
enum SchedulerCommand {
    Start,
    Stop,
    UpdateTaskStatus { running: usize, has_changes: bool },
    PollNow,
    Shutdown,
}

/// Handle for controlling a running scheduler.
///
/// All methods are non-blocking; commands are applied in order by the actor.
#[derive(Clone)]
pub struct SchedulerHandle {
    cmd_tx: mpsc::UnboundedSender<SchedulerCommand>,
    state_rx: watch::Receiver<SchedulerState>,
}

impl SchedulerHandle {
    /// Begin polling. No-op if already polling.
    pub fn start(&self) {
        self.send(SchedulerCommand::Start);
    }

    /// Stop polling and cancel the pending timer. A poll already in flight
    /// completes but is not re-armed.
    pub fn stop(&self) {
        self.send(SchedulerCommand::Stop);
    }

    /// Report an externally observed status
    #[allow(dead_code)]
    pub fn update_task_status(&self, running: usize, has_changes: bool) {
        self.send(SchedulerCommand::UpdateTaskStatus {
            running,
            has_changes,
        });
    }

    /// Cancel the pending timer and poll right away
    pub fn poll_now(&self) {
        self.send(SchedulerCommand::PollNow);
    }

    pub fn shutdown(&self) {
        self.send(SchedulerCommand::Shutdown);
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state_rx.clone()
    }

    #[cfg(test)]
    fn state(&self) -> SchedulerState {
        self.state_rx.borrow().clone()
    }

    fn send(&self, cmd: SchedulerCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::warn!("Scheduler: actor has stopped, command dropped");
        }
    }
}

/// Spawn the scheduler task. Polling does not begin until `start()`.
pub fn spawn_scheduler(config: SchedulerConfig, poll_fn: PollFn) -> SchedulerHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let state = SchedulerState::new(config);
    let (state_tx, state_rx) = watch::channel(state.clone());

    let actor = SchedulerActor {
        state,
        poll_fn,
        deadline: None,
        state_tx,
    };
    tokio::spawn(actor.run(cmd_rx));

    SchedulerHandle { cmd_tx, state_rx }
}

struct SchedulerActor {
    state: SchedulerState,
    poll_fn: PollFn,
    deadline: Option<Instant>,
    state_tx: watch::Sender<SchedulerState>,
}

impl SchedulerActor {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<SchedulerCommand>) {
        loop {
            let deadline = self.deadline;
            let timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    None | Some(SchedulerCommand::Shutdown) => break,
                    Some(cmd) => self.handle(cmd).await,
                },
                _ = timer => {
                    self.deadline = None;
                    self.execute().await;
                }
            }
        }

        tracing::debug!("Scheduler: shut down after {} polls", self.state.polls);
    }

    async fn handle(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::Start => {
                if self.state.is_polling {
                    return;
                }
                self.state.is_polling = true;
                self.arm();
            }
            SchedulerCommand::Stop => {
                self.state.is_polling = false;
                self.deadline = None;
                self.state.phase = SchedulerPhase::Idle;
                self.publish();
            }
            SchedulerCommand::UpdateTaskStatus {
                running,
                has_changes,
            } => {
                let finished = self
                    .state
                    .update_task_status(running, has_changes, Instant::now());
                self.publish();
                if finished && self.state.is_polling {
                    tracing::debug!("Scheduler: all jobs finished, polling immediately");
                    self.deadline = None;
                    self.execute().await;
                }
            }
            SchedulerCommand::PollNow => {
                self.deadline = None;
                self.execute().await;
            }
            SchedulerCommand::Shutdown => {}
        }
    }

    /// Run the poll function, repeating immediately while each report shows
    /// the running count dropping to zero, then re-arm if still polling.
    async fn execute(&mut self) {
        loop {
            self.state.phase = SchedulerPhase::Executing;
            self.state.polls += 1;
            self.publish();

            let finished = match (self.poll_fn)().await {
                Ok(report) => {
                    self.state
                        .update_task_status(report.running, report.has_changes, Instant::now())
                }
                Err(e) => {
                    tracing::warn!("Scheduler: poll failed: {:#}", e);
                    false
                }
            };

            if !(finished && self.state.is_polling) {
                break;
            }
            tracing::debug!("Scheduler: all jobs finished, polling immediately");
        }

        if self.state.is_polling {
            self.arm();
        } else {
            self.state.phase = SchedulerPhase::Idle;
            self.publish();
        }
    }

    fn arm(&mut self) {
        let interval = self.state.next_interval();
        self.deadline = Some(Instant::now() + interval);
        self.state.phase = SchedulerPhase::Scheduled;
        tracing::trace!("Scheduler: next poll in {:?}", interval);
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}
