//! Status probe polled by the scheduler
//!
//! Each check fetches the newest page of tasks, counts the ones still
//! running and compares statuses against the previous check.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use futures::FutureExt;
use tokio::sync::mpsc;

use crate::api::{ApiClient, TaskStatus};
use crate::scheduler::{PollFn, PollReport};

/// What the app hears about each check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    Report {
        running: usize,
        has_changes: bool,
        /// Jobs that were running last time and no longer are
        finished: usize,
        /// The running count just dropped to zero
        all_done: bool,
    },
    Failed(String),
}

pub struct StatusProbe {
    client: ApiClient,
    page_size: u32,
    previous: Mutex<Option<Vec<(String, TaskStatus)>>>,
    events: mpsc::UnboundedSender<ProbeEvent>,
}

impl StatusProbe {
    pub fn new(
        client: ApiClient,
        page_size: u32,
        events: mpsc::UnboundedSender<ProbeEvent>,
    ) -> Self {
        Self {
            client,
            page_size,
            previous: Mutex::new(None),
            events,
        }
    }

    pub async fn check(&self) -> anyhow::Result<PollReport> {
        let page = match self.client.fetch_tasks(1, self.page_size).await {
            Ok(page) => page,
            Err(e) => {
                let _ = self.events.send(ProbeEvent::Failed(e.to_string()));
                return Err(e).context("Failed to fetch task status");
            }
        };

        let snapshot: Vec<(String, TaskStatus)> = page
            .tasks
            .into_iter()
            .map(|task| (task.task_id, task.task_status))
            .collect();
        let running = snapshot
            .iter()
            .filter(|(_, status)| status.is_running())
            .count();

        let previous = self
            .previous
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(snapshot.clone());

        let (has_changes, finished, previously_running) = match previous {
            None => (false, 0, 0),
            Some(previous) => {
                let finished = previous
                    .iter()
                    .filter(|(_, status)| status.is_running())
                    .filter(|(id, _)| {
                        snapshot
                            .iter()
                            .any(|(now_id, now)| now_id == id && !now.is_running())
                    })
                    .count();
                let previously_running = previous
                    .iter()
                    .filter(|(_, status)| status.is_running())
                    .count();
                (previous != snapshot, finished, previously_running)
            }
        };

        tracing::debug!(
            "Probe: {} running, changes={}, finished={}",
            running,
            has_changes,
            finished
        );
        let _ = self.events.send(ProbeEvent::Report {
            running,
            has_changes,
            finished,
            all_done: previously_running > 0 && running == 0,
        });

        Ok(PollReport {
            running,
            has_changes,
        })
    }

    /// Wrap the probe as the scheduler's poll function
    pub fn into_poll_fn(self: Arc<Self>) -> PollFn {
        Arc::new(move || {
            let probe = Arc::clone(&self);
            async move { probe.check().await }.boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResourceKind;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tasks_body(statuses: &[(&str, &str)]) -> serde_json::Value {
        json!({
            "success": true,
            "tasks": statuses
                .iter()
                .map(|(id, status)| json!({"task_id": id, "task_status": status}))
                .collect::<Vec<_>>(),
            "has_more": false
        })
    }

    async fn respond_once(server: &MockServer, statuses: &[(&str, &str)]) {
        Mock::given(method("GET"))
            .and(path("/api/t2v-tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tasks_body(statuses)))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    fn probe_for(server: &MockServer) -> (Arc<StatusProbe>, mpsc::UnboundedReceiver<ProbeEvent>) {
        let client =
            ApiClient::new(server.uri(), ResourceKind::TextToVideo, Duration::from_secs(5))
                .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(StatusProbe::new(client, 20, tx)), rx)
    }

    #[tokio::test]
    async fn test_reports_running_count_and_changes() {
        let server = MockServer::start().await;
        respond_once(&server, &[("a", "RUNNING"), ("b", "PENDING"), ("c", "SUCCEEDED")]).await;
        respond_once(&server, &[("a", "RUNNING"), ("b", "PENDING"), ("c", "SUCCEEDED")]).await;
        respond_once(&server, &[("a", "SUCCEEDED"), ("b", "RUNNING"), ("c", "SUCCEEDED")]).await;
        let (probe, mut events) = probe_for(&server);

        let first = probe.check().await.unwrap();
        assert_eq!(first.running, 2);
        assert!(!first.has_changes);

        let second = probe.check().await.unwrap();
        assert!(!second.has_changes);

        let third = probe.check().await.unwrap();
        assert_eq!(third.running, 1);
        assert!(third.has_changes);

        events.recv().await.unwrap();
        events.recv().await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            ProbeEvent::Report {
                running: 1,
                has_changes: true,
                finished: 1,
                all_done: false
            }
        );
    }

    #[tokio::test]
    async fn test_all_done_when_last_job_finishes() {
        let server = MockServer::start().await;
        respond_once(&server, &[("a", "RUNNING")]).await;
        respond_once(&server, &[("a", "FAILED")]).await;
        let (probe, mut events) = probe_for(&server);
        let poll = Arc::clone(&probe).into_poll_fn();

        poll().await.unwrap();
        let report = poll().await.unwrap();
        assert_eq!(report.running, 0);

        events.recv().await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            ProbeEvent::Report { all_done: true, finished: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/t2v-tasks"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let (probe, mut events) = probe_for(&server);

        assert!(probe.check().await.is_err());
        assert!(matches!(events.recv().await.unwrap(), ProbeEvent::Failed(_)));
    }
}
