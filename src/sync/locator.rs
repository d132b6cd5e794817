use std::future::Future;

use crate::api::{ApiClient, ApiError, TaskLocation};

/// Resolves which server page currently holds a task
pub trait TaskLocator: Clone + Send + Sync + 'static {
    /// `Ok(None)` when the server does not know the task
    fn locate_task(
        &self,
        task_id: &str,
    ) -> impl Future<Output = Result<Option<TaskLocation>, ApiError>> + Send;
}

impl TaskLocator for ApiClient {
    fn locate_task(
        &self,
        task_id: &str,
    ) -> impl Future<Output = Result<Option<TaskLocation>, ApiError>> + Send {
        self.locate(task_id)
    }
}
