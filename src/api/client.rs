//! Task server client

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Client, IntoUrl, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{
    ApiError, Poster, ResourceKind, TaskLocation, TaskPage, ThumbnailPage, ThumbnailRecord,
};
use crate::constants::POSTER_CACHE_CAPACITY;

#[derive(Deserialize)]
struct LocateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    index_in_page: Option<u32>,
    #[serde(default)]
    batch_id: Option<String>,
}

/// HTTP client for one resource kind on one task server.
///
/// Cheap to clone; clones share the connection pool and the poster cache.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    kind: ResourceKind,
    posters: Cache<String, Arc<Poster>>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        kind: ResourceKind,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            kind,
            posters: Cache::new(POSTER_CACHE_CAPACITY),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Resolve a server-relative path; absolute URLs pass through unchanged
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: impl IntoUrl,
        query: &[(&str, u32)],
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fetch one page of the thumbnail list
    pub async fn fetch_thumbnails(&self, page: u32, limit: u32) -> Result<ThumbnailPage, ApiError> {
        let body: ThumbnailPage = self
            .get_json(
                self.resolve(self.kind.thumbnails_path()),
                &[("page", page), ("limit", limit)],
            )
            .await?;
        if !body.success {
            return Err(ApiError::Rejected(
                body.message.unwrap_or_else(|| "thumbnail list unavailable".into()),
            ));
        }
        tracing::debug!(
            "Fetched {} thumbnails for {} page {} (has_more={})",
            body.thumbnails.len(),
            self.kind,
            page,
            body.has_more
        );
        Ok(body)
    }

    /// Fetch one page of the detailed task list
    pub async fn fetch_tasks(&self, page: u32, limit: u32) -> Result<TaskPage, ApiError> {
        let body: TaskPage = self
            .get_json(
                self.resolve(self.kind.tasks_path()),
                &[("page", page), ("limit", limit)],
            )
            .await?;
        if !body.success {
            return Err(ApiError::Rejected(
                body.message.unwrap_or_else(|| "task list unavailable".into()),
            ));
        }
        Ok(body)
    }

    /// Ask the server which page currently holds `task_id`.
    ///
    /// `Ok(None)` means the server answered but does not know the task.
    pub async fn locate(&self, task_id: &str) -> Result<Option<TaskLocation>, ApiError> {
        let mut url = Url::parse(&self.resolve("/api/task-locate"))
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .push(task_id);
        let body: LocateResponse = self.get_json(url, &[]).await?;
        match (body.success, body.page) {
            (true, Some(page)) => Ok(Some(TaskLocation {
                page,
                index_in_page: body.index_in_page,
                batch_id: body.batch_id,
            })),
            _ => Ok(None),
        }
    }

    /// Download a poster image, served from the shared cache when possible
    pub async fn fetch_poster(&self, url: &str) -> Result<Arc<Poster>, ApiError> {
        let url = self.resolve(url);
        if let Some(poster) = self.posters.get(&url).await {
            return Ok(poster);
        }

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::Decode(format!("empty poster body from {}", url)));
        }

        let poster = Arc::new(Poster {
            bytes,
            content_type,
        });
        self.posters.insert(url, Arc::clone(&poster)).await;
        Ok(poster)
    }

    /// Browser-openable URL for a record (video file if known, poster otherwise)
    pub fn media_url(&self, record: &ThumbnailRecord) -> Option<String> {
        record
            .video_path
            .as_deref()
            .or(record.poster_url.as_deref())
            .map(|path| self.resolve(path))
    }
}
