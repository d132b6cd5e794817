//! Task server HTTP contract.
//!
//! This module is split into:
//! - `mod.rs` - Wire types, resource kinds and the error taxonomy
//! - `client.rs` - reqwest-based client for thumbnails, task lists, locate and posters

mod client;

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::ApiClient;

/// Which family of generation jobs to watch.
///
/// Each kind has its own task list and thumbnail endpoints on the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Image-to-video jobs
    #[default]
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "t2i")]
    TextToImage,
    #[serde(rename = "i2i")]
    ImageToImage,
    /// First/last keyframe to video
    #[serde(rename = "kf2v")]
    KeyframeVideo,
    #[serde(rename = "t2v")]
    TextToVideo,
    /// Reference clip to video
    #[serde(rename = "r2v")]
    ReferenceVideo,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        Self::Video,
        Self::TextToImage,
        Self::ImageToImage,
        Self::KeyframeVideo,
        Self::TextToVideo,
        Self::ReferenceVideo,
    ];

    /// Short name used in config files and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::TextToImage => "t2i",
            Self::ImageToImage => "i2i",
            Self::KeyframeVideo => "kf2v",
            Self::TextToVideo => "t2v",
            Self::ReferenceVideo => "r2v",
        }
    }

    /// Human readable label for the status bar
    pub fn label(self) -> &'static str {
        match self {
            Self::Video => "Image to video",
            Self::TextToImage => "Text to image",
            Self::ImageToImage => "Image to image",
            Self::KeyframeVideo => "Keyframes to video",
            Self::TextToVideo => "Text to video",
            Self::ReferenceVideo => "Reference to video",
        }
    }

    pub fn thumbnails_path(self) -> &'static str {
        match self {
            Self::Video => "/api/video-thumbnails",
            Self::TextToImage => "/api/t2i-thumbnails",
            Self::ImageToImage => "/api/i2i-thumbnails",
            Self::KeyframeVideo => "/api/kf2v-thumbnails",
            Self::TextToVideo => "/api/t2v-thumbnails",
            Self::ReferenceVideo => "/api/r2v-thumbnails",
        }
    }

    pub fn tasks_path(self) -> &'static str {
        match self {
            Self::Video => "/api/tasks",
            Self::TextToImage => "/api/t2i-tasks",
            Self::ImageToImage => "/api/i2i-tasks",
            Self::KeyframeVideo => "/api/kf2v-tasks",
            Self::TextToVideo => "/api/t2v-tasks",
            Self::ReferenceVideo => "/api/r2v-tasks",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown resource kind '{}'", s))
    }
}

/// Errors talking to the task server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("server rejected request: {0}")]
    Rejected(String),
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
}

/// One navigator entry. Batched submissions collapse into a single record
/// carrying a completed/total counter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThumbnailRecord {
    pub task_id: String,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub batch_completed: Option<u32>,
    #[serde(default)]
    pub batch_total: Option<u32>,
    #[serde(default, rename = "type")]
    pub media: Option<MediaType>,
    #[serde(default)]
    pub video_path: Option<String>,
}

impl ThumbnailRecord {
    /// Whether this record stands for a multi-task batch
    pub fn is_batch(&self) -> bool {
        self.batch_id.is_some() && self.batch_total.unwrap_or(1) > 1
    }

    /// "completed/total" counter for batch records
    pub fn batch_counter(&self) -> Option<String> {
        if !self.is_batch() {
            return None;
        }
        Some(format!(
            "{}/{}",
            self.batch_completed.unwrap_or(0),
            self.batch_total.unwrap_or(1)
        ))
    }
}

/// Response of `GET /api/<kind>-thumbnails`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThumbnailPage {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailRecord>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub total_tasks: usize,
}

/// Job lifecycle as reported by the generation backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Pending and running jobs still need polling
    pub fn is_running(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "done",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }
}

/// One row of `GET /api/<kind>-tasks`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    #[serde(default)]
    pub task_status: TaskStatus,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub batch_index: Option<u32>,
    #[serde(default)]
    pub batch_total: Option<u32>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Response of `GET /api/<kind>-tasks`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPage {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskSummary>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub has_more: bool,
}

/// Where the server currently keeps a task in its paginated list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskLocation {
    pub page: u32,
    #[serde(default)]
    pub index_in_page: Option<u32>,
    #[serde(default)]
    pub batch_id: Option<String>,
}

/// Downloaded poster image
#[derive(Debug, Clone)]
pub struct Poster {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl Poster {
    /// Short description for the navigator, e.g. "jpeg 42 KB"
    pub fn describe(&self) -> String {
        let format = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split('/').nth(1))
            .unwrap_or("image");
        let kb = self.bytes.len().div_ceil(1024);
        format!("{} {} KB", format, kb)
    }
}
