use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::ResourceKind;
use crate::constants::{
    HIGHLIGHT_MS, HISTORY_PAGE_SIZE, IMAGE_STAGGER_MS, MAX_CONCURRENT_IMAGE_LOADS,
    MAX_FALLBACK_ATTEMPTS, SYNC_DEBOUNCE_MS, THUMBNAIL_PAGE_SIZE,
};
use crate::navigator::NavigatorConfig;
use crate::scheduler::SchedulerConfig;
use crate::sync::BridgeConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub navigator: NavigatorSettings,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub bridge: BridgeSettings,
    #[serde(default)]
    pub ui: UiConfig,
    /// Desktop notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Which job family to watch
    #[serde(default)]
    pub kind: ResourceKind,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            kind: ResourceKind::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Adaptive polling intervals, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub default_interval_ms: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Used while nothing is running
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: default_interval_ms(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorSettings {
    /// Rows per navigator entry
    #[serde(default = "default_item_height")]
    pub item_height: usize,
    /// Extra entries realized above and below the viewport
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_thumbnail_page_size")]
    pub page_size: u32,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            item_height: default_item_height(),
            buffer_size: default_buffer_size(),
            page_size: default_thumbnail_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_page_size")]
    pub page_size: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: default_history_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            stagger_ms: default_stagger_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    #[serde(default = "default_sync_debounce_ms")]
    pub sync_debounce_ms: u64,
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
    /// Upper bound on pages loaded while searching for a jump target
    #[serde(default = "default_max_fallback_attempts")]
    pub max_fallback_attempts: u32,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            sync_debounce_ms: default_sync_debounce_ms(),
            highlight_ms: default_highlight_ms(),
            max_fallback_attempts: default_max_fallback_attempts(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub keybinding_mode: KeybindingMode,
    #[serde(default)]
    pub theme: ThemeVariant,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeybindingMode {
    #[default]
    Vim,
    Arrows,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeVariant {
    #[default]
    Modern,
    TokyoNight,
    Dark,
    HighContrast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Notify when the last running job finishes
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_interval_ms() -> u64 {
    3000
}

fn default_min_interval_ms() -> u64 {
    2000
}

fn default_max_interval_ms() -> u64 {
    30_000
}

fn default_idle_interval_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_item_height() -> usize {
    3
}

fn default_buffer_size() -> usize {
    5
}

fn default_thumbnail_page_size() -> u32 {
    THUMBNAIL_PAGE_SIZE
}

fn default_history_page_size() -> u32 {
    HISTORY_PAGE_SIZE
}

fn default_max_concurrent() -> usize {
    MAX_CONCURRENT_IMAGE_LOADS
}

fn default_stagger_ms() -> u64 {
    IMAGE_STAGGER_MS
}

fn default_sync_debounce_ms() -> u64 {
    SYNC_DEBOUNCE_MS
}

fn default_highlight_ms() -> u64 {
    HIGHLIGHT_MS
}

fn default_max_fallback_attempts() -> u32 {
    MAX_FALLBACK_ATTEMPTS
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("genwatch");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the config file, falling back to defaults when there is none
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let dir = Self::config_dir()?;

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(Self::config_dir()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler()
            .validate()
            .context("Invalid [polling] section")?;
        if self.server.base_url.trim().is_empty() {
            anyhow::bail!("[server] base_url must not be empty");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs.max(1))
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        let polling = &self.polling;
        SchedulerConfig {
            default_interval: Duration::from_millis(polling.default_interval_ms),
            min_interval: Duration::from_millis(polling.min_interval_ms),
            max_interval: Duration::from_millis(polling.max_interval_ms),
            idle_interval: Duration::from_millis(polling.idle_interval_ms),
            backoff_multiplier: polling.backoff_multiplier,
        }
    }

    pub fn navigator(&self) -> NavigatorConfig {
        NavigatorConfig {
            item_height: self.navigator.item_height,
            buffer_size: self.navigator.buffer_size,
            page_size: self.navigator.page_size,
            max_concurrent_images: self.images.max_concurrent,
            image_stagger: Duration::from_millis(self.images.stagger_ms),
        }
    }

    pub fn bridge(&self) -> BridgeConfig {
        BridgeConfig {
            sync_debounce: Duration::from_millis(self.bridge.sync_debounce_ms),
            highlight: Duration::from_millis(self.bridge.highlight_ms),
            max_fallback_attempts: self.bridge.max_fallback_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.server.kind, ResourceKind::Video);
        assert_eq!(config.navigator.item_height, 3);
        assert_eq!(config.navigator.page_size, 50);
        assert_eq!(config.history.page_size, 10);
        assert_eq!(config.ui.keybinding_mode, KeybindingMode::Vim);
        assert!(config.notifications.enabled);
        assert_eq!(config.scheduler(), SchedulerConfig::default());
        assert_eq!(config.bridge(), BridgeConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
            [server]
            base_url = "http://gpu-box:8080/"
            kind = "t2i"

            [polling]
            backoff_multiplier = 2.0

            [images]
            max_concurrent = 2

            [ui]
            keybinding_mode = "arrows"
            theme = "tokyo-night"

            [notifications]
            enabled = false
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.kind, ResourceKind::TextToImage);
        assert_eq!(config.server.request_timeout_secs, 15);
        assert_eq!(config.polling.backoff_multiplier, 2.0);
        assert_eq!(config.polling.default_interval_ms, 3000);
        assert_eq!(config.navigator().max_concurrent_images, 2);
        assert_eq!(config.navigator().image_stagger, Duration::from_millis(25));
        assert_eq!(config.ui.keybinding_mode, KeybindingMode::Arrows);
        assert_eq!(config.ui.theme, ThemeVariant::TokyoNight);
        assert!(!config.notifications.enabled);
    }

    #[test]
    fn test_validate_rejects_inverted_intervals() {
        let toml = r#"
            [polling]
            min_interval_ms = 5000
            default_interval_ms = 3000
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let toml = r#"
            [server]
            kind = "audio"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_defaults_survive_serialization() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.scheduler(), SchedulerConfig::default());
        assert_eq!(config.server.kind, ResourceKind::Video);
    }
}
