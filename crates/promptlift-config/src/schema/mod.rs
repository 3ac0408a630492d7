//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod platform;

pub use platform::*;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub pending: PendingConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extra or overriding platform profiles.
    #[serde(default)]
    pub platforms: Vec<PlatformEntry>,
}

/// Timing and geometry knobs for the page engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard timeout for a remote rewrite.
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,

    /// Upper bound on a whole streamed rewrite.
    #[serde(default = "default_stream_deadline_ms")]
    pub stream_deadline_ms: u64,

    /// Coalescing window for overlay refresh signals.
    #[serde(default = "default_refresh_debounce_ms")]
    pub refresh_debounce_ms: u64,

    /// Minimum spacing between overlay refreshes that are not layout changes.
    #[serde(default = "default_refresh_min_interval_ms")]
    pub refresh_min_interval_ms: u64,

    /// How long resolution keeps retrying before waiting for a relevant mutation.
    #[serde(default = "default_resolution_give_up_ms")]
    pub resolution_give_up_ms: u64,

    /// Window in which identical triggers are suppressed.
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,

    #[serde(default = "default_notice_display_ms")]
    pub notice_display_ms: u64,

    /// Delay before clicking a platform's send control.
    #[serde(default = "default_send_settle_ms")]
    pub send_settle_ms: u64,

    #[serde(default = "default_overlay_padding")]
    pub overlay_padding: f64,

    #[serde(default = "default_control_size")]
    pub control_size: f64,

    #[serde(default = "default_stream_max_retries")]
    pub stream_max_retries: u32,

    #[serde(default = "default_cursor_blink_ms")]
    pub cursor_blink_ms: u64,

    #[serde(default = "default_emphasis_ms")]
    pub emphasis_ms: u64,
}

impl EngineConfig {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn stream_deadline(&self) -> Duration {
        Duration::from_millis(self.stream_deadline_ms)
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn refresh_min_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_min_interval_ms)
    }

    pub fn resolution_give_up(&self) -> Duration {
        Duration::from_millis(self.resolution_give_up_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn notice_display(&self) -> Duration {
        Duration::from_millis(self.notice_display_ms)
    }

    pub fn send_settle(&self) -> Duration {
        Duration::from_millis(self.send_settle_ms)
    }

    pub fn cursor_blink(&self) -> Duration {
        Duration::from_millis(self.cursor_blink_ms)
    }

    pub fn emphasis(&self) -> Duration {
        Duration::from_millis(self.emphasis_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            remote_timeout_ms: default_remote_timeout_ms(),
            stream_deadline_ms: default_stream_deadline_ms(),
            refresh_debounce_ms: default_refresh_debounce_ms(),
            refresh_min_interval_ms: default_refresh_min_interval_ms(),
            resolution_give_up_ms: default_resolution_give_up_ms(),
            dedup_window_ms: default_dedup_window_ms(),
            notice_display_ms: default_notice_display_ms(),
            send_settle_ms: default_send_settle_ms(),
            overlay_padding: default_overlay_padding(),
            control_size: default_control_size(),
            stream_max_retries: default_stream_max_retries(),
            cursor_blink_ms: default_cursor_blink_ms(),
            emphasis_ms: default_emphasis_ms(),
        }
    }
}

fn default_remote_timeout_ms() -> u64 {
    12_000
}

fn default_stream_deadline_ms() -> u64 {
    60_000
}

fn default_refresh_debounce_ms() -> u64 {
    100
}

fn default_refresh_min_interval_ms() -> u64 {
    2_000
}

fn default_resolution_give_up_ms() -> u64 {
    1_000
}

fn default_dedup_window_ms() -> u64 {
    2_000
}

fn default_notice_display_ms() -> u64 {
    5_000
}

fn default_send_settle_ms() -> u64 {
    500
}

fn default_overlay_padding() -> f64 {
    8.0
}

fn default_control_size() -> f64 {
    32.0
}

fn default_stream_max_retries() -> u32 {
    3
}

fn default_cursor_blink_ms() -> u64 {
    530
}

fn default_emphasis_ms() -> u64 {
    600
}

/// Cross-page pending insertion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConfig {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl PendingConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

fn default_ttl_seconds() -> u64 {
    300
}

/// Remote rewriting service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_style")]
    pub default_style: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            default_style: default_style(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8787/v1/enhance".to_string()
}

fn default_style() -> String {
    "balanced".to_string()
}

/// Durable storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".promptlift").join("storage.json"))
        .unwrap_or_else(|| PathBuf::from("/tmp/promptlift/storage.json"))
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for rolling log files; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
