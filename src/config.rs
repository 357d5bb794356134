use serde::Deserialize;
use std::time::Duration;

/// One hundred years.
pub const MAX_STALE_SESSION_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// `plugins > drag-as-window` section of `tauri.conf.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Name prefix of the temp files that carry dragged data between windows
    pub payload_file_prefix: String,
    pub payload_cleanup_delay_ms: u64,
    pub skip_animation_on_cancel: bool,
    /// Pending sessions older than this are released without an outcome
    pub stale_session_ttl_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            payload_file_prefix: "tauri-drag-payload-".to_string(),
            payload_cleanup_delay_ms: 3_000,
            skip_animation_on_cancel: true,
            stale_session_ttl_secs: None,
        }
    }
}

impl Config {
    pub fn payload_cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.payload_cleanup_delay_ms)
    }

    /// Values past `MAX_STALE_SESSION_TTL_SECS` are clamped to it.
    pub fn stale_session_ttl(&self) -> Option<chrono::Duration> {
        self.stale_session_ttl_secs
            .map(|secs| secs.min(MAX_STALE_SESSION_TTL_SECS) as i64)
            .and_then(chrono::Duration::try_seconds)
    }
}
