use std::sync::Arc;

use crate::config::Config;
use crate::registry::CallbackRegistry;
use crate::session::SessionTable;

/// Plugin state managed by the Tauri app.
pub struct DragAsWindowState {
    pub config: Arc<Config>,
    pub registry: Arc<CallbackRegistry>,
    pub sessions: Arc<SessionTable>,
}

impl Default for DragAsWindowState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl DragAsWindowState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            registry: CallbackRegistry::global(),
            sessions: Arc::new(SessionTable::new()),
        }
    }

    /// Releases everything a closing window still has pending, without dispatch.
    pub fn teardown_window(&self, label: &str) {
        let sessions = self.sessions.evict_owner(label, &self.registry);
        let entries = self.registry.release_owner(label);
        if sessions + entries > 0 {
            log::debug!(
                "Window {} torn down: {} sessions, {} callbacks released",
                label,
                sessions,
                entries
            );
        }
    }

    pub fn shutdown(&self) {
        self.sessions.clear();
        let released = self.registry.clear();
        log::debug!("Drag plugin shutdown released {} callbacks", released);
    }
}
