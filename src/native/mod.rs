//! Native side of the drag protocol, backed by the `drag` crate.
//!
//! Outbound drags run on the main thread; their outcome is published on the
//! session channel of the registry. Inbound element drops arrive as native file
//! drops of a payload file and are published on the window's element-drop
//! subscription.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::{AppHandle, DragDropEvent, Manager, Runtime, WebviewWindow, WindowEvent};
use tempfile::NamedTempFile;
use tokio::sync::oneshot;

use crate::bridge::{NativeDragBridge, NativeDragRequest};
use crate::config::Config;
use crate::outcome::{CursorPosition, OutcomeMode, RawDragResult, RawOutcome};
use crate::registry::{CallbackRegistry, CallbackToken, ChannelId, SubscriptionName};

pub mod payload_file;

/// Windows whose native drop events are already routed to the registry.
static HOOKED_WINDOWS: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

pub(crate) fn forget_window(label: &str) {
    HOOKED_WINDOWS
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(label);
}

/// Payload of the native item, built into a `drag::DragItem` on the main thread.
enum NativeItem {
    Path(PathBuf),
    Data(Vec<u8>),
}

pub struct TauriDragBridge<R: Runtime> {
    app: AppHandle<R>,
    window: WebviewWindow<R>,
    registry: Arc<CallbackRegistry>,
    config: Arc<Config>,
}

impl<R: Runtime> TauriDragBridge<R> {
    pub fn new(
        app: AppHandle<R>,
        window: WebviewWindow<R>,
        registry: Arc<CallbackRegistry>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            app,
            window,
            registry,
            config,
        }
    }
}

fn to_raw_outcome(result: drag::DragResult, cursor_pos: drag::CursorPosition) -> RawOutcome {
    RawOutcome {
        result: match result {
            drag::DragResult::Dropped => RawDragResult::Dropped,
            drag::DragResult::Cancel => RawDragResult::Cancelled,
        },
        cursor_pos: CursorPosition::new(f64::from(cursor_pos.x), f64::from(cursor_pos.y)),
    }
}

fn publish_outcome(registry: &CallbackRegistry, token: CallbackToken, outcome: RawOutcome) {
    match serde_json::to_value(outcome) {
        Ok(payload) => {
            registry.publish(&ChannelId::Session(token), payload);
        }
        Err(e) => log::warn!("Failed to encode drag outcome for {}: {}", token, e),
    }
}

fn take_payload_file(file: &Mutex<Option<NamedTempFile>>) -> Option<NamedTempFile> {
    file.lock().unwrap_or_else(|e| e.into_inner()).take()
}

/// Deletes the payload file once the receiving window had time to read it.
async fn remove_payload_after(file: NamedTempFile, delay: Duration) {
    tokio::time::sleep(delay).await;
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        log::warn!("Failed to remove payload file {}: {}", path.display(), e);
    }
}

/// Publishes a native file drop to the window's element-drop subscription when
/// it carries a payload file. Returns whether a listener received it.
fn route_drop(
    paths: &[PathBuf],
    prefix: &str,
    registry: &CallbackRegistry,
    name: &SubscriptionName,
) -> bool {
    let Some(path) = paths.first() else {
        return false;
    };
    if !payload_file::is_payload_file(path, prefix) {
        return false;
    }

    match payload_file::read_payload(path) {
        Ok(data) => {
            let delivered = registry.publish(&ChannelId::Subscription(name.clone()), data);
            if !delivered {
                log::debug!("Element dropped on {} with nobody listening", name);
            }
            delivered
        }
        Err(e) => {
            log::warn!("{}", e);
            false
        }
    }
}

fn install_drop_hook<R: Runtime>(
    window: &WebviewWindow<R>,
    registry: Arc<CallbackRegistry>,
    prefix: String,
    name: SubscriptionName,
) {
    window.on_window_event(move |event| {
        if let WindowEvent::DragDrop(DragDropEvent::Drop { paths, .. }) = event {
            route_drop(paths, &prefix, &registry, &name);
        }
    });
}

#[async_trait]
impl<R: Runtime> NativeDragBridge for TauriDragBridge<R> {
    async fn start_drag(&self, request: NativeDragRequest) -> Result<(), String> {
        let NativeDragRequest {
            image,
            data,
            mode,
            notify,
        } = request;

        let (item, temp_file) = match mode {
            OutcomeMode::HandBack => {
                let file = payload_file::write_payload(&data, &self.config.payload_file_prefix)?;
                (NativeItem::Path(file.path().to_path_buf()), Some(file))
            }
            OutcomeMode::CreateWindow => {
                let bytes = serde_json::to_vec(&data)
                    .map_err(|e| format!("Failed to encode drag data: {}", e))?;
                (NativeItem::Data(bytes), None)
            }
        };

        let temp_file = Arc::new(Mutex::new(temp_file));
        let registry = self.registry.clone();
        let cleanup_delay = self.config.payload_cleanup_delay();
        let skip_animation = self.config.skip_animation_on_cancel;
        let identifier = self.app.config().identifier.clone();
        let window = self.window.clone();
        let (tx, rx) = oneshot::channel();

        self.app
            .run_on_main_thread(move || {
                #[cfg(target_os = "linux")]
                let raw_window = window.gtk_window();
                #[cfg(not(target_os = "linux"))]
                let raw_window = tauri::Result::Ok(window.clone());

                let item = match item {
                    NativeItem::Path(path) => drag::DragItem::Files(vec![path]),
                    NativeItem::Data(bytes) => drag::DragItem::Data {
                        provider: Box::new(move |_type| Some(bytes.clone())),
                        types: vec![identifier],
                    },
                };

                let result = match raw_window {
                    Ok(w) => drag::start_drag(
                        &w,
                        item,
                        drag::Image::Raw(image.into_bytes()),
                        move |result, cursor_pos| {
                            let outcome = to_raw_outcome(result, cursor_pos);
                            log::debug!("Native drag finished: {:?}", outcome.result);
                            if let Some(token) = notify {
                                publish_outcome(&registry, token, outcome);
                            }
                            if let Some(file) = take_payload_file(&temp_file) {
                                tauri::async_runtime::spawn(remove_payload_after(
                                    file,
                                    cleanup_delay,
                                ));
                            }
                        },
                        drag::Options {
                            skip_animatation_on_cancel_or_failure: skip_animation,
                            ..Default::default()
                        },
                    )
                    .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };

                let _ = tx.send(result);
            })
            .map_err(|e| format!("Failed to reach the main thread: {}", e))?;

        rx.await
            .map_err(|_| "Main thread dropped the drag request".to_string())?
    }

    fn register_drop_subscription(
        &self,
        name: &SubscriptionName,
        token: CallbackToken,
    ) -> Result<(), String> {
        let label = self.window.label();
        if name.window() != label {
            return Err(format!("Window '{}' cannot route drops for {}", label, name));
        }

        let first = HOOKED_WINDOWS
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(label.to_string());
        if first {
            install_drop_hook(
                &self.window,
                self.registry.clone(),
                self.config.payload_file_prefix.clone(),
                name.clone(),
            );
            log::debug!("Routing element drops of window '{}'", label);
        }

        log::debug!("Drops on {} now go to {}", name, token);
        Ok(())
    }
}
