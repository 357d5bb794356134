use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tauri::ipc::{Channel, JavaScriptChannelId};
use tauri::{AppHandle, Runtime, State, Webview, WebviewWindow};

use crate::drop_listener::{DropEvent, DropListenerController};
use crate::native::TauriDragBridge;
use crate::outcome::{OutcomeMode, SessionOutcome};
use crate::session::{DragSessionController, OutcomeHandler};
use crate::snapshot::{CapturedImage, DragTarget, ElementRef, ElementResolver, Snapshotter};
use crate::state::DragAsWindowState;

/// What the guest shim sends for the dragged element.
///
/// The DOM lookup and rendering run in the webview; `image_base64` is null when
/// the selector matched nothing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCapture {
    pub target: String,
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// Answers element lookups and snapshots from what the guest already captured.
struct GuestDocument {
    capture: GuestCapture,
}

impl ElementResolver for GuestDocument {
    fn query_selector(&self, selector: &str) -> Option<ElementRef> {
        (selector == self.capture.target && self.capture.image_base64.is_some())
            .then(|| ElementRef::new(selector))
    }
}

#[async_trait]
impl Snapshotter for GuestDocument {
    async fn capture(&self, element: &ElementRef) -> Result<CapturedImage, String> {
        let data_url = self
            .capture
            .image_base64
            .as_deref()
            .ok_or_else(|| format!("no image for {}", element))?;
        CapturedImage::from_data_url(data_url)
    }
}

fn outcome_sender<R: Runtime>(webview: Webview<R>, id: JavaScriptChannelId) -> OutcomeHandler {
    let channel: Channel<SessionOutcome> = id.channel_on(webview);
    Box::new(move |outcome| {
        if let Err(e) = channel.send(outcome) {
            log::warn!("Failed to deliver drag outcome: {}", e);
        }
    })
}

#[allow(clippy::too_many_arguments)]
async fn start_session<R: Runtime>(
    app: AppHandle<R>,
    window: WebviewWindow<R>,
    webview: Webview<R>,
    state: &DragAsWindowState,
    capture: GuestCapture,
    data: serde_json::Value,
    mode: OutcomeMode,
    on_event: Option<JavaScriptChannelId>,
) -> Result<(), String> {
    let owner = window.label().to_string();
    let target = DragTarget::Selector(capture.target.clone());
    let guest = Arc::new(GuestDocument { capture });
    let bridge = Arc::new(TauriDragBridge::new(
        app,
        window,
        state.registry.clone(),
        state.config.clone(),
    ));

    let controller = DragSessionController::new(
        owner,
        mode,
        state.registry.clone(),
        state.sessions.clone(),
        guest.clone(),
        guest,
        bridge,
    )
    .with_stale_after(state.config.stale_session_ttl());

    let on_outcome = on_event.map(|id| outcome_sender(webview, id));
    controller
        .start_drag(target, data, on_outcome)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Drags an element out of the window; dropping it elsewhere asks the app to open a new window.
#[tauri::command]
pub async fn drag_new_window<R: Runtime>(
    app: AppHandle<R>,
    window: WebviewWindow<R>,
    webview: Webview<R>,
    state: State<'_, DragAsWindowState>,
    capture: GuestCapture,
    on_event: Option<JavaScriptChannelId>,
) -> Result<(), String> {
    start_session(
        app,
        window,
        webview,
        &state,
        capture,
        serde_json::Value::Null,
        OutcomeMode::CreateWindow,
        on_event,
    )
    .await
}

/// Drags an element carrying `data` so another window of the app can receive it.
#[tauri::command]
pub async fn drag_back<R: Runtime>(
    app: AppHandle<R>,
    window: WebviewWindow<R>,
    webview: Webview<R>,
    state: State<'_, DragAsWindowState>,
    capture: GuestCapture,
    data: serde_json::Value,
    on_event: Option<JavaScriptChannelId>,
) -> Result<(), String> {
    start_session(
        app,
        window,
        webview,
        &state,
        capture,
        data,
        OutcomeMode::HandBack,
        on_event,
    )
    .await
}

#[tauri::command]
pub async fn on_drop<R: Runtime>(
    app: AppHandle<R>,
    window: WebviewWindow<R>,
    state: State<'_, DragAsWindowState>,
    handler: Channel<serde_json::Value>,
) -> Result<(), String> {
    let label = window.label().to_string();
    let bridge = Arc::new(TauriDragBridge::new(
        app,
        window,
        state.registry.clone(),
        state.config.clone(),
    ));

    let listener = DropListenerController::new(label, state.registry.clone(), bridge);
    listener
        .on_element_drop(Arc::new(move |event: DropEvent| {
            if let Err(e) = handler.send(event.payload) {
                log::warn!("Failed to deliver dropped element: {}", e);
            }
        }))
        .map(|_| ())
        .map_err(|e| e.to_string())
}
