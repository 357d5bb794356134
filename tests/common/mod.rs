#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tauri_plugin_drag_as_window::{
    CallbackRegistry, CallbackToken, CapturedImage, ChannelId, DragSessionController, ElementRef,
    ElementResolver, NativeDragBridge, NativeDragRequest, OutcomeMode, SessionOutcome,
    SessionTable, Snapshotter, SubscriptionName,
};

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Document with a fixed set of element ids.
pub struct FakeDocument {
    ids: HashSet<String>,
}

impl FakeDocument {
    pub fn with(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
        })
    }
}

impl ElementResolver for FakeDocument {
    fn query_selector(&self, selector: &str) -> Option<ElementRef> {
        self.ids.contains(selector).then(|| ElementRef::new(selector))
    }
}

pub enum FakeSnapshot {
    Png,
    Broken(&'static str),
}

#[async_trait]
impl Snapshotter for FakeSnapshot {
    async fn capture(&self, _element: &ElementRef) -> Result<CapturedImage, String> {
        match self {
            FakeSnapshot::Png => CapturedImage::from_png_bytes(PNG.to_vec()),
            FakeSnapshot::Broken(reason) => Err(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StartedDrag {
    pub image_len: usize,
    pub data: Value,
    pub mode: OutcomeMode,
    pub notify: Option<CallbackToken>,
}

/// Records every request and plays the OS by publishing on the registry on demand.
#[derive(Default)]
pub struct RecordingBridge {
    pub started: Mutex<Vec<StartedDrag>>,
    pub subscriptions: Mutex<Vec<(SubscriptionName, CallbackToken)>>,
    pub refuse_start: Option<String>,
    pub refuse_subscription: Option<String>,
}

impl RecordingBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refusing_start(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            refuse_start: Some(reason.to_string()),
            ..Default::default()
        })
    }

    pub fn refusing_subscription(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            refuse_subscription: Some(reason.to_string()),
            ..Default::default()
        })
    }

    pub fn started(&self) -> Vec<StartedDrag> {
        self.started.lock().unwrap().clone()
    }

    pub fn last_notify(&self) -> Option<CallbackToken> {
        self.started().last().and_then(|drag| drag.notify)
    }
}

#[async_trait]
impl NativeDragBridge for RecordingBridge {
    async fn start_drag(&self, request: NativeDragRequest) -> Result<(), String> {
        if let Some(reason) = &self.refuse_start {
            return Err(reason.clone());
        }
        self.started.lock().unwrap().push(StartedDrag {
            image_len: request.image.len(),
            data: request.data,
            mode: request.mode,
            notify: request.notify,
        });
        Ok(())
    }

    fn register_drop_subscription(
        &self,
        name: &SubscriptionName,
        token: CallbackToken,
    ) -> Result<(), String> {
        if let Some(reason) = &self.refuse_subscription {
            return Err(reason.clone());
        }
        self.subscriptions.lock().unwrap().push((name.clone(), token));
        Ok(())
    }
}

pub fn dropped_at(x: f64, y: f64) -> Value {
    json!({ "result": "Dropped", "cursorPos": { "x": x, "y": y } })
}

pub fn cancelled_at(x: f64, y: f64) -> Value {
    json!({ "result": "Cancel", "cursorPos": { "x": x, "y": y } })
}

pub fn publish_outcome(registry: &CallbackRegistry, token: CallbackToken, payload: Value) -> bool {
    registry.publish(&ChannelId::Session(token), payload)
}

/// Collects outcomes delivered to session handlers.
#[derive(Clone, Default)]
pub struct Outcomes(Arc<Mutex<Vec<SessionOutcome>>>);

impl Outcomes {
    pub fn handler(&self) -> tauri_plugin_drag_as_window::OutcomeHandler {
        let seen = self.0.clone();
        Box::new(move |outcome| seen.lock().unwrap().push(outcome))
    }

    pub fn all(&self) -> Vec<SessionOutcome> {
        self.0.lock().unwrap().clone()
    }
}

pub struct Harness {
    pub registry: Arc<CallbackRegistry>,
    pub sessions: Arc<SessionTable>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(CallbackRegistry::new()),
            sessions: Arc::new(SessionTable::new()),
        }
    }

    pub fn controller(
        &self,
        owner: &str,
        mode: OutcomeMode,
        document: Arc<FakeDocument>,
        snapshot: FakeSnapshot,
        bridge: Arc<RecordingBridge>,
    ) -> DragSessionController {
        DragSessionController::new(
            owner,
            mode,
            self.registry.clone(),
            self.sessions.clone(),
            document,
            Arc::new(snapshot),
            bridge,
        )
    }
}
