use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::bridge::NativeDragBridge;
use crate::error::{DragError, Result};
use crate::registry::{CallbackRegistry, CallbackToken, Handler, SubscriptionName};

/// Application data carried by an element dropped on this window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEvent {
    pub payload: serde_json::Value,
}

pub type DropHandler = Arc<dyn Fn(DropEvent) + Send + Sync>;

/// Standing subscription to element drops on one window.
pub struct DropListenerController {
    window: String,
    registry: Arc<CallbackRegistry>,
    bridge: Arc<dyn NativeDragBridge>,
}

impl DropListenerController {
    pub fn new(
        window: impl Into<String>,
        registry: Arc<CallbackRegistry>,
        bridge: Arc<dyn NativeDragBridge>,
    ) -> Self {
        Self {
            window: window.into(),
            registry,
            bridge,
        }
    }

    pub fn subscription_name(&self) -> SubscriptionName {
        SubscriptionName::element_drop(self.window.clone())
    }

    /// Makes `handler` the one receiver of drops on this window, replacing any
    /// handler registered before.
    pub fn on_element_drop(&self, handler: DropHandler) -> Result<CallbackToken> {
        let name = self.subscription_name();
        let wrapped: Handler = Arc::new(move |payload| handler(DropEvent { payload }));
        let token = self
            .registry
            .subscribe(name.clone(), Some(&self.window), wrapped)?;

        if let Err(reason) = self.bridge.register_drop_subscription(&name, token) {
            self.registry.unsubscribe(&name);
            log::warn!("Drop subscription {} refused: {}", name, reason);
            return Err(DragError::SubscriptionFailed(reason));
        }

        log::debug!("Drop listener {} bound to {}", name, token);
        Ok(token)
    }

    pub fn remove(&self) -> bool {
        self.registry.unsubscribe(&self.subscription_name())
    }

    pub fn is_listening(&self) -> bool {
        self.registry
            .subscription_token(&self.subscription_name())
            .is_some()
    }
}
