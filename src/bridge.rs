use async_trait::async_trait;

use crate::outcome::OutcomeMode;
use crate::registry::{CallbackToken, SubscriptionName};
use crate::snapshot::CapturedImage;

/// Everything the native side needs to start one drag.
#[derive(Debug)]
pub struct NativeDragRequest {
    pub image: CapturedImage,
    pub data: serde_json::Value,
    pub mode: OutcomeMode,
    /// Where to publish the outcome. `None` means nobody listens.
    pub notify: Option<CallbackToken>,
}

/// OS-level drag capability.
///
/// Outcomes and drops never come back through this trait: the implementation
/// publishes them on the [`CallbackRegistry`](crate::registry::CallbackRegistry)
/// when they happen.
#[async_trait]
pub trait NativeDragBridge: Send + Sync {
    /// Resolves once the OS accepted the drag; acceptance does not imply completion.
    async fn start_drag(&self, request: NativeDragRequest) -> Result<(), String>;

    fn register_drop_subscription(
        &self,
        name: &SubscriptionName,
        token: CallbackToken,
    ) -> Result<(), String>;
}
