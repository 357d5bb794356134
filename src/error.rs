use serde::{ser::Serializer, Serialize};

pub type Result<T> = std::result::Result<T, DragError>;

/// Failures surfaced synchronously to whoever started a drag or subscribed to drops.
///
/// A cancelled drag is not an error: it is a normal outcome delivered through
/// the outcome callback.
#[derive(Debug, thiserror::Error)]
pub enum DragError {
    #[error("element with selector \"{0}\" not found")]
    ElementNotFound(String),
    #[error("failed to capture element: {0}")]
    CaptureFailed(String),
    #[error("callback token space exhausted")]
    RegistryExhausted,
    #[error("native drag refused to start: {0}")]
    StartFailed(String),
    #[error("failed to register drop subscription: {0}")]
    SubscriptionFailed(String),
}

impl Serialize for DragError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
