use serde::{Deserialize, Serialize};

/// Cursor position in logical (DPI independent) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

impl CursorPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Result vocabulary spoken by the native side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawDragResult {
    Dropped,
    #[serde(alias = "Cancel")]
    Cancelled,
}

/// Outcome payload as published by the native bridge on a session channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOutcome {
    pub result: RawDragResult,
    pub cursor_pos: CursorPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// Dropped back into an app window, application data handed over.
    Dropped,
    Cancelled,
    /// Dropped outside any app window; the caller is expected to spawn a window.
    CreateWindow,
}

/// How a raw `Dropped` is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeMode {
    CreateWindow,
    #[default]
    HandBack,
}

/// Caller-facing result of a drag session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub result: OutcomeKind,
    pub cursor_pos: CursorPosition,
}

impl SessionOutcome {
    pub fn cancelled_at(cursor_pos: CursorPosition) -> Self {
        Self {
            result: OutcomeKind::Cancelled,
            cursor_pos,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.result == OutcomeKind::Cancelled
    }
}

/// Maps the native result onto the caller vocabulary for `mode`. No native round-trip.
pub fn normalize(raw: RawOutcome, mode: OutcomeMode) -> SessionOutcome {
    let result = match (raw.result, mode) {
        (RawDragResult::Cancelled, _) => OutcomeKind::Cancelled,
        (RawDragResult::Dropped, OutcomeMode::CreateWindow) => OutcomeKind::CreateWindow,
        (RawDragResult::Dropped, OutcomeMode::HandBack) => OutcomeKind::Dropped,
    };

    SessionOutcome {
        result,
        cursor_pos: raw.cursor_pos,
    }
}

/// Decodes a payload published on a session channel and normalizes it.
///
/// Anything the native side sends that does not decode is treated as a cancelled
/// session at the origin.
pub fn normalize_payload(payload: serde_json::Value, mode: OutcomeMode) -> SessionOutcome {
    match serde_json::from_value::<RawOutcome>(payload) {
        Ok(raw) => normalize(raw, mode),
        Err(e) => {
            log::warn!("Undecodable drag outcome, reporting as cancelled: {}", e);
            SessionOutcome::cancelled_at(CursorPosition::default())
        }
    }
}
