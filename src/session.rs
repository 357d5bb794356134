//! Outbound drag sessions.
//!
//! A [`DragSession`] walks `Idle -> Resolving -> Capturing -> Requesting ->
//! AwaitingOutcome -> Resolved`, or ends in `Failed` from any non-terminal
//! state. Everything up to `Requesting` happens before a native session exists
//! and is reported straight back to the caller as an error. From then on the
//! only channel back is the outcome handler, invoked once by the registry.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::bridge::{NativeDragBridge, NativeDragRequest};
use crate::error::{DragError, Result};
use crate::outcome::{normalize_payload, OutcomeKind, OutcomeMode, SessionOutcome};
use crate::registry::{CallbackRegistry, CallbackToken, Handler};
use crate::snapshot::{DragTarget, ElementResolver, Snapshotter};

pub type OutcomeHandler = Box<dyn FnOnce(SessionOutcome) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolving,
    Capturing,
    Requesting,
    AwaitingOutcome,
    Resolved(OutcomeKind),
    Failed(String),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Resolved(_) | SessionState::Failed(_))
    }
}

/// One outbound drag, from element lookup to native hand-off.
#[derive(Debug)]
pub struct DragSession {
    id: SessionId,
    owner: String,
    state: SessionState,
}

impl DragSession {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            owner: owner.into(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn advance(&mut self, next: SessionState) {
        if self.state.is_terminal() {
            log::warn!(
                "Drag session {} already {:?}, ignoring move to {:?}",
                self.id,
                self.state,
                next
            );
            return;
        }
        log::debug!(
            "Drag session {} ({}): {:?} -> {:?}",
            self.id,
            self.owner,
            self.state,
            next
        );
        self.state = next;
    }

    fn fail(&mut self, err: DragError) -> DragError {
        log::warn!("Drag session {} failed: {}", self.id, err);
        self.advance(SessionState::Failed(err.to_string()));
        err
    }
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub owner: String,
    pub token: CallbackToken,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
}

/// Outstanding sessions that hold a registry entry, keyed by session id.
#[derive(Default)]
pub struct SessionTable {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, id: SessionId, record: SessionRecord) {
        self.sessions.insert(id, record);
    }

    fn set_state(&self, id: SessionId, state: SessionState) {
        // The outcome may already have removed the record
        if let Some(mut record) = self.sessions.get_mut(&id) {
            record.state = state;
        }
    }

    fn remove(&self, id: SessionId) -> Option<SessionRecord> {
        self.sessions.remove(&id).map(|(_, record)| record)
    }

    /// Takes a session out of the table in its terminal `Resolved` state.
    fn resolve(&self, id: SessionId, result: OutcomeKind) -> Option<SessionRecord> {
        let mut record = self.remove(id)?;
        record.state = SessionState::Resolved(result);
        Some(record)
    }

    pub fn get(&self, id: SessionId) -> Option<SessionRecord> {
        self.sessions.get(&id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_where<F>(&self, registry: &CallbackRegistry, predicate: F) -> usize
    where
        F: Fn(&SessionRecord) -> bool,
    {
        let doomed: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| *entry.key())
            .collect();

        let mut evicted = 0;
        for id in doomed {
            if let Some(record) = self.remove(id) {
                registry.release(record.token);
                evicted += 1;
            }
        }
        evicted
    }

    /// Releases the sessions started by a window that is going away.
    pub fn evict_owner(&self, owner: &str, registry: &CallbackRegistry) -> usize {
        let evicted = self.evict_where(registry, |record| record.owner == owner);
        if evicted > 0 {
            log::info!("Evicted {} pending drag sessions of {}", evicted, owner);
        }
        evicted
    }

    /// Releases sessions whose outcome never arrived within `ttl`.
    pub fn evict_older_than(&self, ttl: Duration, registry: &CallbackRegistry) -> usize {
        // A ttl reaching past the representable range means nothing can be stale yet
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return 0;
        };
        let evicted = self.evict_where(registry, |record| record.started_at < cutoff);
        if evicted > 0 {
            log::info!("Evicted {} stale drag sessions", evicted);
        }
        evicted
    }

    pub fn clear(&self) {
        self.sessions.clear();
    }
}

/// Drives drags started from one window.
pub struct DragSessionController {
    owner: String,
    mode: OutcomeMode,
    registry: Arc<CallbackRegistry>,
    sessions: Arc<SessionTable>,
    resolver: Arc<dyn ElementResolver>,
    snapshotter: Arc<dyn Snapshotter>,
    bridge: Arc<dyn NativeDragBridge>,
    stale_after: Option<Duration>,
}

impl DragSessionController {
    pub fn new(
        owner: impl Into<String>,
        mode: OutcomeMode,
        registry: Arc<CallbackRegistry>,
        sessions: Arc<SessionTable>,
        resolver: Arc<dyn ElementResolver>,
        snapshotter: Arc<dyn Snapshotter>,
        bridge: Arc<dyn NativeDragBridge>,
    ) -> Self {
        Self {
            owner: owner.into(),
            mode,
            registry,
            sessions,
            resolver,
            snapshotter,
            bridge,
            stale_after: None,
        }
    }

    pub fn with_stale_after(mut self, ttl: Option<Duration>) -> Self {
        self.stale_after = ttl;
        self
    }

    /// Starts a drag of `target` carrying `data`.
    ///
    /// Returns as soon as the native side accepted the drag. The outcome, if
    /// anyone asked for it, arrives later through `on_outcome`.
    pub async fn start_drag(
        &self,
        target: impl Into<DragTarget>,
        data: serde_json::Value,
        on_outcome: Option<OutcomeHandler>,
    ) -> Result<SessionId> {
        if let Some(ttl) = self.stale_after {
            self.sessions.evict_older_than(ttl, &self.registry);
        }

        let mut session = DragSession::new(self.owner.clone());
        let id = session.id();

        session.advance(SessionState::Resolving);
        let element = match target.into() {
            DragTarget::Element(element) => element,
            DragTarget::Selector(selector) => match self.resolver.query_selector(&selector) {
                Some(element) => element,
                None => return Err(session.fail(DragError::ElementNotFound(selector))),
            },
        };

        session.advance(SessionState::Capturing);
        let image = match self.snapshotter.capture(&element).await {
            Ok(image) if !image.is_empty() => image,
            Ok(_) => return Err(session.fail(DragError::CaptureFailed("empty image".into()))),
            Err(reason) => return Err(session.fail(DragError::CaptureFailed(reason))),
        };

        session.advance(SessionState::Requesting);
        let notify = match on_outcome {
            Some(handler) => match self.register_outcome(id, handler) {
                Ok(token) => Some(token),
                Err(e) => return Err(session.fail(e)),
            },
            None => None,
        };

        let request = NativeDragRequest {
            image,
            data,
            mode: self.mode,
            notify,
        };
        if let Err(reason) = self.bridge.start_drag(request).await {
            if let Some(token) = notify {
                self.sessions.remove(id);
                self.registry.release(token);
            }
            return Err(session.fail(DragError::StartFailed(reason)));
        }

        session.advance(SessionState::AwaitingOutcome);
        self.sessions.set_state(id, SessionState::AwaitingOutcome);
        log::info!("Drag session {} started from {} ({:?})", id, self.owner, self.mode);
        Ok(id)
    }

    fn register_outcome(&self, id: SessionId, handler: OutcomeHandler) -> Result<CallbackToken> {
        let mode = self.mode;
        let sessions = self.sessions.clone();
        // The registry hands out `Fn` handlers; the one-shot lifetime guarantees a
        // single call, the take() makes the FnOnce compatible.
        let slot = std::sync::Mutex::new(Some(handler));
        let wrapped: Handler = Arc::new(move |payload| {
            let outcome = normalize_payload(payload, mode);
            if let Some(record) = sessions.resolve(id, outcome.result) {
                log::debug!(
                    "Drag session {} of {} {:?} after {}ms",
                    id,
                    record.owner,
                    record.state,
                    (Utc::now() - record.started_at).num_milliseconds()
                );
            }
            let handler = slot.lock().unwrap_or_else(|e| e.into_inner()).take();
            if let Some(handler) = handler {
                handler(outcome);
            }
        });

        let token = self.registry.register_one_shot(Some(&self.owner), wrapped)?;
        self.sessions.insert(
            id,
            SessionRecord {
                owner: self.owner.clone(),
                token,
                state: SessionState::Requesting,
                started_at: Utc::now(),
            },
        );
        Ok(token)
    }
}
