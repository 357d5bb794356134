//! Process-wide table correlating native events with the handlers waiting for them.
//!
//! Native code only ever sees opaque [`CallbackToken`]s or well-known
//! [`SubscriptionName`]s. Every mutation goes through `register`, `dispatch`,
//! `release` and their subscription counterparts, each of which takes the single
//! table lock for the duration of the lookup only. Handlers always run after the
//! lock has been dropped, so a handler may itself register or publish.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{DragError, Result};

pub type Handler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

static GLOBAL: Lazy<Arc<CallbackRegistry>> = Lazy::new(|| Arc::new(CallbackRegistry::new()));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackToken(u64);

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Removed before its first (and only) invocation.
    OneShot,
    /// Stays registered until released, unsubscribed or evicted.
    Persistent,
}

/// Well-known name a standing subscription is bound to, scoped to one window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionName {
    channel: String,
    window: String,
}

impl SubscriptionName {
    pub const ELEMENT_DROP: &'static str = "element-drop";

    pub fn new(channel: impl Into<String>, window: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            window: window.into(),
        }
    }

    /// The single "drop target for this window" subscription.
    pub fn element_drop(window: impl Into<String>) -> Self {
        Self::new(Self::ELEMENT_DROP, window)
    }

    pub fn window(&self) -> &str {
        &self.window
    }
}

impl fmt::Display for SubscriptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.window)
    }
}

/// Address native code publishes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Session(CallbackToken),
    Subscription(SubscriptionName),
}

struct Entry {
    handler: Handler,
    lifetime: Lifetime,
    owner: Option<String>,
}

#[derive(Default)]
struct Table {
    entries: HashMap<CallbackToken, Entry>,
    subscriptions: HashMap<SubscriptionName, CallbackToken>,
}

impl Table {
    fn remove(&mut self, token: CallbackToken) -> Option<Entry> {
        let entry = self.entries.remove(&token)?;
        if entry.lifetime == Lifetime::Persistent {
            self.subscriptions.retain(|_, bound| *bound != token);
        }
        Some(entry)
    }
}

pub struct CallbackRegistry {
    next_token: AtomicU64,
    table: Mutex<Table>,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub(crate) fn starting_at(first_token: u64) -> Self {
        Self {
            next_token: AtomicU64::new(first_token),
            table: Mutex::new(Table::default()),
        }
    }

    /// The registry shared by every window of the process.
    pub fn global() -> Arc<CallbackRegistry> {
        GLOBAL.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        // Handlers never run under the lock, so a poisoned table is still consistent
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn mint(&self) -> Result<CallbackToken> {
        self.next_token
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map(CallbackToken)
            .map_err(|_| DragError::RegistryExhausted)
    }

    pub fn register(
        &self,
        lifetime: Lifetime,
        owner: Option<&str>,
        handler: Handler,
    ) -> Result<CallbackToken> {
        let token = self.mint()?;
        self.lock().entries.insert(
            token,
            Entry {
                handler,
                lifetime,
                owner: owner.map(str::to_string),
            },
        );
        log::debug!("Registered {:?} callback {}", lifetime, token);
        Ok(token)
    }

    pub fn register_one_shot(
        &self,
        owner: Option<&str>,
        handler: Handler,
    ) -> Result<CallbackToken> {
        self.register(Lifetime::OneShot, owner, handler)
    }

    pub fn register_persistent(
        &self,
        owner: Option<&str>,
        handler: Handler,
    ) -> Result<CallbackToken> {
        self.register(Lifetime::Persistent, owner, handler)
    }

    /// Invokes the handler behind `token`. Unknown, released or already
    /// dispatched one-shot tokens are a silent no-op. Returns whether a handler ran.
    pub fn dispatch(&self, token: CallbackToken, payload: serde_json::Value) -> bool {
        let handler = {
            let mut table = self.lock();
            match table.entries.get(&token).map(|e| e.lifetime) {
                Some(Lifetime::OneShot) => table.remove(token).map(|e| e.handler),
                Some(Lifetime::Persistent) => table.entries.get(&token).map(|e| e.handler.clone()),
                None => None,
            }
        };

        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => {
                log::debug!("Ignoring dispatch to stale callback {}", token);
                false
            }
        }
    }

    /// Removes an entry without invoking it.
    pub fn release(&self, token: CallbackToken) -> bool {
        let released = self.lock().remove(token).is_some();
        if released {
            log::debug!("Released callback {}", token);
        }
        released
    }

    /// Binds `name` to a fresh persistent handler, releasing whatever was bound
    /// before in the same critical section so the stale handler can never run.
    pub fn subscribe(
        &self,
        name: SubscriptionName,
        owner: Option<&str>,
        handler: Handler,
    ) -> Result<CallbackToken> {
        let token = self.mint()?;
        let mut table = self.lock();
        if let Some(previous) = table.subscriptions.get(&name).copied() {
            table.remove(previous);
            log::debug!("Replaced subscription {} (was {})", name, previous);
        }
        table.entries.insert(
            token,
            Entry {
                handler,
                lifetime: Lifetime::Persistent,
                owner: owner.map(str::to_string),
            },
        );
        table.subscriptions.insert(name, token);
        Ok(token)
    }

    pub fn unsubscribe(&self, name: &SubscriptionName) -> bool {
        let mut table = self.lock();
        match table.subscriptions.get(name).copied() {
            Some(token) => table.remove(token).is_some(),
            None => false,
        }
    }

    pub fn subscription_token(&self, name: &SubscriptionName) -> Option<CallbackToken> {
        self.lock().subscriptions.get(name).copied()
    }

    pub fn dispatch_subscription(
        &self,
        name: &SubscriptionName,
        payload: serde_json::Value,
    ) -> bool {
        match self.subscription_token(name) {
            Some(token) => self.dispatch(token, payload),
            None => {
                log::debug!("No subscriber for {}", name);
                false
            }
        }
    }

    /// Entry point for native code.
    pub fn publish(&self, channel: &ChannelId, payload: serde_json::Value) -> bool {
        match channel {
            ChannelId::Session(token) => self.dispatch(*token, payload),
            ChannelId::Subscription(name) => self.dispatch_subscription(name, payload),
        }
    }

    /// Drops every entry registered by `owner` without invoking it.
    pub fn release_owner(&self, owner: &str) -> usize {
        let mut table = self.lock();
        let tokens: Vec<CallbackToken> = table
            .entries
            .iter()
            .filter(|(_, entry)| entry.owner.as_deref() == Some(owner))
            .map(|(token, _)| *token)
            .collect();
        for token in &tokens {
            table.remove(*token);
        }
        tokens.len()
    }

    /// Releases everything without dispatch. Used on shutdown.
    pub fn clear(&self) -> usize {
        let mut table = self.lock();
        let count = table.entries.len();
        table.entries.clear();
        table.subscriptions.clear();
        count
    }

    pub fn contains(&self, token: CallbackToken) -> bool {
        self.lock().entries.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
