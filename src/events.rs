//! Events delivered to the coordinator and the one-shot listener registry
//! that gates conversation-created delivery.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::FetchError;

/// Opaque reference to an open conversation with a peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationHandle(String);

impl ConversationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a fetch, as handed back by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Body { text: String, len: usize },
    Failed(FetchError),
}

impl FetchOutcome {
    pub fn body(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.len();
        Self::Body { text, len }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(FetchError(message.into()))
    }
}

/// Everything the event loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MessageReceived {
        sender: String,
        conversation: Option<ConversationHandle>,
        text: String,
    },
    ConversationCreated {
        conversation: ConversationHandle,
        peer: String,
    },
    FetchCompleted {
        conversation: ConversationHandle,
        outcome: FetchOutcome,
    },
    /// The messaging side has no more input.
    InputClosed,
}

/// Event kinds that require an explicit subscription to be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ConversationCreated,
}

/// Shared registry of active subscriptions.
#[derive(Debug, Clone, Default)]
pub struct Listeners {
    active: Arc<Mutex<HashMap<Topic, HashSet<u64>>>>,
    next_id: Arc<AtomicU64>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `topic`. Interest lasts until the returned token
    /// is cancelled or dropped.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic)
            .or_default()
            .insert(id);
        tracing::debug!(?topic, id, "subscribed");
        Subscription {
            topic,
            id,
            listeners: self.clone(),
        }
    }

    pub fn is_subscribed(&self, topic: Topic) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&topic)
            .is_some_and(|ids| !ids.is_empty())
    }

    fn remove(&self, topic: Topic, id: u64) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ids) = active.get_mut(&topic) {
            ids.remove(&id);
        }
    }
}

/// Token for one registration in [`Listeners`].
#[derive(Debug)]
pub struct Subscription {
    topic: Topic,
    id: u64,
    listeners: Listeners,
}

impl Subscription {
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::debug!(topic = ?self.topic, id = self.id, "unsubscribed");
        self.listeners.remove(self.topic, self.id);
    }
}
