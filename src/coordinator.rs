//! Request coordinator: correlates an `ip` trigger with the fetch that
//! answers it and the conversation the answer goes to.

use crate::config::Preferences;
use crate::events::{ConversationHandle, FetchOutcome, Listeners, Subscription, Topic};
use crate::extract::extract;
use crate::identity::normalize;
use crate::messaging::Messenger;
use crate::transport::Transport;

/// Externally visible phase of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    AwaitingConversation,
    FetchingUrl,
}

#[derive(Debug)]
enum Slot {
    Idle,
    /// Trigger arrived before its conversation existed.
    AwaitingConversation {
        sender: String,
        subscription: Subscription,
    },
    FetchingUrl {
        conversation: ConversationHandle,
    },
}

/// At most one request is in flight. Triggers that arrive while one is
/// pending are dropped.
///
/// The trigger command is read once at construction. The URL and pattern
/// are read from `prefs` each time a fetch starts or completes.
pub struct Coordinator<M, T, P> {
    messenger: M,
    transport: T,
    prefs: P,
    trigger: String,
    listeners: Listeners,
    slot: Slot,
}

impl<M: Messenger, T: Transport, P: Preferences> Coordinator<M, T, P> {
    pub fn new(messenger: M, transport: T, prefs: P, listeners: Listeners) -> Self {
        let trigger = prefs.current().trigger.command;
        Self {
            messenger,
            transport,
            prefs,
            trigger,
            listeners,
            slot: Slot::Idle,
        }
    }

    pub fn state(&self) -> TriggerState {
        match self.slot {
            Slot::Idle => TriggerState::Idle,
            Slot::AwaitingConversation { .. } => TriggerState::AwaitingConversation,
            Slot::FetchingUrl { .. } => TriggerState::FetchingUrl,
        }
    }

    pub fn pending_sender(&self) -> Option<&str> {
        match &self.slot {
            Slot::AwaitingConversation { sender, .. } => Some(sender),
            _ => None,
        }
    }

    /// Conversation the in-flight fetch will answer, if any.
    pub fn fetching_for(&self) -> Option<&ConversationHandle> {
        match &self.slot {
            Slot::FetchingUrl { conversation } => Some(conversation),
            _ => None,
        }
    }

    pub fn on_message(&mut self, sender: &str, conversation: Option<ConversationHandle>, text: &str) {
        if text != self.trigger {
            return;
        }
        if !matches!(self.slot, Slot::Idle) {
            tracing::info!(sender, state = ?self.state(), "request already pending, ignoring trigger");
            return;
        }

        match conversation {
            Some(conversation) => {
                tracing::info!(sender, %conversation, "trigger received");
                self.start_fetch(conversation);
            }
            None => {
                let sender = normalize(sender).to_string();
                tracing::info!(%sender, "trigger received, waiting for conversation");
                let subscription = self.listeners.subscribe(Topic::ConversationCreated);
                self.slot = Slot::AwaitingConversation {
                    sender,
                    subscription,
                };
            }
        }
    }

    /// Match a freshly created conversation against the pending sender.
    ///
    /// The test is `peer.starts_with(pending_sender)`, so a sender that is a
    /// prefix of an unrelated peer name also matches.
    pub fn on_conversation_created(&mut self, conversation: ConversationHandle, peer: &str) {
        let Slot::AwaitingConversation { sender, .. } = &self.slot else {
            return;
        };
        if !peer.starts_with(sender.as_str()) {
            tracing::debug!(peer, pending = %sender, "conversation does not match pending sender");
            return;
        }

        tracing::info!(peer, %conversation, "conversation opened for pending trigger");
        // Replacing the slot drops the subscription.
        self.start_fetch(conversation);
    }

    pub fn on_fetch_complete(&mut self, conversation: &ConversationHandle, outcome: FetchOutcome) {
        self.slot = Slot::Idle;

        let reply = match outcome {
            FetchOutcome::Failed(err) => {
                tracing::warn!(%conversation, error = %err, "fetch failed");
                Some(err.0)
            }
            FetchOutcome::Body { text, len } => {
                tracing::info!(%conversation, len, "fetch complete");
                let pattern = self.prefs.current().fetch.pattern;
                match extract(&pattern, &text) {
                    Ok(Some(found)) => Some(found),
                    Ok(None) => {
                        tracing::info!(%conversation, "no address found in page");
                        None
                    }
                    Err(e) => {
                        tracing::error!("{e}");
                        None
                    }
                }
            }
        };

        if let Some(reply) = reply
            && let Err(e) = self.messenger.send(conversation, &reply)
        {
            tracing::warn!(%conversation, "failed to send reply: {e:#}");
        }
    }

    fn start_fetch(&mut self, conversation: ConversationHandle) {
        let url = self.prefs.current().fetch.url;
        tracing::info!(%url, %conversation, "fetching");
        self.slot = Slot::FetchingUrl {
            conversation: conversation.clone(),
        };
        self.transport.fetch(&url, conversation);
    }
}
