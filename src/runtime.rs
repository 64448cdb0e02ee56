//! Single-threaded event loop that owns the coordinator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::config::Preferences;
use crate::coordinator::{Coordinator, TriggerState};
use crate::events::{Event, Listeners, Topic};
use crate::messaging::Messenger;
use crate::transport::Transport;

const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(250);

pub struct Runtime<M, T, P> {
    coordinator: Coordinator<M, T, P>,
    listeners: Listeners,
    events: Receiver<Event>,
    stop: Arc<AtomicBool>,
    input_closed: bool,
}

impl<M: Messenger, T: Transport, P: Preferences> Runtime<M, T, P> {
    pub fn new(
        coordinator: Coordinator<M, T, P>,
        listeners: Listeners,
        events: Receiver<Event>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            coordinator,
            listeners,
            events,
            stop,
            input_closed: false,
        }
    }

    pub const fn coordinator(&self) -> &Coordinator<M, T, P> {
        &self.coordinator
    }

    /// Process events until stopped, or until input has closed and no fetch
    /// is still on its way.
    pub fn run(&mut self) {
        while !self.stop.load(Ordering::Relaxed) {
            match self.events.recv_timeout(STOP_CHECK_INTERVAL) {
                Ok(event) => self.dispatch(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if self.is_finished() {
                break;
            }
        }
        tracing::debug!(state = ?self.coordinator.state(), "event loop stopped");
    }

    /// With input closed a pending conversation can never appear, so only
    /// an in-flight fetch keeps the loop alive.
    fn is_finished(&self) -> bool {
        self.input_closed && self.coordinator.state() != TriggerState::FetchingUrl
    }

    pub fn dispatch(&mut self, event: Event) {
        match event {
            Event::MessageReceived {
                sender,
                conversation,
                text,
            } => {
                tracing::debug!(%sender, has_conversation = conversation.is_some(), "message received");
                self.coordinator.on_message(&sender, conversation, &text);
            }
            Event::ConversationCreated { conversation, peer } => {
                if self.listeners.is_subscribed(Topic::ConversationCreated) {
                    self.coordinator.on_conversation_created(conversation, &peer);
                } else {
                    tracing::trace!(%conversation, "no listener for conversation-created");
                }
            }
            Event::FetchCompleted {
                conversation,
                outcome,
            } => self.coordinator.on_fetch_complete(&conversation, outcome),
            Event::InputClosed => {
                tracing::debug!("input closed");
                self.input_closed = true;
            }
        }
    }
}
