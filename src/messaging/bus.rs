use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;

use serde::Deserialize;

use super::Messenger;
use crate::config::BusConfig;
use crate::error::ExitError;
use crate::events::{ConversationHandle, Event};
use crate::subprocess::Tool;

const BUS_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Message JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BusMessage {
    #[serde(default)]
    agent: String,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct InboxChannel {
    channel: String,
    #[serde(default)]
    messages: Vec<BusMessage>,
}

#[derive(Debug, Deserialize)]
struct InboxResponse {
    #[serde(default)]
    channels: Vec<InboxChannel>,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Sends replies with `bus send`. Each bus channel is one conversation.
#[derive(Debug, Clone)]
pub struct BusMessenger {
    agent: String,
}

impl BusMessenger {
    pub fn new(agent: &str) -> Self {
        Self {
            agent: agent.to_string(),
        }
    }
}

impl Messenger for BusMessenger {
    fn send(&self, conversation: &ConversationHandle, text: &str) -> anyhow::Result<()> {
        Tool::new("bus")
            .args(&["send", "--agent", &self.agent, conversation.as_str(), text])
            .timeout(BUS_TIMEOUT)
            .run_ok()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Polls `bus inbox` and turns unread messages into events.
///
/// A channel becomes an open conversation the first time a message arrives
/// on it. That first message is delivered without a conversation and is
/// followed by a conversation-created event naming its sender.
#[derive(Debug)]
pub struct BusInbox {
    agent: String,
    channels: Vec<String>,
    open: HashSet<String>,
}

impl BusInbox {
    pub fn new(config: &BusConfig) -> Self {
        Self {
            agent: config.agent.clone(),
            channels: config.channels.clone(),
            open: HashSet::new(),
        }
    }

    /// Fetch unread messages, mark them read and return the events they produce.
    pub fn poll(&mut self) -> anyhow::Result<Vec<Event>> {
        let channels = self.channels.join(",");
        let mut args = vec!["inbox", "--agent", &self.agent, "--format", "json"];
        if !channels.is_empty() {
            args.push("--channels");
            args.push(&channels);
        }
        let output = Tool::new("bus").args(&args).timeout(BUS_TIMEOUT).run_ok()?;
        let inbox: InboxResponse = output.parse_json()?;

        for channel in &inbox.channels {
            if channel.messages.is_empty() {
                continue;
            }
            if let Err(e) = Tool::new("bus")
                .args(&["mark-read", "--agent", &self.agent, &channel.channel])
                .timeout(BUS_TIMEOUT)
                .run_ok()
            {
                tracing::warn!(channel = %channel.channel, "mark-read failed: {e:#}");
            }
        }

        Ok(self.events_from(inbox))
    }

    fn events_from(&mut self, inbox: InboxResponse) -> Vec<Event> {
        let mut events = Vec::new();
        for channel in inbox.channels {
            for message in channel.messages {
                if message.agent == self.agent {
                    continue;
                }
                let handle = ConversationHandle::new(channel.channel.as_str());
                if self.open.contains(&channel.channel) {
                    events.push(Event::MessageReceived {
                        sender: message.agent,
                        conversation: Some(handle),
                        text: message.body,
                    });
                } else {
                    self.open.insert(channel.channel.clone());
                    events.push(Event::MessageReceived {
                        sender: message.agent.clone(),
                        conversation: None,
                        text: message.body,
                    });
                    events.push(Event::ConversationCreated {
                        conversation: handle,
                        peer: message.agent,
                    });
                }
            }
        }
        events
    }

    /// Poll on a background thread until `stop` is set or the event loop
    /// goes away. A missing `bus` binary ends polling and closes input.
    pub fn spawn(
        mut self,
        interval: Duration,
        events: Sender<Event>,
        stop: Arc<AtomicBool>,
    ) -> std::io::Result<std::thread::JoinHandle<()>> {
        std::thread::Builder::new().name("bus-inbox".into()).spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                match self.poll() {
                    Ok(batch) => {
                        for event in batch {
                            if events.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        if matches!(e.downcast_ref::<ExitError>(), Some(ExitError::ToolNotFound { .. })) {
                            tracing::error!("{e}");
                            let _ = events.send(Event::InputClosed);
                            return;
                        }
                        tracing::warn!("bus inbox poll failed: {e:#}");
                    }
                }
                std::thread::sleep(interval);
            }
        })
    }
}
