//! Messaging adapters: where trigger messages come from and replies go.

mod bus;
mod console;

pub use bus::{BusInbox, BusMessenger};
pub use console::{ConsoleInput, ConsoleMessenger};

use crate::events::ConversationHandle;

/// Outbound side of a messaging adapter.
pub trait Messenger {
    /// Send `text` into an open conversation.
    fn send(&self, conversation: &ConversationHandle, text: &str) -> anyhow::Result<()>;
}
