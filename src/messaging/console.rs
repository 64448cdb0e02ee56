use std::io::{BufRead, Write};
use std::sync::mpsc::Sender;

use super::Messenger;
use crate::events::{ConversationHandle, Event};

/// Sender name and conversation used for console input.
pub const CONSOLE: &str = "console";

/// Prints replies on stdout, one per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMessenger;

impl Messenger for ConsoleMessenger {
    fn send(&self, _conversation: &ConversationHandle, text: &str) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{text}")?;
        stdout.flush()?;
        Ok(())
    }
}

/// Feeds lines from a reader (normally stdin) to the event loop as messages
/// in an already open conversation.
pub struct ConsoleInput<R> {
    reader: R,
}

impl<R: BufRead> ConsoleInput<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Forward every line, then [`Event::InputClosed`] at end of input.
    pub fn pump(self, events: &Sender<Event>) {
        for line in self.reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("reading input: {e}");
                    break;
                }
            };
            let event = Event::MessageReceived {
                sender: CONSOLE.to_string(),
                conversation: Some(ConversationHandle::new(CONSOLE)),
                text: line.trim_end().to_string(),
            };
            if events.send(event).is_err() {
                return;
            }
        }
        let _ = events.send(Event::InputClosed);
    }
}
