use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::error::FetchError;
use crate::events::{ConversationHandle, Event, FetchOutcome};

/// Issues a fetch and reports back later with [`Event::FetchCompleted`]
/// carrying the same conversation.
pub trait Transport {
    fn fetch(&self, url: &str, conversation: ConversationHandle);
}

/// Blocking HTTP GET with a global timeout.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }

    /// Fetch `url` and return its body. Non-2xx statuses are errors.
    pub fn get(&self, url: &str) -> FetchOutcome {
        let result = self
            .agent
            .get(url)
            .call()
            .and_then(|response| response.into_body().read_to_string());
        match result {
            Ok(text) => FetchOutcome::body(text),
            Err(e) => FetchOutcome::Failed(FetchError::from(e)),
        }
    }
}

/// Runs each fetch on its own thread and posts the outcome to the event loop.
#[derive(Clone)]
pub struct HttpTransport {
    client: HttpClient,
    events: Sender<Event>,
}

impl HttpTransport {
    pub const fn new(client: HttpClient, events: Sender<Event>) -> Self {
        Self { client, events }
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str, conversation: ConversationHandle) {
        let client = self.client.clone();
        let events = self.events.clone();
        let url = url.to_string();
        let context = conversation.clone();

        let spawned = std::thread::Builder::new()
            .name("fetch".into())
            .spawn(move || {
                let outcome = client.get(&url);
                if events
                    .send(Event::FetchCompleted {
                        conversation: context,
                        outcome,
                    })
                    .is_err()
                {
                    tracing::debug!(%url, "event loop gone, dropping fetch result");
                }
            });

        if let Err(e) = spawned {
            tracing::error!("spawning fetch thread: {e}");
            let _ = self.events.send(Event::FetchCompleted {
                conversation,
                outcome: FetchOutcome::failed(format!("could not start fetch: {e}")),
            });
        }
    }
}
