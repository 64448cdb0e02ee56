use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use clap::Args;

use super::ConfigArgs;
use crate::config::{ConfigFile, Preferences};
use crate::coordinator::Coordinator;
use crate::error::ExitError;
use crate::events::{Event, Listeners};
use crate::messaging::{BusInbox, BusMessenger, ConsoleInput, ConsoleMessenger, Messenger};
use crate::runtime::Runtime;
use crate::transport::{HttpClient, HttpTransport};

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Agent name override (bus.agent)
    #[arg(long)]
    pub agent: Option<String>,
    /// Read messages from stdin and print replies instead of using botbus
    #[arg(long)]
    pub console: bool,
}

impl RunArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let path = self.config.resolve_path()?;
        let prefs = ConfigFile::open(path, self.config.overrides(self.agent.as_deref()))?;
        let config = prefs.current();

        let issues = config.validate();
        if !issues.is_empty() {
            return Err(ExitError::Config(issues.join("; ")).into());
        }
        match prefs.path() {
            Some(path) => tracing::info!(path = %path.display(), "using config file"),
            None => tracing::info!("no config file found, using defaults"),
        }

        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        register_stop_handler(&stop);

        let client = HttpClient::new(Duration::from_secs(config.fetch.timeout));
        let transport = HttpTransport::new(client, tx.clone());

        if self.console {
            tracing::info!(trigger = %config.trigger.command, "reading messages from stdin");
            std::thread::Builder::new()
                .name("console".into())
                .spawn(move || ConsoleInput::new(std::io::stdin().lock()).pump(&tx))?;
            event_loop(ConsoleMessenger, transport, prefs, rx, stop);
        } else {
            tracing::info!(
                agent = %config.bus.agent,
                channels = ?config.bus.channels,
                trigger = %config.trigger.command,
                "watching bus inbox"
            );
            BusInbox::new(&config.bus).spawn(
                Duration::from_secs(config.bus.poll_interval.max(1)),
                tx,
                Arc::clone(&stop),
            )?;
            event_loop(BusMessenger::new(&config.bus.agent), transport, prefs, rx, stop);
        }
        Ok(())
    }
}

fn event_loop<M: Messenger>(
    messenger: M,
    transport: HttpTransport,
    prefs: ConfigFile,
    events: Receiver<Event>,
    stop: Arc<AtomicBool>,
) {
    let listeners = Listeners::new();
    let coordinator = Coordinator::new(messenger, transport, prefs, listeners.clone());
    Runtime::new(coordinator, listeners, events, stop).run();
}

/// Ctrl-C ends the event loop at its next check instead of killing the process.
fn register_stop_handler(stop: &Arc<AtomicBool>) {
    let stop = Arc::clone(stop);
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("Received interrupt signal, shutting down...");
        stop.store(true, Ordering::Relaxed);
    }) {
        tracing::warn!("could not install Ctrl-C handler: {e}");
    }
}
