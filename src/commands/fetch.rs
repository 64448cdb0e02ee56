use std::time::Duration;

use clap::Args;

use super::ConfigArgs;
use crate::error::ExitError;
use crate::events::FetchOutcome;
use crate::extract::extract;
use crate::transport::HttpClient;

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl FetchArgs {
    /// Fetch once and print the extracted address.
    pub fn execute(&self) -> anyhow::Result<()> {
        let config = self.config.load()?;
        let client = HttpClient::new(Duration::from_secs(config.fetch.timeout));

        tracing::info!(url = %config.fetch.url, "fetching");
        let body = match client.get(&config.fetch.url) {
            FetchOutcome::Body { text, len } => {
                tracing::info!(len, "fetch complete");
                text
            }
            FetchOutcome::Failed(e) => return Err(ExitError::Other(e.0).into()),
        };

        let found = extract(&config.fetch.pattern, &body)
            .map_err(|e| ExitError::Config(e.to_string()))?;
        match found {
            Some(ip) => {
                println!("{ip}");
                Ok(())
            }
            None => Err(ExitError::NoMatch {
                pattern: config.fetch.pattern,
            }
            .into()),
        }
    }
}
