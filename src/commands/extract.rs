use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use super::ConfigArgs;
use crate::error::ExitError;
use crate::extract::extract;

#[derive(Debug, Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// File to search (default: stdin)
    pub file: Option<PathBuf>,
}

impl ExtractArgs {
    /// Run the configured pattern over a saved page, for testing patterns
    /// without hitting the network.
    pub fn execute(&self) -> anyhow::Result<()> {
        let config = self.config.load()?;
        let text = match &self.file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("reading stdin")?;
                buf
            }
        };

        let found = extract(&config.fetch.pattern, &text)
            .map_err(|e| ExitError::Config(e.to_string()))?;
        match found {
            Some(m) => {
                println!("{m}");
                Ok(())
            }
            None => Err(ExitError::NoMatch {
                pattern: config.fetch.pattern,
            }
            .into()),
        }
    }
}
