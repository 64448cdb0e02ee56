pub mod doctor;
pub mod extract;
pub mod fetch;
pub mod init;
pub mod run;

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::config::{self, Config, Overrides};

/// Config selection and overrides shared by commands that fetch.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Config file (default: ./.whatsmyip.toml, then the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// URL to fetch, overriding fetch.url
    #[arg(long)]
    pub url: Option<String>,
    /// Extraction regex, overriding fetch.pattern
    #[arg(long)]
    pub pattern: Option<String>,
}

impl ConfigArgs {
    /// Locate the config file that applies to the current directory.
    pub fn resolve_path(&self) -> anyhow::Result<Option<PathBuf>> {
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        config::resolve_config(self.config.as_deref(), &cwd)
    }

    pub fn overrides(&self, agent: Option<&str>) -> Overrides {
        Overrides {
            url: self.url.clone(),
            pattern: self.pattern.clone(),
            agent: agent.map(str::to_string),
        }
    }

    /// Load the effective config once, with overrides applied.
    pub fn load(&self) -> anyhow::Result<Config> {
        let path = self.resolve_path()?;
        if let Some(ref p) = path {
            tracing::debug!(path = %p.display(), "using config");
        }
        let mut config = Config::load_or_default(path.as_deref())?;
        config.apply(&self.overrides(None));
        Ok(config)
    }
}
