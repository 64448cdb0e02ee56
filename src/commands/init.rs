use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{self, CONFIG_TOML, Config};
use crate::error::ExitError;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Write the per-user config instead of ./.whatsmyip.toml
    #[arg(long)]
    pub user: bool,
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn execute(&self) -> Result<()> {
        let path = self.target()?;
        if path.exists() && !self.force {
            return Err(ExitError::Other(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            ))
            .into());
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let contents = Config::default().to_toml()?;
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote config");
        eprintln!("Wrote {}", path.display());
        Ok(())
    }

    fn target(&self) -> Result<PathBuf> {
        if self.user {
            return config::user_config_path()
                .ok_or_else(|| anyhow::anyhow!("could not determine the user config directory"));
        }
        Ok(PathBuf::from(CONFIG_TOML))
    }
}
