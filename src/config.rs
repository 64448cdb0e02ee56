use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ExitError;
use crate::extract::{DEFAULT_PATTERN, DEFAULT_URL};

/// Config file name constants.
pub const CONFIG_TOML: &str = ".whatsmyip.toml";
pub const CONFIG_JSON: &str = ".whatsmyip.json";

const CONFIG_HEADER: &str =
    "# whatsmyip configuration\n# Reply to the trigger message with this host's external IP\n";

/// Find the config file in `dir`, preferring .whatsmyip.toml over .whatsmyip.json.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let toml_path = dir.join(CONFIG_TOML);
    if toml_path.exists() {
        return Some(toml_path);
    }
    let json_path = dir.join(CONFIG_JSON);
    if json_path.exists() {
        return Some(json_path);
    }
    None
}

/// Per-user config location (`$XDG_CONFIG_HOME/whatsmyip/config.toml`).
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("whatsmyip").join("config.toml"))
}

/// Resolve which config file to use.
///
/// Priority order (highest first):
/// 1. An explicit `--config` path, which must exist
/// 2. `.whatsmyip.toml` / `.whatsmyip.json` in `dir`
/// 3. The per-user config file
///
/// Returns `Ok(None)` when nothing is found; callers fall back to defaults.
pub fn resolve_config(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ExitError::Config(format!("{} does not exist", path.display())).into());
        }
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(path) = find_config(dir) {
        return Ok(Some(path));
    }
    Ok(user_config_path().filter(|p| p.exists()))
}

/// Top-level .whatsmyip.toml config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub bus: BusConfig,
}

/// Where the address comes from and how it is pulled out of the page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchConfig {
    /// URL of a page that echoes the caller's address
    #[serde(default = "default_url")]
    pub url: String,
    /// Regex applied to the page body; the reply is the whole match, or the `ip` group if the pattern names one
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            pattern: default_pattern(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TriggerConfig {
    /// Exact message text that starts a lookup
    #[serde(default = "default_command")]
    pub command: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
        }
    }
}

/// botbus connection used by `whatsmyip run`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BusConfig {
    #[serde(default = "default_agent")]
    pub agent: String,
    /// Channels to watch; empty watches every channel in the inbox
    #[serde(default)]
    pub channels: Vec<String>,
    /// Seconds between inbox polls
    #[serde(default = "default_poll_interval", alias = "pollInterval")]
    pub poll_interval: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            agent: default_agent(),
            channels: Vec::new(),
            poll_interval: default_poll_interval(),
        }
    }
}

// Default value functions for serde
fn default_url() -> String { DEFAULT_URL.into() }
fn default_pattern() -> String { DEFAULT_PATTERN.into() }
fn default_timeout() -> u64 { 30 }
fn default_command() -> String { "ip".into() }
fn default_agent() -> String { "whatsmyip".into() }
fn default_poll_interval() -> u64 { 2 }

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub pattern: Option<String>,
    pub agent: Option<String>,
}

impl Config {
    /// Load config from a file (TOML or JSON, auto-detected by extension).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "toml" => Self::parse_toml(&contents),
            "json" => Self::parse_json(&contents),
            _ => Self::parse_toml(&contents).or_else(|_| Self::parse_json(&contents)),
        }
    }

    /// Load from `path`, or defaults when there is no file.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_TOML}: {e}")).into())
    }

    pub fn parse_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_JSON}: {e}")).into())
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.url {
            self.fetch.url.clone_from(url);
        }
        if let Some(pattern) = &overrides.pattern {
            self.fetch.pattern.clone_from(pattern);
        }
        if let Some(agent) = &overrides.agent {
            self.bus.agent.clone_from(agent);
        }
    }

    /// Problems that would stop the agent from ever answering.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !(self.fetch.url.starts_with("http://") || self.fetch.url.starts_with("https://")) {
            issues.push(format!("fetch.url must be http(s): {:?}", self.fetch.url));
        }
        if let Err(e) = regex::Regex::new(&self.fetch.pattern) {
            issues.push(format!("fetch.pattern does not compile: {e}"));
        }
        if self.fetch.timeout == 0 {
            issues.push("fetch.timeout must be at least 1 second".to_string());
        }
        if self.trigger.command.trim().is_empty() {
            issues.push("trigger.command is empty".to_string());
        }
        if !valid_agent_name(&self.bus.agent) {
            issues.push(format!("bus.agent is not a valid agent name: {:?}", self.bus.agent));
        }
        issues
    }

    /// Serialize config to a TOML string with helpful comments.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let raw = toml::to_string_pretty(self).context("serializing config to TOML")?;

        let mut doc: toml_edit::DocumentMut = raw
            .parse()
            .context("parsing generated TOML for comment injection")?;

        fn set_table_comment(doc: &mut toml_edit::DocumentMut, key: &str, comment: &str) {
            if let Some(tbl) = doc.get_mut(key).and_then(toml_edit::Item::as_table_mut) {
                tbl.decor_mut().set_prefix(comment);
            }
        }

        set_table_comment(&mut doc, "fetch", "\n# Page to fetch and the regex that finds the address in it\n");
        set_table_comment(&mut doc, "trigger", "\n# Message that starts a lookup (exact match)\n");
        set_table_comment(&mut doc, "bus", "\n# botbus identity and polling\n");

        Ok(format!("{CONFIG_HEADER}{doc}"))
    }
}

/// JSON Schema for the config file, for editor completion and validation.
pub fn json_schema() -> anyhow::Result<String> {
    let schema = schemars::schema_for!(Config);
    serde_json::to_string_pretty(&schema).context("serializing config schema")
}

/// Agent names are passed to `bus` as arguments, so keep them to `[a-z0-9-]`.
pub fn valid_agent_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name.len() <= 64
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Source of the settings a request reads at the moment it needs them.
pub trait Preferences {
    fn current(&self) -> Config;
}

impl Preferences for Config {
    fn current(&self) -> Config {
        self.clone()
    }
}

/// Preferences backed by a config file that is re-read on every request, so
/// edits take effect without a restart.
#[derive(Debug)]
pub struct ConfigFile {
    path: Option<PathBuf>,
    overrides: Overrides,
    last_good: Mutex<Config>,
}

impl ConfigFile {
    pub fn open(path: Option<PathBuf>, overrides: Overrides) -> anyhow::Result<Self> {
        let mut config = Config::load_or_default(path.as_deref())?;
        config.apply(&overrides);
        Ok(Self {
            path,
            overrides,
            last_good: Mutex::new(config),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Preferences for ConfigFile {
    fn current(&self) -> Config {
        let mut last_good = self.last_good.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(path) = &self.path else {
            return last_good.clone();
        };
        match Config::load(path) {
            Ok(mut config) => {
                config.apply(&self.overrides);
                *last_good = config.clone();
                config
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "keeping previous config: {e:#}");
                last_good.clone()
            }
        }
    }
}
