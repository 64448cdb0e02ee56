use std::io::IsTerminal;

use clap::Args;
use serde::{Deserialize, Serialize};

use super::ConfigArgs;
use crate::config::Config;
use crate::error::ExitError;
use crate::subprocess::Tool;

#[derive(Debug, Args)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Text,
    Json,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DoctorReport {
    pub config: ConfigStatus,
    pub bus: ToolStatus,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigStatus {
    pub path: Option<String>,
    pub url: String,
    pub pattern: String,
    pub trigger: String,
    pub agent: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolStatus {
    pub name: String,
    pub version: Option<String>,
    pub present: bool,
}

impl DoctorArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let path = self.config.resolve_path()?;
        let mut config = Config::load_or_default(path.as_deref())?;
        config.apply(&self.config.overrides(None));

        let format = self.format.unwrap_or_else(|| {
            if std::io::stdout().is_terminal() {
                OutputFormat::Pretty
            } else {
                OutputFormat::Text
            }
        });

        let report = build_report(&config, path.map(|p| p.display().to_string()), check_bus());
        let issue_count = report.issues.len();

        match format {
            OutputFormat::Pretty => print_pretty(&report),
            OutputFormat::Text => print_text(&report),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        if issue_count > 0 {
            return Err(ExitError::DoctorFailed(issue_count).into());
        }
        Ok(())
    }
}

fn check_bus() -> ToolStatus {
    let output = Tool::new("bus").arg("--version").run();
    ToolStatus {
        name: "botbus (bus)".to_string(),
        version: output
            .as_ref()
            .ok()
            .filter(|o| o.success())
            .map(|o| o.stdout.trim().to_string()),
        present: output.is_ok(),
    }
}

fn build_report(config: &Config, path: Option<String>, bus: ToolStatus) -> DoctorReport {
    let issues = config.validate();

    let mut advice = Vec::new();
    if path.is_none() {
        advice.push("No config file found; using defaults. Run `whatsmyip init` to create one.".to_string());
    }
    if !bus.present {
        advice.push("bus is not installed; `whatsmyip run --console` still works.".to_string());
    }

    DoctorReport {
        config: ConfigStatus {
            path,
            url: config.fetch.url.clone(),
            pattern: config.fetch.pattern.clone(),
            trigger: config.trigger.command.clone(),
            agent: config.bus.agent.clone(),
        },
        bus,
        issues,
        advice: if advice.is_empty() { None } else { Some(advice) },
    }
}

fn print_pretty(report: &DoctorReport) {
    println!("=== whatsmyip doctor ===\n");
    println!("Config:  {}", report.config.path.as_deref().unwrap_or("(defaults)"));
    println!("URL:     {}", report.config.url);
    println!("Pattern: {}", report.config.pattern);
    println!("Trigger: {}", report.config.trigger);
    println!("Agent:   {}", report.config.agent);
    println!();

    if report.bus.present {
        println!("  ✓ {}: {}", report.bus.name, report.bus.version.as_deref().unwrap_or("OK"));
    } else {
        println!("  ✗ {}: NOT FOUND", report.bus.name);
    }

    if let Some(advice) = &report.advice {
        println!();
        for line in advice {
            println!("  → {line}");
        }
    }

    if report.issues.is_empty() {
        println!("\n✓ No issues found");
    } else {
        println!("\nIssues ({}):", report.issues.len());
        for issue in &report.issues {
            println!("  • {issue}");
        }
    }
}

fn print_text(report: &DoctorReport) {
    println!(
        "whatsmyip-doctor  config={}  agent={}  trigger={}",
        report.config.path.as_deref().unwrap_or("-"),
        report.config.agent,
        report.config.trigger
    );
    println!("url  {}", report.config.url);
    println!("pattern  {}", report.config.pattern);
    let status = if report.bus.present { "ok" } else { "missing" };
    println!("tool  {}  {status}", report.bus.name);

    if !report.issues.is_empty() {
        println!("issues  count={}", report.issues.len());
        for issue in &report.issues {
            println!("issue  {issue}");
        }
    }
}
