//! `storytalk config` subcommands.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use storytalk_config::{
    apply_all_defaults, apply_env_keys, collect_redacted_paths, load_and_prepare, load_config,
    redact, validate, write_config, StorytalkConfig,
};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Write a config file populated with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config with secrets masked
    Show,
    /// Check the config file and report problems
    Validate,
}

pub async fn run(command: ConfigCommand, path: &Path) -> Result<()> {
    match command {
        ConfigCommand::Init { force } => init(path, force).await,
        ConfigCommand::Show => show(path).await,
        ConfigCommand::Validate => check(path).await,
    }
}

async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        note_warn(&format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        ));
        return Ok(());
    }
    let config = apply_all_defaults(StorytalkConfig::default());
    write_config(&config, path).await?;
    note_success(&format!("Wrote {}", path.display()));
    note_info("Set ANTHROPIC_API_KEY and OPENAI_API_KEY, or add apiKey under providers.");
    Ok(())
}

async fn show(path: &Path) -> Result<()> {
    let config = load_and_prepare(path).await?;
    let value = serde_json::to_value(&config).context("Failed to serialize config")?;
    let masked = collect_redacted_paths(&value);

    note_info(&format!("Config file: {}", path.display()));
    println!("{}", serde_json::to_string_pretty(&redact(&value))?);
    if !masked.is_empty() {
        note_info(&format!("Masked: {}", masked.join(", ")));
    }
    Ok(())
}

async fn check(path: &Path) -> Result<()> {
    let config = apply_all_defaults(apply_env_keys(load_config(path).await?));
    let report = validate(&config);

    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
    if !report.is_valid() {
        bail!("{} config error(s) in {}", report.errors.len(), path.display());
    }
    note_success(&format!("{} is valid", path.display()));
    Ok(())
}
