//! Config command - inspect configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use commune_fetch::ClientSettings;

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective settings.
    Show,

    /// Show the settings file path.
    Path,

    /// Write the default settings to the settings file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("commune")
        .join("config.json")
}

/// Returns the settings file selected on the command line, or the default.
pub fn settings_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(default_settings_path)
}

/// Loads settings for this invocation.
pub fn load_settings(cli: &Cli) -> Result<ClientSettings> {
    let path = settings_path(cli);
    ClientSettings::load_from(&path).with_context(|| format!("loading {}", path.display()))
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_settings(cli),
        ConfigAction::Path => show_path(cli),
        ConfigAction::Init { force } => init_settings(&settings_path(cli), *force),
    }
}

fn show_settings(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;

    match cli.format {
        OutputFormat::Text => {
            println!("Commune Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("User agent:     {}", settings.user_agent);
            println!("Timeout:        {}s", settings.timeout.as_secs());
            println!("Max redirects:  {}", settings.max_redirects);
            println!("Insecure TLS:   {}", settings.accept_invalid_certs);
            if !settings.default_headers.is_empty() {
                println!();
                println!("Default headers:");
                for (name, value) in &settings.default_headers {
                    println!("  {name}: {value}");
                }
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_path(cli: &Cli) -> Result<()> {
    let path = settings_path(cli);

    match cli.format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let paths = serde_json::json!({
                "settings_file": path.display().to_string(),
                "exists": path.exists(),
            });
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

fn init_settings(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&ClientSettings::default())?;
    std::fs::write(path, content)?;

    println!("Wrote {}", path.display());
    Ok(())
}
