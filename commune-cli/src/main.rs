// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Commune CLI - community-site requests from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Fetch a page
//! commune get https://steamcommunity.com/market/
//!
//! # Expect JSON and print the full result as JSON
//! commune get https://steamcommunity.com/market/priceoverview/ \
//!     --query appid=730 --json --format json --pretty
//!
//! # Post a form with a session cookie
//! commune post https://steamcommunity.com/actions/AddFriendAjax \
//!     --cookie sessionid=abc --form sessionid=abc --form steamid=76561197960287930
//!
//! # Show effective settings
//! commune config show
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{config, request};

// ============================================================================
// CLI Definition
// ============================================================================

/// Commune CLI - community-site requests.
#[derive(Parser)]
#[command(name = "commune")]
#[command(about = "Community-site HTTP client")]
#[command(long_about = r#"
Commune sends requests the way a logged-in browser session would and
classifies the site's error pages into readable errors.

Examples:
  commune get https://steamcommunity.com/market/
  commune get <url> --json --format json     # JSON in, JSON out
  commune post <url> --form key=value        # URL-encoded form
  commune post <url> --file avatar=./a.png   # multipart upload
  commune config path                        # where settings live
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file (defaults to <config dir>/commune/config.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Send a GET request.
    #[command(visible_alias = "g")]
    Get(request::RequestArgs),

    /// Send a POST request.
    #[command(visible_alias = "p")]
    Post(request::RequestArgs),

    /// Inspect configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// The session is not logged in.
    NotLoggedIn = 2,
    /// The site answered with an error status or error page.
    SiteError = 3,
    /// The transport timed out.
    Timeout = 4,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("commune=debug,info")
    } else {
        EnvFilter::new("commune=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Get(args) => request::run("GET", args, &cli).await,
        Commands::Post(args) => request::run("POST", args, &cli).await,
        Commands::Config(args) => config::run(args, &cli).map(|()| ExitCode::Success),
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
