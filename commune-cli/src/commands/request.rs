//! Get/post commands - send one request and print the result.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use commune_core::FormField;
use commune_fetch::{
    ClientListener, ClientSettings, CommunityClient, Delivery, RequestCompleted, RequestError,
    RequestOptions, ReqwestTransport,
};
use tracing::debug;
use url::Url;

use super::config::load_settings;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the get and post commands.
#[derive(Args, Debug, Default)]
pub struct RequestArgs {
    /// Target URL.
    pub url: String,

    /// Request header as "Name: value" (repeatable).
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Query parameter as key=value (repeatable).
    #[arg(long = "query")]
    pub query: Vec<String>,

    /// URL-encoded form field as key=value (repeatable).
    #[arg(long = "form")]
    pub form: Vec<String>,

    /// Multipart text field as key=value (repeatable).
    #[arg(long = "field")]
    pub fields: Vec<String>,

    /// Multipart file as name=path[;type=mime] (repeatable).
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Raw request body.
    #[arg(long)]
    pub data: Option<String>,

    /// Cookie for the target URL as name=value (repeatable).
    #[arg(long = "cookie")]
    pub cookies: Vec<String>,

    /// Expect a JSON response.
    #[arg(long)]
    pub json: bool,

    /// Keep the response body as raw bytes.
    #[arg(long, conflicts_with = "json")]
    pub binary: bool,

    /// Label reported to hooks and listeners.
    #[arg(long)]
    pub source: Option<String>,

    /// Do not follow redirects.
    #[arg(long)]
    pub no_follow: bool,

    /// Accept invalid TLS certificates.
    #[arg(long)]
    pub insecure: bool,

    /// Request timeout in milliseconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip an error classifier (repeatable).
    #[arg(long = "skip-check", value_enum)]
    pub skip_checks: Vec<Check>,

    /// Present as a desktop browser.
    #[arg(long)]
    pub browser: bool,

    /// Override the user agent.
    #[arg(long)]
    pub user_agent: Option<String>,
}

/// Error classifiers that can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Check {
    /// Transport and status errors.
    Http,
    /// Generic error pages.
    Community,
    /// Inline error messages.
    Trade,
    /// Empty JSON payloads.
    Json,
}

// ============================================================================
// Listener
// ============================================================================

/// Keeps the completed event for output and reports session expiry.
struct CompletionRecorder {
    quiet: bool,
    completed: Mutex<Option<RequestCompleted>>,
}

impl CompletionRecorder {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            completed: Mutex::new(None),
        }
    }

    fn take(&self) -> Option<RequestCompleted> {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl ClientListener for CompletionRecorder {
    fn on_session_expired(&self, error: &RequestError) {
        if !self.quiet {
            eprintln!("warning: session expired ({error}); log in again and refresh cookies");
        }
    }

    fn on_request_completed(&self, event: &RequestCompleted) {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner) = Some(event.clone());
    }
}

// ============================================================================
// Command
// ============================================================================

/// Runs a get or post command.
pub async fn run(method: &str, args: &RequestArgs, cli: &Cli) -> Result<ExitCode> {
    let settings = apply_overrides(load_settings(cli)?, args);

    let transport = Arc::new(ReqwestTransport::with_settings(settings)?);
    if !args.cookies.is_empty() {
        let url = Url::parse(&args.url).with_context(|| format!("invalid url {}", args.url))?;
        transport.set_cookies(&args.cookies, &url);
    }

    let recorder = Arc::new(CompletionRecorder::new(cli.quiet));
    let client = CommunityClient::builder()
        .transport(transport)
        .listener(recorder.clone())
        .build()?;

    let options = build_options(method, args).await?;
    debug!(method, url = %args.url, "Sending request");

    let delivery = client.http_request(options, args.source.as_deref()).await;
    let event = recorder.take();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let output = formatter.format_delivery(&delivery, event.as_ref(), cli.verbose);
            if !output.is_empty() {
                println!("{output}");
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_delivery(&delivery, event.as_ref())?);
        }
    }

    Ok(exit_code(&delivery))
}

fn apply_overrides(mut settings: ClientSettings, args: &RequestArgs) -> ClientSettings {
    if args.browser {
        let browser = ClientSettings::browser_like();
        settings.user_agent = browser.user_agent;
        for (name, value) in browser.default_headers {
            settings.default_headers.entry(name).or_insert(value);
        }
    }
    if let Some(user_agent) = &args.user_agent {
        settings.user_agent.clone_from(user_agent);
    }
    settings
}

/// Builds request options from command-line arguments.
async fn build_options(method: &str, args: &RequestArgs) -> Result<RequestOptions> {
    let mut options = RequestOptions::for_url(&args.url).method(method);

    for header in &args.headers {
        let (name, value) = split_pair(header, ':')?;
        options = options.header(name, value);
    }
    for pair in &args.query {
        let (key, value) = split_pair(pair, '=')?;
        options = options.query(key, value);
    }
    for pair in &args.form {
        let (key, value) = split_pair(pair, '=')?;
        options = options.form_field(key, value);
    }
    for pair in &args.fields {
        let (key, value) = split_pair(pair, '=')?;
        options = options.multipart_field(key, value);
    }
    for field_arg in &args.files {
        let (name, field) = read_file_field(field_arg).await?;
        options = options.multipart_field(name, field);
    }
    if let Some(data) = &args.data {
        options = options.body(data.as_str());
    }

    if args.json {
        options = options.json();
    }
    if args.binary {
        options = options.binary();
    }
    if args.no_follow {
        options = options.follow_redirect(false);
    }
    if args.insecure {
        options = options.reject_unauthorized(false);
    }
    if let Some(millis) = args.timeout {
        options = options.timeout(Duration::from_millis(millis));
    }

    for check in &args.skip_checks {
        options = match check {
            Check::Http => options.check_http_error(false),
            Check::Community => options.check_community_error(false),
            Check::Trade => options.check_trade_error(false),
            Check::Json => options.check_json_error(false),
        };
    }

    Ok(options)
}

/// Splits `key<sep>value`, trimming both sides.
fn split_pair(input: &str, separator: char) -> Result<(String, String)> {
    let (key, value) = input
        .split_once(separator)
        .with_context(|| format!("expected key{separator}value, got {input:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("empty key in {input:?}");
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Reads a `name=path[;type=mime]` file field.
async fn read_file_field(field_arg: &str) -> Result<(String, FormField)> {
    let (name, rest) = split_pair(field_arg, '=')?;
    let (path, content_type) = match rest.split_once(";type=") {
        Some((path, content_type)) => (path, Some(content_type)),
        None => (rest.as_str(), None),
    };

    let path = Path::new(path);
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());

    let field = match content_type {
        Some(content_type) => FormField::file(bytes, filename, content_type),
        None => FormField::Detailed {
            value: bytes.into(),
            options: commune_core::FormFieldOptions {
                content_type: None,
                filename: Some(filename),
            },
        },
    };

    Ok((name, field))
}

/// Maps a delivery to the process exit code.
fn exit_code(delivery: &Delivery) -> ExitCode {
    let Err(failure) = delivery else {
        return ExitCode::Success;
    };

    match &failure.error {
        RequestError::NotLoggedIn => ExitCode::NotLoggedIn,
        RequestError::Transport(err) if err.is_timeout() => ExitCode::Timeout,
        RequestError::FamilyViewRestricted
        | RequestError::Http { .. }
        | RequestError::Community(_)
        | RequestError::Domain(_)
        | RequestError::MalformedResponse => ExitCode::SiteError,
        _ => ExitCode::Error,
    }
}

// ============================================================================
// Tests
// ============================================================================
