//! Error classification cascade.
//!
//! Four independent classifiers inspect every completed request, in order:
//!
//! 1. [`check_http`] - transport failures, login redirects, Family View, status >= 400
//! 2. [`check_community`] - the site's generic "Sorry!" page and anonymous sign-in page
//! 3. [`check_trade`] - inline `error_msg` containers
//! 4. [`check_json`] - empty or undecodable JSON payloads
//!
//! Every enabled classifier always runs so the completed event can report
//! all verdicts. [`CascadeReport::outcome`] then picks the single error that
//! is delivered: the first of 1-3 that fired, else 4.

use std::sync::LazyLock;

use commune_core::{RequestError, RequestOptions, ResponseEnvelope, ResponseFormat, TransportError};
use regex::Regex;

// ============================================================================
// Site markers
// ============================================================================

/// Path fragment of the sign-in page.
const LOGIN_PATH: &str = "/login";

/// Prompt shown when an account is locked behind Family View.
const FAMILY_VIEW_PROMPT: &str =
    r#"<div id="parental_notice_instructions">Enter your PIN below to exit Family View.</div>"#;

/// Heading of the generic error page.
const SORRY_HEADING: &str = "<h1>Sorry!</h1>";

/// Message used when the error page has no `<h3>`.
const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Script marker rendered for anonymous sessions.
const ANONYMOUS_MARKER: &str = "g_steamID = false;";

/// Title of the sign-in page.
const SIGN_IN_TITLE: &str = "<title>Sign In</title>";

static ERROR_PAGE_MESSAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<h3>(.+)</h3>").expect("valid regex"));

static INLINE_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div id="error_msg">\s*([^<]+)\s*</div>"#).expect("valid regex")
});

// ============================================================================
// Classifier Toggles
// ============================================================================

/// Which classifiers run for a request. Disabled ones are skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierToggles {
    /// Transport/HTTP classifier.
    pub http: bool,
    /// Generic error-page classifier.
    pub community: bool,
    /// Inline error-message classifier.
    pub trade: bool,
    /// Malformed-JSON classifier.
    pub json: bool,
}

impl Default for ClassifierToggles {
    fn default() -> Self {
        Self {
            http: true,
            community: true,
            trade: true,
            json: true,
        }
    }
}

impl ClassifierToggles {
    /// Reads the `check*` options. Only an explicit `false` disables.
    pub fn from_options(options: &RequestOptions) -> Self {
        Self {
            http: options.check_http_error != Some(false),
            community: options.check_community_error != Some(false),
            trade: options.check_trade_error != Some(false),
            json: options.check_json_error != Some(false),
        }
    }
}

// ============================================================================
// Classifiers
// ============================================================================

/// Classifier 1: transport errors and status-level failures.
pub fn check_http(result: Result<&ResponseEnvelope, &TransportError>) -> Option<RequestError> {
    let response = match result {
        Ok(response) => response,
        Err(err) => return Some(RequestError::Transport(err.clone())),
    };

    if response.is_redirect() && response.location().is_some_and(|l| l.contains(LOGIN_PATH)) {
        return Some(RequestError::NotLoggedIn);
    }

    if response.status == 403 && response.text().is_some_and(|t| t.contains(FAMILY_VIEW_PROMPT)) {
        return Some(RequestError::FamilyViewRestricted);
    }

    if response.status >= 400 {
        return Some(RequestError::Http {
            status: response.status,
        });
    }

    None
}

/// Classifier 2: the generic error page and the anonymous sign-in page.
pub fn check_community(html: Option<&str>) -> Option<RequestError> {
    let html = html?;

    if html.contains(SORRY_HEADING) {
        let message = ERROR_PAGE_MESSAGE_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .map_or(UNKNOWN_ERROR, |m| m.as_str());
        return Some(RequestError::Community(message.to_string()));
    }

    if html.contains(ANONYMOUS_MARKER) && html.contains(SIGN_IN_TITLE) {
        return Some(RequestError::NotLoggedIn);
    }

    None
}

/// Classifier 3: inline error containers.
pub fn check_trade(html: Option<&str>) -> Option<RequestError> {
    let captures = INLINE_ERROR_RE.captures(html?)?;
    let message = captures.get(1)?.as_str().trim();
    Some(RequestError::Domain(message.to_string()))
}

/// Classifier 4: JSON expected but the decoded payload is empty.
///
/// With no response at all (transport failure) the payload counts as empty.
pub fn check_json(response: Option<&ResponseEnvelope>) -> Option<RequestError> {
    match response {
        Some(response) if !response.body.is_falsy_json() => None,
        _ => Some(RequestError::MalformedResponse),
    }
}

// ============================================================================
// Cascade
// ============================================================================

/// The error chosen for delivery, tagged with the classifier that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationOutcome {
    /// No classifier fired.
    None,
    /// Classifier 1.
    Transport(RequestError),
    /// Classifier 2.
    GenericSite(RequestError),
    /// Classifier 3.
    DomainSpecific(RequestError),
    /// Classifier 4.
    MalformedPayload(RequestError),
}

impl ClassificationOutcome {
    /// Returns the error, if any.
    pub fn error(&self) -> Option<&RequestError> {
        match self {
            Self::None => None,
            Self::Transport(err)
            | Self::GenericSite(err)
            | Self::DomainSpecific(err)
            | Self::MalformedPayload(err) => Some(err),
        }
    }

    /// Consumes the outcome and returns the error, if any.
    pub fn into_error(self) -> Option<RequestError> {
        match self {
            Self::None => None,
            Self::Transport(err)
            | Self::GenericSite(err)
            | Self::DomainSpecific(err)
            | Self::MalformedPayload(err) => Some(err),
        }
    }

    /// Returns true if no classifier fired.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Verdicts of all four classifiers for one request.
///
/// `None` means the classifier was disabled, not applicable, or found
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Classifier 1 verdict.
    pub http_error: Option<RequestError>,
    /// Classifier 2 verdict.
    pub community_error: Option<RequestError>,
    /// Classifier 3 verdict.
    pub trade_error: Option<RequestError>,
    /// Classifier 4 verdict.
    pub json_error: Option<RequestError>,
}

impl CascadeReport {
    /// Picks the delivered error by priority.
    pub fn outcome(&self) -> ClassificationOutcome {
        if let Some(err) = &self.http_error {
            ClassificationOutcome::Transport(err.clone())
        } else if let Some(err) = &self.community_error {
            ClassificationOutcome::GenericSite(err.clone())
        } else if let Some(err) = &self.trade_error {
            ClassificationOutcome::DomainSpecific(err.clone())
        } else if let Some(err) = &self.json_error {
            ClassificationOutcome::MalformedPayload(err.clone())
        } else {
            ClassificationOutcome::None
        }
    }

    /// Not-logged-in detections that must raise the session-expiry signal.
    pub fn session_expirations(&self) -> impl Iterator<Item = &RequestError> {
        [&self.http_error, &self.community_error]
            .into_iter()
            .flatten()
            .filter(|err| err.is_not_logged_in())
    }

    /// Returns true if any classifier fired.
    pub fn has_error(&self) -> bool {
        !self.outcome().is_none()
    }
}

/// Runs every enabled classifier against a completed request.
pub fn run_cascade(
    result: Result<&ResponseEnvelope, &TransportError>,
    format: ResponseFormat,
    toggles: ClassifierToggles,
) -> CascadeReport {
    let response = result.ok();
    let expects_json = format == ResponseFormat::Json;
    let html = if expects_json {
        None
    } else {
        response.and_then(ResponseEnvelope::text)
    };

    CascadeReport {
        http_error: toggles.http.then(|| check_http(result)).flatten(),
        community_error: (toggles.community && !expects_json)
            .then(|| check_community(html))
            .flatten(),
        trade_error: (toggles.trade && !expects_json)
            .then(|| check_trade(html))
            .flatten(),
        json_error: (toggles.json && expects_json)
            .then(|| check_json(response))
            .flatten(),
    }
}

// ============================================================================
// Tests
// ============================================================================
