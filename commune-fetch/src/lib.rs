// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Commune Fetch
//!
//! Request orchestration for community-site clients.
//!
//! Every request made through [`CommunityClient`] follows the same path:
//!
//! - [`descriptor`] - options bag to transport-agnostic descriptor
//! - [`hook`] - optional pre-request hook that may delay or veto the request
//! - [`transport`] - the [`Transport`] seam and response decoding
//! - [`classify`] - four-stage error classification cascade
//! - [`events`] - session-expiry and request-completed listeners
//!
//! The default transport lives in [`host`] and is built on reqwest with a
//! shared cookie jar.
//!
//! ## Example
//!
//! ```ignore
//! use commune_fetch::{CommunityClient, ClientSettings, RequestOptions};
//!
//! let client = CommunityClient::with_settings(ClientSettings::browser_like())?;
//!
//! let response = client
//!     .get("https://steamcommunity.com/market/", RequestOptions::new(), Some("market"))
//!     .await?;
//! println!("{}", response.status);
//! ```

pub mod classify;
pub mod client;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod hook;
pub mod host;
pub mod settings;
pub mod transport;

// Re-export key types at crate root

// Client
pub use client::{ClientBuilder, CommunityClient, Delivery};
pub use context::RequestContext;
pub use settings::{ClientSettings, DEFAULT_USER_AGENT};

// Stages
pub use classify::{CascadeReport, ClassificationOutcome, ClassifierToggles};
pub use descriptor::{build_descriptor, PreparedRequest};
pub use events::{ClientListener, Diagnostics, RequestCompleted};
pub use hook::{Continuation, PreRequestHook};
pub use transport::{Transport, TransportResponse};

// Host
pub use host::ReqwestTransport;

// Errors
pub use error::{ConfigError, RequestFailure, SetupError};

// Core types callers need alongside the client
pub use commune_core::{RequestError, RequestOptions, ResponseBody, ResponseEnvelope};
