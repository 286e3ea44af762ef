// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Commune Core
//!
//! Core request and response types shared by the Commune crates.
//!
//! ## Key Types
//!
//! ### Requests
//! - [`RequestOptions`] - Loosely-typed options bag supplied by callers
//! - [`FormField`] - Multipart field value (scalar or with part options)
//! - [`RequestDescriptor`] - Normalized request handed to the transport
//! - [`RequestBody`] - Body variant (none, raw, form, multipart)
//! - [`ResponseFormat`] - Body representation the caller expects
//!
//! ### Responses
//! - [`ResponseEnvelope`] - Status, headers, body and final URL
//! - [`ResponseBody`] - JSON, bytes or text body
//!
//! ### Errors
//! - [`RequestError`] - Everything a request can fail with
//! - [`TransportError`] - Network-level failures

pub mod error;
pub mod models;

pub use error::{RequestError, TransportError, TransportErrorKind};

pub use models::{
    // Options
    BodyEncoding,
    FormField,
    FormFieldOptions,
    RequestOptions,
    // Requests
    MultipartPart,
    Payload,
    RequestBody,
    RequestDescriptor,
    ResponseFormat,
    // Responses
    ResponseBody,
    ResponseEnvelope,
};
