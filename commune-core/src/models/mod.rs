//! Request and response models for Commune.
//!
//! ## Submodules
//!
//! - [`options`] - Caller options bag (`RequestOptions`, `FormField`)
//! - [`request`] - Normalized request (`RequestDescriptor`, `RequestBody`)
//! - [`response`] - Response envelope (`ResponseEnvelope`, `ResponseBody`)

mod options;
mod request;
mod response;

pub use options::{BodyEncoding, FormField, FormFieldOptions, RequestOptions};
pub use request::{MultipartPart, Payload, RequestBody, RequestDescriptor, ResponseFormat};
pub use response::{ResponseBody, ResponseEnvelope};
