//! Host implementations of the transport seam.
//!
//! - [`http`] - reqwest transport with a shared cookie jar

pub mod http;

pub use http::ReqwestTransport;
