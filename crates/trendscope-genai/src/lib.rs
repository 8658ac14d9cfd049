//! HTTP clients for the external generative services used by enrichment.
//!
//! [`TextGenClient`] produces advisory text plus a score rationale for a
//! trend; [`ImageGenClient`] produces a representative visual from a prompt.
//! Both wrap `reqwest` with typed responses and an API error envelope, and
//! take their base URL at construction so tests can point them at a wiremock
//! server. The clients make exactly one attempt per call; retry policy is the
//! caller's decision via [`GenaiError::is_retryable`].

mod error;
mod image;
mod text;

pub use error::GenaiError;
pub use image::ImageGenClient;
pub use text::{Advisory, AdvisoryRequest, TextGenClient};
