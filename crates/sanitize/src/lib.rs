//! Payload sanitization for captured browser telemetry
//!
//! Everything a capture event goes through before it leaves the process:
//! size bounding and redaction of sensitive values. Pure and synchronous,
//! no I/O.
//!
//! ```text
//! producer JSON ──► bounder (per-string + per-batch limits) ──► relay
//!                        │
//! cookies / storage ──► filter ──► classifier (key patterns, value
//!                                   signatures, normalized entropy)
//! ```

pub mod bounder;
pub mod classifier;
pub mod error;
pub mod filter;
pub mod types;

pub use bounder::{
    bound_array, process_structured_text, transform_strings, truncate_str, truncate_strings,
};
pub use classifier::{is_sensitive_key, is_sensitive_str, is_sensitive_value, normalized_entropy};
pub use error::{Result, SanitizeError};
pub use filter::{filter_cookie, filter_cookies, filter_storage, should_redact};
pub use types::*;
