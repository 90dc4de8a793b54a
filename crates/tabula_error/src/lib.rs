//! Error types for the Tabula view engine.
//!
//! Every error carries the source location where it was raised. View errors
//! additionally expose an [`ErrorCategory`] so outer layers can decide how to
//! surface them without matching every kind.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod view;

pub use config::ConfigError;
pub use view::{ErrorCategory, ViewError, ViewErrorKind, ViewResult};
