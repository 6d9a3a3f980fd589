//! Core utilities for variantkit
//!
//! This crate provides shared functionality used by the descriptor loader and CLI:
//!
//! - **Error handling**: Errors with codes, context, recovery suggestions and exit codes
//! - **Validation**: Collect every error and warning in one pass
//! - **Configuration**: TOML-based tool configuration (properties, release policy)
//! - **Process execution**: Hand-off to the external build toolchain
//!
//! # Example
//!
//! ```rust,no_run
//! use variantkit_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! for (key, value) in config.schema.property_strings() {
//!     println!("{key} = {value}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod process;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema, InsecureReleasePolicy, PolicyConfig};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::validation::{IssueCode, ValidationIssue, ValidationResult, Validator};
}
