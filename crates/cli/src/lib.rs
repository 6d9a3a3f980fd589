//! CLI utilities for variantkit
//!
//! Provides shared CLI functionality:
//! - Status messages
//! - Validation issue formatting

#![warn(missing_docs)]

pub mod output;
