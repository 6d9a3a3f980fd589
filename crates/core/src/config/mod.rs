//! Configuration loading and schema definitions
//!
//! The tool's own settings: injected properties and validation policy.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
