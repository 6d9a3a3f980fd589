//! Android build variant descriptors
//!
//! This crate loads the build-variant section of an Android app module
//! (`build.gradle.kts` or its TOML rendering) and checks it before a build:
//! - Descriptor parsing with line/column errors
//! - Variant merging (`defaultConfig` + build types)
//! - Validation of SDK levels, identifiers and signing credentials
//! - Secret resolution from the environment with declared fallbacks
//! - Keystore preflight and Gradle task handoff

pub mod descriptor;
pub mod gradle;
pub mod loader;
pub mod model;
pub mod preflight;
pub mod secrets;

pub use descriptor::{DescriptorFormat, Location, ParseError, ParseErrorKind, Properties};
pub use loader::{LoadError, LoadOptions, ValidatedVariant, ValidationFailure, VariantConfigLoader};
pub use model::{BuildKind, BuildVariant, Signing, SigningConfig, ValueSource};
pub use secrets::{resolve_secret, EnvSource, ProcessEnv, Resolved, Secret};
