//! Build variant data model
//!
//! These are the values handed to the external build toolchain once a
//! descriptor has been loaded and validated. They are never mutated after
//! construction.

use serde::{Serialize, Serializer};
use std::fmt;

/// Whether a variant produces a debuggable or a distributable artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    Debug,
    Release,
}

impl BuildKind {
    /// Kind implied by a build type name when nothing tags it explicitly
    pub fn from_name(name: &str, release_types: &[String]) -> Self {
        if release_types.iter().any(|t| t == name) {
            BuildKind::Release
        } else {
            BuildKind::Debug
        }
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildKind::Debug => f.write_str("debug"),
            BuildKind::Release => f.write_str("release"),
        }
    }
}

/// SDK levels; valid variants satisfy `min_sdk <= target_sdk <= compile_sdk`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkVersions {
    pub min_sdk: u32,
    pub target_sdk: u32,
    /// Zero when the descriptor never declared it
    pub compile_sdk: u32,
}

/// Java/Kotlin bytecode levels, normalized (`JavaVersion.VERSION_1_8` is `"1.8"`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaCompat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_compatibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_compatibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm_target: Option<String>,
}

/// Where a signing value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ValueSource {
    /// Written directly in the descriptor
    Literal { value: String },
    /// Read from an environment variable, with an optional declared fallback
    Env {
        var: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        fallback: Option<String>,
    },
    /// Supplied through an injected property
    Property { key: String, value: String },
}

impl ValueSource {
    pub fn literal(value: impl Into<String>) -> Self {
        ValueSource::Literal {
            value: value.into(),
        }
    }

    pub fn env(var: impl Into<String>, fallback: Option<&str>) -> Self {
        ValueSource::Env {
            var: var.into(),
            fallback: fallback.map(String::from),
        }
    }

    /// Copy with every concrete value replaced, for display
    fn redacted(&self) -> Self {
        const MASK: &str = "<redacted>";
        match self {
            ValueSource::Literal { .. } => ValueSource::literal(MASK),
            ValueSource::Env { var, fallback } => ValueSource::Env {
                var: var.clone(),
                fallback: fallback.as_ref().map(|_| MASK.to_string()),
            },
            ValueSource::Property { key, .. } => ValueSource::Property {
                key: key.clone(),
                value: MASK.to_string(),
            },
        }
    }
}

fn serialize_redacted<S: Serializer>(
    source: &Option<ValueSource>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    source.as_ref().map(ValueSource::redacted).serialize(serializer)
}

/// A named credential bundle used to sign a package
///
/// Fields the descriptor leaves out stay `None` and are reported by validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfig {
    pub name: String,
    pub store_file: Option<ValueSource>,
    #[serde(serialize_with = "serialize_redacted")]
    pub store_password: Option<ValueSource>,
    pub key_alias: Option<ValueSource>,
    #[serde(serialize_with = "serialize_redacted")]
    pub key_password: Option<ValueSource>,
}

impl SigningConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Signing attached to a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Signing {
    /// The toolchain's auto-generated debug keystore
    DebugKeystore,
    Config(SigningConfig),
}

impl Signing {
    /// Name the descriptor uses to refer to this signing config
    pub fn name(&self) -> &str {
        match self {
            Signing::DebugKeystore => DEBUG_SIGNING,
            Signing::Config(config) => &config.name,
        }
    }
}

/// Built-in signing config name that always exists
pub const DEBUG_SIGNING: &str = "debug";

/// A proguard rules file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "name", rename_all = "camelCase")]
pub enum ProguardFile {
    /// Shipped with the toolchain (`getDefaultProguardFile("...")`)
    Default(String),
    /// Relative to the module directory
    Project(String),
}

/// One fully merged build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildVariant {
    pub name: String,
    pub kind: BuildKind,
    pub application_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub sdk: SdkVersions,
    /// Zero when the descriptor never declared it
    pub version_code: u32,
    pub version_name: String,
    pub signing: Option<Signing>,
    pub minify: bool,
    pub shrink_resources: bool,
    pub multi_dex_enabled: bool,
    pub proguard_files: Vec<ProguardFile>,
    pub java: JavaCompat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndk_version: Option<String>,
    pub plugins: Vec<String>,
}

impl BuildVariant {
    pub fn is_release(&self) -> bool {
        self.kind == BuildKind::Release
    }

    /// The named signing config, if the variant uses one
    pub fn signing_config(&self) -> Option<&SigningConfig> {
        match &self.signing {
            Some(Signing::Config(config)) => Some(config),
            _ => None,
        }
    }

    /// Name with the first letter upper-cased, as used in task names
    pub fn task_suffix(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        let release_types = vec!["release".to_string(), "production".to_string()];
        assert_eq!(BuildKind::from_name("release", &release_types), BuildKind::Release);
        assert_eq!(BuildKind::from_name("production", &release_types), BuildKind::Release);
        assert_eq!(BuildKind::from_name("staging", &release_types), BuildKind::Debug);
    }

    #[test]
    fn test_signing_config_passwords_are_redacted() {
        let config = SigningConfig {
            name: "release".into(),
            store_file: Some(ValueSource::literal("keys/release.jks")),
            store_password: Some(ValueSource::env("STORE_PW", Some("temp123"))),
            key_alias: Some(ValueSource::literal("upload")),
            key_password: Some(ValueSource::literal("hunter22")),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("keys/release.jks"));
        assert!(json.contains("STORE_PW"));
        assert!(json.contains("upload"));
        assert!(!json.contains("temp123"));
        assert!(!json.contains("hunter22"));
    }

    #[test]
    fn test_signing_name() {
        assert_eq!(Signing::DebugKeystore.name(), "debug");
    }
}
