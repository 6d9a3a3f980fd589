//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigSchema {
    /// Project-wide settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Values for symbolic references such as `flutter.compileSdkVersion`
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,

    /// Validation policy
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl ConfigSchema {
    /// Properties rendered as plain strings
    pub fn property_strings(&self) -> BTreeMap<String, String> {
        self.properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

/// General project configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GeneralConfig {
    /// Descriptor used when a command is given no path
    #[serde(default)]
    pub descriptor: Option<String>,
}

/// A property value; integers and booleans are accepted for convenience
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    /// `compileSdkVersion = 34`
    Integer(i64),
    /// `minify = true`
    Boolean(bool),
    /// Any other value
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

/// How release variants treat insecure defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsecureReleasePolicy {
    /// Report warnings and continue
    #[default]
    Warn,
    /// Fail release variants that carry warnings unless overridden
    Deny,
}

/// Validation policy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
    /// Build type names treated as release builds when not tagged explicitly
    #[serde(default = "default_release_types")]
    pub release_types: Vec<String>,

    /// What release variants do with insecure-default warnings
    #[serde(default)]
    pub insecure_release: InsecureReleasePolicy,

    /// Secret values that are never acceptable for production
    #[serde(default = "default_weak_secrets")]
    pub weak_secrets: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            release_types: default_release_types(),
            insecure_release: InsecureReleasePolicy::default(),
            weak_secrets: default_weak_secrets(),
        }
    }
}

fn default_release_types() -> Vec<String> {
    vec!["release".to_string()]
}

fn default_weak_secrets() -> Vec<String> {
    ["temp123", "password", "changeit", "android", "123456"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let schema = ConfigSchema::default();
        assert_eq!(schema.policy.release_types, vec!["release"]);
        assert_eq!(schema.policy.insecure_release, InsecureReleasePolicy::Warn);
        assert!(schema.policy.weak_secrets.iter().any(|s| s == "temp123"));
    }

    #[test]
    fn test_parse_full_schema() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [general]
            descriptor = "android/app/build.gradle.kts"

            [properties]
            "flutter.compileSdkVersion" = 34
            "flutter.ndkVersion" = "26.1.10909125"

            [policy]
            release_types = ["release", "production"]
            insecure_release = "deny"
            "#,
        )
        .unwrap();

        assert_eq!(
            schema.general.descriptor.as_deref(),
            Some("android/app/build.gradle.kts")
        );
        let props = schema.property_strings();
        assert_eq!(props["flutter.compileSdkVersion"], "34");
        assert_eq!(props["flutter.ndkVersion"], "26.1.10909125");
        assert_eq!(schema.policy.insecure_release, InsecureReleasePolicy::Deny);
        assert_eq!(schema.policy.release_types.len(), 2);
        assert!(!schema.policy.weak_secrets.is_empty());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let parsed: Result<ConfigSchema, _> = toml::from_str("[policy]\ninsecure_release = \"maybe\"");
        assert!(parsed.is_err());
    }
}
