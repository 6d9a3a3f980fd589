//! Secret resolution for signing credentials
//!
//! Signing values are read from the environment when set, falling back to
//! the value declared in the descriptor. Resolved values are wrapped in
//! [`Secret`] so they never end up in logs or debug output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Read access to environment variables
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// A credential value that is redacted everywhere except [`Secret::expose`]
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("****")
    }
}

/// Outcome of [`resolve_secret`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: Secret,
    /// True when the declared fallback was used instead of the environment
    pub is_fallback: bool,
}

/// Resolve `var` from `env`, or fall back to `fallback`
///
/// An empty environment value counts as unset. Returns `None` when neither
/// source yields a value.
pub fn resolve_secret<E: EnvSource + ?Sized>(
    env: &E,
    var: &str,
    fallback: Option<&str>,
) -> Option<Resolved> {
    match env.var(var).filter(|v| !v.is_empty()) {
        Some(value) => {
            tracing::debug!(var = %var, "Secret resolved from environment");
            Some(Resolved {
                value: Secret(value),
                is_fallback: false,
            })
        }
        None => fallback.map(|value| {
            tracing::debug!(var = %var, "Environment variable unset, using declared fallback");
            Resolved {
                value: Secret::new(value),
                is_fallback: true,
            }
        }),
    }
}

static DEVELOPER_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z]:[\\/](?:Users|Documents and Settings)[\\/]|/(?:home|Users)/)").unwrap()
});

/// True for absolute paths inside a personal home directory
pub fn is_developer_path(path: &str) -> bool {
    DEVELOPER_PATH.is_match(path)
}

/// True when `value` appears in the weak-secret list (case-insensitive)
pub fn is_weak_secret(value: &str, weak_secrets: &[String]) -> bool {
    weak_secrets.iter().any(|w| w.eq_ignore_ascii_case(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_value_wins() {
        let env = env(&[("STORE_PW", "from-env")]);
        let r = resolve_secret(&env, "STORE_PW", Some("temp123")).unwrap();
        assert_eq!(r.value.expose(), "from-env");
        assert!(!r.is_fallback);
    }

    #[test]
    fn test_fallback_when_unset_or_empty() {
        let r = resolve_secret(&env(&[]), "STORE_PW", Some("temp123")).unwrap();
        assert_eq!(r.value.expose(), "temp123");
        assert!(r.is_fallback);

        let r = resolve_secret(&env(&[("STORE_PW", "")]), "STORE_PW", Some("temp123")).unwrap();
        assert!(r.is_fallback);
    }

    #[test]
    fn test_nothing_to_resolve() {
        assert_eq!(resolve_secret(&env(&[]), "STORE_PW", None), None);
    }

    #[test]
    fn test_secret_is_redacted() {
        let s = Secret::new("hunter22");
        assert_eq!(format!("{}", s), "****");
        assert!(!format!("{:?}", s).contains("hunter22"));
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"****\"");
    }

    #[test]
    fn test_developer_paths() {
        assert!(is_developer_path(r"C:\Users\CyberBot\learnease-release-key.jks"));
        assert!(is_developer_path("c:/Users/dev/key.jks"));
        assert!(is_developer_path("/home/dev/keys/release.jks"));
        assert!(is_developer_path("/Users/dev/release.jks"));
        assert!(!is_developer_path("keys/release.jks"));
        assert!(!is_developer_path("/opt/ci/release.jks"));
        assert!(!is_developer_path("~/release.jks"));
    }

    #[test]
    fn test_weak_secret() {
        let weak = vec!["temp123".to_string(), "changeit".to_string()];
        assert!(is_weak_secret("temp123", &weak));
        assert!(is_weak_secret("ChangeIt", &weak));
        assert!(!is_weak_secret("k9#Lw2!zQ", &weak));
    }
}
