//! Descriptor parsing
//!
//! A descriptor is the declarative text describing an app module's build
//! variants. Two renderings are understood:
//!
//! - the Kotlin Gradle DSL subset used by `build.gradle.kts` files
//! - a flat TOML rendering of the same keys
//!
//! Both produce the same format-neutral [`Descriptor`], which the loader
//! then merges into one [`BuildVariant`](crate::model::BuildVariant) per
//! build type.

mod kts;
mod lexer;
pub mod parser;
mod toml_descriptor;

use crate::model::{BuildKind, JavaCompat, ProguardFile, SigningConfig};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use variantkit_core::error::{Error, ErrorCode};

/// Largest descriptor accepted, in bytes
pub const MAX_DESCRIPTOR_BYTES: usize = 1024 * 1024;

/// Values for symbolic references (`flutter.compileSdkVersion`)
pub type Properties = BTreeMap<String, String>;

/// 1-based position in descriptor text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Position of a byte offset within `source`
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let prefix = &source[..offset.min(source.len())];
        let line = prefix.matches('\n').count() + 1;
        let column = prefix
            .rsplit('\n')
            .next()
            .map_or(0, |l| l.chars().count())
            + 1;
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Malformed text
    Syntax,
    /// Well-formed text using a construct outside the supported subset
    Unsupported,
    /// A recognized key with a value of the wrong type or range
    InvalidValue,
    /// A property or signing config that was never defined
    UnresolvedReference,
    /// Input too large or nested too deeply to parse
    LimitExceeded,
}

/// Fatal descriptor error; aborts the whole load
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{}", .location.map(|l| format!("{l}: ")).unwrap_or_default(), .message)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, at: Location) -> Self {
        Self {
            kind: ParseErrorKind::Syntax,
            message: message.into(),
            location: Some(at),
        }
    }

    pub fn unsupported(what: impl Into<String>, at: Location) -> Self {
        Self {
            kind: ParseErrorKind::Unsupported,
            message: format!("unsupported syntax: {}", what.into()),
            location: Some(at),
        }
    }

    pub fn invalid(key: &str, expected: &str, at: Option<Location>) -> Self {
        Self {
            kind: ParseErrorKind::InvalidValue,
            message: format!("invalid value for `{}`: expected {}", key, expected),
            location: at,
        }
    }

    pub fn input_too_large(actual_bytes: usize) -> Self {
        Self {
            kind: ParseErrorKind::LimitExceeded,
            message: format!(
                "descriptor is {} bytes, larger than the {} byte limit",
                actual_bytes, MAX_DESCRIPTOR_BYTES
            ),
            location: None,
        }
    }

    pub fn nesting_too_deep(max_depth: usize, at: Location) -> Self {
        Self {
            kind: ParseErrorKind::LimitExceeded,
            message: format!("nesting too deep (max {})", max_depth),
            location: Some(at),
        }
    }

    pub fn unresolved(what: impl Into<String>, at: Option<Location>) -> Self {
        Self {
            kind: ParseErrorKind::UnresolvedReference,
            message: format!("unresolved reference {}", what.into()),
            location: at,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        let code = match err.kind {
            ParseErrorKind::UnresolvedReference => ErrorCode::UnresolvedReference,
            ParseErrorKind::Unsupported => ErrorCode::UnsupportedSyntax,
            ParseErrorKind::Syntax | ParseErrorKind::InvalidValue | ParseErrorKind::LimitExceeded => {
                ErrorCode::DescriptorParseError
            }
        };
        let suggestion = match err.kind {
            ParseErrorKind::UnresolvedReference => {
                Some("Define the value under [properties] in .variantkit.toml or pass -P key=value")
            }
            ParseErrorKind::Unsupported => {
                Some("Rewrite the expression as a literal, System.getenv(...) or a property reference")
            }
            _ => None,
        };
        let mut out = Error::new(code, err.to_string());
        if let Some(s) = suggestion {
            out = out.with_suggestion(s);
        }
        out.with_source(err)
    }
}

/// Descriptor text format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    /// Kotlin Gradle DSL (`build.gradle.kts`)
    GradleKts,
    Toml,
}

impl DescriptorFormat {
    /// `.toml` files are TOML; everything else is treated as Gradle DSL
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => DescriptorFormat::Toml,
            _ => DescriptorFormat::GradleKts,
        }
    }
}

/// A `signingConfig = ...` reference, resolved by the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRef {
    pub name: String,
    pub at: Option<Location>,
}

/// `defaultConfig` values shared by every build type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultConfig {
    pub application_id: Option<String>,
    pub min_sdk: Option<u32>,
    pub target_sdk: Option<u32>,
    pub version_code: Option<u32>,
    pub version_name: Option<String>,
    pub multi_dex_enabled: Option<bool>,
    pub signing: Option<SigningRef>,
}

/// One declared build type, before merging with defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTypeDecl {
    pub name: String,
    /// Explicit tag (`isDebuggable`, or `kind` in TOML)
    pub kind: Option<BuildKind>,
    pub signing: Option<SigningRef>,
    pub minify: Option<bool>,
    pub shrink_resources: Option<bool>,
    pub multi_dex_enabled: Option<bool>,
    pub application_id_suffix: Option<String>,
    pub version_name_suffix: Option<String>,
    pub proguard_files: Vec<ProguardFile>,
    pub at: Option<Location>,
}

impl BuildTypeDecl {
    pub fn named(name: impl Into<String>, at: Option<Location>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            signing: None,
            minify: None,
            shrink_resources: None,
            multi_dex_enabled: None,
            application_id_suffix: None,
            version_name_suffix: None,
            proguard_files: Vec::new(),
            at,
        }
    }
}

/// Format-neutral descriptor contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub plugins: Vec<String>,
    pub namespace: Option<String>,
    pub compile_sdk: Option<u32>,
    pub ndk_version: Option<String>,
    pub java: JavaCompat,
    pub defaults: DefaultConfig,
    /// In declaration order
    pub signing_configs: Vec<SigningConfig>,
    /// In declaration order
    pub build_types: Vec<BuildTypeDecl>,
}

impl Descriptor {
    /// Parse descriptor text, resolving symbolic references against `properties`
    pub fn parse(
        source: &str,
        format: DescriptorFormat,
        properties: &Properties,
    ) -> Result<Self, ParseError> {
        if source.len() > MAX_DESCRIPTOR_BYTES {
            return Err(ParseError::input_too_large(source.len()));
        }
        match format {
            DescriptorFormat::GradleKts => {
                let statements = parser::parse_document(source)?;
                kts::extract(&statements, properties)
            }
            DescriptorFormat::Toml => toml_descriptor::parse(source, properties),
        }
    }

    pub fn signing_config(&self, name: &str) -> Option<&SigningConfig> {
        self.signing_configs.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_offset() {
        let src = "a = 1\nbb = 2\n";
        assert_eq!(Location::from_offset(src, 0), Location::new(1, 1));
        assert_eq!(Location::from_offset(src, 6), Location::new(2, 1));
        assert_eq!(Location::from_offset(src, 9), Location::new(2, 4));
    }

    #[test]
    fn test_parse_error_display_includes_location() {
        let err = ParseError::syntax("unexpected character `+`", Location::new(3, 7));
        assert_eq!(err.to_string(), "3:7: unexpected character `+`");
        let err = ParseError::unresolved("`flutter.ndkVersion`", None);
        assert_eq!(err.to_string(), "unresolved reference `flutter.ndkVersion`");
    }

    #[test]
    fn test_parse_error_into_core_error() {
        let err: Error = ParseError::unresolved("`x`", Some(Location::new(1, 1))).into();
        assert_eq!(err.code, ErrorCode::UnresolvedReference);
        assert!(err.suggestion.is_some());
        assert_eq!(err.exit_code(), variantkit_core::error::exit_codes::PARSE_ERROR);
    }

    #[test]
    fn test_oversized_descriptor_rejected_for_both_formats() {
        let source = format!("// {}\n", "x".repeat(MAX_DESCRIPTOR_BYTES));
        for format in [DescriptorFormat::GradleKts, DescriptorFormat::Toml] {
            let err = Descriptor::parse(&source, format, &Properties::new()).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::LimitExceeded);
            assert!(err.message.contains("byte limit"));
        }
        let err: Error = ParseError::input_too_large(MAX_DESCRIPTOR_BYTES + 1).into();
        assert_eq!(err.exit_code(), variantkit_core::error::exit_codes::PARSE_ERROR);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DescriptorFormat::from_path(Path::new("app/build.gradle.kts")),
            DescriptorFormat::GradleKts
        );
        assert_eq!(
            DescriptorFormat::from_path(Path::new("variants.toml")),
            DescriptorFormat::Toml
        );
    }
}
