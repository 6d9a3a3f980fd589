//! Validation result collection
//!
//! Validation never stops at the first problem: every check appends to a
//! [`ValidationResult`], which separates blocking errors from warnings.
//!
//! # Example
//!
//! ```rust
//! use variantkit_core::validation::{IssueCode, Validator};
//!
//! let result = Validator::new()
//!     .required("versionName", "1.0.0")
//!     .ordered("sdk", &[("minSdk", 21), ("targetSdk", 34), ("compileSdk", 34)])
//!     .validate();
//!
//! assert!(result.is_valid());
//! assert!(!result.has_code(IssueCode::SdkOrder));
//! ```

use crate::error::{Error, ErrorCode, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable issue code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// Missing or empty field
    Required,
    /// Value does not match the expected format
    Pattern,
    /// Number outside its allowed range
    Range,
    /// `minSdk <= targetSdk <= compileSdk` violated
    SdkOrder,
    /// Release variant without signing
    SigningRequired,
    /// Release variant signed with the debug keystore
    DebugSignedRelease,
    /// Secret env var unset and no fallback declared
    SecretMissing,
    /// `shrinkResources` enabled without minification
    ShrinkWithoutMinify,
    /// Release carries warnings under the deny policy
    InsecureRelease,
    /// Secret resolved to a known placeholder
    WeakSecret,
    /// Hardcoded fallback or developer-machine path
    InsecureDefault,
}

impl IssueCode {
    /// Stable string form, as used in JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::Required => "REQUIRED",
            IssueCode::Pattern => "PATTERN",
            IssueCode::Range => "RANGE",
            IssueCode::SdkOrder => "SDK_ORDER",
            IssueCode::SigningRequired => "SIGNING_REQUIRED",
            IssueCode::DebugSignedRelease => "DEBUG_SIGNED_RELEASE",
            IssueCode::SecretMissing => "SECRET_MISSING",
            IssueCode::ShrinkWithoutMinify => "SHRINK_WITHOUT_MINIFY",
            IssueCode::InsecureRelease => "INSECURE_RELEASE",
            IssueCode::WeakSecret => "WEAK_SECRET",
            IssueCode::InsecureDefault => "INSECURE_DEFAULT",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Field that failed validation
    pub field: String,
    /// Human-readable message
    pub message: String,
    /// Issue code
    pub code: IssueCode,
    /// Expected value (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Actual value (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl ValidationIssue {
    /// Create an issue without expected/actual detail
    pub fn new(field: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
            expected: None,
            actual: None,
        }
    }

    /// Attach the expected value
    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Attach the actual value
    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all errors
    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    /// Get all warnings
    pub fn warnings(&self) -> &[ValidationIssue] {
        &self.warnings
    }

    /// Whether any error or warning carries `code`
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .any(|i| i.code == code)
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationIssue) {
        self.errors.push(error);
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: ValidationIssue) {
        self.warnings.push(warning);
    }

    /// Split into (errors, warnings)
    pub fn into_parts(self) -> (Vec<ValidationIssue>, Vec<ValidationIssue>) {
        (self.errors, self.warnings)
    }

    /// Convert to Result type
    pub fn to_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
            Err(Error::new(
                ErrorCode::ValidationError,
                format!("Validation failed: {}", messages.join("; ")),
            ))
        }
    }
}

/// Fluent validator builder
pub struct Validator {
    result: ValidationResult,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self {
            result: ValidationResult::new(),
        }
    }

    /// Validate that a field is not empty
    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.result.add_error(
                ValidationIssue::new(field, IssueCode::Required, "Field is required")
                    .expected("non-empty value")
                    .actual("empty"),
            );
        }
        self
    }

    /// Validate against a regex; empty values are left to [`Validator::required`]
    pub fn pattern(mut self, field: &str, value: &str, re: &Regex, description: &str) -> Self {
        if !value.is_empty() && !re.is_match(value) {
            self.result.add_error(
                ValidationIssue::new(field, IssueCode::Pattern, format!("Must match {}", description))
                    .expected(description)
                    .actual(value),
            );
        }
        self
    }

    /// Validate that named values are non-decreasing in the given order
    pub fn ordered(mut self, field: &str, values: &[(&str, u32)]) -> Self {
        let violated = values.windows(2).any(|w| w[0].1 > w[1].1);
        if violated {
            let expected = values
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(" <= ");
            let actual = values
                .iter()
                .map(|(name, v)| format!("{}={}", name, v))
                .collect::<Vec<_>>()
                .join(", ");
            self.result.add_error(
                ValidationIssue::new(
                    field,
                    IssueCode::SdkOrder,
                    format!("SDK ordering violated: expected {} ({})", expected, actual),
                )
                .expected(expected)
                .actual(actual),
            );
        }
        self
    }

    /// Add an error unconditionally
    pub fn error(mut self, issue: ValidationIssue) -> Self {
        self.result.add_error(issue);
        self
    }

    /// Add an error when `condition` holds
    pub fn error_if(self, condition: bool, issue: ValidationIssue) -> Self {
        if condition { self.error(issue) } else { self }
    }

    /// Add a warning (non-blocking)
    pub fn warn(mut self, issue: ValidationIssue) -> Self {
        self.result.add_warning(issue);
        self
    }

    /// Add a warning when `condition` holds
    pub fn warn_if(self, condition: bool, issue: ValidationIssue) -> Self {
        if condition { self.warn(issue) } else { self }
    }

    /// Complete validation and return result
    pub fn validate(self) -> ValidationResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_validation() {
        let result = Validator::new().required("versionName", "  ").validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].code, IssueCode::Required);
    }

    #[test]
    fn test_pattern_validation() {
        let re = Regex::new(r"^[a-z]+(\.[a-z]+)+$").unwrap();
        let result = Validator::new()
            .pattern("applicationId", "NotAnId", &re, "reverse-domain identifier")
            .validate();
        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].code, IssueCode::Pattern);
    }

    #[test]
    fn test_pattern_skips_empty() {
        let re = Regex::new(r"^x$").unwrap();
        let result = Validator::new().pattern("id", "", &re, "x").validate();
        assert!(result.is_valid());
    }

    #[test]
    fn test_ordered_accepts_equal_values() {
        let result = Validator::new()
            .ordered("sdk", &[("minSdk", 34), ("targetSdk", 34), ("compileSdk", 34)])
            .validate();
        assert!(result.is_valid());
    }

    #[test]
    fn test_ordered_rejects_inversion() {
        let result = Validator::new()
            .ordered("sdk", &[("minSdk", 34), ("targetSdk", 21), ("compileSdk", 34)])
            .validate();
        assert!(!result.is_valid());
        let issue = &result.errors()[0];
        assert_eq!(issue.code, IssueCode::SdkOrder);
        assert!(issue.message.contains("SDK ordering violated"));
        assert_eq!(issue.actual.as_deref(), Some("minSdk=34, targetSdk=21, compileSdk=34"));
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let result = Validator::new()
            .warn_if(
                true,
                ValidationIssue::new("storePassword", IssueCode::WeakSecret, "fallback used"),
            )
            .warn_if(
                false,
                ValidationIssue::new("keyPassword", IssueCode::WeakSecret, "fallback used"),
            )
            .validate();
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);
        assert!(result.has_code(IssueCode::WeakSecret));
    }

    #[test]
    fn test_collects_every_error() {
        let result = Validator::new()
            .required("applicationId", "")
            .required("versionName", "")
            .error_if(
                true,
                ValidationIssue::new("signingConfig", IssueCode::SigningRequired, "missing"),
            )
            .validate();
        assert_eq!(result.errors().len(), 3);
        assert!(result.to_result().is_err());
    }

    #[test]
    fn test_issue_code_serializes_screaming_snake() {
        let issue = ValidationIssue::new("sdk", IssueCode::SdkOrder, "bad");
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains("\"SDK_ORDER\""));
        assert_eq!(IssueCode::SdkOrder.to_string(), "SDK_ORDER");
    }
}
