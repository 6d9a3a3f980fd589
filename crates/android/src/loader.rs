//! Loading and validating build variants
//!
//! [`VariantConfigLoader`] turns descriptor text into one [`BuildVariant`]
//! per build type and checks each variant before it is handed to the build
//! toolchain. Loading fails fast on the first [`ParseError`]; validation
//! collects every problem it finds.
//!
//! ```rust,no_run
//! use variantkit_android::loader::{LoadOptions, VariantConfigLoader};
//! use variantkit_android::DescriptorFormat;
//!
//! let loader = VariantConfigLoader::new(LoadOptions::default());
//! let source = std::fs::read_to_string("android/app/build.gradle.kts").unwrap();
//! for validated in loader.load_and_validate(&source, DescriptorFormat::GradleKts).unwrap() {
//!     println!("{} ({} warnings)", validated.variant.name, validated.warnings.len());
//! }
//! ```

use crate::descriptor::{
    BuildTypeDecl, Descriptor, DescriptorFormat, ParseError, Properties, SigningRef,
};
use crate::model::{
    BuildKind, BuildVariant, SdkVersions, Signing, SigningConfig, ValueSource, DEBUG_SIGNING,
};
use crate::secrets::{self, EnvSource, ProcessEnv, Resolved, Secret};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use variantkit_core::config::{Config, InsecureReleasePolicy, PolicyConfig};
use variantkit_core::error::{Error as CoreError, ErrorCode};
use variantkit_core::validation::{IssueCode, ValidationIssue, ValidationResult, Validator};

static APPLICATION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$").unwrap());

static SEMVER_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+(\.\d+)?([-+.][0-9A-Za-z.+-]+)?$").unwrap());

/// Loader settings, usually derived from `.variantkit.toml`
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Values for symbolic references in the descriptor
    pub properties: Properties,
    /// Build type names treated as release when not tagged explicitly
    pub release_types: Vec<String>,
    pub policy: InsecureReleasePolicy,
    /// Lets release variants through a `deny` policy
    pub allow_insecure: bool,
    pub weak_secrets: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        let policy = PolicyConfig::default();
        Self {
            properties: Properties::new(),
            release_types: policy.release_types,
            policy: policy.insecure_release,
            allow_insecure: false,
            weak_secrets: policy.weak_secrets,
        }
    }
}

impl LoadOptions {
    pub fn from_config(config: &Config) -> Self {
        let policy = &config.schema.policy;
        Self {
            properties: config.schema.property_strings(),
            release_types: policy.release_types.clone(),
            policy: policy.insecure_release,
            allow_insecure: false,
            weak_secrets: policy.weak_secrets.clone(),
        }
    }
}

/// Signing credentials resolved for a validated variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSigning {
    pub config: String,
    /// As written; relative to the module directory unless absolute
    pub store_file: String,
    pub store_password: Secret,
    pub key_alias: String,
    pub key_password: Secret,
}

/// A variant that passed validation, with any non-fatal findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedVariant {
    pub variant: BuildVariant,
    /// `None` for debug-keystore and unsigned variants
    pub signing: Option<ResolvedSigning>,
    pub warnings: Vec<ValidationIssue>,
}

/// Every validation error found for one variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("variant `{variant}` failed validation: {}", summarize(.errors))]
pub struct ValidationFailure {
    pub variant: String,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationFailure {
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ValidationFailure> for CoreError {
    fn from(failure: ValidationFailure) -> Self {
        CoreError::new(ErrorCode::ValidationError, failure.to_string()).with_source(failure)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{} variant(s) failed validation", .0.len())]
    Invalid(Vec<ValidationFailure>),
}

impl From<LoadError> for CoreError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Read { path, source } => CoreError::from(source)
                .with_context(format!("reading descriptor {}", path.display())),
            LoadError::Parse(e) => e.into(),
            LoadError::Invalid(failures) => {
                let message = failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n");
                CoreError::new(ErrorCode::ValidationError, message)
            }
        }
    }
}

/// Loads descriptors and validates the resulting variants
#[derive(Debug, Clone)]
pub struct VariantConfigLoader<E = ProcessEnv> {
    options: LoadOptions,
    env: E,
}

impl VariantConfigLoader<ProcessEnv> {
    /// Loader reading secrets from the process environment
    pub fn new(options: LoadOptions) -> Self {
        Self::with_env(options, ProcessEnv)
    }
}

impl<E: EnvSource> VariantConfigLoader<E> {
    pub fn with_env(options: LoadOptions, env: E) -> Self {
        Self { options, env }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load Kotlin DSL descriptor text
    pub fn load(&self, source: &str) -> Result<Vec<BuildVariant>, ParseError> {
        self.load_with_format(source, DescriptorFormat::GradleKts)
    }

    pub fn load_with_format(
        &self,
        source: &str,
        format: DescriptorFormat,
    ) -> Result<Vec<BuildVariant>, ParseError> {
        let descriptor = Descriptor::parse(source, format, &self.options.properties)?;
        let variants = self.merge(&descriptor)?;
        tracing::info!(
            variants = variants.len(),
            signing_configs = descriptor.signing_configs.len(),
            "Descriptor loaded"
        );
        Ok(variants)
    }

    /// Read and load a descriptor file; the format follows the extension
    pub fn load_file(&self, path: &Path) -> Result<Vec<BuildVariant>, LoadError> {
        let source = read(path)?;
        tracing::debug!(path = %path.display(), "Reading descriptor");
        Ok(self.load_with_format(&source, DescriptorFormat::from_path(path))?)
    }

    /// Resolve a secret against this loader's environment
    pub fn resolve_secret(&self, var: &str, fallback: Option<&str>) -> Option<Resolved> {
        secrets::resolve_secret(&self.env, var, fallback)
    }

    /// Load, then validate every variant
    ///
    /// Returns all validated variants, or every failure when any variant is
    /// invalid.
    pub fn load_and_validate(
        &self,
        source: &str,
        format: DescriptorFormat,
    ) -> Result<Vec<ValidatedVariant>, LoadError> {
        let variants = self.load_with_format(source, format)?;
        self.validate_all(&variants)
    }

    /// Validate already loaded variants, collecting every failure
    pub fn validate_all(&self, variants: &[BuildVariant]) -> Result<Vec<ValidatedVariant>, LoadError> {
        let mut validated = Vec::with_capacity(variants.len());
        let mut failures = Vec::new();
        for variant in variants {
            match self.validate(variant) {
                Ok(v) => validated.push(v),
                Err(f) => failures.push(f),
            }
        }
        if failures.is_empty() {
            Ok(validated)
        } else {
            Err(LoadError::Invalid(failures))
        }
    }

    /// Check one variant, reporting every error and warning at once
    pub fn validate(&self, variant: &BuildVariant) -> Result<ValidatedVariant, ValidationFailure> {
        let mut result = self.check_fields(variant);
        let signing = self.check_signing(variant, &mut result);

        if variant.is_release()
            && self.options.policy == InsecureReleasePolicy::Deny
            && !self.options.allow_insecure
            && !result.warnings().is_empty()
        {
            let count = result.warnings().len();
            result.add_error(
                ValidationIssue::new(
                    "policy",
                    IssueCode::InsecureRelease,
                    format!(
                        "Release variant `{}` has {} insecure finding(s) and the release policy is `deny`",
                        variant.name, count
                    ),
                )
                .expected("no warnings")
                .actual(count.to_string()),
            );
        }

        let (errors, warnings) = result.into_parts();
        for warning in &warnings {
            tracing::warn!(variant = %variant.name, field = %warning.field, code = %warning.code, "{}", warning.message);
        }
        if !errors.is_empty() {
            tracing::debug!(variant = %variant.name, errors = errors.len(), "Validation failed");
            return Err(ValidationFailure {
                variant: variant.name.clone(),
                errors,
                warnings,
            });
        }
        Ok(ValidatedVariant {
            variant: variant.clone(),
            signing,
            warnings,
        })
    }

    fn check_fields(&self, variant: &BuildVariant) -> ValidationResult {
        let sdk = variant.sdk;
        let mut sdk_order = vec![("minSdk", sdk.min_sdk), ("targetSdk", sdk.target_sdk)];
        if sdk.compile_sdk > 0 {
            sdk_order.push(("compileSdk", sdk.compile_sdk));
        }

        Validator::new()
            .required("applicationId", &variant.application_id)
            .pattern(
                "applicationId",
                &variant.application_id,
                &APPLICATION_ID,
                "reverse-domain form (com.example.app)",
            )
            .ordered("sdkVersions", &sdk_order)
            .error_if(
                sdk.compile_sdk == 0,
                ValidationIssue::new("compileSdk", IssueCode::Required, "compileSdk is required"),
            )
            .error_if(
                variant.version_code == 0,
                ValidationIssue::new(
                    "versionCode",
                    IssueCode::Range,
                    "versionCode must be a positive integer",
                )
                .expected(">= 1")
                .actual(variant.version_code.to_string()),
            )
            .required("versionName", &variant.version_name)
            .warn_if(
                !variant.version_name.is_empty() && !SEMVER_LIKE.is_match(&variant.version_name),
                ValidationIssue::new(
                    "versionName",
                    IssueCode::Pattern,
                    format!("`{}` is not semantic-version-like", variant.version_name),
                )
                .expected("MAJOR.MINOR[.PATCH]"),
            )
            .error_if(
                variant.shrink_resources && !variant.minify,
                ValidationIssue::new(
                    "shrinkResources",
                    IssueCode::ShrinkWithoutMinify,
                    "shrinkResources requires minify to be enabled",
                ),
            )
            .validate()
    }

    fn check_signing(
        &self,
        variant: &BuildVariant,
        result: &mut ValidationResult,
    ) -> Option<ResolvedSigning> {
        match &variant.signing {
            None if variant.is_release() => {
                result.add_error(ValidationIssue::new(
                    "signingConfig",
                    IssueCode::SigningRequired,
                    format!("Release variant `{}` has no signing config", variant.name),
                ));
                None
            }
            None => None,
            Some(Signing::DebugKeystore) => {
                if variant.is_release() {
                    result.add_error(ValidationIssue::new(
                        "signingConfig",
                        IssueCode::DebugSignedRelease,
                        format!(
                            "Release variant `{}` is signed with the debug keystore",
                            variant.name
                        ),
                    ));
                }
                None
            }
            Some(Signing::Config(config)) => self.resolve_signing(config, result),
        }
    }

    fn resolve_signing(
        &self,
        config: &SigningConfig,
        result: &mut ValidationResult,
    ) -> Option<ResolvedSigning> {
        let store_file = self.resolve_field(config, "storeFile", &config.store_file, false, result);
        let store_password =
            self.resolve_field(config, "storePassword", &config.store_password, true, result);
        let key_alias = self.resolve_field(config, "keyAlias", &config.key_alias, false, result);
        let key_password = self.resolve_field(config, "keyPassword", &config.key_password, true, result);

        if let Some(path) = &store_file {
            if secrets::is_developer_path(path.expose()) {
                result.add_warning(
                    ValidationIssue::new(
                        field_name(config, "storeFile"),
                        IssueCode::InsecureDefault,
                        "Keystore path points into a developer's home directory",
                    )
                    .actual(path.expose()),
                );
            }
        }

        Some(ResolvedSigning {
            config: config.name.clone(),
            store_file: store_file?.expose().to_string(),
            store_password: store_password?,
            key_alias: key_alias?.expose().to_string(),
            key_password: key_password?,
        })
    }

    fn resolve_field(
        &self,
        config: &SigningConfig,
        key: &str,
        source: &Option<ValueSource>,
        is_password: bool,
        result: &mut ValidationResult,
    ) -> Option<Secret> {
        let field = field_name(config, key);
        let Some(source) = source else {
            result.add_error(ValidationIssue::new(
                field.clone(),
                IssueCode::Required,
                format!("`{}` is not set", field),
            ));
            return None;
        };
        match source {
            ValueSource::Literal { value } => {
                if is_password {
                    result.add_warning(ValidationIssue::new(
                        field,
                        IssueCode::InsecureDefault,
                        "Password is hard-coded in the descriptor",
                    ));
                }
                Some(Secret::new(value.clone()))
            }
            ValueSource::Property { value, .. } => Some(Secret::new(value.clone())),
            ValueSource::Env { var, fallback } => {
                let Some(resolved) = self.resolve_secret(var, fallback.as_deref()) else {
                    result.add_error(
                        ValidationIssue::new(
                            field,
                            IssueCode::SecretMissing,
                            format!("Environment variable {} is not set and no fallback is declared", var),
                        )
                        .expected(format!("{} set", var)),
                    );
                    return None;
                };
                if resolved.is_fallback {
                    let weak = fallback
                        .as_deref()
                        .is_some_and(|f| secrets::is_weak_secret(f, &self.options.weak_secrets));
                    result.add_warning(
                        ValidationIssue::new(
                            field.clone(),
                            IssueCode::WeakSecret,
                            format!("{} is not set; using the declared fallback", var),
                        )
                        .expected(format!("{} set", var))
                        .actual("fallback"),
                    );
                    if weak {
                        result.add_warning(ValidationIssue::new(
                            field,
                            IssueCode::InsecureDefault,
                            format!("Fallback for {} is a well-known default value", var),
                        ));
                    }
                }
                Some(resolved.value)
            }
        }
    }

    /// Merge defaults and build types into one variant per build type
    fn merge(&self, d: &Descriptor) -> Result<Vec<BuildVariant>, ParseError> {
        let default_signing = match &d.defaults.signing {
            Some(r) => Some(lookup_signing(d, r)?),
            None => None,
        };

        let mut decls: Vec<BuildTypeDecl> = d.build_types.clone();
        for implicit in [DEBUG_SIGNING, "release"] {
            if !decls.iter().any(|s| s.name == implicit) {
                tracing::debug!(build_type = implicit, "Adding implicit build type");
                decls.push(BuildTypeDecl::named(implicit, None));
            }
        }

        decls
            .iter()
            .map(|decl| -> Result<BuildVariant, ParseError> {
                let is_debug_type = decl.name == DEBUG_SIGNING;
                let signing = match &decl.signing {
                    Some(r) => Some(lookup_signing(d, r)?),
                    None if is_debug_type => Some(Signing::DebugKeystore),
                    None => default_signing.clone(),
                };
                let kind = decl
                    .kind
                    .unwrap_or_else(|| BuildKind::from_name(&decl.name, &self.options.release_types));
                let min_sdk = d.defaults.min_sdk.unwrap_or(1);

                Ok(BuildVariant {
                    name: decl.name.clone(),
                    kind,
                    application_id: format!(
                        "{}{}",
                        d.defaults
                            .application_id
                            .as_deref()
                            .or(d.namespace.as_deref())
                            .unwrap_or_default(),
                        decl.application_id_suffix.as_deref().unwrap_or_default()
                    ),
                    namespace: d.namespace.clone(),
                    sdk: SdkVersions {
                        min_sdk,
                        target_sdk: d.defaults.target_sdk.unwrap_or(min_sdk),
                        compile_sdk: d.compile_sdk.unwrap_or(0),
                    },
                    version_code: d.defaults.version_code.unwrap_or(0),
                    version_name: format!(
                        "{}{}",
                        d.defaults.version_name.as_deref().unwrap_or_default(),
                        decl.version_name_suffix.as_deref().unwrap_or_default()
                    ),
                    signing,
                    minify: decl.minify.unwrap_or(false),
                    shrink_resources: decl.shrink_resources.unwrap_or(false),
                    multi_dex_enabled: decl
                        .multi_dex_enabled
                        .or(d.defaults.multi_dex_enabled)
                        .unwrap_or(false),
                    proguard_files: decl.proguard_files.clone(),
                    java: d.java.clone(),
                    ndk_version: d.ndk_version.clone(),
                    plugins: d.plugins.clone(),
                })
            })
            .collect()
    }
}

fn lookup_signing(d: &Descriptor, r: &SigningRef) -> Result<Signing, ParseError> {
    match d.signing_config(&r.name) {
        Some(config) => Ok(Signing::Config(config.clone())),
        None if r.name == DEBUG_SIGNING => Ok(Signing::DebugKeystore),
        None => Err(ParseError::unresolved(
            format!("signing config `{}`", r.name),
            r.at,
        )),
    }
}

fn field_name(config: &SigningConfig, key: &str) -> String {
    format!("signingConfigs.{}.{}", config.name, key)
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}
