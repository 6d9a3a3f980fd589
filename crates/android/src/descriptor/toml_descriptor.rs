//! TOML rendering of a descriptor
//!
//! ```toml
//! namespace = "com.example.app"
//! compileSdk = { property = "flutter.compileSdkVersion" }
//!
//! [defaultConfig]
//! minSdk = 21
//! versionCode = 1
//! versionName = "1.0.0"
//!
//! [signingConfigs.release]
//! storeFile = "keys/release.jks"
//! storePassword = { env = "STORE_PASSWORD", fallback = "temp123" }
//! keyAlias = "upload"
//! keyPassword = { env = "KEY_PASSWORD" }
//!
//! [buildTypes.release]
//! signingConfig = "release"
//! minifyEnabled = true
//! proguardFiles = [{ default = "proguard-android-optimize.txt" }, "proguard-rules.pro"]
//! ```
//!
//! Tables are keyed by name, so declared build types come out in name order.

use super::{
    BuildTypeDecl, DefaultConfig, Descriptor, Location, ParseError, Properties, SigningRef,
};
use crate::model::{BuildKind, JavaCompat, ProguardFile, SigningConfig, ValueSource};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Literal(String),
    Env {
        env: String,
        #[serde(default)]
        fallback: Option<String>,
    },
    Property {
        property: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInt {
    Int(i64),
    Property { property: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProguard {
    Project(String),
    Default { default: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJava {
    source_compatibility: Option<String>,
    target_compatibility: Option<String>,
    jvm_target: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDefaults {
    application_id: Option<String>,
    min_sdk: Option<RawInt>,
    target_sdk: Option<RawInt>,
    version_code: Option<RawInt>,
    version_name: Option<String>,
    multi_dex_enabled: Option<bool>,
    signing_config: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSigning {
    store_file: Option<RawValue>,
    store_password: Option<RawValue>,
    key_alias: Option<RawValue>,
    key_password: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuildType {
    kind: Option<BuildKind>,
    signing_config: Option<String>,
    #[serde(alias = "isMinifyEnabled")]
    minify_enabled: Option<bool>,
    #[serde(alias = "isShrinkResources")]
    shrink_resources: Option<bool>,
    multi_dex_enabled: Option<bool>,
    application_id_suffix: Option<String>,
    version_name_suffix: Option<String>,
    #[serde(default)]
    proguard_files: Vec<RawProguard>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    #[serde(default)]
    plugins: Vec<String>,
    namespace: Option<String>,
    compile_sdk: Option<RawInt>,
    ndk_version: Option<String>,
    #[serde(default)]
    compile_options: RawJava,
    #[serde(default)]
    kotlin_options: RawJava,
    #[serde(default)]
    default_config: RawDefaults,
    #[serde(default)]
    signing_configs: BTreeMap<String, RawSigning>,
    #[serde(default)]
    build_types: BTreeMap<String, RawBuildType>,
    #[serde(flatten)]
    unknown: BTreeMap<String, toml::Value>,
}

/// Parse a TOML descriptor
pub(super) fn parse(source: &str, props: &Properties) -> Result<Descriptor, ParseError> {
    let raw: RawDescriptor = toml::from_str(source).map_err(|e| {
        let at = e.span().map(|span| Location::from_offset(source, span.start));
        ParseError {
            kind: super::ParseErrorKind::Syntax,
            message: e.message().trim().to_string(),
            location: at,
        }
    })?;
    for key in raw.unknown.keys() {
        tracing::debug!(key = %key, "Ignoring unrecognized descriptor key");
    }

    let resolver = Resolver { props };
    let defaults = DefaultConfig {
        application_id: raw.default_config.application_id,
        min_sdk: resolver.int_opt("defaultConfig.minSdk", raw.default_config.min_sdk)?,
        target_sdk: resolver.int_opt("defaultConfig.targetSdk", raw.default_config.target_sdk)?,
        version_code: resolver.int_opt("defaultConfig.versionCode", raw.default_config.version_code)?,
        version_name: raw.default_config.version_name,
        multi_dex_enabled: raw.default_config.multi_dex_enabled,
        signing: raw.default_config.signing_config.map(signing_ref),
    };

    let signing_configs = raw
        .signing_configs
        .into_iter()
        .map(|(name, s)| -> Result<SigningConfig, ParseError> {
            let field = |key: &str, value: Option<RawValue>| {
                resolver.source(&format!("signingConfigs.{}.{}", name, key), value)
            };
            Ok(SigningConfig {
                store_file: field("storeFile", s.store_file)?,
                store_password: field("storePassword", s.store_password)?,
                key_alias: field("keyAlias", s.key_alias)?,
                key_password: field("keyPassword", s.key_password)?,
                name,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let build_types = raw
        .build_types
        .into_iter()
        .map(|(name, b)| BuildTypeDecl {
            kind: b.kind,
            signing: b.signing_config.map(signing_ref),
            minify: b.minify_enabled,
            shrink_resources: b.shrink_resources,
            multi_dex_enabled: b.multi_dex_enabled,
            application_id_suffix: b.application_id_suffix,
            version_name_suffix: b.version_name_suffix,
            proguard_files: b
                .proguard_files
                .into_iter()
                .map(|p| match p {
                    RawProguard::Project(name) => ProguardFile::Project(name),
                    RawProguard::Default { default } => ProguardFile::Default(default),
                })
                .collect(),
            ..BuildTypeDecl::named(name, None)
        })
        .collect();

    Ok(Descriptor {
        plugins: raw.plugins,
        namespace: raw.namespace,
        compile_sdk: resolver.int_opt("compileSdk", raw.compile_sdk)?,
        ndk_version: raw.ndk_version,
        java: JavaCompat {
            source_compatibility: raw.compile_options.source_compatibility,
            target_compatibility: raw.compile_options.target_compatibility,
            jvm_target: raw.kotlin_options.jvm_target,
        },
        defaults,
        signing_configs,
        build_types,
    })
}

fn signing_ref(name: String) -> SigningRef {
    SigningRef { name, at: None }
}

struct Resolver<'a> {
    props: &'a Properties,
}

impl Resolver<'_> {
    fn property(&self, key: &str) -> Result<String, ParseError> {
        self.props
            .get(key)
            .cloned()
            .ok_or_else(|| ParseError::unresolved(format!("`{}`", key), None))
    }

    fn int_opt(&self, field: &str, value: Option<RawInt>) -> Result<Option<u32>, ParseError> {
        let invalid = || ParseError::invalid(field, "a non-negative integer", None);
        match value {
            None => Ok(None),
            Some(RawInt::Int(i)) => u32::try_from(i).map(Some).map_err(|_| invalid()),
            Some(RawInt::Property { property }) => self
                .property(&property)?
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| invalid()),
        }
    }

    fn source(&self, field: &str, value: Option<RawValue>) -> Result<Option<ValueSource>, ParseError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let source = match value {
            RawValue::Literal(value) => ValueSource::Literal { value },
            RawValue::Env { env, fallback } => ValueSource::Env { var: env, fallback },
            RawValue::Property { property } => {
                let value = self.property(&property).map_err(|e| ParseError {
                    message: format!("{} (in `{}`)", e.message, field),
                    ..e
                })?;
                ValueSource::Property {
                    key: property,
                    value,
                }
            }
        };
        Ok(Some(source))
    }
}
