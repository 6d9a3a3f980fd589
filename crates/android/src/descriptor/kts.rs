//! Extraction of recognized keys from a parsed `build.gradle.kts`

use super::parser::{Expr, Statement, StatementKind};
use super::{BuildTypeDecl, Descriptor, Location, ParseError, Properties, SigningRef};
use crate::model::{BuildKind, ProguardFile, SigningConfig, ValueSource};

struct Extractor<'a> {
    props: &'a Properties,
    out: Descriptor,
}

/// Build a [`Descriptor`] from top-level statements
pub(super) fn extract(statements: &[Statement], props: &Properties) -> Result<Descriptor, ParseError> {
    let mut ex = Extractor {
        props,
        out: Descriptor::default(),
    };
    for stmt in statements {
        match (&stmt.kind, stmt.name().as_str()) {
            (StatementKind::Block { body, .. }, "plugins") => ex.plugins(body)?,
            (StatementKind::Block { body, .. }, "android") => ex.android(body)?,
            _ => ignore(stmt),
        }
    }
    Ok(ex.out)
}

fn ignore(stmt: &Statement) {
    tracing::debug!(statement = %stmt.name(), at = %stmt.at, "Ignoring unrecognized statement");
}

fn body_of(stmt: &Statement) -> Option<&[Statement]> {
    match &stmt.kind {
        StatementKind::Block { body, .. } => Some(body),
        _ => None,
    }
}

/// `JavaVersion.VERSION_1_8` → `1.8`
fn java_version_name(segment: &str) -> Option<String> {
    segment
        .strip_prefix("VERSION_")
        .map(|v| v.replace('_', "."))
}

impl Extractor<'_> {
    fn property(&self, path: &[String], at: Location) -> Result<String, ParseError> {
        let key = path.join(".");
        self.props
            .get(&key)
            .cloned()
            .ok_or_else(|| ParseError::unresolved(format!("`{}`", key), Some(at)))
    }

    fn string(&self, key: &str, expr: &Expr, at: Location) -> Result<String, ParseError> {
        match expr {
            Expr::Str(s) => Ok(s.clone()),
            Expr::Path(path) => self.property(path, at),
            _ => Err(ParseError::invalid(key, "a string", Some(at))),
        }
    }

    fn int(&self, key: &str, expr: &Expr, at: Location) -> Result<u32, ParseError> {
        let invalid = || ParseError::invalid(key, "a non-negative integer", Some(at));
        match expr {
            Expr::Int(i) => u32::try_from(*i).map_err(|_| invalid()),
            Expr::Path(path) => self.property(path, at)?.trim().parse().map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    fn bool(&self, key: &str, expr: &Expr, at: Location) -> Result<bool, ParseError> {
        let invalid = || ParseError::invalid(key, "`true` or `false`", Some(at));
        match expr {
            Expr::Bool(b) => Ok(*b),
            Expr::Path(path) => self.property(path, at)?.trim().parse().map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    fn java_version(&self, key: &str, expr: &Expr, at: Location) -> Result<String, ParseError> {
        let from_path = |path: &[String]| match path {
            [java, version, rest @ ..] if java == "JavaVersion" && rest.iter().all(|r| r == "toString") => {
                java_version_name(version)
            }
            _ => None,
        };
        match expr {
            Expr::Str(s) => Ok(s.clone()),
            Expr::Int(i) => Ok(i.to_string()),
            Expr::Path(path) => match from_path(path.as_slice()) {
                Some(v) => Ok(v),
                None => self.property(path, at),
            },
            Expr::Call { callee, args } if args.is_empty() => {
                from_path(callee.as_slice()).ok_or_else(|| ParseError::invalid(key, "a Java version", Some(at)))
            }
            _ => Err(ParseError::invalid(key, "a Java version", Some(at))),
        }
    }

    fn source(&self, key: &str, expr: &Expr, at: Location) -> Result<ValueSource, ParseError> {
        match expr {
            Expr::Str(s) => Ok(ValueSource::literal(s.clone())),
            Expr::Path(path) => Ok(ValueSource::Property {
                key: path.join("."),
                value: self.property(path, at)?,
            }),
            Expr::Call { .. } if expr.is_call_to("System.getenv") => {
                Ok(ValueSource::env(getenv_name(key, expr, at)?, None))
            }
            Expr::Elvis(lhs, rhs) if lhs.is_call_to("System.getenv") => {
                let var = getenv_name(key, lhs, at)?;
                let fallback = match rhs.as_ref() {
                    Expr::Str(s) => s.clone(),
                    Expr::Path(path) => self.property(path, at)?,
                    _ => {
                        return Err(ParseError::unsupported(
                            format!("fallback for `{}` must be a string or property", key),
                            at,
                        ));
                    }
                };
                Ok(ValueSource::Env {
                    var,
                    fallback: Some(fallback),
                })
            }
            _ => Err(ParseError::unsupported(
                format!("value for `{}`", key),
                at,
            )),
        }
    }

    fn store_file(&self, expr: &Expr, at: Location) -> Result<ValueSource, ParseError> {
        match expr {
            Expr::Call { callee, args } if matches!(callee.last().map(String::as_str), Some("file")) => {
                match args.as_slice() {
                    [inner] => self.source("storeFile", inner, at),
                    _ => Err(ParseError::invalid("storeFile", "file(<path>)", Some(at))),
                }
            }
            other => self.source("storeFile", other, at),
        }
    }

    fn signing_ref(&self, expr: &Expr, at: Location) -> Result<SigningRef, ParseError> {
        let name = match expr {
            Expr::Call { callee, args }
                if callee.len() == 2
                    && callee[0] == "signingConfigs"
                    && matches!(callee[1].as_str(), "getByName" | "named") =>
            {
                match args.as_slice() {
                    [Expr::Str(name)] => Some(name.clone()),
                    _ => None,
                }
            }
            Expr::Path(path) if path.len() == 2 && path[0] == "signingConfigs" => Some(path[1].clone()),
            _ => None,
        };
        name.map(|name| SigningRef { name, at: Some(at) }).ok_or_else(|| {
            ParseError::invalid(
                "signingConfig",
                "signingConfigs.getByName(\"<name>\")",
                Some(at),
            )
        })
    }

    fn plugins(&mut self, body: &[Statement]) -> Result<(), ParseError> {
        for stmt in body {
            match &stmt.kind {
                StatementKind::Call { name, args } if args.len() == 1 => {
                    let Expr::Str(arg) = &args[0] else {
                        return Err(ParseError::invalid("plugins", "a plugin id string", Some(stmt.at)));
                    };
                    match name.join(".").as_str() {
                        "id" => self.out.plugins.push(arg.clone()),
                        "kotlin" => self.out.plugins.push(format!("org.jetbrains.kotlin.{}", arg)),
                        _ => ignore(stmt),
                    }
                }
                _ => ignore(stmt),
            }
        }
        Ok(())
    }

    fn android(&mut self, body: &[Statement]) -> Result<(), ParseError> {
        for stmt in body {
            let at = stmt.at;
            match (&stmt.kind, stmt.name().as_str()) {
                (StatementKind::Assign { value, .. }, "namespace") => {
                    self.out.namespace = Some(self.string("namespace", value, at)?);
                }
                (StatementKind::Assign { value, .. }, key @ ("compileSdk" | "compileSdkVersion")) => {
                    self.out.compile_sdk = Some(self.int(key, value, at)?);
                }
                (StatementKind::Assign { value, .. }, "ndkVersion") => {
                    self.out.ndk_version = Some(self.string("ndkVersion", value, at)?);
                }
                (StatementKind::Block { body, .. }, "compileOptions") => self.compile_options(body)?,
                (StatementKind::Block { body, .. }, "kotlinOptions") => self.kotlin_options(body)?,
                (StatementKind::Block { body, .. }, "defaultConfig") => self.default_config(body)?,
                (StatementKind::Block { body, .. }, "signingConfigs") => self.signing_configs(body)?,
                (StatementKind::Block { body, .. }, "buildTypes") => self.build_types(body)?,
                _ => ignore(stmt),
            }
        }
        Ok(())
    }

    fn compile_options(&mut self, body: &[Statement]) -> Result<(), ParseError> {
        for stmt in body {
            match (&stmt.kind, stmt.name().as_str()) {
                (StatementKind::Assign { value, .. }, key @ "sourceCompatibility") => {
                    self.out.java.source_compatibility = Some(self.java_version(key, value, stmt.at)?);
                }
                (StatementKind::Assign { value, .. }, key @ "targetCompatibility") => {
                    self.out.java.target_compatibility = Some(self.java_version(key, value, stmt.at)?);
                }
                _ => ignore(stmt),
            }
        }
        Ok(())
    }

    fn kotlin_options(&mut self, body: &[Statement]) -> Result<(), ParseError> {
        for stmt in body {
            match (&stmt.kind, stmt.name().as_str()) {
                (StatementKind::Assign { value, .. }, key @ "jvmTarget") => {
                    self.out.java.jvm_target = Some(self.java_version(key, value, stmt.at)?);
                }
                _ => ignore(stmt),
            }
        }
        Ok(())
    }

    fn default_config(&mut self, body: &[Statement]) -> Result<(), ParseError> {
        for stmt in body {
            let at = stmt.at;
            let StatementKind::Assign { value, .. } = &stmt.kind else {
                ignore(stmt);
                continue;
            };
            let key = stmt.name();
            match key.as_str() {
                "applicationId" => self.out.defaults.application_id = Some(self.string(&key, value, at)?),
                "minSdk" | "minSdkVersion" => self.out.defaults.min_sdk = Some(self.int(&key, value, at)?),
                "targetSdk" | "targetSdkVersion" => self.out.defaults.target_sdk = Some(self.int(&key, value, at)?),
                "versionCode" => self.out.defaults.version_code = Some(self.int(&key, value, at)?),
                "versionName" => self.out.defaults.version_name = Some(self.string(&key, value, at)?),
                "multiDexEnabled" => self.out.defaults.multi_dex_enabled = Some(self.bool(&key, value, at)?),
                "signingConfig" => self.out.defaults.signing = Some(self.signing_ref(value, at)?),
                _ => ignore(stmt),
            }
        }
        Ok(())
    }

    fn signing_configs(&mut self, body: &[Statement]) -> Result<(), ParseError> {
        for stmt in body {
            let Some(name) = container_entry(stmt)? else {
                ignore(stmt);
                continue;
            };
            let idx = match self.out.signing_configs.iter().position(|c| c.name == name) {
                Some(idx) => idx,
                None => {
                    self.out.signing_configs.push(SigningConfig::named(name));
                    self.out.signing_configs.len() - 1
                }
            };
            for entry in body_of(stmt).unwrap_or_default() {
                let at = entry.at;
                let StatementKind::Assign { value, .. } = &entry.kind else {
                    ignore(entry);
                    continue;
                };
                let key = entry.name();
                let source = match key.as_str() {
                    "storeFile" => self.store_file(value, at)?,
                    "storePassword" | "keyAlias" | "keyPassword" => self.source(&key, value, at)?,
                    _ => {
                        ignore(entry);
                        continue;
                    }
                };
                let config = &mut self.out.signing_configs[idx];
                let slot = match key.as_str() {
                    "storeFile" => &mut config.store_file,
                    "storePassword" => &mut config.store_password,
                    "keyAlias" => &mut config.key_alias,
                    _ => &mut config.key_password,
                };
                *slot = Some(source);
            }
        }
        Ok(())
    }

    fn build_types(&mut self, body: &[Statement]) -> Result<(), ParseError> {
        for stmt in body {
            let Some(name) = container_entry(stmt)? else {
                ignore(stmt);
                continue;
            };
            let idx = match self.out.build_types.iter().position(|b| b.name == name) {
                Some(idx) => idx,
                None => {
                    self.out.build_types.push(BuildTypeDecl::named(name, Some(stmt.at)));
                    self.out.build_types.len() - 1
                }
            };
            for entry in body_of(stmt).unwrap_or_default() {
                self.build_type_entry(idx, entry)?;
            }
        }
        Ok(())
    }

    fn build_type_entry(&mut self, idx: usize, entry: &Statement) -> Result<(), ParseError> {
        let at = entry.at;
        let key = entry.name();
        match &entry.kind {
            StatementKind::Assign { value, .. } => {
                let typed = match key.as_str() {
                    "signingConfig" => BuildTypeValue::Signing(self.signing_ref(value, at)?),
                    "minifyEnabled" | "isMinifyEnabled" => BuildTypeValue::Minify(self.bool(&key, value, at)?),
                    "shrinkResources" | "isShrinkResources" => {
                        BuildTypeValue::Shrink(self.bool(&key, value, at)?)
                    }
                    "isDebuggable" | "debuggable" => BuildTypeValue::Debuggable(self.bool(&key, value, at)?),
                    "multiDexEnabled" => BuildTypeValue::MultiDex(self.bool(&key, value, at)?),
                    "applicationIdSuffix" => BuildTypeValue::IdSuffix(self.string(&key, value, at)?),
                    "versionNameSuffix" => BuildTypeValue::NameSuffix(self.string(&key, value, at)?),
                    _ => {
                        ignore(entry);
                        return Ok(());
                    }
                };
                let decl = &mut self.out.build_types[idx];
                match typed {
                    BuildTypeValue::Signing(r) => decl.signing = Some(r),
                    BuildTypeValue::Minify(b) => decl.minify = Some(b),
                    BuildTypeValue::Shrink(b) => decl.shrink_resources = Some(b),
                    BuildTypeValue::Debuggable(b) => {
                        decl.kind = Some(if b { BuildKind::Debug } else { BuildKind::Release });
                    }
                    BuildTypeValue::MultiDex(b) => decl.multi_dex_enabled = Some(b),
                    BuildTypeValue::IdSuffix(s) => decl.application_id_suffix = Some(s),
                    BuildTypeValue::NameSuffix(s) => decl.version_name_suffix = Some(s),
                }
            }
            StatementKind::Call { args, .. } if key == "proguardFiles" || key == "proguardFile" => {
                let files = args
                    .iter()
                    .map(|arg| self.proguard_file(arg, at))
                    .collect::<Result<Vec<_>, _>>()?;
                self.out.build_types[idx].proguard_files.extend(files);
            }
            _ => ignore(entry),
        }
        Ok(())
    }

    fn proguard_file(&self, expr: &Expr, at: Location) -> Result<ProguardFile, ParseError> {
        match expr {
            Expr::Str(s) => Ok(ProguardFile::Project(s.clone())),
            Expr::Call { args, .. } if expr.is_call_to("getDefaultProguardFile") || expr.is_call_to("file") => {
                let [Expr::Str(name)] = args.as_slice() else {
                    return Err(ParseError::invalid("proguardFiles", "a file name string", Some(at)));
                };
                if expr.is_call_to("file") {
                    Ok(ProguardFile::Project(name.clone()))
                } else {
                    Ok(ProguardFile::Default(name.clone()))
                }
            }
            _ => Err(ParseError::invalid("proguardFiles", "file names", Some(at))),
        }
    }
}

enum BuildTypeValue {
    Signing(SigningRef),
    Minify(bool),
    Shrink(bool),
    Debuggable(bool),
    MultiDex(bool),
    IdSuffix(String),
    NameSuffix(String),
}

fn getenv_name(key: &str, call: &Expr, at: Location) -> Result<String, ParseError> {
    match call {
        Expr::Call { args, .. } => match args.as_slice() {
            [Expr::Str(var)] => Ok(var.clone()),
            _ => Err(ParseError::invalid(key, "System.getenv(\"<NAME>\")", Some(at))),
        },
        _ => Err(ParseError::invalid(key, "System.getenv(\"<NAME>\")", Some(at))),
    }
}

/// Name of a `signingConfigs`/`buildTypes` entry: `release { }`,
/// `create("staging") { }` or `getByName("debug") { }`
fn container_entry(stmt: &Statement) -> Result<Option<String>, ParseError> {
    let StatementKind::Block { name, args, .. } = &stmt.kind else {
        return Ok(None);
    };
    match (name.as_slice(), args.as_slice()) {
        ([single], []) => Ok(Some(single.clone())),
        ([method], [Expr::Str(entry)])
            if matches!(method.as_str(), "create" | "getByName" | "maybeCreate" | "register" | "named") =>
        {
            Ok(Some(entry.clone()))
        }
        ([method], _) if matches!(method.as_str(), "create" | "getByName" | "maybeCreate" | "register" | "named") => {
            Err(ParseError::invalid(method, "a single name string", Some(stmt.at)))
        }
        _ => Ok(None),
    }
}
