//! variantkit CLI
//!
//! Loads and validates Android build variant descriptors before a build.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use variantkit_android::gradle::{self, Artifact};
use variantkit_android::loader::{LoadOptions, ValidatedVariant, VariantConfigLoader};
use variantkit_android::preflight;
use variantkit_android::{BuildVariant, Signing, ValueSource};
use variantkit_cli::output::{self, format_count, Status};
use variantkit_core::config::{Config, InsecureReleasePolicy};
use variantkit_core::error::{exit_codes, Error, ErrorCode};
use variantkit_telemetry::{level_for_verbosity, TelemetryConfig, Timer};

#[derive(Parser)]
#[command(name = "variantkit")]
#[command(about = "Load and validate Android build variant descriptors")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Property for symbolic references, e.g. flutter.compileSdkVersion=34
    #[arg(short = 'P', long = "property", value_name = "KEY=VALUE", value_parser = parse_property, global = true)]
    properties: Vec<(String, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every variant (or one) in a descriptor
    Check {
        /// Descriptor file (build.gradle.kts or .toml)
        descriptor: Option<PathBuf>,
        /// Only this variant
        #[arg(long)]
        variant: Option<String>,
        /// Fail release variants that carry warnings
        #[arg(long)]
        deny_insecure: bool,
        /// Let release variants through a deny policy
        #[arg(long)]
        allow_insecure: bool,
    },

    /// Print the merged variants (secrets redacted)
    Show {
        /// Descriptor file (build.gradle.kts or .toml)
        descriptor: Option<PathBuf>,
        /// Only this variant
        #[arg(long)]
        variant: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate, then check that keystores exist
    Preflight {
        /// Descriptor file (build.gradle.kts or .toml)
        descriptor: Option<PathBuf>,
        /// Only this variant
        #[arg(long)]
        variant: Option<String>,
        /// Directory relative keystore paths are resolved against
        #[arg(long)]
        module_dir: Option<PathBuf>,
    },

    /// Validate one variant and run its Gradle task
    Build {
        /// Descriptor file (build.gradle.kts or .toml)
        descriptor: Option<PathBuf>,
        /// Variant to build
        #[arg(long)]
        variant: String,
        /// Build bundle (AAB) instead of APK
        #[arg(long)]
        bundle: bool,
        /// Gradle project root (contains gradlew)
        #[arg(long)]
        project_dir: Option<PathBuf>,
    },

    /// Report whether a secret comes from the environment or its fallback
    #[command(name = "resolve-secret")]
    ResolveSecret {
        /// Environment variable name
        env_var: String,
        /// Value used when the variable is unset or empty
        #[arg(long)]
        fallback: Option<String>,
    },
}

fn parse_property(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{}`", s)),
    }
}

struct App {
    config: Config,
    options: LoadOptions,
    quiet: bool,
}

impl App {
    fn loader(&self) -> VariantConfigLoader {
        VariantConfigLoader::new(self.options.clone())
    }

    fn descriptor(&self, arg: Option<PathBuf>) -> Result<PathBuf, Error> {
        arg.or_else(|| self.config.schema.general.descriptor.as_ref().map(PathBuf::from))
            .ok_or_else(|| {
                Error::new(ErrorCode::InvalidConfigValue, "No descriptor given")
                    .with_suggestion("Pass a descriptor path or set general.descriptor in .variantkit.toml")
            })
    }

    fn success(&self, message: &str) {
        if !self.quiet {
            Status::success(message);
        }
    }

    fn info(&self, message: &str) {
        if !self.quiet {
            Status::info(message);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    variantkit_telemetry::init_with_config(TelemetryConfig {
        log_level: level_for_verbosity(cli.verbose, cli.quiet).to_string(),
        json: cli.log_json,
        ..TelemetryConfig::default()
    })?;

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => std::process::exit(report(&e)),
    };

    let mut options = LoadOptions::from_config(&config);
    options.properties.extend(cli.properties);

    let app = App {
        config,
        options,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Check {
            descriptor,
            variant,
            deny_insecure,
            allow_insecure,
        } => run_check(&app, descriptor, variant.as_deref(), deny_insecure, allow_insecure),
        Commands::Show {
            descriptor,
            variant,
            json,
        } => run_show(&app, descriptor, variant.as_deref(), json),
        Commands::Preflight {
            descriptor,
            variant,
            module_dir,
        } => run_preflight(&app, descriptor, variant.as_deref(), module_dir),
        Commands::Build {
            descriptor,
            variant,
            bundle,
            project_dir,
        } => run_build(&app, descriptor, &variant, bundle, project_dir),
        Commands::ResolveSecret { env_var, fallback } => {
            Ok(run_resolve_secret(&app, &env_var, fallback.as_deref()))
        }
    };

    let exit_code = result.unwrap_or_else(|e| report(&e));
    std::process::exit(exit_code);
}

/// Print an error and return its exit code
fn report(err: &Error) -> i32 {
    Status::error(&err.to_string());
    err.exit_code()
}

fn load_variants(
    loader: &VariantConfigLoader,
    path: &Path,
    only: Option<&str>,
) -> Result<Vec<BuildVariant>, Error> {
    let timer = Timer::start("load_descriptor");
    let variants = loader.load_file(path)?;
    timer.stop();

    match only {
        None => Ok(variants),
        Some(name) => {
            let available: Vec<_> = variants.iter().map(|v| v.name.clone()).collect();
            let selected: Vec<_> = variants.into_iter().filter(|v| v.name == name).collect();
            if selected.is_empty() {
                Err(
                    Error::new(ErrorCode::InvalidConfigValue, format!("Unknown variant `{}`", name))
                        .with_suggestion(format!("Available variants: {}", available.join(", "))),
                )
            } else {
                Ok(selected)
            }
        }
    }
}

fn module_dir_of(descriptor: &Path) -> PathBuf {
    match descriptor.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn run_check(
    app: &App,
    descriptor: Option<PathBuf>,
    only: Option<&str>,
    deny_insecure: bool,
    allow_insecure: bool,
) -> Result<i32, Error> {
    let path = app.descriptor(descriptor)?;
    let mut options = app.options.clone();
    if deny_insecure {
        options.policy = InsecureReleasePolicy::Deny;
    }
    options.allow_insecure = allow_insecure;
    let loader = VariantConfigLoader::new(options);

    let variants = load_variants(&loader, &path, only)?;
    let timer = Timer::start("validate");
    let mut failed = 0;
    for variant in &variants {
        match loader.validate(variant) {
            Ok(valid) => {
                Status::issues_as_warnings(&valid.warnings);
                app.success(&format!(
                    "{} ({}): valid, {}",
                    variant.name,
                    variant.kind,
                    format_count(valid.warnings.len(), "warning", "warnings")
                ));
            }
            Err(failure) => {
                failed += 1;
                Status::issues_as_warnings(&failure.warnings);
                Status::issues_as_errors(&failure.errors);
                Status::error(&format!(
                    "{} ({}): {}",
                    variant.name,
                    variant.kind,
                    format_count(failure.errors.len(), "error", "errors")
                ));
            }
        }
    }
    let elapsed = timer.stop();
    tracing::debug!(elapsed = %output::format_duration(elapsed), "Check finished");

    if failed > 0 {
        Ok(exit_codes::VALIDATION_ERROR)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

fn describe_source(source: Option<&ValueSource>) -> String {
    match source {
        None => "(not set)".to_string(),
        Some(ValueSource::Literal { value }) => value.clone(),
        Some(ValueSource::Env { var, fallback: Some(_) }) => format!("${} (with fallback)", var),
        Some(ValueSource::Env { var, fallback: None }) => format!("${}", var),
        Some(ValueSource::Property { key, .. }) => format!("property {}", key),
    }
}

/// Pretty JSON plus a trailing newline; write failures such as a closed pipe become errors
fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn run_show(app: &App, descriptor: Option<PathBuf>, only: Option<&str>, json: bool) -> Result<i32, Error> {
    let path = app.descriptor(descriptor)?;
    let variants = load_variants(&app.loader(), &path, only)?;

    if json {
        write_json(&mut io::stdout().lock(), &variants)?;
        return Ok(exit_codes::SUCCESS);
    }

    for v in &variants {
        Status::header(&format!("{} ({})", v.name, v.kind));
        let mut rows = vec![
            ("applicationId", v.application_id.clone()),
            (
                "sdk",
                format!(
                    "min {} / target {} / compile {}",
                    v.sdk.min_sdk, v.sdk.target_sdk, v.sdk.compile_sdk
                ),
            ),
            ("version", format!("{} ({})", v.version_name, v.version_code)),
            ("minify", v.minify.to_string()),
            ("shrinkResources", v.shrink_resources.to_string()),
            ("multiDex", v.multi_dex_enabled.to_string()),
        ];
        match &v.signing {
            None => rows.push(("signing", "(none)".to_string())),
            Some(Signing::DebugKeystore) => rows.push(("signing", "debug keystore".to_string())),
            Some(Signing::Config(c)) => {
                rows.push(("signing", c.name.clone()));
                rows.push(("storeFile", describe_source(c.store_file.as_ref())));
                rows.push(("keyAlias", describe_source(c.key_alias.as_ref())));
            }
        }
        output::print_fields(&rows);
    }
    Ok(exit_codes::SUCCESS)
}

fn validate_selected(
    loader: &VariantConfigLoader,
    path: &Path,
    only: Option<&str>,
) -> Result<Vec<ValidatedVariant>, Error> {
    let variants = load_variants(loader, path, only)?;
    match loader.validate_all(&variants) {
        Ok(validated) => {
            for v in &validated {
                Status::issues_as_warnings(&v.warnings);
            }
            Ok(validated)
        }
        Err(variantkit_android::LoadError::Invalid(failures)) => {
            for failure in &failures {
                Status::issues_as_errors(&failure.errors);
            }
            Err(variantkit_android::LoadError::Invalid(failures).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_preflight(
    app: &App,
    descriptor: Option<PathBuf>,
    only: Option<&str>,
    module_dir: Option<PathBuf>,
) -> Result<i32, Error> {
    let path = app.descriptor(descriptor)?;
    let module_dir = module_dir.unwrap_or_else(|| module_dir_of(&path));
    let validated = validate_selected(&app.loader(), &path, only)?;

    match preflight::check_keystores(&validated, &module_dir) {
        Ok(found) => {
            for check in &found {
                app.success(&format!("{}: keystore {}", check.variant, check.path.display()));
            }
            app.success(&format!(
                "Preflight passed for {}",
                format_count(validated.len(), "variant", "variants")
            ));
            Ok(exit_codes::SUCCESS)
        }
        Err(missing) => {
            let code = missing.iter().map(Error::exit_code).max().unwrap_or(exit_codes::FAILURE);
            for err in &missing {
                report(err);
            }
            Ok(code)
        }
    }
}

fn run_build(
    app: &App,
    descriptor: Option<PathBuf>,
    variant: &str,
    bundle: bool,
    project_dir: Option<PathBuf>,
) -> Result<i32, Error> {
    let path = app.descriptor(descriptor)?;
    let module_dir = module_dir_of(&path);
    let project_dir = project_dir.unwrap_or_else(|| module_dir_of(&module_dir));

    let mut validated = validate_selected(&app.loader(), &path, Some(variant))?;
    if let Err(missing) = preflight::check_keystores(&validated, &module_dir) {
        for err in &missing {
            report(err);
        }
        return Ok(exit_codes::FAILURE);
    }
    let Some(target) = validated.pop() else {
        return Ok(exit_codes::FAILURE);
    };

    let artifact = if bundle { Artifact::Bundle } else { Artifact::Apk };
    app.info(&format!(
        "Building {} {} ({})...",
        target.variant.name,
        artifact,
        gradle::task_for(&target, artifact)
    ));

    let timer = Timer::start("gradle_build");
    gradle::build(&project_dir, &target, artifact, &app.options.properties)?;
    let elapsed = timer.stop();
    app.success(&format!("Build succeeded in {}", output::format_duration(elapsed)));
    Ok(exit_codes::SUCCESS)
}

fn run_resolve_secret(app: &App, env_var: &str, fallback: Option<&str>) -> i32 {
    match app.loader().resolve_secret(env_var, fallback) {
        Some(resolved) if resolved.is_fallback => {
            Status::warning(&format!("{} is not set; the declared fallback would be used", env_var));
            exit_codes::SUCCESS
        }
        Some(_) => {
            app.success(&format!("{} is set in the environment", env_var));
            exit_codes::SUCCESS
        }
        None => {
            Status::error(&format!("{} is not set and no fallback was given", env_var));
            exit_codes::VALIDATION_ERROR
        }
    }
}
