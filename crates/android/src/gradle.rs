//! Gradle build system integration
//!
//! Hands a validated variant to the project's Gradle wrapper.

use crate::descriptor::Properties;
use crate::loader::ValidatedVariant;
use std::fmt;
use std::path::{Path, PathBuf};
use variantkit_core::error::{Error, Result};
use variantkit_core::process::{ensure_success, run_streaming_in_dir};

/// Kind of package to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Artifact {
    /// Installable APK (`assemble<Variant>`)
    #[default]
    Apk,
    /// App bundle for store upload (`bundle<Variant>`)
    Bundle,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Apk => f.write_str("APK"),
            Artifact::Bundle => f.write_str("AAB"),
        }
    }
}

/// Gradle task producing `artifact` for `variant`
pub fn task_for(variant: &ValidatedVariant, artifact: Artifact) -> String {
    let prefix = match artifact {
        Artifact::Apk => "assemble",
        Artifact::Bundle => "bundle",
    };
    format!("{}{}", prefix, variant.variant.task_suffix())
}

fn wrapper_name() -> &'static str {
    if cfg!(windows) { "gradlew.bat" } else { "gradlew" }
}

/// Path of the Gradle wrapper inside `project_dir`
pub fn wrapper_path(project_dir: &Path) -> PathBuf {
    project_dir.join(wrapper_name())
}

/// Injected properties as `ORG_GRADLE_PROJECT_*` environment variables
///
/// Gradle exposes these as project properties without putting the values on
/// the command line.
pub fn property_env(properties: &Properties) -> Vec<(String, String)> {
    properties
        .iter()
        .map(|(k, v)| (format!("ORG_GRADLE_PROJECT_{}", k), v.clone()))
        .collect()
}

/// Run the task for `variant` through the project's Gradle wrapper
pub fn build(
    project_dir: &Path,
    variant: &ValidatedVariant,
    artifact: Artifact,
    properties: &Properties,
) -> Result<()> {
    let wrapper = wrapper_path(project_dir);
    if !wrapper.exists() {
        return Err(Error::file_not_found(&wrapper)
            .with_suggestion("Run from the Gradle project root or pass --project-dir"));
    }

    let task = task_for(variant, artifact);
    let program = wrapper.canonicalize()?.to_string_lossy().into_owned();
    let env = property_env(properties);
    let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    tracing::info!(task = %task, dir = %project_dir.display(), "Running Gradle");
    let code = run_streaming_in_dir(&program, &[task.as_str()], project_dir, &env)?;
    ensure_success(&program, code).map_err(|e| e.with_context(format!("Gradle task {}", task)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildKind, BuildVariant, JavaCompat, SdkVersions};

    fn validated(name: &str) -> ValidatedVariant {
        ValidatedVariant {
            variant: BuildVariant {
                name: name.to_string(),
                kind: BuildKind::Debug,
                application_id: "com.example.app".into(),
                namespace: None,
                sdk: SdkVersions {
                    min_sdk: 21,
                    target_sdk: 34,
                    compile_sdk: 34,
                },
                version_code: 1,
                version_name: "1.0.0".into(),
                signing: None,
                minify: false,
                shrink_resources: false,
                multi_dex_enabled: false,
                proguard_files: Vec::new(),
                java: JavaCompat::default(),
                ndk_version: None,
                plugins: Vec::new(),
            },
            signing: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_task_names() {
        assert_eq!(task_for(&validated("release"), Artifact::Apk), "assembleRelease");
        assert_eq!(task_for(&validated("release"), Artifact::Bundle), "bundleRelease");
        assert_eq!(task_for(&validated("stagingQa"), Artifact::Apk), "assembleStagingQa");
    }

    #[test]
    fn test_property_env() {
        let props = Properties::from([("flutter.versionCode".to_string(), "7".to_string())]);
        assert_eq!(
            property_env(&props),
            vec![("ORG_GRADLE_PROJECT_flutter.versionCode".to_string(), "7".to_string())]
        );
    }

    #[test]
    fn test_build_without_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let err = build(dir.path(), &validated("debug"), Artifact::Apk, &Properties::new()).unwrap_err();
        assert_eq!(err.code, variantkit_core::ErrorCode::FileNotFound);
        assert!(err.suggestion.is_some());
    }
}
