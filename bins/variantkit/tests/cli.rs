use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const LEARNEASE: &str = r#"
plugins {
    id("com.android.application")
    id("dev.flutter.flutter-gradle-plugin")
}

android {
    namespace = "com.learnease.app"
    compileSdk = flutter.compileSdkVersion

    defaultConfig {
        applicationId = "com.learnease.app"
        minSdk = 21
        targetSdk = 34
        versionCode = 1
        versionName = "1.0.0"
        multiDexEnabled = true
    }

    signingConfigs {
        release {
            storeFile = file("keys/learnease-release-key.jks")
            storePassword = System.getenv("LEARNEASE_STORE_PASSWORD") ?: "temp123"
            keyAlias = "learnease"
            keyPassword = System.getenv("LEARNEASE_KEY_PASSWORD") ?: "temp123"
        }
    }

    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("release")
            minifyEnabled = true
            shrinkResources = true
        }
    }
}
"#;

/// Project layout `android/app/build.gradle.kts` inside a temp dir
fn project(descriptor: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let app = dir.path().join("android/app");
    fs::create_dir_all(&app).unwrap();
    fs::write(app.join("build.gradle.kts"), descriptor).unwrap();
    fs::create_dir_all(dir.path().join("xdg")).unwrap();
    dir
}

fn write_keystore(dir: &Path) {
    let keys = dir.join("android/app/keys");
    fs::create_dir_all(&keys).unwrap();
    fs::write(keys.join("learnease-release-key.jks"), b"keystore").unwrap();
}

fn variantkit(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("variantkit").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("RUST_LOG")
        .env_remove("LEARNEASE_STORE_PASSWORD")
        .env_remove("LEARNEASE_KEY_PASSWORD")
        .arg("--no-color");
    cmd
}

const DESCRIPTOR: &str = "android/app/build.gradle.kts";

#[test]
fn check_passes_with_fallback_warnings() {
    let dir = project(LEARNEASE);
    variantkit(dir.path())
        .args(["-P", "flutter.compileSdkVersion=34", "check", DESCRIPTOR])
        .assert()
        .success()
        .stdout(predicate::str::contains("release (release): valid"))
        .stderr(predicate::str::contains("WEAK_SECRET"))
        .stderr(predicate::str::contains("LEARNEASE_STORE_PASSWORD"))
        .stderr(predicate::str::contains("temp123").not());
}

#[test]
fn check_with_env_set_has_no_weak_secret_warning() {
    let dir = project(LEARNEASE);
    variantkit(dir.path())
        .env("LEARNEASE_STORE_PASSWORD", "store-pw")
        .env("LEARNEASE_KEY_PASSWORD", "key-pw")
        .args(["-P", "flutter.compileSdkVersion=34", "check", DESCRIPTOR])
        .assert()
        .success()
        .stderr(predicate::str::contains("WEAK_SECRET").not());
}

#[test]
fn check_reports_sdk_ordering() {
    let dir = project(&LEARNEASE.replace("minSdk = 21", "minSdk = 35"));
    variantkit(dir.path())
        .args(["-P", "flutter.compileSdkVersion=34", "check", DESCRIPTOR, "--variant", "release"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SDK ordering violated"));
}

#[test]
fn unresolved_property_is_parse_error() {
    let dir = project(LEARNEASE);
    variantkit(dir.path())
        .args(["check", DESCRIPTOR])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("flutter.compileSdkVersion"))
        .stderr(predicate::str::contains("E4001"));
}

#[test]
fn syntax_error_reports_location() {
    let dir = project("android {\n    minSdk 21\n}\n");
    variantkit(dir.path())
        .args(["check", DESCRIPTOR])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("2:12"));
}

#[test]
fn properties_from_config_file() {
    let dir = project(LEARNEASE);
    fs::write(
        dir.path().join(".variantkit.toml"),
        "[general]\ndescriptor = \"android/app/build.gradle.kts\"\n\n[properties]\n\"flutter.compileSdkVersion\" = 34\n",
    )
    .unwrap();
    variantkit(dir.path()).arg("check").assert().success();
}

#[test]
fn deny_policy_and_override() {
    let dir = project(LEARNEASE);
    let args = ["-P", "flutter.compileSdkVersion=34", "check", DESCRIPTOR, "--deny-insecure"];
    variantkit(dir.path())
        .args(args)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("INSECURE_RELEASE"));
    variantkit(dir.path())
        .args(args)
        .arg("--allow-insecure")
        .assert()
        .success();
}

#[test]
fn unknown_variant() {
    let dir = project(LEARNEASE);
    variantkit(dir.path())
        .args(["-P", "flutter.compileSdkVersion=34", "check", DESCRIPTOR, "--variant", "qa"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Available variants: release, debug"));
}

#[test]
fn missing_explicit_config() {
    let dir = project(LEARNEASE);
    variantkit(dir.path())
        .args(["--config", "absent.toml", "check", DESCRIPTOR])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("E3001"));
}

#[test]
fn show_json_redacts_secrets() {
    let dir = project(LEARNEASE);
    let out = variantkit(dir.path())
        .args(["-P", "flutter.compileSdkVersion=34", "show", DESCRIPTOR, "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    assert!(!text.contains("temp123"));
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let variants = json.as_array().unwrap();
    assert_eq!(variants.len(), 2);
    assert_eq!(variants[0]["name"], "release");
    assert_eq!(variants[0]["sdk"]["compileSdk"], 34);
    assert_eq!(variants[1]["signing"]["type"], "debugKeystore");
}

#[test]
fn show_text() {
    let dir = project(LEARNEASE);
    variantkit(dir.path())
        .args(["-P", "flutter.compileSdkVersion=34", "show", DESCRIPTOR, "--variant", "release"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.learnease.app"))
        .stdout(predicate::str::contains("$LEARNEASE_STORE_PASSWORD").not())
        .stdout(predicate::str::contains("keys/learnease-release-key.jks"));
}

#[test]
fn resolve_secret_never_prints_value() {
    let dir = project(LEARNEASE);
    variantkit(dir.path())
        .env("LEARNEASE_STORE_PASSWORD", "super-secret-value")
        .args(["resolve-secret", "LEARNEASE_STORE_PASSWORD", "--fallback", "temp123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set in the environment"))
        .stdout(predicate::str::contains("super-secret-value").not());

    variantkit(dir.path())
        .args(["resolve-secret", "LEARNEASE_STORE_PASSWORD", "--fallback", "temp123"])
        .assert()
        .success()
        .stderr(predicate::str::contains("fallback"))
        .stderr(predicate::str::contains("temp123").not());

    variantkit(dir.path())
        .args(["resolve-secret", "LEARNEASE_STORE_PASSWORD"])
        .assert()
        .code(2);
}

#[test]
fn preflight_reports_missing_keystore() {
    let dir = project(LEARNEASE);
    variantkit(dir.path())
        .args(["-P", "flutter.compileSdkVersion=34", "preflight", DESCRIPTOR])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("E8010"));

    write_keystore(dir.path());
    variantkit(dir.path())
        .args(["-P", "flutter.compileSdkVersion=34", "preflight", DESCRIPTOR])
        .assert()
        .success()
        .stdout(predicate::str::contains("Preflight passed for 2 variants"));
}

#[test]
fn build_without_gradle_wrapper() {
    let dir = project(LEARNEASE);
    write_keystore(dir.path());
    variantkit(dir.path())
        .args(["-P", "flutter.compileSdkVersion=34", "build", DESCRIPTOR, "--variant", "release"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("gradlew"));
}

#[cfg(unix)]
#[test]
fn build_runs_gradle_task() {
    use std::os::unix::fs::PermissionsExt;

    let dir = project(LEARNEASE);
    write_keystore(dir.path());
    let wrapper = dir.path().join("android/gradlew");
    fs::write(&wrapper, "#!/bin/sh\necho \"$1\" > task.txt\n").unwrap();
    fs::set_permissions(&wrapper, fs::Permissions::from_mode(0o755)).unwrap();

    variantkit(dir.path())
        .args([
            "-P",
            "flutter.compileSdkVersion=34",
            "build",
            DESCRIPTOR,
            "--variant",
            "release",
            "--bundle",
        ])
        .assert()
        .success();

    let task = fs::read_to_string(dir.path().join("android/task.txt")).unwrap();
    assert!(task.starts_with("bundleRelease"));
}
