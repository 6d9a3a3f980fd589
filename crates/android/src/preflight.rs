//! Build-time checks that need the filesystem
//!
//! Validation never touches the disk, so a keystore that only exists on the
//! build machine can still be validated elsewhere. These checks run right
//! before a build.

use crate::loader::ValidatedVariant;
use std::path::{Path, PathBuf};
use variantkit_core::error::Error;

/// A signed variant whose keystore file is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoreCheck {
    pub variant: String,
    pub path: PathBuf,
}

/// Keystore path as Gradle would open it from `module_dir`
pub fn keystore_path(store_file: &str, module_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(store_file);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        module_dir.join(path)
    }
}

/// Check that every resolved keystore exists
///
/// Returns the found keystores, or one `KeystoreNotFound` error per missing
/// file. Variants without a resolved signing config are skipped.
pub fn check_keystores(
    variants: &[ValidatedVariant],
    module_dir: &Path,
) -> Result<Vec<KeystoreCheck>, Vec<Error>> {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for validated in variants {
        let Some(signing) = &validated.signing else {
            continue;
        };
        let path = keystore_path(&signing.store_file, module_dir);
        let name = &validated.variant.name;
        if path.is_file() {
            tracing::debug!(variant = %name, path = %path.display(), "Keystore found");
            found.push(KeystoreCheck {
                variant: name.clone(),
                path,
            });
        } else {
            tracing::debug!(variant = %name, path = %path.display(), "Keystore missing");
            missing.push(Error::keystore_not_found(name, &path));
        }
    }

    if missing.is_empty() {
        Ok(found)
    } else {
        Err(missing)
    }
}
