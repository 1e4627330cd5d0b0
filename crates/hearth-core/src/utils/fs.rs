use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Manifest file names recognised inside a plugin directory, in lookup order.
pub const MANIFEST_FILE_NAMES: [&str; 4] = ["plugin.toml", "plugin.json", "plugin.yaml", "plugin.yml"];

const MANIFEST_EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

/// Whether `path` names a manifest file: one of [`MANIFEST_FILE_NAMES`] or
/// `<anything>.plugin.<toml|json|yaml|yml>`.
pub fn is_manifest_file(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = file_name.to_lowercase();
    if MANIFEST_FILE_NAMES.contains(&lower.as_str()) {
        return true;
    }
    MANIFEST_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".plugin.{}", ext)) && lower.len() > ".plugin.".len() + ext.len())
}

/// The manifest file inside a plugin directory, if it has one
pub fn manifest_in_dir(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Plugin artifacts directly inside `dir`, sorted by path.
///
/// An artifact is a manifest file, or a subdirectory holding one of the
/// canonical manifest names. Other entries are ignored; the scan does not
/// descend further than one level.
pub fn find_artifacts(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut artifacts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let entry_path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(e) => {
                log::warn!("Failed to get file type for {}: {}", entry_path.display(), e);
                continue;
            }
        };

        if file_type.is_dir() || (file_type.is_symlink() && entry_path.is_dir()) {
            if manifest_in_dir(&entry_path).is_some() {
                artifacts.push(entry_path);
            } else {
                log::debug!("Skipping directory without manifest: {}", entry_path.display());
            }
        } else if is_manifest_file(&entry_path) {
            artifacts.push(entry_path);
        }
    }
    artifacts.sort();
    Ok(artifacts)
}
