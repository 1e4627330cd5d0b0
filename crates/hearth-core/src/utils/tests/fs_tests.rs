use std::fs;
use std::path::Path;

use tempfile::tempdir;

use crate::utils::fs::{find_artifacts, is_manifest_file, manifest_in_dir};

#[test]
fn test_is_manifest_file() {
    assert!(is_manifest_file(Path::new("plugins/plugin.toml")));
    assert!(is_manifest_file(Path::new("plugin.json")));
    assert!(is_manifest_file(Path::new("PLUGIN.YML")));
    assert!(is_manifest_file(Path::new("economy.plugin.toml")));
    assert!(is_manifest_file(Path::new("chat.plugin.yaml")));

    assert!(!is_manifest_file(Path::new(".plugin.toml")));
    assert!(!is_manifest_file(Path::new("economy.toml")));
    assert!(!is_manifest_file(Path::new("plugin.txt")));
    assert!(!is_manifest_file(Path::new("libeconomy.so")));
}

#[test]
fn test_manifest_in_dir_prefers_toml() {
    let tmp = tempdir().expect("Failed to create temp directory");
    assert!(manifest_in_dir(tmp.path()).is_none());

    fs::write(tmp.path().join("plugin.json"), "{}").unwrap();
    assert_eq!(manifest_in_dir(tmp.path()), Some(tmp.path().join("plugin.json")));

    fs::write(tmp.path().join("plugin.toml"), "").unwrap();
    assert_eq!(manifest_in_dir(tmp.path()), Some(tmp.path().join("plugin.toml")));
}

#[test]
fn test_find_artifacts_sorted_and_filtered() {
    let tmp = tempdir().expect("Failed to create temp directory");
    let root = tmp.path();

    fs::create_dir(root.join("zeta")).unwrap();
    fs::write(root.join("zeta").join("plugin.toml"), "").unwrap();
    fs::create_dir(root.join("empty_dir")).unwrap();
    fs::create_dir_all(root.join("nested/deeper")).unwrap();
    fs::write(root.join("nested/deeper/plugin.toml"), "").unwrap();
    fs::write(root.join("alpha.plugin.json"), "{}").unwrap();
    fs::write(root.join("README.md"), "notes").unwrap();

    let artifacts = find_artifacts(root).expect("scan should succeed");
    assert_eq!(artifacts, vec![root.join("alpha.plugin.json"), root.join("zeta")]);
}

#[test]
fn test_find_artifacts_missing_dir_errors() {
    let tmp = tempdir().expect("Failed to create temp directory");
    assert!(find_artifacts(&tmp.path().join("does-not-exist")).is_err());
}
