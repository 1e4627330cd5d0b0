//! Small filesystem helpers shared by discovery and tests.
pub mod fs;

pub use fs::{find_artifacts, is_manifest_file, manifest_in_dir, MANIFEST_FILE_NAMES};

#[cfg(test)]
mod tests;
