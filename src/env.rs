//! Advisory check for environment files the projects expect.

use std::path::Path;

/// Expected env files that are absent, in policy order
pub fn missing_env_files(root: &Path, env_files: &[String]) -> Vec<String> {
    env_files
        .iter()
        .filter(|rel| !root.join(rel).exists())
        .cloned()
        .collect()
}
