//! Cleanup policies loaded from the embedded policies.toml.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path};

// Embed the TOML file directly in the binary at compile time
const POLICIES_TOML: &str = include_str!("../policies.toml");

/// Policy used when none is named on the command line
pub const DEFAULT_POLICY: &str = "precommit";

/// Where user data lives and how its backup is named
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackupSettings {
    /// Candidate user-data directories, highest priority first
    pub candidates: Vec<String>,
    /// Backup directory name; also the prefix used to find older backups
    pub name: String,
    /// Where the restore hint tells the user to copy the backup back to
    pub restore_target: String,
}

impl Default for BackupSettings {
    fn default() -> Self {
        BackupSettings {
            candidates: vec![
                "backend/dist/backend/userdata".to_string(),
                "backend/userdata".to_string(),
            ],
            name: "userdata_backup".to_string(),
            restore_target: "backend/userdata".to_string(),
        }
    }
}

/// Directory names and name prefixes removed during a full tree walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WalkRule {
    pub names: Vec<String>,
    pub prefixes: Vec<String>,
}

impl WalkRule {
    /// Check a directory base name against the name set and the prefixes
    pub fn matches(&self, dir_name: &str) -> bool {
        self.names.iter().any(|name| name == dir_name)
            || self
                .prefixes
                .iter()
                .any(|prefix| !prefix.is_empty() && dir_name.starts_with(prefix.as_str()))
    }
}

/// One named set of cleanup rules.
///
/// A policy combines two directory strategies: `directories` removes explicit
/// root-relative paths, `walk` removes directories by name anywhere in the
/// tree. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub description: String,
    pub directories: Vec<String>,
    pub walk: Option<WalkRule>,
    pub file_patterns: Vec<String>,
    pub exclude: Vec<String>,
    pub env_files: Vec<String>,
    pub backup: Option<BackupSettings>,
}

impl Policy {
    /// Reject paths that would resolve outside the project root
    pub fn validate(&self) -> Result<()> {
        let backup_paths = self
            .backup
            .iter()
            .flat_map(|b| b.candidates.iter().chain(std::iter::once(&b.restore_target)));

        for rel in self
            .directories
            .iter()
            .chain(self.env_files.iter())
            .chain(backup_paths)
        {
            if !is_root_relative(rel) {
                bail!(
                    "Path '{}' must be relative to the project root and must not contain '..'",
                    rel
                );
            }
        }

        if let Some(backup) = &self.backup {
            if backup.name.is_empty() || backup.name.contains(['/', '\\']) {
                bail!("Backup name '{}' must be a plain directory name", backup.name);
            }
        }

        Ok(())
    }
}

fn is_root_relative(rel: &str) -> bool {
    !rel.is_empty()
        && Path::new(rel)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Parse every policy from the embedded TOML content
pub fn load_policies() -> Result<BTreeMap<String, Policy>> {
    parse_policies(POLICIES_TOML).context("Failed to parse embedded policies TOML")
}

fn parse_policies(content: &str) -> Result<BTreeMap<String, Policy>> {
    let policies: BTreeMap<String, Policy> = toml::from_str(content)?;
    for (name, policy) in &policies {
        policy
            .validate()
            .with_context(|| format!("Invalid policy '{}'", name))?;
    }
    Ok(policies)
}

/// Look up a built-in policy by name
pub fn get_policy(name: &str) -> Result<Policy> {
    let mut policies = load_policies()?;
    match policies.remove(name) {
        Some(policy) => Ok(policy),
        None => bail!(
            "Unknown policy '{}'. Available policies: {}",
            name,
            policies.keys().cloned().collect::<Vec<_>>().join(", ")
        ),
    }
}
