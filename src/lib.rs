//! Scrub - pre-commit cleanup for a multi-package project
//!
//! Scrub backs up the user-data directory, then removes build output,
//! dependency caches, temporary test directories and generated files so a
//! commit only carries sources.
//!
//! ## Run order
//!
//! Backup → directory removal → file-pattern removal → env-file check →
//! restore hint. The backup always happens before anything that could delete
//! its source.
//!
//! ## Policies
//!
//! Rules are plain data ([`Policy`]) compiled in from `policies.toml`:
//! - `precommit` removes an explicit list of directories by path
//! - `sweep` walks the tree and removes directories by name or prefix
//!
//! Both share one deletion primitive and the same glob file pass.

pub mod backup;
pub mod cleaner;
pub mod env;
pub mod policy;
pub mod remover;
pub mod vcs;

// Re-export commonly used items
pub use backup::{backup_userdata, latest_backup, restore_command, BackupOutcome};
pub use cleaner::{Cleaner, RunOptions, RunReport};
pub use policy::{get_policy, load_policies, BackupSettings, Policy, WalkRule, DEFAULT_POLICY};
pub use remover::{
    compile_patterns, should_exclude_path, FilePattern, PatternCount, RemovalOptions,
    RemovalReport, RemovedDir,
};
pub use vcs::VCS_INTERNALS;
