//! The cleanup run: backup, directory removal, file patterns, env check,
//! restore hint. Stages run strictly in that order.

use crate::backup::{backup_userdata, latest_backup, restore_command, BackupOutcome};
use crate::env::missing_env_files;
use crate::policy::Policy;
use crate::remover::{
    compile_patterns, remove_listed_dirs, remove_matching_files, remove_named_dirs,
    RemovalOptions, RemovalReport,
};

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Options controlling run behavior (runtime flags)
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub verbose: bool,
    pub calculate_sizes: bool,
}

/// Result of one cleanup run
#[derive(Debug)]
pub struct RunReport {
    /// `None` when the policy has no backup settings
    pub backup: Option<BackupOutcome>,
    pub removal: RemovalReport,
    pub missing_env: Vec<String>,
    pub latest_backup: Option<PathBuf>,
    pub restore_hint: Option<String>,
}

impl RunReport {
    pub fn warning_count(&self) -> usize {
        let backup_failed = matches!(self.backup, Some(BackupOutcome::Failed { .. }));
        self.removal.warnings.len() + usize::from(backup_failed)
    }
}

/// Applies one policy to one project root
pub struct Cleaner {
    root: PathBuf,
    policy: Policy,
    options: RunOptions,
}

impl Cleaner {
    /// Create a cleaner; fails if the policy has paths escaping the root
    pub fn new(root: impl Into<PathBuf>, policy: Policy, options: RunOptions) -> Result<Self> {
        policy.validate()?;
        Ok(Cleaner {
            root: root.into(),
            policy,
            options,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run every stage using the current local time for backup naming
    pub fn run(&self) -> Result<RunReport> {
        self.run_at(Local::now())
    }

    /// Run every stage; `now` names a timestamped backup if one is needed
    pub fn run_at(&self, now: DateTime<Local>) -> Result<RunReport> {
        let root = self.root.as_path();
        if !root.is_dir() {
            bail!("Project root {} is not a directory", root.display());
        }

        // Compile up front so a bad pattern fails before anything is deleted
        let patterns = compile_patterns(&self.policy.file_patterns)?;

        println!("{}", format!("Cleaning {}", root.display()).bold());

        let backup = self
            .policy
            .backup
            .as_ref()
            .map(|settings| backup_userdata(root, settings, &now));

        let removal_options = RemovalOptions {
            verbose: self.options.verbose,
            calculate_sizes: self.options.calculate_sizes,
        };
        let mut removal = RemovalReport::default();

        remove_listed_dirs(root, &self.policy.directories, removal_options, &mut removal);

        let protected = self.policy.backup.as_ref().map(|b| b.name.as_str());

        if let Some(rule) = &self.policy.walk {
            remove_named_dirs(
                root,
                rule,
                &self.policy.exclude,
                protected,
                removal_options,
                &mut removal,
            );
        }

        remove_matching_files(
            root,
            &patterns,
            &self.policy.exclude,
            protected,
            removal_options,
            &mut removal,
        );

        let missing_env = missing_env_files(root, &self.policy.env_files);
        if !missing_env.is_empty() {
            println!(
                "{}",
                format!("Missing environment files: {}", missing_env.join(", ")).yellow()
            );
        }

        println!("{}", "Cleanup complete".green());

        let (latest, restore_hint) = match &self.policy.backup {
            Some(settings) => match latest_backup(root, &settings.name)? {
                Some(path) => {
                    let hint = restore_command(&path, &settings.restore_target);
                    (Some(path), Some(hint))
                }
                None => (None, None),
            },
            None => (None, None),
        };

        Ok(RunReport {
            backup,
            removal,
            missing_env,
            latest_backup: latest,
            restore_hint,
        })
    }
}
