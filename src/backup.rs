//! User-data backup and the restore hint printed after a run.

use crate::policy::BackupSettings;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Format appended to the backup name when the plain name is taken
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// What the backup step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// None of the candidate directories exists
    NoUserData,
    /// The first existing candidate has no entries
    Empty { source: PathBuf },
    /// A full copy was written
    Created {
        source: PathBuf,
        destination: PathBuf,
        files: usize,
    },
    /// Copying failed; the run continues without a backup
    Failed {
        source: PathBuf,
        destination: PathBuf,
        error: String,
    },
}

/// First candidate that exists as a directory, in priority order
pub fn find_userdata(root: &Path, settings: &BackupSettings) -> Option<PathBuf> {
    settings
        .candidates
        .iter()
        .map(|rel| root.join(rel))
        .find(|path| path.is_dir())
}

fn path_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Pick a backup directory that does not exist yet.
///
/// `<name>` if free, else `<name>_<YYYYMMDD_HHMMSS>`, else the timestamped
/// name with `_2`, `_3`, ... appended.
pub fn backup_destination(root: &Path, name: &str, now: &DateTime<Local>) -> PathBuf {
    let plain = root.join(name);
    if !path_taken(&plain) {
        return plain;
    }

    let stamped = format!("{}_{}", name, now.format(TIMESTAMP_FORMAT));
    let mut candidate = root.join(&stamped);
    let mut n = 2;
    while path_taken(&candidate) {
        candidate = root.join(format!("{}_{}", stamped, n));
        n += 1;
    }
    candidate
}

/// Copy a directory tree into a destination that must not exist yet.
/// Symlinks in the source are followed so the copy is self-contained.
/// On failure the partial copy is removed so it is never mistaken for a
/// backup. Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    fs::create_dir(dst).with_context(|| format!("Failed to create {}", dst.display()))?;

    let result = copy_entries(src, dst);
    if result.is_err() {
        if let Err(err) = fs::remove_dir_all(dst) {
            eprintln!(
                "{} Could not remove partial backup {}: {}",
                "Warning:".yellow(),
                dst.display(),
                err
            );
        }
    }
    result
}

fn copy_entries(src: &Path, dst: &Path) -> Result<usize> {
    let mut files = 0;
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to read {}", src.display()))?;
        let src_path = entry.path();
        let dst_path = dst.join(src_path.strip_prefix(src)?);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dst_path)
                .with_context(|| format!("Failed to create {}", dst_path.display()))?;
        } else {
            fs::copy(src_path, &dst_path)
                .with_context(|| format!("Failed to copy {}", src_path.display()))?;
            files += 1;
        }
    }

    Ok(files)
}

/// Back up the user-data directory before anything is deleted.
///
/// Missing or empty user data is a normal outcome. Copy failures are
/// reported in the outcome rather than returned as errors.
pub fn backup_userdata(root: &Path, settings: &BackupSettings, now: &DateTime<Local>) -> BackupOutcome {
    let Some(source) = find_userdata(root, settings) else {
        println!("No user data directory found, skipping backup");
        return BackupOutcome::NoUserData;
    };

    let relative_source = source.strip_prefix(root).unwrap_or(&source).to_path_buf();

    let is_empty = match fs::read_dir(&source) {
        Ok(mut entries) => entries.next().is_none(),
        Err(err) => {
            let error = format!("Failed to read {}: {}", relative_source.display(), err);
            eprintln!("{} Backup failed: {}", "Warning:".yellow(), error);
            return BackupOutcome::Failed {
                source: relative_source,
                destination: PathBuf::new(),
                error,
            };
        }
    };

    if is_empty {
        println!(
            "User data directory {} is empty, skipping backup",
            relative_source.display()
        );
        return BackupOutcome::Empty {
            source: relative_source,
        };
    }

    let destination = backup_destination(root, &settings.name, now);

    match copy_tree(&source, &destination) {
        Ok(files) => {
            println!(
                "User data backed up: {} -> {} ({} files)",
                relative_source.display(),
                backup_dir_name(&destination),
                files
            );
            BackupOutcome::Created {
                source: relative_source,
                destination,
                files,
            }
        }
        Err(err) => {
            let error = format!("{:#}", err);
            eprintln!("{} Backup failed: {}", "Warning:".yellow(), error);
            BackupOutcome::Failed {
                source: relative_source,
                destination,
                error,
            }
        }
    }
}

fn backup_dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Backup directories directly under `root` with their modification times
pub fn find_backups(root: &Path, name: &str) -> Result<Vec<(PathBuf, SystemTime)>> {
    let mut backups = Vec::new();

    let entries =
        fs::read_dir(root).with_context(|| format!("Failed to read {}", root.display()))?;

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        if !file_name.to_string_lossy().starts_with(name) {
            continue;
        }

        // A symlink named like a backup is not a backup
        let Ok(metadata) = fs::symlink_metadata(entry.path()) else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        backups.push((entry.path(), modified));
    }

    Ok(backups)
}

/// Most recently modified backup. Ties go to the lexically greatest name,
/// which for timestamped names is the newest.
pub fn latest_by_mtime(backups: Vec<(PathBuf, SystemTime)>) -> Option<PathBuf> {
    backups
        .into_iter()
        .max_by(|(a_path, a_time), (b_path, b_time)| {
            a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
        })
        .map(|(path, _)| path)
}

/// Find the newest backup under `root`
pub fn latest_backup(root: &Path, name: &str) -> Result<Option<PathBuf>> {
    Ok(latest_by_mtime(find_backups(root, name)?))
}

/// Shell command that copies a backup back into the live user-data directory
pub fn restore_command(backup: &Path, restore_target: &str) -> String {
    format!(
        "cp -r {}/* {}/",
        backup_dir_name(backup),
        restore_target.trim_end_matches('/')
    )
}
