//! Removal passes over the project tree.
//!
//! Three passes share one deletion primitive ([`remove_entry`]):
//! explicit directory paths, directories matched by name during a walk, and
//! files matched by glob pattern. Deletion failures are downgraded to
//! warnings so one stubborn path never stops the rest of the run.

use crate::policy::WalkRule;
use crate::vcs::is_vcs_internal;

use anyhow::{Context, Result};
use colored::Colorize;
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Options controlling removal output (runtime flags)
#[derive(Debug, Clone, Copy, Default)]
pub struct RemovalOptions {
    pub verbose: bool,
    pub calculate_sizes: bool,
}

/// A directory removed during the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedDir {
    /// Path relative to the project root
    pub path: PathBuf,
    pub size: u64,
}

/// Per-pattern tally of removed files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternCount {
    pub pattern: String,
    pub count: usize,
    pub size: u64,
}

/// Everything the removal passes did
#[derive(Debug, Default)]
pub struct RemovalReport {
    pub directories: Vec<RemovedDir>,
    pub patterns: Vec<PatternCount>,
    pub warnings: Vec<String>,
}

impl RemovalReport {
    pub fn files_removed(&self) -> usize {
        self.patterns.iter().map(|p| p.count).sum()
    }

    pub fn bytes_removed(&self) -> u64 {
        self.directories.iter().map(|d| d.size).sum::<u64>()
            + self.patterns.iter().map(|p| p.size).sum::<u64>()
    }

    fn warn(&mut self, message: String) {
        eprintln!("{} {}", "Warning:".yellow(), message);
        self.warnings.push(message);
    }
}

/// A compiled glob pattern from a policy's file list
#[derive(Debug, Clone)]
pub struct FilePattern {
    pub pattern: String,
    matcher: GlobMatcher,
}

impl FilePattern {
    /// Compile a pattern where `*` never crosses `/` and `**/` may match nothing
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("Invalid file pattern '{}'", pattern))?;
        Ok(FilePattern {
            pattern: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// Match a path relative to the project root
    pub fn is_match(&self, relative: &Path) -> bool {
        self.matcher.is_match(relative)
    }
}

/// Compile every pattern, failing on the first invalid one
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<FilePattern>> {
    patterns.iter().map(|p| FilePattern::new(p)).collect()
}

/// Check if a path should be excluded based on directory name matching.
/// VCS internals are always excluded.
pub fn should_exclude_path(path: &Path, excludes: &[String]) -> bool {
    for component in path.components() {
        if let std::path::Component::Normal(name) = component {
            let dir_name = name.to_string_lossy();
            if is_vcs_internal(&dir_name) || excludes.iter().any(|e| e == dir_name.as_ref()) {
                return true;
            }
        }
    }

    false
}

/// Bytes held by regular files under `path`, not following symlinks and
/// not counting VCS metadata
fn calculate_total_dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !entry.file_name().to_str().is_some_and(is_vcs_internal))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Remove one file or directory tree. `metadata` must come from
/// `symlink_metadata`; symlinks are the caller's business.
/// Returns the number of bytes freed (0 unless sizes are requested).
pub fn remove_entry(path: &Path, metadata: &fs::Metadata, calculate_sizes: bool) -> io::Result<u64> {
    let size = match (calculate_sizes, metadata.is_dir()) {
        (false, _) => 0,
        (true, true) => calculate_total_dir_size(path),
        (true, false) => metadata.len(),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }

    Ok(size)
}

fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// Delete already-collected directories. Missing paths and non-directories
/// are skipped silently, symlinks are never followed or removed.
fn remove_directories(
    root: &Path,
    paths: Vec<PathBuf>,
    options: RemovalOptions,
    report: &mut RemovalReport,
) {
    for path in paths {
        let relative = relative_to(&path, root).to_path_buf();

        let metadata = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => {
                report.warn(format!(
                    "Could not get metadata for {}: {}",
                    relative.display(),
                    err
                ));
                continue;
            }
        };

        if metadata.is_symlink() {
            if options.verbose {
                println!("Skipping symlink: {}", relative.display());
            }
            continue;
        }

        if !metadata.is_dir() {
            continue;
        }

        match remove_entry(&path, &metadata, options.calculate_sizes) {
            Ok(size) => {
                println!("Removed: {}", relative.display());
                report.directories.push(RemovedDir {
                    path: relative,
                    size,
                });
            }
            Err(err) => {
                report.warn(format!("Error removing {}: {}", relative.display(), err));
            }
        }
    }
}

/// Remove each listed root-relative directory if present
pub fn remove_listed_dirs(
    root: &Path,
    directories: &[String],
    options: RemovalOptions,
    report: &mut RemovalReport,
) {
    let paths = directories.iter().map(|rel| root.join(rel)).collect();
    remove_directories(root, paths, options, report);
}

/// Walk the whole tree and collect directories matching `rule`.
///
/// Matched directories are not descended into, so nested matches are never
/// collected twice. VCS internals, excluded names and anything starting with
/// `protected_prefix` (existing backups) are neither matched nor entered.
pub fn find_named_dirs(
    root: &Path,
    rule: &WalkRule,
    exclude: &[String],
    protected_prefix: Option<&str>,
    report: &mut RemovalReport,
) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !entry.file_name().to_str().is_some_and(is_vcs_internal));

    while let Some(result) = walker.next() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                report.warn(format!("Failed to access entry: {}", err));
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let relative = relative_to(entry.path(), root);

        if should_exclude_path(relative, exclude)
            || protected_prefix.is_some_and(|prefix| name.starts_with(prefix))
        {
            walker.skip_current_dir();
            continue;
        }

        if rule.matches(&name) {
            found.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }

    found
}

/// Remove directories matched by name during a walk of `root`
pub fn remove_named_dirs(
    root: &Path,
    rule: &WalkRule,
    exclude: &[String],
    protected_prefix: Option<&str>,
    options: RemovalOptions,
    report: &mut RemovalReport,
) {
    let found = find_named_dirs(root, rule, exclude, protected_prefix, report);
    remove_directories(root, found, options, report);
}

/// Remove every regular file under `root` matching one of `patterns`,
/// skipping anything inside an excluded directory or a directory whose name
/// starts with `protected_prefix` (existing backups).
///
/// The tree is walked once; a file is attributed to the first pattern it
/// matches. One summary line is printed per pattern that removed anything.
pub fn remove_matching_files(
    root: &Path,
    patterns: &[FilePattern],
    exclude: &[String],
    protected_prefix: Option<&str>,
    options: RemovalOptions,
    report: &mut RemovalReport,
) {
    let mut counts: Vec<PatternCount> = patterns
        .iter()
        .map(|p| PatternCount {
            pattern: p.pattern.clone(),
            count: 0,
            size: 0,
        })
        .collect();

    if !patterns.is_empty() {
        let root_buf = root.to_path_buf();
        let exclude_clone = exclude.to_vec();
        let protected = protected_prefix.map(str::to_string);

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .parents(false)
            .git_ignore(false)
            .ignore(false)
            .git_global(false)
            .git_exclude(false)
            .filter_entry(move |entry| {
                if entry.depth() > 0 && entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    let name = entry.file_name().to_string_lossy();
                    if protected.as_deref().is_some_and(|prefix| name.starts_with(prefix)) {
                        return false;
                    }
                }
                let relative = relative_to(entry.path(), &root_buf);
                !should_exclude_path(relative, &exclude_clone)
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    report.warn(format!("Failed to access entry: {}", err));
                    continue;
                }
            };

            // Symlinks and directories are never pattern candidates
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let relative = relative_to(path, root);

            let Some(index) = patterns.iter().position(|p| p.is_match(relative)) else {
                continue;
            };

            let metadata = match fs::symlink_metadata(path) {
                Ok(meta) => meta,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => {
                    report.warn(format!(
                        "Could not get metadata for {}: {}",
                        relative.display(),
                        err
                    ));
                    continue;
                }
            };

            match remove_entry(path, &metadata, options.calculate_sizes) {
                Ok(size) => {
                    if options.verbose {
                        println!("Removed: {}", relative.display());
                    }
                    counts[index].count += 1;
                    counts[index].size += size;
                }
                Err(err) => {
                    report.warn(format!(
                        "Error removing {}: {}. Skipping.",
                        relative.display(),
                        err
                    ));
                }
            }
        }
    }

    for tally in &counts {
        if tally.count > 0 {
            println!("Removed {} {} files", tally.count, tally.pattern);
        }
    }

    report.patterns.extend(counts);
}
