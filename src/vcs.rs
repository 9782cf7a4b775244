//! Version-control metadata directories.

/// VCS internal directories that should never be traversed or removed,
/// whatever the active policy says.
pub const VCS_INTERNALS: &[&str] = &[
    ".git", ".jj", ".svn", ".hg", ".bzr", "_darcs", ".pijul", "CVS", ".fossil",
];

/// Check whether a single path component names VCS metadata
pub fn is_vcs_internal(name: &str) -> bool {
    VCS_INTERNALS.contains(&name)
}
