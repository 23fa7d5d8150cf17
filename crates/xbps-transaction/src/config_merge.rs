//! The config-file three-way merge decided at §4.7 of the design: what
//! to do with a file marked `conf_files` when a package is updated.

use std::path::PathBuf;

/// The three hashes the merge table is keyed on. `current` is `None` if
/// the file is missing from disk entirely.
#[derive(Debug, Clone)]
pub struct ConfFileHashes<'a> {
    pub original: Option<&'a str>,
    pub current: Option<&'a str>,
    pub new: &'a str,
}

/// What to do with one `conf_files` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfFileAction {
    /// Write the new file directly over the target path.
    InstallNew,
    /// Leave the on-disk file untouched.
    KeepCurrent,
    /// Write the new file alongside the target as `<path>.new-<version>`,
    /// leaving the user's edited file in place.
    InstallAlongside(PathBuf),
}

/// Decide the action for one `conf_files` entry per the merge table.
#[must_use]
pub fn decide(hashes: &ConfFileHashes<'_>, target: &std::path::Path, new_version: &str) -> ConfFileAction {
    let ConfFileHashes { original, current, new } = *hashes;

    let Some(original) = original else {
        return ConfFileAction::InstallNew;
    };

    let Some(current) = current else {
        return ConfFileAction::InstallNew;
    };

    if current == original {
        // User had not touched the file since it was installed.
        return ConfFileAction::InstallNew;
    }

    if current == new {
        // User's edit already matches what we'd install.
        return ConfFileAction::KeepCurrent;
    }

    if original == new {
        // New version ships the same content as the original; the
        // user's edit is the only thing that differs.
        return ConfFileAction::KeepCurrent;
    }

    ConfFileAction::InstallAlongside(target.with_file_name(format!(
        "{}.new-{new_version}",
        target.file_name().and_then(|n| n.to_str()).unwrap_or("conf")
    )))
}
