use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

pub const BACKUP_PREFIX: &str = "data_backup_";
pub const BACKUP_SUFFIX: &str = ".json";
const BACKUP_DIR: &str = "backups";

/// Rolling set of timestamped copies of the data file.
///
/// Files live in a `backups/` directory next to the data file and are named
/// `data_backup_<YYYYMMDD_HHMMSS>.json` (UTC). A second backup within the same
/// second gets a `_NNN` counter so that lexicographic order always matches
/// creation order; pruning and listing rely on that.
#[derive(Clone, Debug)]
pub struct BackupRotation {
    dir: PathBuf,
    enabled: bool,
    max_backups: usize,
}

impl BackupRotation {
    pub fn new(data_file: &Path, enabled: bool, max_backups: usize) -> Self {
        let parent = data_file.parent().unwrap_or_else(|| Path::new("."));
        Self { dir: parent.join(BACKUP_DIR), enabled, max_backups }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Copy `source` into the rotation and prune old copies.
    ///
    /// Best effort: failures are logged and reported as `None`, never raised.
    /// Does nothing when backups are disabled or `source` does not exist.
    pub fn snapshot(&self, source: &Path) -> Option<String> {
        if !self.enabled || !source.exists() {
            return None;
        }
        match self.try_snapshot(source) {
            Ok(name) => {
                debug!(backup = %name, "backup created");
                Some(name)
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "backup failed; continuing without it");
                None
            }
        }
    }

    fn try_snapshot(&self, source: &Path) -> io::Result<String> {
        fs::create_dir_all(&self.dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let name = self.next_name(&stamp);
        fs::copy(source, self.dir.join(&name))?;
        self.prune();
        Ok(name)
    }

    fn next_name(&self, stamp: &str) -> String {
        let stem = format!("{BACKUP_PREFIX}{stamp}");
        let highest = self
            .list()
            .iter()
            .filter_map(|name| name.strip_prefix(&stem))
            .map(|rest| {
                rest.strip_prefix('_')
                    .and_then(|r| r.strip_suffix(BACKUP_SUFFIX))
                    .and_then(|r| r.parse::<u32>().ok())
                    .unwrap_or(0)
            })
            .max();
        match highest {
            None => format!("{stem}{BACKUP_SUFFIX}"),
            Some(n) => format!("{stem}_{:03}{BACKUP_SUFFIX}", n + 1),
        }
    }

    /// Delete everything beyond the `max_backups` newest copies. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut removed = 0;
        for old in self.list().into_iter().skip(self.max_backups) {
            match fs::remove_file(self.dir.join(&old)) {
                Ok(()) => {
                    removed += 1;
                    info!(backup = %old, "removed old backup");
                }
                Err(e) => warn!(backup = %old, error = %e, "failed to remove old backup"),
            }
        }
        removed
    }

    /// Retained backup names, newest first. An unreadable directory lists as empty.
    pub fn list(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(dir = %self.dir.display(), error = %e, "cannot read backup directory");
                }
                return Vec::new();
            }
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_backup_name(name))
            .collect();
        names.sort_unstable_by(|a, b| b.cmp(a));
        names
    }

    /// Full path of a retained backup, or `None` for names outside the rotation.
    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        if !is_backup_name(name) {
            return None;
        }
        let path = self.dir.join(name);
        path.is_file().then_some(path)
    }
}

/// `data_backup_*.json` with no path components.
pub fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX)
        && name.ends_with(BACKUP_SUFFIX)
        && name.len() > BACKUP_PREFIX.len() + BACKUP_SUFFIX.len()
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}
