// Backup naming: `<active path>.<UTC rotation time>` with an optional `.gz`.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
pub const COMPRESS_SUFFIX: &str = ".gz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: PathBuf,
    pub rotated_at: DateTime<Utc>,
    pub compressed: bool,
}

pub fn backup_path(active: &Path, rotated_at: DateTime<Utc>) -> PathBuf {
    let mut name = active.as_os_str().to_os_string();
    name.push(".");
    name.push(rotated_at.format(BACKUP_TIME_FORMAT).to_string());
    PathBuf::from(name)
}

pub fn compressed_path(backup: &Path) -> PathBuf {
    let mut name = backup.as_os_str().to_os_string();
    name.push(COMPRESS_SUFFIX);
    PathBuf::from(name)
}

/// First free backup name at or after `now`, bumping by one millisecond on collision.
pub fn next_backup_path(active: &Path, now: DateTime<Utc>) -> PathBuf {
    let mut rotated_at = now;
    loop {
        let candidate = backup_path(active, rotated_at);
        if !candidate.exists() && !compressed_path(&candidate).exists() {
            return candidate;
        }
        rotated_at += ChronoDuration::milliseconds(1);
    }
}

/// Parses `candidate` as a backup of the file named `active_name`.
pub fn parse_backup_name(active_name: &str, candidate: &str) -> Option<(DateTime<Utc>, bool)> {
    let suffix = candidate.strip_prefix(active_name)?.strip_prefix('.')?;
    let (stamp, compressed) = match suffix.strip_suffix(COMPRESS_SUFFIX) {
        Some(stamp) => (stamp, true),
        None => (suffix, false),
    };
    let naive = NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT).ok()?;
    Some((naive.and_utc(), compressed))
}

/// Backups of `active` found next to it, newest first.
pub fn list_backups(active: &Path) -> io::Result<Vec<BackupFile>> {
    let Some(active_name) = active.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let directory = match active.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut backups = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some((rotated_at, compressed)) = parse_backup_name(active_name, file_name) {
            backups.push(BackupFile {
                path: entry.path(),
                rotated_at,
                compressed,
            });
        }
    }

    backups.sort_by(|a, b| b.rotated_at.cmp(&a.rotated_at));
    Ok(backups)
}
