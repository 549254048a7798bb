// Post-rotation pass: prune backups by count and age, then compress the rest.

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use super::backup::{self, BackupFile};
use crate::config::RotationPolicy;

#[derive(Debug, Default)]
pub struct MillReport {
    pub removed: Vec<PathBuf>,
    pub compressed: Vec<PathBuf>,
    pub errors: Vec<io::Error>,
}

/// Never fails as a whole; every problem, including an unreadable
/// directory, is collected in [`MillReport::errors`].
pub fn run(policy: &RotationPolicy, now: DateTime<Utc>) -> MillReport {
    let mut report = MillReport::default();
    let backups = match backup::list_backups(&policy.path) {
        Ok(backups) => backups,
        Err(e) => {
            report.errors.push(e);
            return report;
        }
    };
    let mut remaining = Vec::with_capacity(backups.len());

    // A backup and its partially written `.gz` share a timestamp and count once.
    let mut kept_stamps = HashSet::new();
    for backup in backups {
        let over_count = policy.max_backups > 0
            && !kept_stamps.contains(&backup.rotated_at)
            && kept_stamps.len() >= policy.max_backups;
        if over_count {
            remove(&backup, &mut report);
        } else {
            kept_stamps.insert(backup.rotated_at);
            remaining.push(backup);
        }
    }

    if let Some(max_age) = policy.max_age() {
        let cutoff = now - max_age;
        remaining.retain(|backup| {
            if backup.rotated_at < cutoff {
                remove(backup, &mut report);
                false
            } else {
                true
            }
        });
    }

    if policy.compress {
        for backup in remaining.iter().filter(|b| !b.compressed) {
            match compress_file(&backup.path) {
                Ok(dst) => report.compressed.push(dst),
                Err(e) => report.errors.push(e),
            }
        }
    }

    report
}

fn remove(backup: &BackupFile, report: &mut MillReport) {
    match fs::remove_file(&backup.path) {
        Ok(()) => report.removed.push(backup.path.clone()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => report.errors.push(e),
    }
}

/// Gzips `src` into `<src>.gz` and removes `src`.
pub fn compress_file(src: &Path) -> io::Result<PathBuf> {
    let dst = backup::compressed_path(src);

    let result: io::Result<()> = (|| {
        let mut input = File::open(src)?;
        let output = File::create(&dst)?;
        let mut encoder = GzEncoder::new(output, Compression::default());
        io::copy(&mut input, &mut encoder)?;
        encoder.finish()?.sync_all()?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&dst);
        return Err(e);
    }

    fs::remove_file(src)?;
    Ok(dst)
}
