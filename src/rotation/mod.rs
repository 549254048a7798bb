//! Size-rotated log file with backup retention.
//!
//! Each call to [`RotatingWriter::write_record`] appends one complete record.
//! When the record would push the active file past the configured size, the
//! file is renamed to `<path>.<UTC timestamp>` and a fresh file is opened
//! before the record is written. After every rotation the backups are pruned
//! by count and age and, if enabled, gzipped.

pub mod backup;
pub mod mill;

use chrono::Utc;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

pub use backup::BackupFile;
pub use mill::MillReport;

use crate::config::RotationPolicy;

thread_local! {
    // Write failures are surfaced to the thread that issued the write.
    static WRITE_ERROR: RefCell<Option<io::Error>> = const { RefCell::new(None) };
}

struct WriterState {
    file: Option<File>,
    size: u64,
    closed: bool,
}

struct Shared {
    policy: RotationPolicy,
    max_size: u64,
    state: Mutex<WriterState>,
}

/// Cloneable handle; all clones share the same file and lock.
#[derive(Clone)]
pub struct RotatingWriter {
    shared: Arc<Shared>,
}

impl RotatingWriter {
    /// Opens (or creates) the active file in append mode.
    pub fn open(policy: RotationPolicy) -> io::Result<Self> {
        let file = open_active(&policy.path)?;
        let size = file.metadata()?.len();
        let max_size = policy.max_size_bytes();

        Ok(Self {
            shared: Arc::new(Shared {
                policy,
                max_size,
                state: Mutex::new(WriterState {
                    file: Some(file),
                    size,
                    closed: false,
                }),
            }),
        })
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.shared.policy
    }

    pub fn path(&self) -> &Path {
        &self.shared.policy.path
    }

    /// Bytes in the active file.
    pub fn size(&self) -> u64 {
        self.shared.state.lock().size
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn write_record(&self, buf: &[u8]) -> io::Result<usize> {
        let result = self.write_locked(&mut self.shared.state.lock(), buf);
        if let Err(e) = &result {
            WRITE_ERROR.with(|slot| {
                slot.borrow_mut()
                    .get_or_insert_with(|| io::Error::new(e.kind(), e.to_string()));
            });
        }
        result
    }

    /// Runs `f` and returns the first write failure it caused on the calling
    /// thread. Failures on other threads are not observed.
    pub fn capture_error(&self, f: impl FnOnce()) -> io::Result<()> {
        WRITE_ERROR.with(|slot| slot.borrow_mut().take());
        f();
        match WRITE_ERROR.with(|slot| slot.borrow_mut().take()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Rotates immediately, regardless of the active file's size.
    pub fn rotate(&self) -> io::Result<MillReport> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(closed_error());
        }
        self.rotate_locked(&mut state)
    }

    /// Flushes and releases the active file. Later writes fail.
    pub fn close(&self) -> io::Result<()> {
        let mut state = self.shared.state.lock();
        state.closed = true;
        match state.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    pub fn backups(&self) -> io::Result<Vec<BackupFile>> {
        backup::list_backups(self.path())
    }

    fn write_locked(&self, state: &mut WriterState, buf: &[u8]) -> io::Result<usize> {
        if state.closed {
            return Err(closed_error());
        }

        let len = buf.len() as u64;
        if len > self.shared.max_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {len} exceeds maximum file size {}",
                    self.shared.max_size
                ),
            ));
        }

        if state.size + len > self.shared.max_size {
            self.rotate_locked(state)?;
        }

        if state.file.is_none() {
            // A previous rotation renamed the file but failed to reopen it.
            let file = open_active(self.path())?;
            state.size = file.metadata()?.len();
            state.file = Some(file);
        }
        let Some(file) = state.file.as_mut() else {
            return Err(io::Error::other("active log file unavailable"));
        };

        file.write_all(buf)?;
        state.size += len;
        Ok(buf.len())
    }

    fn rotate_locked(&self, state: &mut WriterState) -> io::Result<MillReport> {
        if let Some(mut file) = state.file.take() {
            file.flush()?;
            file.sync_all()?;
        }

        let path = self.path();
        if path.exists() {
            let backup = backup::next_backup_path(path, Utc::now());
            fs::rename(path, &backup)?;
        }

        state.file = Some(open_active(path)?);
        state.size = 0;

        let report = mill::run(&self.shared.policy, Utc::now());
        for e in &report.errors {
            // Maintenance failures never fail the write that triggered rotation.
            let _ = writeln!(
                io::stderr(),
                "[rask-logger] backup maintenance for {}: {e}",
                path.display()
            );
        }
        Ok(report)
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_record(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.shared.state.lock().file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn open_active(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn closed_error() -> io::Error {
    io::Error::other("rotating writer is closed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::thread;
    use tempfile::TempDir;

    fn policy(dir: &TempDir, max_size_mb: u64) -> RotationPolicy {
        RotationPolicy {
            path: dir.path().join("app.log"),
            max_size_mb,
            max_backups: 0,
            max_age_days: 0,
            compress: false,
        }
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let nested = RotationPolicy::new(dir.path().join("a").join("b").join("app.log"));
        let writer = RotatingWriter::open(nested).unwrap();
        assert!(writer.path().exists());
        assert_eq!(writer.size(), 0);
    }

    #[test]
    fn test_open_appends_to_existing_file() {
        let dir = TempDir::new().unwrap();
        let policy = policy(&dir, 1);
        fs::write(&policy.path, b"existing\n").unwrap();

        let writer = RotatingWriter::open(policy.clone()).unwrap();
        assert_eq!(writer.size(), 9);
        writer.write_record(b"next\n").unwrap();
        assert_eq!(fs::read_to_string(&policy.path).unwrap(), "existing\nnext\n");
    }

    #[test]
    fn test_open_fails_when_path_is_directory() {
        let dir = TempDir::new().unwrap();
        let result = RotatingWriter::open(RotationPolicy::new(dir.path()));
        assert!(result.is_err());
    }

    #[test]
    fn test_rotates_when_size_exceeded() {
        let dir = TempDir::new().unwrap();
        let writer = RotatingWriter::open(policy(&dir, 1)).unwrap();
        let record = vec![b'x'; 1023];
        let mut line = record.clone();
        line.push(b'\n');

        for _ in 0..1500 {
            writer.write_record(&line).unwrap();
        }

        let backups = writer.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::metadata(&backups[0].path).unwrap().len(), 1024 * 1024);
        assert_eq!(writer.size(), (1500 - 1024) * 1024);
    }

    #[test]
    fn test_record_never_split_across_files() {
        let dir = TempDir::new().unwrap();
        let writer = RotatingWriter::open(policy(&dir, 1)).unwrap();
        let line = vec![b'y'; 1000];

        for _ in 0..1100 {
            writer.write_record(&line).unwrap();
        }

        let backup = &writer.backups().unwrap()[0];
        assert_eq!(fs::metadata(&backup.path).unwrap().len() % 1000, 0);
        assert_eq!(writer.size() % 1000, 0);
    }

    #[test]
    fn test_oversized_record_is_rejected() {
        let dir = TempDir::new().unwrap();
        let writer = RotatingWriter::open(policy(&dir, 1)).unwrap();
        let record = vec![b'z'; 1024 * 1024 + 1];

        let err = writer.write_record(&record).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(writer.size(), 0);
    }

    #[test]
    fn test_capture_error_reports_failure_from_the_closure() {
        let dir = TempDir::new().unwrap();
        let writer = RotatingWriter::open(policy(&dir, 1)).unwrap();

        let err = writer
            .capture_error(|| {
                let _ = writer.write_record(&vec![b'z'; 1024 * 1024 + 1]);
            })
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        // A failure already captured is not reported again.
        assert!(writer.capture_error(|| {}).is_ok());
        assert!(
            writer
                .capture_error(|| {
                    writer.write_record(b"fits\n").unwrap();
                })
                .is_ok()
        );
    }

    #[test]
    fn test_capture_error_ignores_failures_on_other_threads() {
        let dir = TempDir::new().unwrap();
        let writer = RotatingWriter::open(policy(&dir, 1)).unwrap();

        let failing = writer.clone();
        let handle = thread::spawn(move || {
            for _ in 0..20 {
                let result = failing.capture_error(|| {
                    let _ = failing.write_record(&vec![b'z'; 1024 * 1024 + 1]);
                });
                assert!(result.is_err());
            }
        });

        for i in 0..2_000 {
            let line = format!("small {i}\n");
            let result = writer.capture_error(|| {
                let _ = writer.write_record(line.as_bytes());
            });
            assert!(result.is_ok());
        }
        assert!(handle.join().is_ok());
    }

    #[test]
    fn test_rotation_survives_failing_maintenance() {
        let dir = TempDir::new().unwrap();
        let mut policy = policy(&dir, 1);
        policy.compress = true;
        let writer = RotatingWriter::open(policy).unwrap();
        writer.write_record(b"first\n").unwrap();

        // A directory squatting on the `.gz` name makes compression fail.
        let stamp = Utc::now() + chrono::Duration::hours(1);
        let blocked = backup::backup_path(writer.path(), stamp);
        fs::write(&blocked, b"old backup\n").unwrap();
        fs::create_dir(backup::compressed_path(&blocked)).unwrap();

        let report = writer.rotate().unwrap();
        assert!(!report.errors.is_empty());
        writer.write_record(b"second\n").unwrap();
        assert_eq!(fs::read_to_string(writer.path()).unwrap(), "second\n");
    }

    #[test]
    fn test_manual_rotation_with_compression() {
        let dir = TempDir::new().unwrap();
        let mut policy = policy(&dir, 1);
        policy.compress = true;
        let writer = RotatingWriter::open(policy).unwrap();
        writer.write_record(b"before rotation\n").unwrap();

        let report = writer.rotate().unwrap();
        assert_eq!(report.compressed.len(), 1);
        writer.write_record(b"after rotation\n").unwrap();

        let backups = writer.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].compressed);
        assert!(backups[0].path.to_string_lossy().ends_with(".gz"));

        let mut decoded = String::new();
        GzDecoder::new(File::open(&backups[0].path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "before rotation\n");
        assert_eq!(fs::read_to_string(writer.path()).unwrap(), "after rotation\n");
    }

    #[test]
    fn test_max_backups_enforced_after_each_rotation() {
        let dir = TempDir::new().unwrap();
        let mut policy = policy(&dir, 1);
        policy.max_backups = 2;
        let writer = RotatingWriter::open(policy).unwrap();

        for i in 0..5 {
            writer.write_record(format!("generation {i}\n").as_bytes()).unwrap();
            writer.rotate().unwrap();
        }

        let backups = writer.backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), "generation 4\n");
        assert_eq!(fs::read_to_string(&backups[1].path).unwrap(), "generation 3\n");
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let writer = RotatingWriter::open(policy(&dir, 1)).unwrap();
        writer.write_record(b"kept\n").unwrap();
        writer.close().unwrap();
        writer.close().unwrap();

        assert!(writer.is_closed());
        assert!(writer.write_record(b"dropped\n").is_err());
        assert!(writer.rotate().is_err());
        assert_eq!(fs::read_to_string(writer.path()).unwrap(), "kept\n");
    }

    #[test]
    fn test_concurrent_writers_keep_lines_intact() {
        let dir = TempDir::new().unwrap();
        let writer = RotatingWriter::open(policy(&dir, 1)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let writer = writer.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let line = format!("thread-{t:02} line-{i:05} {}\n", "p".repeat(200));
                        writer.write_record(line.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        let mut total = 0;
        let mut files = vec![writer.path().to_path_buf()];
        files.extend(writer.backups().unwrap().into_iter().map(|b| b.path));
        for path in files {
            let content = fs::read_to_string(path).unwrap();
            for line in content.lines() {
                assert!(line.starts_with("thread-"));
                assert!(line.ends_with(&"p".repeat(200)));
                total += 1;
            }
        }
        assert_eq!(total, 8 * 500);
    }
}
