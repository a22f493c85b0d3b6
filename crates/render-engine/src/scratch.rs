//! Scratch directory for render outputs.
//!
//! Each render allocates a [`ScratchFile`]. Allocation drops a
//! `<file>.lock` marker holding the owner's process id next to the output;
//! dropping the guard deletes both. [`ScratchDir::sweep`] removes stale
//! leftovers (e.g. from a crashed process) but skips any output whose
//! marker belongs to a live process, including other processes sharing the
//! same directory.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const LOCK_EXTENSION: &str = "lock";

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(LOCK_EXTENSION);
    PathBuf::from(name)
}

fn is_lock_file(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(LOCK_EXTENSION))
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Whether the marker at `lock` still protects its output.
///
/// Unreadable or half-written markers count as live.
fn lock_is_live(lock: &Path) -> bool {
    match std::fs::read_to_string(lock) {
        Ok(content) => match content.trim().parse::<u32>() {
            Ok(pid) => process_alive(pid),
            Err(_) => true,
        },
        Err(e) => e.kind() != std::io::ErrorKind::NotFound,
    }
}

fn file_age(metadata: &std::fs::Metadata, now: SystemTime) -> Duration {
    metadata
        .modified()
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .unwrap_or_default()
}

/// Local directory holding in-progress render outputs.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Use `root` as scratch space, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a unique path `<stem>_<uuid>.<extension>` and mark it in-flight.
    pub fn allocate(&self, stem: &str, extension: &str) -> std::io::Result<ScratchFile> {
        let path = self
            .root
            .join(format!("{stem}_{}.{extension}", uuid::Uuid::new_v4()));
        let lock = lock_path(&path);
        std::fs::write(&lock, std::process::id().to_string())?;
        Ok(ScratchFile { path, lock })
    }

    /// Whether a live render, in any process, owns `path`.
    pub fn is_in_flight(&self, path: &Path) -> bool {
        lock_is_live(&lock_path(path))
    }

    /// Number of live in-flight markers in the directory.
    pub fn in_flight_count(&self) -> usize {
        std::fs::read_dir(&self.root)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.path())
                    .filter(|p| is_lock_file(p) && lock_is_live(p))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Delete regular files older than `max_age` that no live render owns,
    /// plus markers left behind by dead processes.
    ///
    /// Blocking; run it on a blocking thread from async code.
    pub fn sweep(&self, max_age: Duration) -> SweepReport {
        let mut report = SweepReport::default();
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    dir = %self.root.display(),
                    error = %e,
                    "Failed to read scratch directory"
                );
                report.failed += 1;
                return report;
            }
        };

        let now = SystemTime::now();
        for entry in entries.flatten() {
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to stat scratch file"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let age = file_age(&metadata, now);
            if is_lock_file(&path) {
                if age > max_age && !lock_is_live(&path) {
                    self.remove(&path, age, &mut report);
                }
                continue;
            }

            report.scanned += 1;
            if age <= max_age {
                continue;
            }
            if self.is_in_flight(&path) {
                report.skipped_in_flight += 1;
                continue;
            }
            self.remove(&path, age, &mut report);
        }
        report
    }

    fn remove(&self, path: &Path, age: Duration, report: &mut SweepReport) {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(
                    path = %path.display(),
                    age_secs = age.as_secs(),
                    "Removed stale scratch file"
                );
                if !is_lock_file(path) {
                    report.removed += 1;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove stale scratch file"
                );
                report.failed += 1;
            }
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub skipped_in_flight: usize,
    pub failed: usize,
}

/// A scratch path owned by one render. Deleted and unmarked on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    lock: PathBuf,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed scratch output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove scratch output"
                )
            }
        }
        if let Err(e) = std::fs::remove_file(&self.lock) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.lock.display(),
                    error = %e,
                    "Failed to remove scratch marker"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backdate(path: &Path, by: Duration) {
        let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - by).unwrap();
    }

    #[test]
    fn test_scratch_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path().join("work")).unwrap();

        let file = scratch.allocate("output_0", "mp4").unwrap();
        let path = file.path().to_path_buf();
        std::fs::write(&path, b"frames").unwrap();
        assert!(scratch.is_in_flight(&path));
        assert_eq!(scratch.in_flight_count(), 1);

        drop(file);
        assert!(!path.exists());
        assert!(!lock_path(&path).exists());
        assert_eq!(scratch.in_flight_count(), 0);
    }

    #[test]
    fn test_drop_without_output_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path()).unwrap();
        drop(scratch.allocate("output_1", "mp4").unwrap());
        assert_eq!(scratch.in_flight_count(), 0);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_sweep_removes_only_stale_idle_files() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path()).unwrap();
        let hour = Duration::from_secs(3600);

        let stale = dir.path().join("crashed.mp4");
        std::fs::write(&stale, b"x").unwrap();
        backdate(&stale, 2 * hour);

        let fresh = dir.path().join("recent.mp4");
        std::fs::write(&fresh, b"x").unwrap();

        let running = scratch.allocate("output_2", "mp4").unwrap();
        std::fs::write(running.path(), b"x").unwrap();
        backdate(running.path(), 2 * hour);
        backdate(&lock_path(running.path()), 2 * hour);

        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let report = scratch.sweep(hour);
        assert_eq!(
            report,
            SweepReport {
                scanned: 3,
                removed: 1,
                skipped_in_flight: 1,
                failed: 0,
            }
        );
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(running.path().exists());
        assert!(lock_path(running.path()).exists());
    }

    #[test]
    fn test_separate_handles_respect_each_others_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let hour = Duration::from_secs(3600);
        let renderer_side = ScratchDir::new(dir.path()).unwrap();
        let sweeper_side = ScratchDir::new(dir.path()).unwrap();

        let output = renderer_side.allocate("output_3", "mp4").unwrap();
        std::fs::write(output.path(), b"x").unwrap();
        backdate(output.path(), 2 * hour);

        assert!(sweeper_side.is_in_flight(output.path()));
        let report = sweeper_side.sweep(hour);
        assert_eq!(report.removed, 0);
        assert_eq!(report.skipped_in_flight, 1);
        assert!(output.path().exists());

        drop(output);
        assert_eq!(sweeper_side.in_flight_count(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_markers_of_dead_processes_do_not_protect() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path()).unwrap();
        let hour = Duration::from_secs(3600);

        let orphan = dir.path().join("output_4_crashed.mp4");
        let marker = lock_path(&orphan);
        std::fs::write(&orphan, b"x").unwrap();
        std::fs::write(&marker, u32::MAX.to_string()).unwrap();
        backdate(&orphan, 2 * hour);
        backdate(&marker, 2 * hour);

        assert!(!scratch.is_in_flight(&orphan));
        let report = scratch.sweep(hour);
        assert_eq!(report.removed, 1);
        assert!(!orphan.exists());
        assert!(!marker.exists());
    }
}
