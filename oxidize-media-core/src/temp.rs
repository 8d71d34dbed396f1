//! Scoped temporary files for codec staging.
//!
//! A [`TempStore`] owns one directory. Every [`TempHandle`] it hands out has a
//! random, exclusively created name, so concurrent requests never share a
//! path. Handles are removed by [`TempHandle::release`] or, failing that, on
//! drop. Removal is best effort: the outcome is reported, never raised.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// Default age after which [`sweep`] removes a staged file.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Where and how temporary files are created.
#[derive(Debug, Clone)]
pub struct TempConfig {
    /// Directory holding every staged file
    pub directory: PathBuf,
    /// File name prefix
    pub prefix: String,
    /// Age threshold used by [`TempStore::sweep_expired`]
    pub max_age: Duration,
}

impl Default for TempConfig {
    fn default() -> Self {
        Self {
            directory: std::env::temp_dir().join("oxidize-media"),
            prefix: "oxm-".to_string(),
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl TempConfig {
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }
}

/// Factory for [`TempHandle`]s rooted in one configured directory.
#[derive(Debug, Clone)]
pub struct TempStore {
    config: TempConfig,
}

impl TempStore {
    pub fn new(config: TempConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(TempConfig::default())
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    pub fn config(&self) -> &TempConfig {
        &self.config
    }

    /// Create the staging directory if it does not exist yet.
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.config.directory)
    }

    /// Create a new, uniquely named, empty file ending in `.<extension>`.
    #[instrument(skip(self), fields(dir = %self.config.directory.display()))]
    pub fn acquire(&self, extension: &str) -> io::Result<TempHandle> {
        self.ensure_dir()?;
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let file = tempfile::Builder::new()
            .prefix(&self.config.prefix)
            .suffix(&suffix)
            .rand_bytes(16)
            .tempfile_in(&self.config.directory)?;
        let path = file.path().to_path_buf();
        debug!(path = %path.display(), "Temp file acquired");
        Ok(TempHandle {
            file: Some(file),
            path,
        })
    }

    /// Acquire a handle, run `f` with it, and release it whatever `f` returned.
    pub fn stage<T, E, F>(&self, extension: &str, f: F) -> Result<T, E>
    where
        E: From<io::Error>,
        F: FnOnce(&mut TempHandle) -> Result<T, E>,
    {
        let mut handle = self.acquire(extension)?;
        let result = f(&mut handle);
        handle.release();
        result
    }

    /// Remove files in this store's directory older than the configured age.
    pub fn sweep_expired(&self) -> SweepReport {
        sweep(&self.config.directory, self.config.max_age)
    }
}

/// Result of a best-effort removal.
#[derive(Debug)]
pub enum ReleaseOutcome {
    Removed,
    /// Nothing to delete; the file was already gone.
    AlreadyAbsent,
    /// Deletion failed. Logged, never escalated.
    Failed(io::Error),
}

impl ReleaseOutcome {
    /// True when nothing is left on disk.
    pub fn is_clean(&self) -> bool {
        !matches!(self, ReleaseOutcome::Failed(_))
    }
}

/// A staged file owned by one pipeline invocation.
#[derive(Debug)]
pub struct TempHandle {
    file: Option<NamedTempFile>,
    path: PathBuf,
}

impl TempHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mutable access to the open file, for encoders that write directly.
    pub fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .map(NamedTempFile::as_file_mut)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "temp file already released"))
    }

    /// Read back everything written so far.
    pub fn read_to_vec(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Delete the file. Safe to call if it was never written or is already gone.
    pub fn release(mut self) -> ReleaseOutcome {
        self.release_inner()
    }

    fn release_inner(&mut self) -> ReleaseOutcome {
        let Some(file) = self.file.take() else {
            return ReleaseOutcome::AlreadyAbsent;
        };
        match file.close() {
            Ok(()) => {
                debug!(path = %self.path.display(), "Temp file released");
                ReleaseOutcome::Removed
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => ReleaseOutcome::AlreadyAbsent,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to remove temp file");
                ReleaseOutcome::Failed(err)
            }
        }
    }
}

impl Drop for TempHandle {
    fn drop(&mut self) {
        if self.file.is_some() {
            let _ = self.release_inner();
        }
    }
}

/// Counters from one [`sweep`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Delete regular files in `directory` whose modification time is older than
/// `max_age`. Individual failures are counted and skipped.
#[instrument(fields(dir = %directory.display(), max_age_secs = max_age.as_secs()))]
pub fn sweep(directory: &Path, max_age: Duration) -> SweepReport {
    let mut report = SweepReport::default();
    let now = SystemTime::now();

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(error = %err, "Sweep skipped, directory not readable");
            return report;
        }
    };

    for entry in entries.flatten() {
        let metadata = match entry.metadata() {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => continue,
        };
        report.scanned += 1;

        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path) {
            Ok(()) => report.removed += 1,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                report.failed += 1;
                warn!(path = %path.display(), error = %err, "Sweep could not remove file");
            }
        }
    }

    if report.removed > 0 || report.failed > 0 {
        info!(
            scanned = report.scanned,
            removed = report.removed,
            failed = report.failed,
            "Temp sweep finished"
        );
    }
    report
}
