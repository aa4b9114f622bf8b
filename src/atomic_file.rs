//! Crash-safe whole-file replacement through a temp file and atomic rename.
//!
//! [`AtomicWriteFile`] stages writes in a uniquely-named temp file in the
//! target's own directory (same filesystem, so the final rename is a
//! single atomic operation). [`commit`](AtomicWriteFile::commit) turns
//! the staged bytes into the target's new content; every failure path —
//! a write error, a flush error, a failed rename, an explicit
//! [`cancel`](AtomicWriteFile::cancel), or a drop — removes the temp
//! file and leaves the target's prior content untouched. At no point is
//! the target observable in a partially-written state.

use crate::error::{Error, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::{Builder, NamedTempFile};

/// A writer that atomically replaces a file's content on commit.
///
/// The lifecycle is open → committed or open → canceled, never both and
/// never backward. `commit` consumes the value, so a second commit (or a
/// cancel after commit) is a compile-time error; only
/// [`Error::AlreadyCanceled`] remains a runtime condition. An instance
/// dropped while still open cancels itself — a best-effort safety net,
/// not a substitute for calling `commit` or `cancel` explicitly.
///
/// Single-threaded use; wrap in external synchronization if shared.
#[derive(Debug)]
pub struct AtomicWriteFile {
    target: PathBuf,
    temp: Option<NamedTempFile>,
}

impl AtomicWriteFile {
    /// Stages an atomic update of `target`, creating the temp file next
    /// to it so the eventual rename cannot cross filesystems.
    pub fn create(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("update");
        let temp = Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(dir)?;
        log::debug!(
            "update of {} staged at {}",
            target.display(),
            temp.path().display()
        );
        Ok(Self {
            target,
            temp: Some(temp),
        })
    }

    /// The path this update will replace on commit.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The staging file's path while the update is open.
    pub fn temp_path(&self) -> Option<&Path> {
        self.temp.as_ref().map(NamedTempFile::path)
    }

    /// Abandons the update: closes and deletes the temp file, leaving the
    /// target untouched. Returns whether this call performed the
    /// cancellation (`false` if already canceled). Removal errors are
    /// logged and suppressed.
    pub fn cancel(&mut self) -> bool {
        match self.temp.take() {
            None => false,
            Some(temp) => {
                if let Err(err) = temp.close() {
                    log::warn!(
                        "failed to remove temp file for {}: {err}",
                        self.target.display()
                    );
                }
                true
            }
        }
    }

    /// Commits the update: flushes and syncs the staged bytes, captures
    /// the temp file's modification timestamp, and atomically renames it
    /// over the target, returning the timestamp.
    ///
    /// On any failure the temp file is removed, the target keeps its
    /// prior content, and the error propagates. Fails with
    /// [`Error::AlreadyCanceled`] after a cancel.
    pub fn commit(mut self) -> Result<SystemTime> {
        let Some(mut temp) = self.temp.take() else {
            return Err(Error::AlreadyCanceled);
        };
        // Early returns drop `temp`, which removes the staging file.
        temp.flush()?;
        temp.as_file().sync_all()?;
        let modified = temp.as_file().metadata()?.modified()?;
        temp.persist(&self.target).map_err(|e| Error::Io(e.error))?;
        log::debug!("committed {}", self.target.display());
        Ok(modified)
    }
}

impl Write for AtomicWriteFile {
    /// Passes through to the temp file; any error cancels the update
    /// before propagating.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(temp) = self.temp.as_mut() else {
            return Err(Error::AlreadyCanceled.into());
        };
        match temp.write(buf) {
            Ok(n) => Ok(n),
            Err(err) => {
                self.cancel();
                Err(err)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let Some(temp) = self.temp.as_mut() else {
            return Err(Error::AlreadyCanceled.into());
        };
        match temp.flush() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.cancel();
                Err(err)
            }
        }
    }
}

impl Drop for AtomicWriteFile {
    fn drop(&mut self) {
        if self.temp.is_some() {
            log::debug!("dropping uncommitted update of {}", self.target.display());
            self.cancel();
        }
    }
}
