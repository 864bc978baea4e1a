//! Exclusive ownership of a base directory
//!
//! One daemon per base directory. The lock is an advisory `flock` on
//! `<base>/lock`, held for as long as the [`BaseDirLock`] lives.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, error};

use crate::error::{Error, Result};

const LOCK_FILE: &str = "lock";
const LOCK_MODE: u32 = 0o644;

/// Held lock on a base directory; released on drop.
#[derive(Debug)]
pub struct BaseDirLock {
    _file: File,
    path: PathBuf,
}

impl BaseDirLock {
    /// Take the lock without waiting.
    pub fn acquire(base: &Path) -> Result<Self> {
        let path = base.join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(LOCK_MODE)
            .open(&path)
            .map_err(|e| {
                error!("failed to open lock file {:?} ({})", path, e);
                Error::Io(e)
            })?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                error!("another daemon is using {:?}", base);
                return Err(Error::BaseDirLocked(base.to_path_buf()));
            }
            error!("unable to get base dir lock ({})", e);
            return Err(Error::Io(e));
        }

        debug!(path = ?path, "base directory locked");
        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let dir = TempDir::new().unwrap();
        let first = BaseDirLock::acquire(dir.path()).unwrap();
        assert_eq!(first.path(), dir.path().join("lock"));

        let err = BaseDirLock::acquire(dir.path()).unwrap_err();
        assert_matches!(err, Error::BaseDirLocked(p) if p == dir.path());

        drop(first);
        BaseDirLock::acquire(dir.path()).unwrap();
    }

    #[test]
    fn test_lock_held_through_foreign_handle() {
        let dir = TempDir::new().unwrap();
        let holder = File::create(dir.path().join("lock")).unwrap();
        holder.try_lock_exclusive().unwrap();

        let err = BaseDirLock::acquire(dir.path()).unwrap_err();
        assert_matches!(err, Error::BaseDirLocked(_));

        holder.unlock().unwrap();
        BaseDirLock::acquire(dir.path()).unwrap();
    }

    #[test]
    fn test_missing_base_dir() {
        let dir = TempDir::new().unwrap();
        let err = BaseDirLock::acquire(&dir.path().join("nope")).unwrap_err();
        assert_matches!(err, Error::Io(_));
    }
}
