//! Translation of raw I/O failures into cluster result codes
//!
//! This is the only place that looks at errno values. Everything above it
//! speaks [`ResultCode`].

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::proto::{Oid, ResultCode};

/// Receives reports of volumes that failed underneath the store.
pub trait DiskHealth: Send + Sync {
    /// Report an unrecoverable error below `dir` and return the code to surface.
    fn handle_eio(&self, dir: &Path) -> ResultCode;
}

/// Map an I/O error on `path` (backing `oid`) to a result code.
///
/// `EMFILE`, `ENFILE`, `EINTR`, `EAGAIN` and `EEXIST` come back as
/// [`ResultCode::NetworkError`] so the gateway retries elsewhere.
pub fn map_io_error(path: &Path, oid: Oid, err: &io::Error, health: &dyn DiskHealth) -> ResultCode {
    let dir = path.parent().unwrap_or(path);
    debug!("{:?}", path);

    match err.raw_os_error() {
        Some(libc::ENOENT) => {
            if dir.metadata().is_err() {
                error!("{:?} corrupted", dir);
                return health.handle_eio(dir);
            }
            debug!("object {} not found locally", oid);
            ResultCode::NoObj
        }
        Some(libc::ENOSPC) => {
            error!("diskfull, oid={}", oid);
            ResultCode::NoSpace
        }
        Some(libc::EMFILE | libc::ENFILE | libc::EINTR | libc::EAGAIN | libc::EEXIST) => {
            error!("{}, oid={}", err, oid);
            ResultCode::NetworkError
        }
        _ => {
            error!("oid={}, {}", oid, err);
            health.handle_eio(dir)
        }
    }
}

// =============================================================================
// Disk Health Tracker
// =============================================================================

/// Tracks which configured disks have failed.
#[derive(Debug, Default)]
pub struct DiskHealthTracker {
    disks: Vec<PathBuf>,
    failed: RwLock<Vec<PathBuf>>,
}

impl DiskHealthTracker {
    pub fn new(disks: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            disks: disks.into_iter().collect(),
            failed: RwLock::new(Vec::new()),
        }
    }

    pub fn is_failed(&self, disk: &Path) -> bool {
        self.failed.read().iter().any(|d| d == disk)
    }

    pub fn failed_disks(&self) -> Vec<PathBuf> {
        self.failed.read().clone()
    }

    /// Configured disks not yet reported broken.
    pub fn healthy_disks(&self) -> Vec<PathBuf> {
        let failed = self.failed.read();
        self.disks
            .iter()
            .filter(|d| !failed.contains(*d))
            .cloned()
            .collect()
    }

    /// Configured disk containing `dir`, or `dir` itself when none does.
    fn owning_disk(&self, dir: &Path) -> PathBuf {
        self.disks
            .iter()
            .filter(|d| dir.starts_with(d))
            .max_by_key(|d| d.as_os_str().len())
            .cloned()
            .unwrap_or_else(|| dir.to_path_buf())
    }
}

impl DiskHealth for DiskHealthTracker {
    fn handle_eio(&self, dir: &Path) -> ResultCode {
        let disk = self.owning_disk(dir);
        let mut failed = self.failed.write();
        if !failed.contains(&disk) {
            warn!(disk = ?disk, "disk failed, removing it from service");
            failed.push(disk);
        }
        ResultCode::Eio
    }
}
