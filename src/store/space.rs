//! Node capacity
//!
//! The capacity a node advertises is decided once and then persisted in the
//! node config file, so restarts keep advertising the same number even as
//! the disks fill up.

use std::ffi::CString;
use std::fs;
use std::io;
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::StorePaths;
use crate::epoch::log::atomic_write;
use crate::error::{Error, Result};

/// Persisted per-node settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Advertised capacity in bytes, 0 when not yet decided
    #[serde(default)]
    pub space: u64,
}

impl NodeConfig {
    /// Load the config, treating a missing file as empty.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|source| Error::NodeConfig {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_vec_pretty(self).map_err(|source| Error::NodeConfig {
            path: path.to_path_buf(),
            source,
        })?;
        atomic_write(path, &raw)?;
        Ok(())
    }
}

/// Bytes available to unprivileged writers on the filesystem holding `path`.
pub fn free_space(path: &Path) -> Result<u64> {
    let space_err = |source| Error::DiskSpace {
        path: path.to_path_buf(),
        source,
    };
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| space_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    // SAFETY: c_path is NUL-terminated and stat is a valid out-pointer
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if ret < 0 {
        let err = io::Error::last_os_error();
        debug!("get disk space failed {}", err);
        return Err(space_err(err));
    }
    // SAFETY: statvfs succeeded and filled the struct
    let stat = unsafe { stat.assume_init() };
    Ok(stat.f_frsize as u64 * stat.f_bavail as u64)
}

/// Total free space across dedicated object disks, 0 without any.
pub fn multi_disk_space(paths: &StorePaths) -> Result<u64> {
    if !paths.is_multi_disk() {
        return Ok(0);
    }
    let mut total = 0u64;
    for disk in paths.disks() {
        total += free_space(disk)?;
    }
    Ok(total)
}

/// Decide the capacity this node advertises.
///
/// In order: gateways contribute nothing; a previously persisted value wins;
/// a value given at startup is persisted and used; otherwise the free space
/// of the object disks, or of the base directory, is persisted and used.
pub fn resolve_disk_space(paths: &StorePaths, requested: u64, is_gateway: bool) -> Result<u64> {
    if is_gateway {
        debug!("disk free space is 0");
        return Ok(0);
    }

    let mds = multi_disk_space(paths)?;
    let mut config = NodeConfig::load(paths.config_file())?;
    if config.space != 0 {
        debug!("disk free space is {}", config.space);
        return Ok(config.space);
    }

    let space = if requested != 0 {
        requested
    } else if mds != 0 {
        mds
    } else {
        free_space(paths.base())?
    };

    config.space = space;
    config.save(paths.config_file())?;
    debug!("disk free space is {}", space);
    Ok(space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn single_disk(dir: &TempDir) -> StorePaths {
        let base = dir.path().join("node");
        StorePaths::init(&base, &base.to_string_lossy()).unwrap()
    }

    #[test]
    fn test_gateway_has_no_space() {
        let dir = TempDir::new().unwrap();
        let paths = single_disk(&dir);
        assert_eq!(resolve_disk_space(&paths, 1 << 30, true).unwrap(), 0);
        assert!(!paths.config_file().exists());
    }

    #[test]
    fn test_requested_space_is_persisted() {
        let dir = TempDir::new().unwrap();
        let paths = single_disk(&dir);
        assert_eq!(resolve_disk_space(&paths, 1 << 30, false).unwrap(), 1 << 30);
        assert_eq!(NodeConfig::load(paths.config_file()).unwrap().space, 1 << 30);
    }

    #[test]
    fn test_persisted_space_wins() {
        let dir = TempDir::new().unwrap();
        let paths = single_disk(&dir);
        NodeConfig { space: 12345 }.save(paths.config_file()).unwrap();
        assert_eq!(resolve_disk_space(&paths, 1 << 30, false).unwrap(), 12345);
    }

    #[test]
    fn test_falls_back_to_free_space() {
        let dir = TempDir::new().unwrap();
        let paths = single_disk(&dir);
        let space = resolve_disk_space(&paths, 0, false).unwrap();
        assert_eq!(NodeConfig::load(paths.config_file()).unwrap().space, space);
    }

    #[test]
    fn test_corrupt_config() {
        let dir = TempDir::new().unwrap();
        let paths = single_disk(&dir);
        fs::write(paths.config_file(), b"not json").unwrap();
        let err = resolve_disk_space(&paths, 0, false).unwrap_err();
        assert_matches!(err, Error::NodeConfig { .. });
    }

    #[test]
    fn test_free_space_missing_path() {
        let dir = TempDir::new().unwrap();
        let err = free_space(&dir.path().join("missing")).unwrap_err();
        assert_matches!(err, Error::DiskSpace { .. });
    }
}
