//! Store paths and options
//!
//! [`StorePaths`] is built once at startup from the base directory and the
//! disk list, then handed by reference to everything that touches disk.

use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::proto::Oid;

/// Mode of every directory the store creates.
pub const DIR_MODE: u32 = 0o755;

const OBJ_DIR: &str = "obj";
const EPOCH_DIR: &str = "epoch";
const CONFIG_FILE: &str = "config";

/// Create `dir` (and missing parents) if it does not exist yet.
pub fn init_base_path(dir: &Path) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(dir)
        .map_err(|e| {
            error!("cannot create the directory {:?} ({})", dir, e);
            Error::Io(e)
        })
}

// =============================================================================
// Store Paths
// =============================================================================

/// Process-wide directory layout of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    base: PathBuf,
    obj: PathBuf,
    epoch: PathBuf,
    config: PathBuf,
    disks: Vec<PathBuf>,
}

impl StorePaths {
    /// Resolve and create the directory layout under `base`.
    ///
    /// `disk_arg` is the comma-separated disk list whose first component is
    /// the base directory itself. With no further component the object store
    /// shares the base directory under `obj/`. Otherwise every remaining
    /// component is a dedicated object disk, and none may be a meta-store.
    pub fn init(base: &Path, disk_arg: &str) -> Result<Self> {
        check_path_len(base)?;

        let obj = base.join(OBJ_DIR);
        let dedicated: Vec<&str> = disk_arg
            .split(',')
            .skip(1)
            .filter(|p| !p.is_empty())
            .collect();

        let mut disks = Vec::new();
        if dedicated.is_empty() {
            // meta-store and object-store share the base directory
            add_disk(&mut disks, obj.clone());
        } else {
            for p in dedicated {
                let path = PathBuf::from(p);
                check_path_len(&path)?;
                if is_meta_store(&path) {
                    error!("{:?} is meta-store, abort", path);
                    return Err(Error::MetaStoreDisk(path));
                }
                add_disk(&mut disks, path);
            }
        }
        if disks.is_empty() {
            error!("there isn't any available disk");
            return Err(Error::NoDisks);
        }

        init_base_path(&obj)?;
        let epoch = Self::epoch_dir_for(base);
        init_base_path(&epoch)?;

        info!(base = ?base, disks = disks.len(), "store paths initialized");
        Ok(Self {
            base: base.to_path_buf(),
            obj,
            epoch,
            config: base.join(CONFIG_FILE),
            disks,
        })
    }

    /// Epoch log directory under `base`, without creating anything.
    pub fn epoch_dir_for(base: &Path) -> PathBuf {
        base.join(EPOCH_DIR)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn obj_dir(&self) -> &Path {
        &self.obj
    }

    pub fn epoch_dir(&self) -> &Path {
        &self.epoch
    }

    pub fn config_file(&self) -> &Path {
        &self.config
    }

    /// Object roots, in configuration order.
    pub fn disks(&self) -> &[PathBuf] {
        &self.disks
    }

    /// True when objects live on disks separate from the base directory.
    pub fn is_multi_disk(&self) -> bool {
        self.disks.len() > 1 || self.disks.first() != Some(&self.obj)
    }

    /// Object root that holds `oid`.
    pub fn disk_for(&self, oid: Oid) -> &Path {
        let idx = (oid.placement_hash() % self.disks.len() as u64) as usize;
        &self.disks[idx]
    }

    /// Backing file of `oid`.
    pub fn object_path(&self, oid: Oid) -> PathBuf {
        self.disk_for(oid).join(oid.file_name())
    }
}

fn check_path_len(path: &Path) -> Result<()> {
    if path.as_os_str().len() > libc::PATH_MAX as usize {
        error!("insanely long object directory {:?}", path);
        return Err(Error::PathTooLong(path.to_path_buf()));
    }
    Ok(())
}

/// A directory holding both a node config and an epoch log.
fn is_meta_store(path: &Path) -> bool {
    path.join(CONFIG_FILE).exists() && path.join(EPOCH_DIR).exists()
}

fn add_disk(disks: &mut Vec<PathBuf>, path: PathBuf) {
    if disks.contains(&path) {
        debug!("{:?} listed twice, ignored", path);
        return;
    }
    match init_base_path(&path) {
        Ok(()) => disks.push(path),
        Err(e) => warn!("skipping disk {:?}: {}", path, e),
    }
}

// =============================================================================
// Store Options
// =============================================================================

/// Durability and I/O options of the object store.
#[derive(Debug)]
pub struct StoreOptions {
    /// A write-ahead journal covers durability; toggled at runtime
    pub use_journal: AtomicBool,
    /// Skip synchronous writes entirely
    pub nosync: bool,
    /// Use O_DIRECT for aligned data-object I/O
    pub backend_dio: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            use_journal: AtomicBool::new(false),
            nosync: false,
            backend_dio: false,
        }
    }
}

impl StoreOptions {
    pub fn journal_enabled(&self) -> bool {
        self.use_journal.load(Ordering::Acquire)
    }

    pub fn set_journal(&self, enabled: bool) {
        self.use_journal.store(enabled, Ordering::Release);
    }

    /// Sync flags are dropped when something else owns durability.
    pub fn skip_sync(&self) -> bool {
        self.nosync || self.journal_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_single_path_shares_base() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("node");
        let arg = base.to_string_lossy().into_owned();

        let paths = StorePaths::init(&base, &arg).unwrap();
        assert_eq!(paths.disks(), &[base.join("obj")]);
        assert!(!paths.is_multi_disk());
        assert!(paths.obj_dir().is_dir());
        assert!(paths.epoch_dir().is_dir());
        assert_eq!(paths.config_file(), base.join("config"));
    }

    #[test]
    fn test_multiple_disks() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("node");
        let d1 = dir.path().join("d1");
        let d2 = dir.path().join("d2");
        let arg = format!("{},{},{}", base.display(), d1.display(), d2.display());

        let paths = StorePaths::init(&base, &arg).unwrap();
        assert_eq!(paths.disks(), &[d1.clone(), d2.clone()]);
        assert!(paths.is_multi_disk());
        assert!(d1.is_dir() && d2.is_dir());
    }

    #[test]
    fn test_meta_store_disk_rejected() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("node");
        let old = dir.path().join("old");
        fs::create_dir_all(old.join("epoch")).unwrap();
        fs::write(old.join("config"), b"{}").unwrap();
        let arg = format!("{},{}", base.display(), old.display());

        let err = StorePaths::init(&base, &arg).unwrap_err();
        assert_matches!(err, Error::MetaStoreDisk(p) if p == old);
    }

    #[test]
    fn test_object_path_is_stable() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("node");
        let arg = format!(
            "{},{},{},{}",
            base.display(),
            dir.path().join("a").display(),
            dir.path().join("b").display(),
            dir.path().join("c").display()
        );
        let paths = StorePaths::init(&base, &arg).unwrap();

        let oid = Oid(0x00ab_cdef_0000_0001);
        let path = paths.object_path(oid);
        assert_eq!(path, paths.object_path(oid));
        assert_eq!(path.file_name().unwrap(), "00abcdef00000001");
        assert!(paths.disks().iter().any(|d| path.starts_with(d)));
    }

    #[test]
    fn test_store_options() {
        let opts = StoreOptions::default();
        assert!(!opts.skip_sync());
        opts.set_journal(true);
        assert!(opts.skip_sync());
    }
}
