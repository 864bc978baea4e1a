//! Epoch log directory
//!
//! One file per epoch, named by the zero-padded 8-digit epoch number. A file
//! holds the node records followed by the creation time as a little-endian
//! `i64` of seconds since the Unix epoch. Files are published with an atomic
//! rename and never modified afterwards, so concurrent readers only ever see
//! complete records.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::node::{NodeDescriptor, NODE_RECORD_SIZE};
use crate::error::{Error, Result};

/// Width of an epoch file name.
pub const EPOCH_NAME_WIDTH: usize = 8;

/// Size of the trailing creation timestamp.
pub const TIMESTAMP_SIZE: usize = 8;

const TMP_SUFFIX: &str = "tmp";

/// A fully loaded epoch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: u32,
    pub nodes: Vec<NodeDescriptor>,
    pub created_at: DateTime<Utc>,
}

/// Handle on the epoch log directory.
#[derive(Debug, Clone)]
pub struct EpochLog {
    dir: PathBuf,
}

impl EpochLog {
    /// The directory is expected to exist; see [`crate::store::StorePaths`].
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `epoch`.
    pub fn path_for(&self, epoch: u32) -> PathBuf {
        self.dir.join(format!("{:08}", epoch))
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Persist the membership of `epoch`, stamped with the current time.
    pub fn record_epoch(&self, epoch: u32, nodes: &[NodeDescriptor]) -> Result<()> {
        self.record_epoch_at(epoch, nodes, Utc::now())
    }

    /// Persist the membership of `epoch` with an explicit creation time.
    ///
    /// An existing file for the same epoch is replaced.
    pub fn record_epoch_at(
        &self,
        epoch: u32,
        nodes: &[NodeDescriptor],
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        debug!("update epoch: {}, {}", epoch, nodes.len());

        let mut buf = Vec::with_capacity(nodes.len() * NODE_RECORD_SIZE + TIMESTAMP_SIZE);
        for node in nodes {
            node.encode(&mut buf);
        }
        buf.put_i64_le(created_at.timestamp());

        let path = self.path_for(epoch);
        atomic_write(&path, &buf).map_err(|e| {
            error!("failed to write epoch {} log, {}", epoch, e);
            Error::Io(e)
        })
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Read the node list of `epoch` into `out`, returning the node count.
    pub fn read_epoch(&self, epoch: u32, out: &mut [NodeDescriptor]) -> Result<usize> {
        self.load(epoch, out).map(|(count, _)| count)
    }

    /// Like [`Self::read_epoch`], also returning the creation time.
    pub fn read_epoch_with_timestamp(
        &self,
        epoch: u32,
        out: &mut [NodeDescriptor],
    ) -> Result<(usize, DateTime<Utc>)> {
        let (count, secs) = self.load(epoch, out)?;
        let created_at = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            error!("invalid epoch {} log", epoch);
            Error::NoSuchEpoch(epoch)
        })?;
        Ok((count, created_at))
    }

    /// Load an entire epoch file.
    pub fn read(&self, epoch: u32) -> Result<EpochRecord> {
        let capacity = self.node_capacity(epoch)?;
        let mut nodes = vec![NodeDescriptor::default(); capacity];
        let (count, created_at) = self.read_epoch_with_timestamp(epoch, &mut nodes)?;
        nodes.truncate(count);
        Ok(EpochRecord {
            epoch,
            nodes,
            created_at,
        })
    }

    fn node_capacity(&self, epoch: u32) -> Result<usize> {
        let len = fs::metadata(self.path_for(epoch))
            .map_err(|e| {
                debug!("failed to open epoch {} log, {}", epoch, e);
                Error::NoSuchEpoch(epoch)
            })?
            .len() as usize;
        Ok(len.saturating_sub(TIMESTAMP_SIZE).div_ceil(NODE_RECORD_SIZE))
    }

    fn load(&self, epoch: u32, out: &mut [NodeDescriptor]) -> Result<(usize, i64)> {
        let invalid = || {
            error!("invalid epoch {} log", epoch);
            Error::NoSuchEpoch(epoch)
        };

        let mut file = File::open(self.path_for(epoch)).map_err(|e| {
            debug!("failed to open epoch {} log, {}", epoch, e);
            Error::NoSuchEpoch(epoch)
        })?;
        let len = file
            .metadata()
            .map_err(|e| {
                error!("failed to stat epoch {} log, {}", epoch, e);
                Error::NoSuchEpoch(epoch)
            })?
            .len() as usize;

        let node_bytes = len.checked_sub(TIMESTAMP_SIZE).ok_or_else(invalid)?;
        let capacity = out.len() * NODE_RECORD_SIZE;
        if node_bytes > capacity {
            return Err(Error::BufferTooSmall {
                needed: node_bytes.div_ceil(NODE_RECORD_SIZE),
                capacity: out.len(),
            });
        }
        // broken epoch, ignore it
        if node_bytes % NODE_RECORD_SIZE != 0 {
            return Err(invalid());
        }

        let mut raw = vec![0u8; len];
        file.read_exact(&mut raw).map_err(|e| {
            error!("failed to read epoch {} log, {}", epoch, e);
            Error::NoSuchEpoch(epoch)
        })?;

        let count = node_bytes / NODE_RECORD_SIZE;
        let mut cursor = &raw[..];
        for slot in out.iter_mut().take(count) {
            *slot = NodeDescriptor::decode(&mut cursor);
        }
        let secs = cursor.get_i64_le();
        Ok((count, secs))
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Highest recorded epoch, or 0 when none exists.
    ///
    /// Only names made of exactly eight ASCII digits count; anything else in
    /// the directory is ignored.
    pub fn latest_epoch(&self) -> Result<u32> {
        Ok(self.epochs()?.last().copied().unwrap_or(0))
    }

    /// Every recorded epoch, ascending.
    pub fn epochs(&self) -> Result<Vec<u32>> {
        let scan_err = |source| Error::EpochScan {
            path: self.dir.clone(),
            source,
        };

        let mut epochs = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            if let Some(epoch) = entry.file_name().to_str().and_then(parse_epoch_name) {
                epochs.push(epoch);
            }
        }
        epochs.sort_unstable();
        Ok(epochs)
    }
}

/// Parse a file name of exactly [`EPOCH_NAME_WIDTH`] decimal digits.
pub fn parse_epoch_name(name: &str) -> Option<u32> {
    if name.len() != EPOCH_NAME_WIDTH || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// Write `data` to `path` so that readers see either nothing or all of it.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension(TMP_SUFFIX);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}
