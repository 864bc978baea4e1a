//! Object identifiers
//!
//! An [`Oid`] is a 64-bit value. The top bits classify the object; anything
//! without a class bit is a plain data object. Ledger objects live in their
//! own class and carry the data object's low bits unchanged, so every data
//! oid has exactly one ledger oid.

use serde::{Deserialize, Serialize};

/// Inode (VDI) object
pub const VDI_BIT: u64 = 1 << 63;
/// VM state object
pub const VMSTATE_BIT: u64 = 1 << 62;
/// VDI attribute object
pub const VDI_ATTR_BIT: u64 = 1 << 61;
/// Inode b-tree index object
pub const VDI_BTREE_BIT: u64 = 1 << 60;
/// Reference-count ledger object
pub const LEDGER_BIT: u64 = 1 << 59;

const CLASS_MASK: u64 = VDI_BIT | VMSTATE_BIT | VDI_ATTR_BIT | VDI_BTREE_BIT | LEDGER_BIT;

/// 64-bit object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Oid(pub u64);

impl Oid {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Plain data object (no class bit set).
    #[inline]
    pub const fn is_data_obj(self) -> bool {
        self.0 & CLASS_MASK == 0
    }

    #[inline]
    pub const fn is_ledger_obj(self) -> bool {
        self.0 & LEDGER_BIT != 0
    }

    /// Ledger object that tracks copy-on-write references to this data object.
    #[inline]
    pub const fn to_ledger_oid(self) -> Oid {
        Oid(self.0 | LEDGER_BIT)
    }

    /// Backing file name under an object root.
    pub fn file_name(self) -> String {
        format!("{:016x}", self.0)
    }

    /// Stable 64-bit mix used to spread objects across disks.
    pub fn placement_hash(self) -> u64 {
        // FNV-1a over the little-endian bytes
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in self.0.to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for Oid {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
