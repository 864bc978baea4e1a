//! I/O control blocks and open-flag selection

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;

use super::config::StoreOptions;
use crate::proto::Oid;

/// Direct I/O granularity.
pub const SECTOR_SIZE: u64 = 512;

#[cfg(target_os = "linux")]
const O_DIRECT: i32 = libc::O_DIRECT;
#[cfg(not(target_os = "linux"))]
const O_DIRECT: i32 = 0;

/// Caller-owned buffer of one object I/O.
#[derive(Debug)]
pub enum IoBuffer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl IoBuffer<'_> {
    pub fn len(&self) -> usize {
        match self {
            IoBuffer::Read(buf) => buf.len(),
            IoBuffer::Write(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn addr(&self) -> usize {
        match self {
            IoBuffer::Read(buf) => buf.as_ptr() as usize,
            IoBuffer::Write(buf) => buf.as_ptr() as usize,
        }
    }
}

/// One object I/O: where, how much, and into/from which buffer.
#[derive(Debug)]
pub struct IoControlBlock<'a> {
    pub epoch: u32,
    pub offset: u64,
    pub buf: IoBuffer<'a>,
}

impl<'a> IoControlBlock<'a> {
    pub fn read(epoch: u32, offset: u64, buf: &'a mut [u8]) -> Self {
        Self {
            epoch,
            offset,
            buf: IoBuffer::Read(buf),
        }
    }

    pub fn write(epoch: u32, offset: u64, buf: &'a [u8]) -> Self {
        Self {
            epoch,
            offset,
            buf: IoBuffer::Write(buf),
        }
    }

    pub fn length(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Offset and length both fall on sector boundaries.
    pub fn is_aligned(&self) -> bool {
        sector_aligned(self.offset) && sector_aligned(self.length())
    }
}

fn sector_aligned(x: u64) -> bool {
    x & (SECTOR_SIZE - 1) == 0
}

fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

// =============================================================================
// Open Flags
// =============================================================================

/// `open(2)` flags chosen for one object I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags(i32);

impl OpenFlags {
    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn contains(self, flag: i32) -> bool {
        self.0 & flag == flag
    }

    pub const fn is_create(self) -> bool {
        self.contains(libc::O_CREAT | libc::O_EXCL)
    }

    pub const fn is_direct(self) -> bool {
        O_DIRECT != 0 && self.contains(O_DIRECT)
    }

    /// Open options carrying these flags.
    ///
    /// Access mode and creation go through the std builder; sync and direct
    /// bits travel as custom flags.
    pub fn open_options(self) -> OpenOptions {
        let custom = self.0 & !(libc::O_ACCMODE | libc::O_CREAT | libc::O_EXCL);
        let mut opts = OpenOptions::new();
        opts.read(true)
            .write(true)
            .create_new(self.is_create())
            .custom_flags(custom);
        opts
    }
}

/// Decide how to open the backing file of `oid` for `iocb`.
///
/// Creates open `O_SYNC`, updates `O_DSYNC`, unless a journal or the no-sync
/// option owns durability. Aligned data-object I/O goes direct when enabled.
///
/// # Panics
///
/// If direct I/O applies and the buffer is not page-aligned.
pub fn prepare_io(
    oid: Oid,
    iocb: &IoControlBlock<'_>,
    create: bool,
    opts: &StoreOptions,
) -> OpenFlags {
    let syncflag = if create { libc::O_SYNC } else { libc::O_DSYNC };
    let mut flags = syncflag | libc::O_RDWR;

    if opts.skip_sync() {
        flags &= !syncflag;
    }

    if opts.backend_dio && oid.is_data_obj() && iocb.length() > 0 && iocb.is_aligned() {
        if iocb.buf.addr() % page_size() != 0 {
            panic!(
                "memory isn't aligned to pagesize {:#x}, oid: {}",
                iocb.buf.addr(),
                oid
            );
        }
        flags |= O_DIRECT;
    }

    if create {
        flags |= libc::O_CREAT | libc::O_EXCL;
    }

    OpenFlags(flags)
}
