//! Space reclamation by hole punching

use std::io;
use std::os::unix::io::AsRawFd;

use tracing::{error, info};

/// Deallocate `[start, end)` of `file` without changing its size.
///
/// Filesystems without hole punching report [`io::ErrorKind::Unsupported`]
/// and only log at info level. Callers treat any failure as non-fatal.
pub fn discard(file: &impl AsRawFd, start: u64, end: u64) -> io::Result<()> {
    let len = end.saturating_sub(start);
    if len == 0 {
        return Ok(());
    }

    match punch_hole(file.as_raw_fd(), start, len) {
        Ok(()) => Ok(()),
        Err(e) if is_unsupported(&e) => {
            info!("FALLOC_FL_PUNCH_HOLE is not supported on this filesystem");
            Err(io::Error::new(io::ErrorKind::Unsupported, e))
        }
        Err(e) => {
            error!("failed to discard object, {}", e);
            Err(e)
        }
    }
}

fn is_unsupported(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::ENOSYS | libc::EOPNOTSUPP))
        || err.kind() == io::ErrorKind::Unsupported
}

#[cfg(target_os = "linux")]
fn punch_hole(fd: i32, start: u64, len: u64) -> io::Result<()> {
    let mode = libc::FALLOC_FL_KEEP_SIZE | libc::FALLOC_FL_PUNCH_HOLE;
    loop {
        // SAFETY: fd is borrowed from a live file for the duration of the call
        let ret = unsafe { libc::fallocate(fd, mode, start as libc::off_t, len as libc::off_t) };
        if ret == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn punch_hole(_fd: i32, _start: u64, _len: u64) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}
