//! Cluster result codes
//!
//! Every node, gateway and client speaks this vocabulary. The `Display`
//! string of each variant is the human-readable status used in logs.

use thiserror::Error;

/// Status carried in a response header.
///
/// `NetworkError` is deliberately overloaded: local file-descriptor
/// exhaustion and other transient local failures are reported with it so the
/// requesting gateway retries against another node.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultCode {
    #[default]
    #[error("Success")]
    Success,
    #[error("Unknown error")]
    Unknown,
    #[error("No object found")]
    NoObj,
    #[error("I/O error")]
    Eio,
    #[error("Invalid parameters")]
    InvalidParms,
    #[error("System error")]
    SystemError,
    #[error("Failed to find requested tag")]
    NoTag,
    #[error("Failed to allocate memory")]
    NoMem,
    #[error("Server has no space for new objects")]
    NoSpace,
    #[error("Network error between nodes")]
    NetworkError,
    #[error("The buffer is too small")]
    BufferSmall,
    #[error("No targeted backend store")]
    NoStore,
}

impl ResultCode {
    /// Wire value.
    pub const fn as_u32(self) -> u32 {
        match self {
            ResultCode::Success => 0x00,
            ResultCode::Unknown => 0x01,
            ResultCode::NoObj => 0x02,
            ResultCode::Eio => 0x03,
            ResultCode::InvalidParms => 0x05,
            ResultCode::SystemError => 0x06,
            ResultCode::NoTag => 0x0E,
            ResultCode::NoMem => 0x12,
            ResultCode::NoSpace => 0x15,
            ResultCode::NetworkError => 0x86,
            ResultCode::BufferSmall => 0x88,
            ResultCode::NoStore => 0x8A,
        }
    }

    /// Decode a wire value. Codes this crate does not know collapse to `Unknown`.
    pub const fn from_u32(raw: u32) -> Self {
        match raw {
            0x00 => ResultCode::Success,
            0x02 => ResultCode::NoObj,
            0x03 => ResultCode::Eio,
            0x05 => ResultCode::InvalidParms,
            0x06 => ResultCode::SystemError,
            0x0E => ResultCode::NoTag,
            0x12 => ResultCode::NoMem,
            0x15 => ResultCode::NoSpace,
            0x86 => ResultCode::NetworkError,
            0x88 => ResultCode::BufferSmall,
            0x8A => ResultCode::NoStore,
            _ => ResultCode::Unknown,
        }
    }

    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, ResultCode::Success)
    }

    /// `Ok(())` on success, the code itself otherwise.
    pub fn into_result(self) -> std::result::Result<(), ResultCode> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }
}
