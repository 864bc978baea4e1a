//! Error types for Herdstore
//!
//! The crate-wide [`Error`] covers transport, epoch log and store setup
//! failures. The cluster status vocabulary that travels on the wire lives in
//! [`crate::proto::ResultCode`]; [`Error::result_code`] is the bridge between
//! the two.

use std::path::PathBuf;

use thiserror::Error;

use crate::proto::{Opcode, ResultCode};

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Herdstore
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Peer closed the channel before the transfer completed
    #[error("connection closed ({remaining} bytes left)")]
    ConnectionClosed { remaining: usize },

    /// Request header or payload could not be sent
    #[error("failed to send request {opcode}, {length}: {source}")]
    SendRequest {
        opcode: Opcode,
        length: u32,
        #[source]
        source: Box<Error>,
    },

    /// Response header could not be read
    #[error("failed to read a response: {0}")]
    ResponseHeader(#[source] Box<Error>),

    /// Response payload could not be read
    #[error("failed to read the response data ({length} bytes): {source}")]
    ResponseData {
        length: u32,
        #[source]
        source: Box<Error>,
    },

    /// Incoming request payload could not be read
    #[error("failed to read request data ({length} bytes): {source}")]
    RequestData {
        length: u32,
        #[source]
        source: Box<Error>,
    },

    /// Caller-provided payload buffer does not match the header
    #[error("payload buffer holds {actual} bytes but header declares {declared}")]
    PayloadMismatch { declared: u32, actual: usize },

    /// Declared request payload exceeds what a receiver will buffer
    #[error("request payload of {length} bytes exceeds limit {limit}")]
    PayloadTooLarge { length: u32, limit: u32 },

    // =========================================================================
    // Epoch Log Errors
    // =========================================================================
    /// Epoch log missing, truncated or corrupted
    #[error("no such epoch {0}")]
    NoSuchEpoch(u32),

    /// Output buffer cannot hold the epoch's node list
    #[error("buffer too small: need {needed} node slots, have {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// Epoch directory could not be scanned
    #[error("failed to get the latest epoch from {path:?}: {source}")]
    EpochScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// Path longer than the platform allows
    #[error("insanely long object directory {0:?}")]
    PathTooLong(PathBuf),

    /// A per-disk object root overlaps a meta-store
    #[error("{0:?} is meta-store, abort")]
    MetaStoreDisk(PathBuf),

    /// No disk survived validation
    #[error("there isn't any available disk")]
    NoDisks,

    /// Another daemon holds the base directory lock
    #[error("another daemon is using {0:?}")]
    BaseDirLocked(PathBuf),

    /// Store driver not registered
    #[error("store {0} not found")]
    NoStore(String),

    /// Store driver initialization failed
    #[error("store driver {name} failed to initialize: {reason}")]
    StoreInit { name: String, reason: String },

    /// Persisted node configuration could not be parsed
    #[error("invalid node config {path:?}: {source}")]
    NodeConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Disk space query failed
    #[error("get disk space failed for {path:?}: {source}")]
    DiskSpace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Cluster status code that best describes this failure.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Error::ConnectionClosed { .. }
            | Error::SendRequest { .. }
            | Error::ResponseHeader(_)
            | Error::ResponseData { .. }
            | Error::RequestData { .. } => ResultCode::NetworkError,
            Error::PayloadMismatch { .. } | Error::PayloadTooLarge { .. } => {
                ResultCode::InvalidParms
            }
            Error::NoSuchEpoch(_) => ResultCode::NoTag,
            Error::BufferTooSmall { .. } => ResultCode::BufferSmall,
            Error::NoStore(_) => ResultCode::NoStore,
            Error::DiskSpace { .. } => ResultCode::Eio,
            _ => ResultCode::SystemError,
        }
    }

    /// Returns true if the peer closed the channel mid-transfer.
    pub fn is_connection_closed(&self) -> bool {
        match self {
            Error::ConnectionClosed { .. } => true,
            Error::SendRequest { source, .. }
            | Error::ResponseHeader(source)
            | Error::ResponseData { source, .. }
            | Error::RequestData { source, .. } => source.is_connection_closed(),
            _ => false,
        }
    }
}
