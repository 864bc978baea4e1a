//! Herdstore - epoch-versioned object store substrate
//!
//! The transport and on-disk core of a distributed object-storage daemon.
//! Nodes exchange fixed-header binary requests over byte streams, and every
//! object operation is versioned against the cluster epoch, a membership
//! generation that only moves forward.
//!
//! # Architecture
//!
//! ```text
//!   ObjectClient ──▶ LocalExecutor ──▶ NetworkExecutor
//!                                           │
//!                          execute_request ◀┘   (net::transport)
//!                                 │
//!                 read_full / write_vectored_full (net::io)
//!                                 │
//!                     Channel + RetryPolicy (net::channel)
//!
//!   storage side:  StorePaths ─ prepare_io ─ map_io_error ─ discard
//!                  EpochLog (one immutable file per epoch)
//! ```
//!
//! # Modules
//!
//! - [`proto`] - Wire headers, opcodes, flags, object ids and result codes
//! - [`net`] - Exact-length framed I/O and the request/response transport
//! - [`epoch`] - Epoch log store
//! - [`store`] - Object store paths, open flags, errno mapping, disk lifecycle
//! - [`client`] - Object operation client and network executor
//! - [`error`] - Error types

pub mod client;
pub mod epoch;
pub mod error;
pub mod net;
pub mod proto;
pub mod store;

// Re-export commonly used types
pub use client::{LocalExecutor, NetworkExecutor, ObjectClient, RequestData};
pub use epoch::{EpochLog, EpochRecord, NodeDescriptor};
pub use error::{Error, Result};
pub use net::{ClusterEpoch, EpochGuard, RetryPolicy, RetryPredicate};
pub use proto::{Oid, Opcode, RequestFlags, RequestHeader, ResponseHeader, ResultCode};
pub use store::{StoreOptions, StorePaths};
