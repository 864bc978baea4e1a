//! Framed transport over duplex byte channels
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                 transport (execute_request)                    │
//! │   header + payload ──▶ one scatter write                        │
//! │   response header ──▶ clamped response payload                 │
//! └───────────────────────────────┬───────────────────────────────┘
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │            io (read_full / write_vectored_full)                │
//! │   exact-length transfers, partial progress, retry budget        │
//! └───────────────────────────────┬───────────────────────────────┘
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │        channel (any Read + Write, RetryPolicy, EpochGuard)      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Calls block until the transfer completes or fails. Timeouts are the
//! channel's business; they surface as would-block errors that the
//! [`RetryPolicy`] either absorbs or turns into a failure.

pub mod channel;
pub mod io;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;
#[cfg(test)]
mod proptest;

pub use channel::{
    Channel, ClusterEpoch, EpochGuard, RetryPolicy, RetryPredicate, DEFAULT_MAX_RETRIES,
};
pub use io::{read_full, write_vectored_full, SpanCursor};
pub use transport::{
    execute_request, execute_request_split, recv_request, send_request, send_response,
    MAX_REQUEST_PAYLOAD,
};
