//! Channel abstraction and retry policy
//!
//! A channel is any connected, duplex, byte-oriented endpoint. Socket setup
//! and send/receive deadlines belong to whoever created it; a deadline that
//! fires shows up here as a `WouldBlock` or `TimedOut` error.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Default retry budget for would-block/timeout errors.
pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Connected duplex byte stream.
pub trait Channel: Read + Write {}

impl<T: Read + Write + ?Sized> Channel for T {}

// =============================================================================
// Retry Predicate
// =============================================================================

/// Decides whether a timed-out transfer is still worth retrying.
///
/// This is the only place cluster semantics enter the transport; returning
/// `false` cancels an in-flight transfer at its next timeout.
pub trait RetryPredicate {
    fn should_retry(&self) -> bool;
}

impl<F> RetryPredicate for F
where
    F: Fn() -> bool,
{
    fn should_retry(&self) -> bool {
        self()
    }
}

/// Shared view of the cluster epoch.
#[derive(Debug, Clone, Default)]
pub struct ClusterEpoch(Arc<AtomicU32>);

impl ClusterEpoch {
    pub fn new(epoch: u32) -> Self {
        Self(Arc::new(AtomicU32::new(epoch)))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, epoch: u32) {
        self.0.store(epoch, Ordering::Release);
    }

    /// Predicate for a request issued under the current epoch.
    pub fn guard(&self) -> EpochGuard {
        EpochGuard {
            current: self.clone(),
            issued: self.get(),
        }
    }
}

/// Keeps retrying while the cluster has not moved past the issuing epoch.
#[derive(Debug, Clone)]
pub struct EpochGuard {
    current: ClusterEpoch,
    issued: u32,
}

impl EpochGuard {
    pub fn new(current: ClusterEpoch, issued: u32) -> Self {
        Self { current, issued }
    }

    pub fn issued(&self) -> u32 {
        self.issued
    }
}

impl RetryPredicate for EpochGuard {
    fn should_retry(&self) -> bool {
        let now = self.current.get();
        if now > self.issued {
            tracing::debug!(issued = self.issued, current = now, "epoch advanced, giving up");
            return false;
        }
        true
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Retry budget plus optional cancellation predicate.
#[derive(Clone, Copy)]
pub struct RetryPolicy<'a> {
    /// Retries allowed on would-block/timeout
    pub max_retries: u32,
    /// Absent means always retry while budget remains
    pub predicate: Option<&'a dyn RetryPredicate>,
}

impl<'a> RetryPolicy<'a> {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            predicate: None,
        }
    }

    /// Fail on the first would-block.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    pub fn with_predicate(mut self, predicate: &'a dyn RetryPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub(crate) fn budget(&self) -> RetryBudget<'a> {
        RetryBudget {
            remaining: self.max_retries,
            predicate: self.predicate,
        }
    }
}

impl Default for RetryPolicy<'_> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl std::fmt::Debug for RetryPolicy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Per-transfer retry state.
pub(crate) struct RetryBudget<'a> {
    remaining: u32,
    predicate: Option<&'a dyn RetryPredicate>,
}

impl RetryBudget<'_> {
    /// Consume one retry for a timeout, if allowed.
    pub(crate) fn take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        if let Some(predicate) = self.predicate {
            if !predicate.should_retry() {
                return false;
            }
        }
        self.remaining -= 1;
        true
    }
}

/// How a transfer loop should treat an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorClass {
    /// Interrupted by a signal: retry, free of charge
    Interrupted,
    /// Deadline or backpressure: retry against the budget
    Timeout,
    Fatal,
}

pub(crate) fn classify(err: &io::Error) -> ErrorClass {
    match err.kind() {
        io::ErrorKind::Interrupted => ErrorClass::Interrupted,
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ErrorClass::Timeout,
        _ => ErrorClass::Fatal,
    }
}
