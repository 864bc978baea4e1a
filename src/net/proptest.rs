//! Property-Based Tests for Framed I/O
//!
//! # Test Properties
//!
//! 1. **Exact Transfer**: any length over any chunking arrives intact
//! 2. **Retry Budget**: a channel stuck on would-block is tried `K + 1` times
//! 3. **Predicate Gating**: a refusing predicate fails the next timeout at once,
//!    on reads and writes alike

#![cfg(test)]

use std::io;

use proptest::prelude::*;

use super::channel::RetryPolicy;
use super::io::{read_full, write_vectored_full};
use super::mock::MockChannel;
use crate::error::Error;

// =============================================================================
// Property Strategies
// =============================================================================

/// Payload plus a chunk size strictly smaller than it.
fn payload_and_chunk() -> impl Strategy<Value = (Vec<u8>, usize)> {
    prop::collection::vec(any::<u8>(), 2..4096).prop_flat_map(|data| {
        let len = data.len();
        (Just(data), 1..len)
    })
}

/// Payload split into up to five spans at arbitrary points.
fn split_payload() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    prop::collection::vec(any::<u8>(), 1..2048).prop_flat_map(|data| {
        let len = data.len();
        (Just(data), prop::collection::vec(0..=len, 0..5))
    })
}

fn spans_at<'a>(data: &'a [u8], cuts: &[usize]) -> Vec<&'a [u8]> {
    let mut cuts = cuts.to_vec();
    cuts.sort_unstable();
    let mut spans = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        spans.push(&data[start..cut]);
        start = cut;
    }
    spans.push(&data[start..]);
    spans
}

// =============================================================================
// Exact Transfer
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a chunked read collects exactly the requested bytes.
    #[test]
    fn prop_read_exact_over_chunks((data, chunk) in payload_and_chunk()) {
        let mut channel = MockChannel::with_input(data.clone()).chunked(chunk);
        let mut buf = vec![0u8; data.len()];
        read_full(&mut channel, &mut buf, &RetryPolicy::no_retry())?;

        prop_assert_eq!(&buf, &data);
        prop_assert_eq!(channel.read_calls(), data.len().div_ceil(chunk));
    }

    /// Property: a chunked scatter write emits every span in order.
    #[test]
    fn prop_write_exact_over_spans(
        (data, cuts) in split_payload(),
        chunk in 1usize..300,
    ) {
        let spans = spans_at(&data, &cuts);
        let mut channel = MockChannel::default().chunked(chunk);
        write_vectored_full(&mut channel, &spans, &RetryPolicy::no_retry())?;

        prop_assert_eq!(channel.output(), &data[..]);
    }

    /// Property: interruptions never count against the retry budget.
    #[test]
    fn prop_interrupts_are_free(
        (data, chunk) in payload_and_chunk(),
        interrupts in 0usize..50,
    ) {
        let mut channel = MockChannel::with_input(data.clone())
            .chunked(chunk)
            .fail_reads(io::ErrorKind::Interrupted, interrupts);
        let mut buf = vec![0u8; data.len()];
        read_full(&mut channel, &mut buf, &RetryPolicy::no_retry())?;
        prop_assert_eq!(buf, data);
    }
}

// =============================================================================
// Retry Budget
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: `K` retries means `K + 1` attempts, then a hard I/O error.
    #[test]
    fn prop_read_retry_budget(max_retries in 0u32..64) {
        let mut channel = MockChannel::with_input(vec![0u8; 8]).always_fail(io::ErrorKind::WouldBlock);
        let always = || true;
        let policy = RetryPolicy::new(max_retries).with_predicate(&always);
        let mut buf = [0u8; 8];

        let err = read_full(&mut channel, &mut buf, &policy).unwrap_err();
        prop_assert!(matches!(err, Error::Io(_)));
        prop_assert_eq!(channel.read_calls(), max_retries as usize + 1);
    }

    /// Property: the write path honours the same budget.
    #[test]
    fn prop_write_retry_budget(max_retries in 0u32..64) {
        let mut channel = MockChannel::default().always_fail(io::ErrorKind::TimedOut);
        let data = [1u8; 8];
        let spans: [&[u8]; 1] = [&data];

        let err = write_vectored_full(&mut channel, &spans, &RetryPolicy::new(max_retries)).unwrap_err();
        prop_assert!(matches!(err, Error::Io(_)));
        prop_assert_eq!(channel.write_calls(), max_retries as usize + 1);
    }

    /// Property: once the predicate refuses, the next timeout fails regardless of budget.
    #[test]
    fn prop_predicate_gates_retries(max_retries in 1u32..64, allowed in 0usize..8) {
        let calls = std::cell::Cell::new(0usize);
        let predicate = || {
            let n = calls.get();
            calls.set(n + 1);
            n < allowed
        };
        let policy = RetryPolicy::new(max_retries).with_predicate(&predicate);
        let mut channel = MockChannel::with_input(vec![0u8; 8]).always_fail(io::ErrorKind::WouldBlock);
        let mut buf = [0u8; 8];

        prop_assert!(read_full(&mut channel, &mut buf, &policy).is_err());
        let expected = allowed.min(max_retries as usize) + 1;
        prop_assert_eq!(channel.read_calls(), expected);
    }

    /// Property: a refusing predicate stops the write path after one attempt.
    #[test]
    fn prop_write_predicate_refusal(max_retries in 0u32..64, len in 1usize..512) {
        let refuse = || false;
        let policy = RetryPolicy::new(max_retries).with_predicate(&refuse);
        let mut channel = MockChannel::default().always_fail(io::ErrorKind::WouldBlock);
        let data = vec![7u8; len];
        let spans: [&[u8]; 1] = [&data];

        let err = write_vectored_full(&mut channel, &spans, &policy).unwrap_err();
        prop_assert!(matches!(err, Error::Io(_)));
        prop_assert_eq!(channel.write_calls(), 1);
        prop_assert!(channel.output().is_empty());
    }
}
