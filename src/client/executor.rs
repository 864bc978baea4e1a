//! Request execution entry points

use parking_lot::Mutex;
use tracing::{error, warn};

use crate::error::Error;
use crate::net::{
    execute_request, execute_request_split, Channel, ClusterEpoch, RetryPolicy,
    DEFAULT_MAX_RETRIES,
};
use crate::proto::{RequestHeader, ResultCode};

/// Payload attached to a request.
#[derive(Debug)]
pub enum RequestData<'a> {
    None,
    /// Sent after the header
    Write(&'a [u8]),
    /// Filled from the response payload
    Read(&'a mut [u8]),
}

impl RequestData<'_> {
    pub fn len(&self) -> usize {
        match self {
            RequestData::None => 0,
            RequestData::Write(buf) => buf.len(),
            RequestData::Read(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs a request on behalf of this node, locally or by relaying it.
pub trait LocalExecutor {
    fn exec_local_req(&self, hdr: &RequestHeader, data: RequestData<'_>) -> ResultCode;
}

impl<E: LocalExecutor + ?Sized> LocalExecutor for &E {
    fn exec_local_req(&self, hdr: &RequestHeader, data: RequestData<'_>) -> ResultCode {
        (**self).exec_local_req(hdr, data)
    }
}

// =============================================================================
// Network Executor
// =============================================================================

/// Executes requests over one channel to a peer.
///
/// The channel carries one request at a time; callers on other threads wait
/// for the lock. Requests are stamped with the current cluster epoch and
/// stop retrying once the epoch moves on.
///
/// An exchange that fails once bytes may have crossed the wire leaves the
/// channel's framing unknown, so the channel is dropped. Every later request
/// fails with [`ResultCode::NetworkError`] until
/// [`NetworkExecutor::replace_channel`] installs a new one.
#[derive(Debug)]
pub struct NetworkExecutor<C> {
    channel: Mutex<Option<C>>,
    epoch: ClusterEpoch,
    max_retries: u32,
}

impl<C: Channel> NetworkExecutor<C> {
    pub fn new(channel: C, epoch: ClusterEpoch) -> Self {
        Self {
            channel: Mutex::new(Some(channel)),
            epoch,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn epoch(&self) -> &ClusterEpoch {
        &self.epoch
    }

    /// True once a failed exchange dropped the channel.
    pub fn is_broken(&self) -> bool {
        self.channel.lock().is_none()
    }

    /// Install a fresh channel, returning the one still held, if any.
    pub fn replace_channel(&self, channel: C) -> Option<C> {
        self.channel.lock().replace(channel)
    }

    pub fn into_inner(self) -> Option<C> {
        self.channel.into_inner()
    }
}

impl<C: Channel> LocalExecutor for NetworkExecutor<C> {
    fn exec_local_req(&self, hdr: &RequestHeader, data: RequestData<'_>) -> ResultCode {
        let guard = self.epoch.guard();
        let policy = RetryPolicy::new(self.max_retries).with_predicate(&guard);

        let mut hdr = *hdr;
        hdr.epoch = guard.issued();

        let mut slot = self.channel.lock();
        let Some(channel) = slot.as_mut() else {
            error!("no channel to send request {}", hdr.opcode);
            return ResultCode::NetworkError;
        };

        let ret = match data {
            RequestData::None => execute_request(channel, &hdr, &mut [], &policy),
            RequestData::Read(buf) => execute_request(channel, &hdr, buf, &policy),
            RequestData::Write(buf) => {
                // a piggybacked reply still has to be drained off the channel
                let (_, rlen) = hdr.transfer_lengths();
                let mut sink = vec![0u8; rlen as usize];
                execute_request_split(channel, &hdr, buf, &mut sink, &policy)
            }
        };

        match ret {
            Ok(rsp) => rsp.result,
            Err(e) => {
                error!("failed to execute request {}: {}", hdr.opcode, e);
                if !matches!(e, Error::PayloadMismatch { .. }) {
                    warn!("dropping channel after failed request {}", hdr.opcode);
                    *slot = None;
                }
                e.result_code()
            }
        }
    }
}
