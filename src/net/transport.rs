//! Request/response transport
//!
//! One request is in flight per channel: the caller sends a header and its
//! payload as a single scatter write, then consumes the fixed-size response
//! header and at most the expected amount of response payload before the
//! channel may carry the next request.

use std::io::{Read, Write};

use tracing::{error, trace};

use super::channel::{Channel, RetryPolicy};
use super::io::{read_full, write_vectored_full};
use crate::error::{Error, Result};
use crate::proto::{RequestFlags, RequestHeader, ResponseHeader, HEADER_SIZE};

/// Largest request payload a receiver will buffer.
pub const MAX_REQUEST_PAYLOAD: u32 = 64 * 1024 * 1024;

/// Send `hdr` followed by `data` as one logical write.
pub fn send_request<C>(
    channel: &mut C,
    hdr: &RequestHeader,
    data: &[u8],
    policy: &RetryPolicy<'_>,
) -> Result<()>
where
    C: Write + ?Sized,
{
    let wire = hdr.encode();
    let spans: [&[u8]; 2] = [&wire, data];
    let spans = if data.is_empty() { &spans[..1] } else { &spans[..] };

    write_vectored_full(channel, spans, policy).map_err(|e| {
        error!("failed to send request {}, {}: {}", hdr.opcode, data.len(), e);
        Error::SendRequest {
            opcode: hdr.opcode,
            length: data.len() as u32,
            source: Box::new(e),
        }
    })
}

/// Run one full request/response exchange.
///
/// With [`RequestFlags::WRITE`] the first `data_length` bytes of `data` are
/// sent, and a response payload is only expected when
/// [`RequestFlags::PIGGYBACK`] is also set. Without it nothing is sent and up
/// to `data_length` bytes are read back. The response payload read is
/// clamped to the response's own `data_length`; bytes of `data` past that
/// point are left untouched.
pub fn execute_request<C>(
    channel: &mut C,
    hdr: &RequestHeader,
    data: &mut [u8],
    policy: &RetryPolicy<'_>,
) -> Result<ResponseHeader>
where
    C: Channel + ?Sized,
{
    let (wlen, rlen) = hdr.transfer_lengths();
    check_payload(wlen.max(rlen), data.len())?;

    send_request(channel, hdr, &data[..wlen as usize], policy)?;
    recv_response(channel, hdr, &mut data[..rlen as usize], policy)
}

/// Like [`execute_request`], with the outgoing payload and the response
/// buffer kept apart.
///
/// `out` must hold the bytes the header sends and `input` the bytes it
/// expects back; a plain write passes an empty `input`.
pub fn execute_request_split<C>(
    channel: &mut C,
    hdr: &RequestHeader,
    out: &[u8],
    input: &mut [u8],
    policy: &RetryPolicy<'_>,
) -> Result<ResponseHeader>
where
    C: Channel + ?Sized,
{
    let (wlen, rlen) = hdr.transfer_lengths();
    check_payload(wlen, out.len())?;
    check_payload(rlen, input.len())?;

    send_request(channel, hdr, &out[..wlen as usize], policy)?;
    recv_response(channel, hdr, &mut input[..rlen as usize], policy)
}

fn check_payload(declared: u32, actual: usize) -> Result<()> {
    if declared as usize > actual {
        return Err(Error::PayloadMismatch { declared, actual });
    }
    Ok(())
}

/// Read the response header, then at most `buf.len()` bytes of its payload.
fn recv_response<C>(
    channel: &mut C,
    hdr: &RequestHeader,
    buf: &mut [u8],
    policy: &RetryPolicy<'_>,
) -> Result<ResponseHeader>
where
    C: Channel + ?Sized,
{
    // the response lands in the request's scratch space
    let mut wire = hdr.encode();
    read_full(channel, &mut wire, policy).map_err(|e| {
        error!("failed to read a response");
        Error::ResponseHeader(Box::new(e))
    })?;
    let rsp = ResponseHeader::decode(&wire);

    let rlen = buf.len().min(rsp.data_length as usize);
    if rlen > 0 {
        read_full(channel, &mut buf[..rlen], policy).map_err(|e| {
            error!("failed to read the response data");
            Error::ResponseData {
                length: rlen as u32,
                source: Box::new(e),
            }
        })?;
    }

    trace!(
        opcode = %hdr.opcode,
        result = %rsp.result,
        received = rlen,
        "request executed"
    );
    Ok(rsp)
}

// =============================================================================
// Receiving side
// =============================================================================

/// Read one request header and, for write requests, its payload.
pub fn recv_request<C>(
    channel: &mut C,
    policy: &RetryPolicy<'_>,
) -> Result<(RequestHeader, Vec<u8>)>
where
    C: Read + ?Sized,
{
    let mut wire = [0u8; HEADER_SIZE];
    read_full(channel, &mut wire, policy)?;
    let hdr = RequestHeader::decode(&wire);

    if !hdr.flags.contains(RequestFlags::WRITE) || hdr.data_length == 0 {
        return Ok((hdr, Vec::new()));
    }
    if hdr.data_length > MAX_REQUEST_PAYLOAD {
        return Err(Error::PayloadTooLarge {
            length: hdr.data_length,
            limit: MAX_REQUEST_PAYLOAD,
        });
    }

    let mut data = vec![0u8; hdr.data_length as usize];
    read_full(channel, &mut data, policy).map_err(|e| Error::RequestData {
        length: hdr.data_length,
        source: Box::new(e),
    })?;
    Ok((hdr, data))
}

/// Write a response header followed by exactly `rsp.data_length` bytes of `data`.
pub fn send_response<C>(
    channel: &mut C,
    rsp: &ResponseHeader,
    data: &[u8],
    policy: &RetryPolicy<'_>,
) -> Result<()>
where
    C: Write + ?Sized,
{
    let len = rsp.data_length as usize;
    if len > data.len() {
        return Err(Error::PayloadMismatch {
            declared: rsp.data_length,
            actual: data.len(),
        });
    }

    let wire = rsp.encode();
    let spans: [&[u8]; 2] = [&wire, &data[..len]];
    write_vectored_full(channel, &spans, policy)
}
