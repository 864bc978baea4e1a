//! Object operation client
//!
//! [`ObjectClient`] turns write/read/remove/decref calls into request
//! headers and runs them through a [`LocalExecutor`]. [`NetworkExecutor`]
//! is the executor that relays them to a peer over a channel.

pub mod executor;
pub mod object;

pub use executor::{LocalExecutor, NetworkExecutor, RequestData};
pub use object::{ObjectClient, OpResult};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::mock::MockChannel;
    use crate::net::ClusterEpoch;
    use crate::proto::{
        Oid, Opcode, RequestFlags, RequestHeader, ResponseHeader, ResultCode, HEADER_SIZE,
    };
    use std::io;

    fn reply(req: &RequestHeader, result: ResultCode, payload: &[u8]) -> Vec<u8> {
        let mut out = ResponseHeader::for_request(req, result)
            .with_data_length(payload.len() as u32)
            .encode()
            .to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_network_read_stamps_epoch() {
        let mut req = RequestHeader::object(Opcode::ReadObj, Oid(5), 0);
        req.data_length = 4;
        let channel = MockChannel::with_input(reply(&req, ResultCode::Success, b"data"));

        let client = ObjectClient::new(NetworkExecutor::new(channel, ClusterEpoch::new(11)));
        let mut buf = [0u8; 4];
        client.read_object(Oid(5), &mut buf, 0).unwrap();
        assert_eq!(&buf, b"data");

        let channel = client.into_executor().into_inner().unwrap();
        let sent = channel.output();
        let hdr = RequestHeader::decode(sent[..HEADER_SIZE].try_into().unwrap());
        assert_eq!(hdr.epoch, 11);
    }

    #[test]
    fn test_network_failure_is_network_error() {
        let channel = MockChannel::default().always_fail(io::ErrorKind::BrokenPipe);
        let client = ObjectClient::new(NetworkExecutor::new(channel, ClusterEpoch::new(1)));
        assert_eq!(
            client.write_object(Oid(1), b"abc", 0, true),
            Err(ResultCode::NetworkError)
        );
    }

    #[test]
    fn test_remote_status_passed_through() {
        let req = RequestHeader::object(Opcode::RemoveObj, Oid(5), 0);
        let channel = MockChannel::with_input(reply(&req, ResultCode::NoObj, &[]));
        let client = ObjectClient::new(NetworkExecutor::new(channel, ClusterEpoch::new(1)));
        assert_eq!(client.remove_object(Oid(5)), Err(ResultCode::NoObj));
    }

    #[test]
    fn test_failed_exchange_drops_channel() {
        let first = RequestHeader::object(Opcode::RemoveObj, Oid(0xA), 0);
        let second = RequestHeader::object(Opcode::RemoveObj, Oid(0xB), 0);
        let mut input = reply(&first, ResultCode::NoObj, &[]);
        input.extend(reply(&second, ResultCode::Success, &[]));

        // the first response arrives too late for its request
        let channel = MockChannel::with_input(input).fail_reads(io::ErrorKind::WouldBlock, 1);
        let executor = NetworkExecutor::new(channel, ClusterEpoch::new(1)).with_max_retries(0);
        let client = ObjectClient::new(executor);

        assert_eq!(client.remove_object(Oid(0xA)), Err(ResultCode::NetworkError));
        assert!(client.executor().is_broken());

        // the stale NoObj must never be reported for the second remove
        assert_eq!(client.remove_object(Oid(0xB)), Err(ResultCode::NetworkError));

        let fresh = MockChannel::with_input(reply(&second, ResultCode::Success, &[]));
        assert!(client.executor().replace_channel(fresh).is_none());
        assert!(!client.executor().is_broken());
        assert_eq!(client.remove_object(Oid(0xB)), Ok(()));
    }

    #[test]
    fn test_rejected_payload_keeps_channel() {
        let executor = NetworkExecutor::new(MockChannel::default(), ClusterEpoch::new(1));
        let mut hdr = RequestHeader::object(Opcode::ReadObj, Oid(1), 0);
        hdr.data_length = 64;

        let code = executor.exec_local_req(&hdr, RequestData::Read(&mut [0u8; 8]));
        assert_eq!(code, ResultCode::InvalidParms);
        assert!(!executor.is_broken());
        assert_eq!(executor.into_inner().unwrap().write_calls(), 0);
    }

    #[test]
    fn test_piggyback_write_reply_is_drained() {
        let mut write = RequestHeader::object(Opcode::WriteObj, Oid(3), 0);
        write.flags = RequestFlags::WRITE | RequestFlags::PIGGYBACK;
        write.data_length = 4;
        let remove = RequestHeader::object(Opcode::RemoveObj, Oid(3), 0);

        let mut input = reply(&write, ResultCode::Success, b"ABCD");
        input.extend(reply(&remove, ResultCode::NoObj, &[]));
        let executor = NetworkExecutor::new(MockChannel::with_input(input), ClusterEpoch::new(1));

        let code = executor.exec_local_req(&write, RequestData::Write(b"abcd"));
        assert_eq!(code, ResultCode::Success);
        let code = executor.exec_local_req(&remove, RequestData::None);
        assert_eq!(code, ResultCode::NoObj);

        let channel = executor.into_inner().unwrap();
        assert_eq!(&channel.output()[HEADER_SIZE..HEADER_SIZE + 4], b"abcd");
    }
}
