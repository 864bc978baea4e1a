//! Object operations issued by this node

use tracing::{debug, error};

use super::executor::{LocalExecutor, RequestData};
use crate::proto::{Oid, Opcode, RequestFlags, RequestHeader, ResultCode};

/// Result of an object operation: success, or the cluster status code.
pub type OpResult = std::result::Result<(), ResultCode>;

/// Builds object requests and hands them to an executor.
#[derive(Debug, Clone)]
pub struct ObjectClient<E> {
    executor: E,
}

impl<E: LocalExecutor> ObjectClient<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Write `data` at `offset`, creating the object when `create` is set.
    pub fn write_object(&self, oid: Oid, data: &[u8], offset: u64, create: bool) -> OpResult {
        self.write(oid, data, offset, create, RequestFlags::empty())
    }

    /// Like [`Self::write_object`], replicated to the object's peers.
    pub fn write_object_fwd(&self, oid: Oid, data: &[u8], offset: u64, create: bool) -> OpResult {
        self.write(oid, data, offset, create, RequestFlags::FORWARD)
    }

    /// Read `buf.len()` bytes at `offset`.
    pub fn read_object(&self, oid: Oid, buf: &mut [u8], offset: u64) -> OpResult {
        self.read(oid, buf, offset, RequestFlags::empty())
    }

    /// Like [`Self::read_object`], served by a peer holding the object.
    pub fn read_object_fwd(&self, oid: Oid, buf: &mut [u8], offset: u64) -> OpResult {
        self.read(oid, buf, offset, RequestFlags::FORWARD)
    }

    pub fn remove_object(&self, oid: Oid) -> OpResult {
        let hdr = RequestHeader::object(Opcode::RemoveObj, oid, 0);
        let ret = self.executor.exec_local_req(&hdr, RequestData::None);
        if !ret.is_success() {
            error!("failed to remove object {}, {}", oid, ret);
        }
        ret.into_result()
    }

    /// Drop `count` references of `generation` to `data_oid`.
    ///
    /// A zero generation and count removes the object outright. Otherwise the
    /// decrement targets the object's ledger and is always forwarded.
    pub fn dec_object_refcnt(&self, data_oid: Oid, generation: u32, count: u32) -> OpResult {
        let ledger_oid = data_oid.to_ledger_oid();
        debug!("{}, {}, {}", data_oid, generation, count);

        if generation == 0 && count == 0 {
            return self.remove_object(data_oid);
        }

        let mut hdr = RequestHeader::reference(Opcode::DecrefObj, ledger_oid, generation, count);
        // decrements run in gateway threads and must not loop back through
        // the local work queue
        hdr.flags = RequestFlags::FORWARD;

        let ret = self.executor.exec_local_req(&hdr, RequestData::None);
        if !ret.is_success() {
            error!("failed to decrement reference {}, {}", ledger_oid, ret);
        }
        ret.into_result()
    }

    fn write(
        &self,
        oid: Oid,
        data: &[u8],
        offset: u64,
        create: bool,
        flags: RequestFlags,
    ) -> OpResult {
        let opcode = if create {
            Opcode::CreateAndWriteObj
        } else {
            Opcode::WriteObj
        };
        let mut hdr = RequestHeader::object(opcode, oid, offset);
        hdr.flags = RequestFlags::WRITE | flags;
        hdr.data_length = payload_length(oid, data.len())?;

        let ret = self.executor.exec_local_req(&hdr, RequestData::Write(data));
        if !ret.is_success() {
            error!("failed to write object {}, {}", oid, ret);
        }
        ret.into_result()
    }

    fn read(&self, oid: Oid, buf: &mut [u8], offset: u64, flags: RequestFlags) -> OpResult {
        let mut hdr = RequestHeader::object(Opcode::ReadObj, oid, offset);
        hdr.flags = flags;
        hdr.data_length = payload_length(oid, buf.len())?;

        let ret = self.executor.exec_local_req(&hdr, RequestData::Read(buf));
        if !ret.is_success() {
            error!("failed to read object {}, {}", oid, ret);
        }
        ret.into_result()
    }
}

/// Payload length as carried by the header, which holds 32 bits.
fn payload_length(oid: Oid, len: usize) -> Result<u32, ResultCode> {
    u32::try_from(len).map_err(|_| {
        error!("payload of {} bytes too large for object {}", len, oid);
        ResultCode::InvalidParms
    })
}
