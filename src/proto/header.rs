//! Fixed-size request and response headers
//!
//! Both headers occupy [`HEADER_SIZE`] bytes on the wire so a receiver can
//! read a response into the same scratch space the request was built in.
//! All integers are little-endian.
//!
//! ```text
//!  0      1       2        4        8       12            16                48
//!  ┌──────┬───────┬────────┬────────┬───────┬─────────────┬─────────────────┐
//!  │ ver  │opcode │ flags  │ epoch  │  id   │ data_length │ op-specific     │  request
//!  └──────┴───────┴────────┴────────┴───────┴─────────────┴─────────────────┘
//!  ┌──────┬───────┬────────┬────────┬───────┬─────────────┬────────┬────────┐
//!  │ ver  │opcode │ flags  │ epoch  │  id   │ data_length │ result │ op-spec│  response
//!  └──────┴───────┴────────┴────────┴───────┴─────────────┴────────┴────────┘
//! ```

use bytes::{Buf, BufMut};

use super::oid::Oid;
use super::result::ResultCode;

/// Wire size shared by request and response headers.
pub const HEADER_SIZE: usize = 48;

/// Size of the operation-specific area of a request.
pub const REQ_ARGS_SIZE: usize = 32;

/// Size of the operation-specific area of a response.
pub const RSP_ARGS_SIZE: usize = 28;

/// Client protocol version
pub const PROTO_VER: u8 = 0x02;

/// Node-to-node protocol version
pub const NODE_PROTO_VER: u8 = 0x09;

// =============================================================================
// Opcodes
// =============================================================================

/// Request opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    CreateAndWriteObj,
    ReadObj,
    WriteObj,
    RemoveObj,
    DecrefObj,
    /// Opcode handled outside this crate
    Other(u8),
}

impl Opcode {
    pub const fn as_u8(self) -> u8 {
        match self {
            Opcode::CreateAndWriteObj => 0x01,
            Opcode::ReadObj => 0x02,
            Opcode::WriteObj => 0x03,
            Opcode::RemoveObj => 0x04,
            Opcode::DecrefObj => 0x05,
            Opcode::Other(raw) => raw,
        }
    }

    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0x01 => Opcode::CreateAndWriteObj,
            0x02 => Opcode::ReadObj,
            0x03 => Opcode::WriteObj,
            0x04 => Opcode::RemoveObj,
            0x05 => Opcode::DecrefObj,
            other => Opcode::Other(other),
        }
    }

    /// Opcodes whose argument area is [`ObjectArgs`].
    pub const fn is_object_op(self) -> bool {
        matches!(
            self,
            Opcode::CreateAndWriteObj | Opcode::ReadObj | Opcode::WriteObj | Opcode::RemoveObj
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04x}", self.as_u8())
    }
}

// =============================================================================
// Flags
// =============================================================================

/// Request flag bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RequestFlags(u16);

impl RequestFlags {
    /// Request carries a payload of `data_length` bytes
    pub const WRITE: RequestFlags = RequestFlags(0x01);
    /// Copy-on-write from `cow_oid`
    pub const COW: RequestFlags = RequestFlags(0x02);
    /// Bypass any object cache
    pub const DIRECT: RequestFlags = RequestFlags(0x08);
    /// Response reuses the request payload length to return data
    pub const PIGGYBACK: RequestFlags = RequestFlags(0x10);
    /// Relay to replica nodes
    pub const FORWARD: RequestFlags = RequestFlags(0x20);

    pub const fn empty() -> Self {
        RequestFlags(0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn from_bits(bits: u16) -> Self {
        RequestFlags(bits)
    }

    pub const fn contains(self, other: RequestFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: RequestFlags) {
        self.0 |= other.0;
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for RequestFlags {
    type Output = RequestFlags;

    fn bitor(self, rhs: RequestFlags) -> RequestFlags {
        RequestFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for RequestFlags {
    fn bitor_assign(&mut self, rhs: RequestFlags) {
        self.0 |= rhs.0;
    }
}

// =============================================================================
// Operation-specific arguments
// =============================================================================

/// Arguments of object read/write/remove requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectArgs {
    pub oid: Oid,
    pub cow_oid: Oid,
    pub copies: u8,
    pub copy_policy: u8,
    pub ec_index: u8,
    pub tgt_epoch: u32,
    pub offset: u64,
}

/// Arguments of reference-count requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefArgs {
    pub oid: Oid,
    pub generation: u32,
    pub count: u32,
}

/// Operation-specific area of a request, interpreted according to the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestArgs {
    Object(ObjectArgs),
    Reference(RefArgs),
    Raw([u8; REQ_ARGS_SIZE]),
}

impl RequestArgs {
    /// Zeroed arguments of the shape `opcode` expects.
    pub fn for_opcode(opcode: Opcode) -> Self {
        match opcode {
            Opcode::DecrefObj => RequestArgs::Reference(RefArgs::default()),
            op if op.is_object_op() => RequestArgs::Object(ObjectArgs::default()),
            _ => RequestArgs::Raw([0; REQ_ARGS_SIZE]),
        }
    }

    fn encode(&self, mut out: &mut [u8]) {
        match self {
            RequestArgs::Object(args) => {
                out.put_u64_le(args.oid.as_u64());
                out.put_u64_le(args.cow_oid.as_u64());
                out.put_u8(args.copies);
                out.put_u8(args.copy_policy);
                out.put_u8(args.ec_index);
                out.put_u8(0);
                out.put_u32_le(args.tgt_epoch);
                out.put_u64_le(args.offset);
            }
            RequestArgs::Reference(args) => {
                out.put_u64_le(args.oid.as_u64());
                out.put_u32_le(args.generation);
                out.put_u32_le(args.count);
                out.put_bytes(0, REQ_ARGS_SIZE - 16);
            }
            RequestArgs::Raw(raw) => out.put_slice(raw),
        }
    }

    fn decode(opcode: Opcode, mut input: &[u8]) -> Self {
        match opcode {
            Opcode::DecrefObj => RequestArgs::Reference(RefArgs {
                oid: Oid(input.get_u64_le()),
                generation: input.get_u32_le(),
                count: input.get_u32_le(),
            }),
            op if op.is_object_op() => {
                let oid = Oid(input.get_u64_le());
                let cow_oid = Oid(input.get_u64_le());
                let copies = input.get_u8();
                let copy_policy = input.get_u8();
                let ec_index = input.get_u8();
                input.advance(1);
                RequestArgs::Object(ObjectArgs {
                    oid,
                    cow_oid,
                    copies,
                    copy_policy,
                    ec_index,
                    tgt_epoch: input.get_u32_le(),
                    offset: input.get_u64_le(),
                })
            }
            _ => {
                let mut raw = [0u8; REQ_ARGS_SIZE];
                input.copy_to_slice(&mut raw);
                RequestArgs::Raw(raw)
            }
        }
    }
}

// =============================================================================
// Request Header
// =============================================================================

/// Fixed-layout request header.
///
/// `data_length` is the size of the payload that follows the header when
/// [`RequestFlags::WRITE`] is set, and the size of the expected response
/// payload otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub proto_ver: u8,
    pub opcode: Opcode,
    pub flags: RequestFlags,
    pub epoch: u32,
    pub id: u32,
    pub data_length: u32,
    pub args: RequestArgs,
}

impl RequestHeader {
    /// Zeroed header for `opcode` at the client protocol version.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            proto_ver: PROTO_VER,
            opcode,
            flags: RequestFlags::empty(),
            epoch: 0,
            id: 0,
            data_length: 0,
            args: RequestArgs::for_opcode(opcode),
        }
    }

    /// Object request addressing `oid` at `offset`.
    pub fn object(opcode: Opcode, oid: Oid, offset: u64) -> Self {
        let mut hdr = Self::new(opcode);
        hdr.args = RequestArgs::Object(ObjectArgs {
            oid,
            offset,
            ..ObjectArgs::default()
        });
        hdr
    }

    /// Reference-count request against a ledger object.
    pub fn reference(opcode: Opcode, oid: Oid, generation: u32, count: u32) -> Self {
        let mut hdr = Self::new(opcode);
        hdr.args = RequestArgs::Reference(RefArgs {
            oid,
            generation,
            count,
        });
        hdr
    }

    pub fn object_args(&self) -> Option<&ObjectArgs> {
        match &self.args {
            RequestArgs::Object(args) => Some(args),
            _ => None,
        }
    }

    pub fn ref_args(&self) -> Option<&RefArgs> {
        match &self.args {
            RequestArgs::Reference(args) => Some(args),
            _ => None,
        }
    }

    /// Target object of this request, if it addresses one.
    pub fn oid(&self) -> Option<Oid> {
        match &self.args {
            RequestArgs::Object(args) => Some(args.oid),
            RequestArgs::Reference(args) => Some(args.oid),
            RequestArgs::Raw(_) => None,
        }
    }

    /// Bytes sent after the header, and bytes expected after the response header.
    pub fn transfer_lengths(&self) -> (u32, u32) {
        if self.flags.contains(RequestFlags::WRITE) {
            let rlen = if self.flags.contains(RequestFlags::PIGGYBACK) {
                self.data_length
            } else {
                0
            };
            (self.data_length, rlen)
        } else {
            (0, self.data_length)
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut out = &mut buf[..];
        out.put_u8(self.proto_ver);
        out.put_u8(self.opcode.as_u8());
        out.put_u16_le(self.flags.bits());
        out.put_u32_le(self.epoch);
        out.put_u32_le(self.id);
        out.put_u32_le(self.data_length);
        self.args.encode(out);
        buf
    }

    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Self {
        let mut input = &buf[..];
        let proto_ver = input.get_u8();
        let opcode = Opcode::from_u8(input.get_u8());
        let flags = RequestFlags::from_bits(input.get_u16_le());
        let epoch = input.get_u32_le();
        let id = input.get_u32_le();
        let data_length = input.get_u32_le();
        Self {
            proto_ver,
            opcode,
            flags,
            epoch,
            id,
            data_length,
            args: RequestArgs::decode(opcode, input),
        }
    }
}

// =============================================================================
// Response Header
// =============================================================================

/// Fixed-layout response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub proto_ver: u8,
    pub opcode: Opcode,
    pub flags: RequestFlags,
    pub epoch: u32,
    pub id: u32,
    /// Payload bytes following this header
    pub data_length: u32,
    pub result: ResultCode,
    pub args: [u8; RSP_ARGS_SIZE],
}

impl ResponseHeader {
    /// Response to `req` with no payload.
    pub fn for_request(req: &RequestHeader, result: ResultCode) -> Self {
        Self {
            proto_ver: req.proto_ver,
            opcode: req.opcode,
            flags: req.flags,
            epoch: req.epoch,
            id: req.id,
            data_length: 0,
            result,
            args: [0; RSP_ARGS_SIZE],
        }
    }

    pub fn with_data_length(mut self, data_length: u32) -> Self {
        self.data_length = data_length;
        self
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut out = &mut buf[..];
        out.put_u8(self.proto_ver);
        out.put_u8(self.opcode.as_u8());
        out.put_u16_le(self.flags.bits());
        out.put_u32_le(self.epoch);
        out.put_u32_le(self.id);
        out.put_u32_le(self.data_length);
        out.put_u32_le(self.result.as_u32());
        out.put_slice(&self.args);
        buf
    }

    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Self {
        let mut input = &buf[..];
        let proto_ver = input.get_u8();
        let opcode = Opcode::from_u8(input.get_u8());
        let flags = RequestFlags::from_bits(input.get_u16_le());
        let epoch = input.get_u32_le();
        let id = input.get_u32_le();
        let data_length = input.get_u32_le();
        let result = ResultCode::from_u32(input.get_u32_le());
        let mut args = [0u8; RSP_ARGS_SIZE];
        input.copy_to_slice(&mut args);
        Self {
            proto_ver,
            opcode,
            flags,
            epoch,
            id,
            data_length,
            result,
            args,
        }
    }
}
