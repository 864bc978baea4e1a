//! Wire protocol
//!
//! Request/response headers, opcodes, flags, object identifiers and the
//! cluster result-code vocabulary.

pub mod header;
pub mod oid;
pub mod result;

pub use header::{
    ObjectArgs, Opcode, RefArgs, RequestArgs, RequestFlags, RequestHeader, ResponseHeader,
    HEADER_SIZE, NODE_PROTO_VER, PROTO_VER, REQ_ARGS_SIZE, RSP_ARGS_SIZE,
};
pub use oid::Oid;
pub use result::ResultCode;
