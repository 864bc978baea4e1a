//! Node descriptors and their persisted record layout
//!
//! Each node occupies one fixed 80-byte little-endian record:
//!
//! ```text
//! offset  size  field
//!      0    24  reserved (always zero)
//!     24    16  addr (IPv6, IPv4 is stored mapped)
//!     40     2  port
//!     42     2  io_port
//!     44    16  io_addr
//!     60     2  nr_vnodes
//!     62     2  padding
//!     64     4  zone
//!     68     8  space
//!     76     4  reserved
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

/// Size of one persisted node record.
pub const NODE_RECORD_SIZE: usize = 80;

/// Leading slot that once held in-memory index state; never carries data.
const RESERVED_HEAD: usize = 24;
const RESERVED_TAIL: usize = 4;

/// One cluster member as of a given epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Address the node listens on for cluster traffic
    pub addr: IpAddr,
    pub port: u16,
    /// Dedicated data-path address, unspecified when shared with `addr`
    pub io_addr: IpAddr,
    pub io_port: u16,
    /// Virtual nodes placed on the hash ring
    pub nr_vnodes: u16,
    /// Failure domain
    pub zone: u32,
    /// Capacity contributed, in bytes
    pub space: u64,
}

impl Default for NodeDescriptor {
    fn default() -> Self {
        Self {
            addr: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            port: 0,
            io_addr: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            io_port: 0,
            nr_vnodes: 0,
            zone: 0,
            space: 0,
        }
    }
}

impl NodeDescriptor {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr: addr.ip(),
            port: addr.port(),
            ..Self::default()
        }
    }

    pub fn with_zone(mut self, zone: u32) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_vnodes(mut self, nr_vnodes: u16) -> Self {
        self.nr_vnodes = nr_vnodes;
        self
    }

    pub fn with_space(mut self, space: u64) -> Self {
        self.space = space;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }

    /// Append the persisted record to `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_bytes(0, RESERVED_HEAD);
        buf.put_slice(&ip_octets(self.addr));
        buf.put_u16_le(self.port);
        buf.put_u16_le(self.io_port);
        buf.put_slice(&ip_octets(self.io_addr));
        buf.put_u16_le(self.nr_vnodes);
        buf.put_u16_le(0);
        buf.put_u32_le(self.zone);
        buf.put_u64_le(self.space);
        buf.put_bytes(0, RESERVED_TAIL);
    }

    /// Decode one record. `buf` must hold at least [`NODE_RECORD_SIZE`] bytes.
    pub fn decode(buf: &mut impl Buf) -> Self {
        buf.advance(RESERVED_HEAD);
        let addr = get_ip(buf);
        let port = buf.get_u16_le();
        let io_port = buf.get_u16_le();
        let io_addr = get_ip(buf);
        let nr_vnodes = buf.get_u16_le();
        buf.advance(2);
        let zone = buf.get_u32_le();
        let space = buf.get_u64_le();
        buf.advance(RESERVED_TAIL);

        Self {
            addr,
            port,
            io_addr,
            io_port,
            nr_vnodes,
            zone,
            space,
        }
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())?;
        if self.io_port != 0 {
            write!(f, " (io {})", SocketAddr::new(self.io_addr, self.io_port))?;
        }
        Ok(())
    }
}

fn ip_octets(ip: IpAddr) -> [u8; 16] {
    match ip {
        IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
        IpAddr::V6(v6) => v6.octets(),
    }
}

fn get_ip(buf: &mut impl Buf) -> IpAddr {
    let mut octets = [0u8; 16];
    buf.copy_to_slice(&mut octets);
    Ipv6Addr::from(octets).to_canonical()
}
