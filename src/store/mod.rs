//! Object store addressing and lifecycle
//!
//! # Architecture
//!
//! ```text
//! <base>/
//! ├── lock          BaseDirLock (one daemon per base)
//! ├── config        NodeConfig (advertised space)
//! ├── epoch/        EpochLog
//! └── obj/          object root when no dedicated disks are given
//!
//! <disk N>/<%016x>  one file per object, disk chosen by oid hash
//! ```
//!
//! Everything here runs on the storage side of a request: resolving an oid
//! to its file, choosing open flags, and turning errno values into result
//! codes.

pub mod config;
pub mod discard;
pub mod driver;
pub mod errors;
pub mod iocb;
pub mod lock;
pub mod space;

pub use config::{init_base_path, StoreOptions, StorePaths, DIR_MODE};
pub use discard::discard;
pub use driver::{store_name, StoreDriver, StoreDriverRegistry, STORE_NAME_LEN};
pub use errors::{map_io_error, DiskHealth, DiskHealthTracker};
pub use iocb::{prepare_io, IoBuffer, IoControlBlock, OpenFlags, SECTOR_SIZE};
pub use lock::BaseDirLock;
pub use space::{free_space, resolve_disk_space, NodeConfig};
