//! Epoch log store
//!
//! Cluster membership history, one immutable file per epoch. Recovery and
//! placement logic read it; only a membership change writes to it.

pub mod log;
pub mod node;

pub use log::{parse_epoch_name, EpochLog, EpochRecord, EPOCH_NAME_WIDTH, TIMESTAMP_SIZE};
pub use node::{NodeDescriptor, NODE_RECORD_SIZE};
