//! Backend store drivers
//!
//! Drivers register by name. Which one a node runs is recorded in a fixed
//! 16-byte NUL-terminated name field, either node-local or the cluster-wide
//! default.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Width of a persisted store name, terminator included.
pub const STORE_NAME_LEN: usize = 16;

/// A backend that keeps object data on local disks.
pub trait StoreDriver: Send + Sync {
    fn name(&self) -> &str;

    /// Prepare the backend for serving I/O.
    fn init(&self) -> Result<()>;
}

/// Encode `name` into a persisted name field.
///
/// Returns `None` if it does not fit with its terminator.
pub fn store_name(name: &str) -> Option<[u8; STORE_NAME_LEN]> {
    if name.len() >= STORE_NAME_LEN || name.as_bytes().contains(&0) {
        return None;
    }
    let mut field = [0u8; STORE_NAME_LEN];
    field[..name.len()].copy_from_slice(name.as_bytes());
    Some(field)
}

/// Known drivers, looked up by name.
#[derive(Default, Clone)]
pub struct StoreDriverRegistry {
    drivers: Vec<Arc<dyn StoreDriver>>,
}

impl fmt::Debug for StoreDriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreDriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

impl StoreDriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a driver. Lookups return the first one registered under a name.
    pub fn register(&mut self, driver: Arc<dyn StoreDriver>) {
        debug!(name = driver.name(), "store driver registered");
        self.drivers.push(driver);
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn StoreDriver>> {
        self.drivers.iter().find(|d| d.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.drivers.iter().map(|d| d.name()).collect()
    }

    /// Resolve, and unless this is a gateway initialize, the node's driver.
    ///
    /// The node-local name wins over the cluster default. An empty name means
    /// the node never joined a cluster and yields `Ok(None)`.
    ///
    /// # Panics
    ///
    /// If the chosen name field has no NUL terminator.
    pub fn init_store_driver(
        &self,
        node_store: &[u8; STORE_NAME_LEN],
        cluster_default: &[u8; STORE_NAME_LEN],
        is_gateway: bool,
    ) -> Result<Option<Arc<dyn StoreDriver>>> {
        let field = if node_store[0] != 0 {
            node_store
        } else {
            cluster_default
        };

        let Some(end) = field.iter().position(|&b| b == 0) else {
            panic!("store name not NUL terminated: {:?}", field);
        };
        if end == 0 {
            return Ok(None);
        }

        let name = String::from_utf8_lossy(&field[..end]).into_owned();
        let Some(driver) = self.find(&name) else {
            debug!("store {} not found", name);
            return Err(Error::NoStore(name));
        };

        if !is_gateway {
            driver.init().map_err(|e| Error::StoreInit {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            info!(store = %name, "store driver initialized");
        }
        Ok(Some(driver))
    }
}
