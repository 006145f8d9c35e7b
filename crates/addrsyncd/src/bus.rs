//! Application-bus table boundary.

use crate::error::BusError;
use parking_lot::Mutex;
use redis::Commands;
use std::collections::BTreeMap;
use tracing::info;

/// One published table on the application bus.
pub trait AppStateTable: Send + Sync {
    /// Publishes (or replaces) a record.
    fn set(&self, key: &str, fvs: &[(String, String)]) -> Result<(), BusError>;

    /// Withdraws a record.
    fn del(&self, key: &str) -> Result<(), BusError>;
}

/// In-memory table backing tests.
#[derive(Debug, Default)]
pub struct MemoryTable {
    entries: Mutex<BTreeMap<String, Vec<(String, String)>>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a record's fields, if published.
    pub fn get(&self, key: &str) -> Option<Vec<(String, String)>> {
        self.entries.lock().get(key).cloned()
    }

    /// Returns all published keys.
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Returns the number of published records.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is published.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl AppStateTable for MemoryTable {
    fn set(&self, key: &str, fvs: &[(String, String)]) -> Result<(), BusError> {
        self.entries.lock().insert(key.to_string(), fvs.to_vec());
        Ok(())
    }

    fn del(&self, key: &str) -> Result<(), BusError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Bus-backed table: records are hashes under `"<table>:<key>"`.
pub struct RedisTable {
    connection: Mutex<redis::Connection>,
    table: String,
}

impl RedisTable {
    /// Connects to the bus and binds to a table name.
    pub fn connect(url: &str, table: impl Into<String>) -> Result<Self, BusError> {
        let client =
            redis::Client::open(url).map_err(|e| BusError::Connection(e.to_string()))?;
        let connection = client
            .get_connection()
            .map_err(|e| BusError::Connection(e.to_string()))?;

        let table = table.into();
        info!(url, table, "connected to application bus");

        Ok(Self {
            connection: Mutex::new(connection),
            table,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.table, key)
    }
}

impl AppStateTable for RedisTable {
    fn set(&self, key: &str, fvs: &[(String, String)]) -> Result<(), BusError> {
        let full_key = self.full_key(key);
        self.connection
            .lock()
            .hset_multiple::<_, _, _, ()>(&full_key, fvs)
            .map_err(|e| BusError::Command(e.to_string()))
    }

    fn del(&self, key: &str) -> Result<(), BusError> {
        let full_key = self.full_key(key);
        self.connection
            .lock()
            .del::<_, ()>(&full_key)
            .map_err(|e| BusError::Command(e.to_string()))
    }
}
