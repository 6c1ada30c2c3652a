use crate::domain::ports::{StorageEngine, Table, WriteOp};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

type Keyspace = BTreeMap<Vec<u8>, Vec<u8>>;

/// A thread-safe in-memory storage engine.
///
/// Uses `Arc<RwLock<..>>` so clones share the same data. Each table is an
/// ordered map, which keeps prefix scans in key order. Ideal for tests and
/// for runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<HashMap<Table, Keyspace>>>,
}

impl InMemoryStorage {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageEngine for InMemoryStorage {
    async fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let tables = self.tables.read().await;
        Ok(tables.get(&table).and_then(|space| space.get(key)).cloned())
    }

    async fn scan_prefix(&self, table: Table, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let tables = self.tables.read().await;
        let Some(space) = tables.get(&table) else {
            return Ok(Vec::new());
        };
        Ok(space
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        // A single write guard makes the whole batch visible at once.
        let mut tables = self.tables.write().await;
        for op in ops {
            match op {
                WriteOp::Put { table, key, value } => {
                    tables.entry(table).or_default().insert(key, value);
                }
                WriteOp::Delete { table, key } => {
                    if let Some(space) = tables.get_mut(&table) {
                        space.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}
