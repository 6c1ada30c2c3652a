use crate::error::Result;
use async_trait::async_trait;

/// Logical tables of the canteen store. Each maps to its own keyspace
/// (a column family in RocksDB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Users,
    Products,
    Carts,
    CartItems,
    Orders,
    Transactions,
    StandSettings,
    Sequences,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Users,
        Table::Products,
        Table::Carts,
        Table::CartItems,
        Table::Orders,
        Table::Transactions,
        Table::StandSettings,
        Table::Sequences,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Products => "products",
            Table::Carts => "carts",
            Table::CartItems => "cart_items",
            Table::Orders => "orders",
            Table::Transactions => "transactions",
            Table::StandSettings => "stand_settings",
            Table::Sequences => "sequences",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put {
        table: Table,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        table: Table,
        key: Vec<u8>,
    },
}

/// Durable key-value storage underneath the canteen records.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    async fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Returns every entry whose key starts with `prefix`, in key order.
    async fn scan_prefix(&self, table: Table, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Applies all operations atomically: either every write lands or none does.
    async fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()>;
}

pub type StorageEngineBox = Box<dyn StorageEngine>;
