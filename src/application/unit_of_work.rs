use crate::domain::cart::{Cart, CartId, CartItem, CartItemId};
use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{StorageEngine, StorageEngineBox, Table, WriteOp};
use crate::domain::product::{Product, ProductId};
use crate::domain::stand::StandSettings;
use crate::domain::transaction::Transaction;
use crate::domain::user::{StandId, User, UserId};
use crate::error::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Id sequences allocated inside a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Cart,
    CartItem,
    Order,
    Transaction,
}

impl Sequence {
    fn key(&self) -> &'static [u8] {
        match self {
            Sequence::Cart => b"cart",
            Sequence::CartItem => b"cart_item",
            Sequence::Order => b"order",
            Sequence::Transaction => b"transaction",
        }
    }
}

fn id_key(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

fn compound_key(parent: u64, child: u64) -> Vec<u8> {
    let mut key = id_key(parent);
    key.extend_from_slice(&child.to_be_bytes());
    key
}

/// Shared handle to the canteen store.
///
/// All reads that decide a write go through a [`UnitOfWork`], and at most one
/// unit of work is open at a time, so two checkouts racing for the last unit
/// of stock are serialized.
#[derive(Clone)]
pub struct Database {
    engine: Arc<dyn StorageEngine>,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    pub fn new(engine: StorageEngineBox) -> Self {
        Self {
            engine: Arc::from(engine),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Opens a unit of work, waiting for any other one to finish first.
    pub async fn begin(&self) -> UnitOfWork {
        let guard = self.write_lock.clone().lock_owned().await;
        UnitOfWork {
            engine: Arc::clone(&self.engine),
            staged: BTreeMap::new(),
            _guard: guard,
        }
    }
}

/// An isolated, all-or-nothing batch of reads and writes.
///
/// Writes are staged in memory and become visible to this unit immediately;
/// other units only see them after [`UnitOfWork::commit`]. Dropping a unit
/// without committing discards everything it staged.
pub struct UnitOfWork {
    engine: Arc<dyn StorageEngine>,
    staged: BTreeMap<(Table, Vec<u8>), Option<Vec<u8>>>,
    _guard: OwnedMutexGuard<()>,
}

impl UnitOfWork {
    pub async fn commit(self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let ops = self
            .staged
            .into_iter()
            .map(|((table, key), value)| match value {
                Some(value) => WriteOp::Put { table, key, value },
                None => WriteOp::Delete { table, key },
            })
            .collect();
        self.engine.write_batch(ops).await
    }

    async fn get_raw(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = self.staged.get(&(table, key.to_vec())) {
            return Ok(staged.clone());
        }
        self.engine.get(table, key).await
    }

    async fn scan_raw(&self, table: Table, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .engine
            .scan_prefix(table, prefix)
            .await?
            .into_iter()
            .collect();

        for ((staged_table, key), value) in &self.staged {
            if *staged_table != table || !key.starts_with(prefix) {
                continue;
            }
            match value {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }

        Ok(merged.into_values().collect())
    }

    async fn load<T: DeserializeOwned>(&self, table: Table, key: &[u8]) -> Result<Option<T>> {
        match self.get_raw(table, key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_all<T: DeserializeOwned>(&self, table: Table, prefix: &[u8]) -> Result<Vec<T>> {
        self.scan_raw(table, prefix)
            .await?
            .iter()
            .map(|bytes| Ok(serde_json::from_slice(bytes)?))
            .collect()
    }

    fn stage<T: Serialize>(&mut self, table: Table, key: Vec<u8>, record: &T) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.staged.insert((table, key), Some(bytes));
        Ok(())
    }

    fn stage_delete(&mut self, table: Table, key: Vec<u8>) {
        self.staged.insert((table, key), None);
    }

    pub async fn next_id(&mut self, sequence: Sequence) -> Result<u64> {
        let key = sequence.key().to_vec();
        let current: u64 = self.load(Table::Sequences, &key).await?.unwrap_or(0);
        let next = current + 1;
        self.stage(Table::Sequences, key, &next)?;
        Ok(next)
    }

    pub async fn user(&self, id: UserId) -> Result<Option<User>> {
        self.load(Table::Users, &id_key(id)).await
    }

    pub async fn users(&self) -> Result<Vec<User>> {
        self.load_all(Table::Users, &[]).await
    }

    pub fn put_user(&mut self, user: &User) -> Result<()> {
        self.stage(Table::Users, id_key(user.id), user)
    }

    pub async fn product(&self, id: ProductId) -> Result<Option<Product>> {
        self.load(Table::Products, &id_key(id)).await
    }

    pub fn put_product(&mut self, product: &Product) -> Result<()> {
        self.stage(Table::Products, id_key(product.id), product)
    }

    /// Carts are keyed by their owner, which enforces one cart per user.
    pub async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>> {
        self.load(Table::Carts, &id_key(user_id)).await
    }

    pub fn put_cart(&mut self, cart: &Cart) -> Result<()> {
        self.stage(Table::Carts, id_key(cart.user_id), cart)
    }

    pub async fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>> {
        self.load_all(Table::CartItems, &id_key(cart_id)).await
    }

    pub fn put_cart_item(&mut self, item: &CartItem) -> Result<()> {
        self.stage(Table::CartItems, compound_key(item.cart_id, item.id), item)
    }

    pub fn delete_cart_item(&mut self, cart_id: CartId, item_id: CartItemId) {
        self.stage_delete(Table::CartItems, compound_key(cart_id, item_id));
    }

    pub async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        self.load(Table::Orders, &id_key(id)).await
    }

    /// Every order row, soft-deleted ones included, in id order.
    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.load_all(Table::Orders, &[]).await
    }

    pub fn put_order(&mut self, order: &Order) -> Result<()> {
        self.stage(Table::Orders, id_key(order.id), order)
    }

    pub async fn transactions_for_user(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        self.load_all(Table::Transactions, &id_key(user_id)).await
    }

    /// Ledger entries are append-only: there is no update or delete.
    pub fn append_transaction(&mut self, tx: &Transaction) -> Result<()> {
        self.stage(Table::Transactions, compound_key(tx.user_id, tx.id), tx)
    }

    pub async fn stand_settings(&self, stand_id: StandId) -> Result<Option<StandSettings>> {
        self.load(Table::StandSettings, &id_key(stand_id)).await
    }

    pub fn put_stand_settings(&mut self, settings: &StandSettings) -> Result<()> {
        self.stage(Table::StandSettings, id_key(settings.stand_id), settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::infrastructure::in_memory::InMemoryStorage;

    fn database() -> Database {
        Database::new(Box::new(InMemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let db = database();
        {
            let mut uow = db.begin().await;
            uow.put_user(&User::new(1, "Budi", Role::Student)).unwrap();
            assert!(uow.user(1).await.unwrap().is_some());
        }

        let uow = db.begin().await;
        assert!(uow.user(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let db = database();
        let mut uow = db.begin().await;
        uow.put_user(&User::new(1, "Budi", Role::Student)).unwrap();
        uow.commit().await.unwrap();

        let uow = db.begin().await;
        assert_eq!(uow.user(1).await.unwrap().unwrap().name, "Budi");
        assert_eq!(uow.users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_sees_staged_inserts_and_deletes() {
        let db = database();
        let item = |id| CartItem {
            id,
            cart_id: 4,
            product_id: id,
            product_name: "Es Teh".to_string(),
            quantity: 1,
            price: rust_decimal::Decimal::ONE,
            subtotal: rust_decimal::Decimal::ONE,
            stand_id: 10,
        };

        let mut uow = db.begin().await;
        uow.put_cart_item(&item(1)).unwrap();
        uow.put_cart_item(&item(2)).unwrap();
        uow.commit().await.unwrap();

        let mut uow = db.begin().await;
        uow.delete_cart_item(4, 1);
        uow.put_cart_item(&item(3)).unwrap();
        let ids: Vec<_> = uow
            .cart_items(4)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(uow.cart_items(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sequences_are_monotonic() {
        let db = database();
        let mut uow = db.begin().await;
        assert_eq!(uow.next_id(Sequence::Order).await.unwrap(), 1);
        assert_eq!(uow.next_id(Sequence::Order).await.unwrap(), 2);
        assert_eq!(uow.next_id(Sequence::Cart).await.unwrap(), 1);
        uow.commit().await.unwrap();

        let mut uow = db.begin().await;
        assert_eq!(uow.next_id(Sequence::Order).await.unwrap(), 3);
    }
}
