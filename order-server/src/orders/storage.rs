//! redb-based storage layer for orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Authoritative order records |
//! | `open_orders` | `order_id` | `()` | Index of non-terminal orders |
//! | `order_numbers` | `order_number` | `order_id` | Uniqueness constraint |
//! | `sequence_counters` | `YYYYMMDD` | `u64` | Per-day order number counter |
//! | `meta` | `"seq"` | `u64` | Global change sequence |
//!
//! # Concurrency
//!
//! redb admits one write transaction at a time. Every mutation here reads,
//! checks and writes inside a single write transaction, so a conditional
//! update cannot interleave with another writer and a counter increment is
//! an atomic increment-and-fetch.

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// key = order_id, value = empty (existence check)
const OPEN_ORDERS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("open_orders");

/// key = order_number, value = order_id
const ORDER_NUMBERS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("order_numbers");

/// key = YYYYMMDD, value = last issued number of that day
const SEQUENCE_COUNTERS_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("sequence_counters");

/// key = "seq", value = u64
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const CHANGE_SEQUENCE_KEY: &str = "seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already exists: {0}")]
    DuplicateOrderId(String),

    #[error("Order number already issued: {0}")]
    DuplicateOrderNumber(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// What a conditional update should do with the current record
#[derive(Debug, Clone)]
pub enum UpdateDecision {
    /// Persist this new state
    Write(Order),
    /// Already in the desired state; write nothing
    Keep,
    /// Current state does not allow the change
    Reject,
}

/// Result of [`OrderStorage::update_if`]
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Written { previous: Order, current: Order },
    Kept(Order),
    Rejected(Order),
}

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the write survives a power loss.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(OPEN_ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_NUMBERS_TABLE)?;
            let _ = write_txn.open_table(SEQUENCE_COUNTERS_TABLE)?;

            let mut meta = write_txn.open_table(META_TABLE)?;
            if meta.get(CHANGE_SEQUENCE_KEY)?.is_none() {
                meta.insert(CHANGE_SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Change Sequence ==========

    fn bump_change_sequence(txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(META_TABLE)?;
        let current = table
            .get(CHANGE_SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(CHANGE_SEQUENCE_KEY, next)?;
        Ok(next)
    }

    fn read_change_sequence(txn: &ReadTransaction) -> StorageResult<u64> {
        let table = txn.open_table(META_TABLE)?;
        Ok(table
            .get(CHANGE_SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Sequence of the latest committed write
    pub fn current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        Self::read_change_sequence(&read_txn)
    }

    // ========== Day Counters ==========

    /// Increment the counter for `day` (creating it at 0) and return the new value
    pub fn increment_day_counter(&self, day: &str) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let next = {
            let mut table = txn.open_table(SEQUENCE_COUNTERS_TABLE)?;
            let current = table.get(day)?.map(|g| g.value()).unwrap_or(0);
            let next = current + 1;
            table.insert(day, next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }

    /// Last number issued for `day` (0 if none)
    pub fn day_counter(&self, day: &str) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_COUNTERS_TABLE)?;
        Ok(table.get(day)?.map(|g| g.value()).unwrap_or(0))
    }

    // ========== Orders ==========

    fn load_order(txn: &WriteTransaction, order_id: &str) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn store_order(txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let bytes = serde_json::to_vec(order)?;
        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            table.insert(order.id.as_str(), bytes.as_slice())?;
        }
        let mut open = txn.open_table(OPEN_ORDERS_TABLE)?;
        if order.is_open() {
            open.insert(order.id.as_str(), ())?;
        } else {
            open.remove(order.id.as_str())?;
        }
        Ok(())
    }

    /// Insert a new order
    ///
    /// Assigns `last_sequence` from the global change sequence and returns the
    /// stored record. Fails without writing anything if the id or the order
    /// number is already taken.
    pub fn insert_order(&self, order: &Order) -> StorageResult<Order> {
        let txn = self.db.begin_write()?;

        if Self::load_order(&txn, &order.id)?.is_some() {
            return Err(StorageError::DuplicateOrderId(order.id.clone()));
        }
        {
            let mut numbers = txn.open_table(ORDER_NUMBERS_TABLE)?;
            if numbers.get(order.order_number.as_str())?.is_some() {
                return Err(StorageError::DuplicateOrderNumber(order.order_number.clone()));
            }
            numbers.insert(order.order_number.as_str(), order.id.as_str())?;
        }

        let mut stored = order.clone();
        stored.last_sequence = Self::bump_change_sequence(&txn)?;
        Self::store_order(&txn, &stored)?;
        txn.commit()?;

        Ok(stored)
    }

    /// Conditional update
    ///
    /// `decide` sees the committed state of the order and chooses whether to
    /// write. Reading, deciding and writing happen inside one write
    /// transaction. On `Write`, `version` is bumped and `last_sequence` set
    /// to the new change sequence.
    pub fn update_if<F>(&self, order_id: &str, decide: F) -> StorageResult<UpdateOutcome>
    where
        F: FnOnce(&Order) -> UpdateDecision,
    {
        let txn = self.db.begin_write()?;
        let previous = Self::load_order(&txn, order_id)?
            .ok_or_else(|| StorageError::OrderNotFound(order_id.to_string()))?;

        match decide(&previous) {
            UpdateDecision::Keep => Ok(UpdateOutcome::Kept(previous)),
            UpdateDecision::Reject => Ok(UpdateOutcome::Rejected(previous)),
            UpdateDecision::Write(mut current) => {
                current.version = previous.version + 1;
                current.last_sequence = Self::bump_change_sequence(&txn)?;
                Self::store_order(&txn, &current)?;
                txn.commit()?;
                Ok(UpdateOutcome::Written { previous, current })
            }
        }
    }

    /// Get an order by id
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Find an order id by its order number
    pub fn find_by_number(&self, order_number: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_NUMBERS_TABLE)?;
        Ok(table.get(order_number)?.map(|g| g.value().to_string()))
    }

    /// All non-terminal orders and the change sequence they reflect
    ///
    /// Both come from the same read transaction, so every write with a
    /// sequence at or below the returned value is visible in the orders.
    pub fn open_orders_snapshot(&self) -> StorageResult<(Vec<Order>, u64)> {
        let read_txn = self.db.begin_read()?;
        let sequence = Self::read_change_sequence(&read_txn)?;
        let open = read_txn.open_table(OPEN_ORDERS_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;

        let mut result = Vec::new();
        for entry in open.iter()? {
            let (key, _) = entry?;
            if let Some(value) = orders.get(key.value())? {
                result.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok((result, sequence))
    }

    /// Number of non-terminal orders
    pub fn open_order_count(&self) -> StorageResult<u64> {
        use redb::ReadableTableMetadata;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OPEN_ORDERS_TABLE)?;
        Ok(table.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::order::{OrderItem, OrderStatus};

    fn new_order(id: &str, number: &str) -> Order {
        Order {
            id: id.to_string(),
            order_number: number.to_string(),
            table_id: "5".to_string(),
            items: vec![OrderItem::new("burger", Decimal::from(10), 2)],
            status: OrderStatus::Pending,
            paid: false,
            created_at: 1,
            processed_at: None,
            paid_at: None,
            payment_method: None,
            version: 0,
            last_sequence: 0,
            degraded_number: false,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let stored = storage.insert_order(&new_order("o-1", "20261019-001")).unwrap();
        assert_eq!(stored.last_sequence, 1);

        let loaded = storage.get_order("o-1").unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(
            storage.find_by_number("20261019-001").unwrap().as_deref(),
            Some("o-1")
        );
        assert_eq!(storage.current_sequence().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_order_number_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.insert_order(&new_order("o-1", "20261019-001")).unwrap();

        let err = storage
            .insert_order(&new_order("o-2", "20261019-001"))
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateOrderNumber(n) if n == "20261019-001"));
        assert!(storage.get_order("o-2").unwrap().is_none());
        // Nothing committed for the failed insert
        assert_eq!(storage.current_sequence().unwrap(), 1);
    }

    #[test]
    fn test_day_counter_increments_per_day() {
        let storage = OrderStorage::open_in_memory().unwrap();
        assert_eq!(storage.increment_day_counter("20261019").unwrap(), 1);
        assert_eq!(storage.increment_day_counter("20261019").unwrap(), 2);
        assert_eq!(storage.increment_day_counter("20261020").unwrap(), 1);
        assert_eq!(storage.day_counter("20261019").unwrap(), 2);
        assert_eq!(storage.day_counter("20261021").unwrap(), 0);
    }

    #[test]
    fn test_update_if_outcomes() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.insert_order(&new_order("o-1", "20261019-001")).unwrap();

        let outcome = storage
            .update_if("o-1", |o| {
                let mut next = o.clone();
                next.status = OrderStatus::ReadyForWaiter;
                UpdateDecision::Write(next)
            })
            .unwrap();
        let UpdateOutcome::Written { previous, current } = outcome else {
            panic!("expected write");
        };
        assert_eq!(previous.status, OrderStatus::Pending);
        assert_eq!(current.status, OrderStatus::ReadyForWaiter);
        assert_eq!(current.version, 1);
        assert_eq!(current.last_sequence, 2);

        let kept = storage.update_if("o-1", |_| UpdateDecision::Keep).unwrap();
        assert!(matches!(kept, UpdateOutcome::Kept(o) if o.version == 1));

        let rejected = storage.update_if("o-1", |_| UpdateDecision::Reject).unwrap();
        assert!(matches!(rejected, UpdateOutcome::Rejected(_)));
        assert_eq!(storage.current_sequence().unwrap(), 2);

        let missing = storage.update_if("nope", |_| UpdateDecision::Keep);
        assert!(matches!(missing, Err(StorageError::OrderNotFound(_))));
    }

    #[test]
    fn test_open_index_tracks_terminal_orders() {
        let storage = OrderStorage::open_in_memory().unwrap();
        storage.insert_order(&new_order("o-1", "20261019-001")).unwrap();
        storage.insert_order(&new_order("o-2", "20261019-002")).unwrap();
        assert_eq!(storage.open_order_count().unwrap(), 2);

        storage
            .update_if("o-1", |o| {
                let mut next = o.clone();
                next.status = OrderStatus::Paid;
                next.paid = true;
                UpdateDecision::Write(next)
            })
            .unwrap();

        let (open, seq) = storage.open_orders_snapshot().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "o-2");
        assert_eq!(seq, 3);
        // Terminal orders are kept, just not indexed
        assert!(storage.get_order("o-1").unwrap().unwrap().paid);
    }

    #[test]
    fn test_reopen_on_disk_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.redb");
        {
            let storage = OrderStorage::open(&path).unwrap();
            storage.insert_order(&new_order("o-1", "20261019-001")).unwrap();
            storage.increment_day_counter("20261019").unwrap();
        }
        let storage = OrderStorage::open(&path).unwrap();
        assert!(storage.get_order("o-1").unwrap().is_some());
        assert_eq!(storage.day_counter("20261019").unwrap(), 1);
        assert_eq!(storage.current_sequence().unwrap(), 1);
    }
}
