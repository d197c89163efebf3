use crate::domain::escrow::EscrowRecord;
use crate::domain::ports::EscrowStore;
use crate::error::{Result, RewardsError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding payment records keyed by big-endian payment id.
pub const CF_ESCROWS: &str = "escrows";

fn storage_error(err: rocksdb::Error) -> RewardsError {
    RewardsError::IoError(std::io::Error::other(err))
}

/// A persistent payment record store backed by RocksDB.
///
/// Records are stored as JSON. Big-endian keys keep iteration in payment id
/// order. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    /// Serializes check-then-put in `insert_new` across clones.
    insert_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating the
    /// "escrows" column family if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_escrows = ColumnFamilyDescriptor::new(CF_ESCROWS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_escrows]).map_err(storage_error)?;

        Ok(Self {
            db: Arc::new(db),
            insert_lock: Arc::new(Mutex::new(())),
        })
    }

    fn escrows(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_ESCROWS).ok_or_else(|| {
            RewardsError::IoError(std::io::Error::other("Escrows column family not found"))
        })
    }
}

#[async_trait]
impl EscrowStore for RocksDBStore {
    async fn store(&self, record: EscrowRecord) -> Result<()> {
        let cf = self.escrows()?;
        let value = serde_json::to_vec(&record)?;
        self.db
            .put_cf(cf, record.payment_id.to_be_bytes(), value)
            .map_err(storage_error)?;
        Ok(())
    }

    async fn get(&self, payment_id: u64) -> Result<Option<EscrowRecord>> {
        let cf = self.escrows()?;
        let pinned = self
            .db
            .get_pinned_cf(cf, payment_id.to_be_bytes())
            .map_err(storage_error)?;
        match pinned {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn insert_new(&self, record: EscrowRecord) -> Result<bool> {
        let _guard = self.insert_lock.lock().await;
        let cf = self.escrows()?;
        let key = record.payment_id.to_be_bytes();
        if self.db.get_pinned_cf(cf, key).map_err(storage_error)?.is_some() {
            return Ok(false);
        }
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(cf, key, value).map_err(storage_error)?;
        Ok(true)
    }

    async fn get_all(&self) -> Result<Vec<EscrowRecord>> {
        let cf = self.escrows()?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(storage_error)?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}
