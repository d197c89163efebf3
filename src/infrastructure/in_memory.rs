use crate::domain::escrow::EscrowRecord;
use crate::domain::ports::EscrowStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payment records.
///
/// Uses `Arc<RwLock<HashMap<u64, EscrowRecord>>>` so clones share state.
/// Used by default and in tests; records are lost when the process exits.
#[derive(Default, Clone)]
pub struct InMemoryEscrowStore {
    records: Arc<RwLock<HashMap<u64, EscrowRecord>>>,
}

impl InMemoryEscrowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EscrowStore for InMemoryEscrowStore {
    async fn store(&self, record: EscrowRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.payment_id, record);
        Ok(())
    }

    async fn get(&self, payment_id: u64) -> Result<Option<EscrowRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&payment_id).cloned())
    }

    async fn insert_new(&self, record: EscrowRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.entry(record.payment_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn get_all(&self) -> Result<Vec<EscrowRecord>> {
        let records = self.records.read().await;
        let mut all: Vec<EscrowRecord> = records.values().cloned().collect();
        all.sort_by_key(|r| r.payment_id);
        Ok(all)
    }
}
