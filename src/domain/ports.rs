use super::escrow::EscrowRecord;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait EscrowStore: Send + Sync {
    async fn store(&self, record: EscrowRecord) -> Result<()>;
    /// Stores `record` only if its payment id is unused, as one atomic step.
    /// Returns `false` and leaves the existing record untouched otherwise.
    async fn insert_new(&self, record: EscrowRecord) -> Result<bool>;
    async fn get(&self, payment_id: u64) -> Result<Option<EscrowRecord>>;
    async fn get_all(&self) -> Result<Vec<EscrowRecord>>;
}

pub type EscrowStoreBox = Box<dyn EscrowStore>;
