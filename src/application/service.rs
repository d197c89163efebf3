use crate::config::FeeConfig;
use crate::domain::escrow::{EscrowRecord, PaymentState};
use crate::domain::payment::{self, FeeBreakdown, PaymentRequest};
use crate::domain::ports::EscrowStoreBox;
use crate::error::{Result, RewardsError};
use chrono::{DateTime, Utc};

/// Prices payments and drives them through their lifecycle.
///
/// `PaymentService` owns the fee configuration and the record store. Fee
/// computation is delegated to the pure domain functions; this layer only
/// sequences validation, pricing and state changes, and persists the result.
pub struct PaymentService {
    config: FeeConfig,
    store: EscrowStoreBox,
}

impl PaymentService {
    /// Creates a new `PaymentService`.
    ///
    /// # Arguments
    ///
    /// * `config` - Fee rates and limits applied to every payment.
    /// * `store` - Where payment records are persisted.
    pub fn new(config: FeeConfig, store: EscrowStoreBox) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Prices a request without recording anything.
    pub fn quote(&self, request: &PaymentRequest, now: DateTime<Utc>) -> Result<FeeBreakdown> {
        payment::compute_fees(request, &self.config, now)
    }

    /// Prices a request and records it.
    ///
    /// Direct payments are completed immediately; escrow payments are left
    /// `IN_ESCROW` until released or cancelled.
    pub async fn submit(
        &self,
        payment_id: u64,
        request: PaymentRequest,
        now: DateTime<Utc>,
    ) -> Result<EscrowRecord> {
        let fees = self.quote(&request, now)?;
        let mut record = EscrowRecord::open(payment_id, &request, fees, now);
        if request.escrow {
            record.hold()?;
        } else {
            record.complete(now)?;
        }

        if !self.store.insert_new(record.clone()).await? {
            return Err(RewardsError::DuplicatePayment(payment_id));
        }
        Ok(record)
    }

    pub async fn release(
        &self,
        payment_id: u64,
        now: DateTime<Utc>,
        authorized: bool,
    ) -> Result<EscrowRecord> {
        let mut record = self.load(payment_id).await?;
        record.release(now, authorized)?;
        self.store.store(record.clone()).await?;
        Ok(record)
    }

    pub async fn cancel(&self, payment_id: u64, now: DateTime<Utc>) -> Result<EscrowRecord> {
        let mut record = self.load(payment_id).await?;
        record.cancel(now)?;
        self.store.store(record.clone()).await?;
        Ok(record)
    }

    /// Releases every escrow whose release time has been reached.
    pub async fn release_due(&self, now: DateTime<Utc>) -> Result<Vec<EscrowRecord>> {
        let mut released = Vec::new();
        for mut record in self.store.get_all().await? {
            let due = record.state == PaymentState::InEscrow
                && record.release_at().is_some_and(|at| now >= at);
            if due {
                record.release(now, false)?;
                self.store.store(record.clone()).await?;
                released.push(record);
            }
        }
        Ok(released)
    }

    /// Consumes the service and returns every record, ordered by payment id.
    pub async fn into_results(self) -> Result<Vec<EscrowRecord>> {
        let mut records = self.store.get_all().await?;
        records.sort_by_key(|r| r.payment_id);
        Ok(records)
    }

    async fn load(&self, payment_id: u64) -> Result<EscrowRecord> {
        self.store
            .get(payment_id)
            .await?
            .ok_or(RewardsError::PaymentNotFound(payment_id))
    }
}
