use super::payment::{FeeBreakdown, PaymentRequest};
use crate::error::{Result, RewardsError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Pending,
    Completed,
    InEscrow,
    Released,
    Cancelled,
}

impl PaymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentState::Completed | PaymentState::Released | PaymentState::Cancelled
        )
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentState::Pending => "PENDING",
            PaymentState::Completed => "COMPLETED",
            PaymentState::InEscrow => "IN_ESCROW",
            PaymentState::Released => "RELEASED",
            PaymentState::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

/// Funds held in escrow may be released once the release time has passed, or
/// earlier when an authorized party signs off.
pub fn is_release_eligible(now: DateTime<Utc>, release_at: DateTime<Utc>, authorized: bool) -> bool {
    now >= release_at || authorized
}

/// The lifecycle of a single payment.
///
/// Direct payments go `PENDING -> COMPLETED`. Escrow payments go
/// `PENDING -> IN_ESCROW` and end either `RELEASED` or `CANCELLED`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct EscrowRecord {
    pub payment_id: u64,
    pub payer_address: String,
    pub payee_address: String,
    pub amount: Decimal,
    pub currency: String,
    pub fees: FeeBreakdown,
    pub state: PaymentState,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl EscrowRecord {
    /// Opens a pending record for an already-priced request.
    pub fn open(
        payment_id: u64,
        request: &PaymentRequest,
        fees: FeeBreakdown,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            payment_id,
            payer_address: request.payer_address.clone(),
            payee_address: request.payee_address.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            fees,
            state: PaymentState::Pending,
            created_at: now,
            settled_at: None,
        }
    }

    pub fn release_at(&self) -> Option<DateTime<Utc>> {
        self.fees.escrow_release_timestamp
    }

    /// Settles a direct payment.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        match (self.state, self.release_at()) {
            (PaymentState::Pending, None) => {
                self.settle(PaymentState::Completed, Some(now));
                Ok(())
            }
            _ => Err(self.invalid(PaymentState::Completed)),
        }
    }

    /// Moves the funds of an escrow payment into escrow.
    pub fn hold(&mut self) -> Result<()> {
        match (self.state, self.release_at()) {
            (PaymentState::Pending, Some(_)) => {
                self.settle(PaymentState::InEscrow, None);
                Ok(())
            }
            _ => Err(self.invalid(PaymentState::InEscrow)),
        }
    }

    pub fn release(&mut self, now: DateTime<Utc>, authorized: bool) -> Result<()> {
        match (self.state, self.release_at()) {
            (PaymentState::InEscrow, Some(release_at)) => {
                if !is_release_eligible(now, release_at, authorized) {
                    return Err(RewardsError::EscrowLocked(self.payment_id));
                }
                self.settle(PaymentState::Released, Some(now));
                Ok(())
            }
            _ => Err(self.invalid(PaymentState::Released)),
        }
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        match (self.state, self.release_at()) {
            (PaymentState::InEscrow, Some(release_at)) => {
                if now >= release_at {
                    return Err(RewardsError::EscrowExpired(self.payment_id));
                }
                self.settle(PaymentState::Cancelled, Some(now));
                Ok(())
            }
            _ => Err(self.invalid(PaymentState::Cancelled)),
        }
    }

    fn settle(&mut self, to: PaymentState, settled_at: Option<DateTime<Utc>>) {
        tracing::info!(
            payment_id = self.payment_id,
            from = %self.state,
            %to,
            "Payment state changed"
        );
        self.state = to;
        self.settled_at = settled_at;
    }

    fn invalid(&self, to: PaymentState) -> RewardsError {
        RewardsError::InvalidStateTransition {
            from: self.state,
            to,
        }
    }
}
