use crate::domain::escrow::PaymentState;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unknown tier: {0}")]
    UnknownTier(String),
    #[error("Invalid tier table: {0}")]
    InvalidTierTable(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error("Invalid escrow period: {0} days")]
    InvalidEscrowPeriod(i64),

    #[error("Escrow for payment {0} has expired")]
    EscrowExpired(u64),
    #[error("Escrow for payment {0} is still locked")]
    EscrowLocked(u64),
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: PaymentState, to: PaymentState },

    #[error("Duplicate payment id: {0}")]
    DuplicatePayment(u64),
    #[error("Payment not found: {0}")]
    PaymentNotFound(u64),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// How an HTTP layer should surface a [`RewardsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied data was rejected (HTTP 400).
    Validation,
    /// Anything the caller could not have avoided (HTTP 500).
    Internal,
}

impl RewardsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RewardsError::CsvError(_)
            | RewardsError::IoError(_)
            | RewardsError::SerializationError(_)
            | RewardsError::InvalidConfig(_)
            | RewardsError::InvalidTierTable(_) => ErrorKind::Internal,
            _ => ErrorKind::Validation,
        }
    }
}

/// JSON body `{"error": "..."}` returned alongside a failed request.
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&RewardsError> for ErrorBody {
    fn from(err: &RewardsError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RewardsError>;
