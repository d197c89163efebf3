use crate::domain::payment::PaymentRequest;
use crate::error::{Result, RewardsError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One CSV row: `id,payer,payee,amount,currency,escrow,escrow_days`.
#[derive(Debug, Deserialize)]
struct PaymentRow {
    id: u64,
    payer: String,
    payee: String,
    amount: Decimal,
    currency: String,
    escrow: Option<bool>,
    escrow_days: Option<i64>,
}

impl PaymentRow {
    fn into_request(self) -> (u64, PaymentRequest) {
        (
            self.id,
            PaymentRequest {
                payer_address: self.payer,
                payee_address: self.payee,
                amount: self.amount,
                currency: self.currency,
                escrow: self.escrow.unwrap_or(false),
                escrow_days: self.escrow_days,
            },
        )
    }
}

/// Reads payment requests from a CSV source.
///
/// Wraps `csv::Reader` and yields `(payment_id, PaymentRequest)` pairs. Fields
/// are trimmed and short rows are tolerated, so trailing optional columns can
/// be left off.
pub struct PaymentRequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentRequestReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one request per row.
    pub fn requests(self) -> impl Iterator<Item = Result<(u64, PaymentRequest)>> {
        self.reader
            .into_deserialize::<PaymentRow>()
            .map(|result| result.map(PaymentRow::into_request).map_err(RewardsError::from))
    }
}
