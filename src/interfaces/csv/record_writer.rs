use crate::domain::escrow::{EscrowRecord, PaymentState};
use crate::error::Result;
use chrono::SecondsFormat;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct RecordRow<'a> {
    id: u64,
    currency: &'a str,
    amount: Decimal,
    processing_fee: Decimal,
    network_fee: Decimal,
    total_fees: Decimal,
    state: PaymentState,
    escrow_release: Option<String>,
}

impl<'a> From<&'a EscrowRecord> for RecordRow<'a> {
    fn from(record: &'a EscrowRecord) -> Self {
        Self {
            id: record.payment_id,
            currency: &record.currency,
            amount: record.amount,
            processing_fee: record.fees.processing_fee,
            network_fee: record.fees.network_fee,
            total_fees: record.fees.total_fees,
            state: record.state,
            escrow_release: record
                .release_at()
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

/// Writes settled payment records as CSV.
///
/// Header: `id,currency,amount,processing_fee,network_fee,total_fees,state,escrow_release`.
pub struct EscrowRecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> EscrowRecordWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_records<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = EscrowRecord>,
    {
        let mut wrote_any = false;
        for record in records {
            self.writer.serialize(RecordRow::from(&record))?;
            wrote_any = true;
        }
        // Header is emitted by the first serialized row; write it explicitly
        // for an empty batch so consumers always see the columns.
        if !wrote_any {
            self.writer.write_record([
                "id",
                "currency",
                "amount",
                "processing_fee",
                "network_fee",
                "total_fees",
                "state",
                "escrow_release",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
