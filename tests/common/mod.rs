#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const PAYER: &str = "0x1111111111111111111111111111111111111111";
pub const PAYEE: &str = "0x2222222222222222222222222222222222222222";
pub const NOW: &str = "2024-04-20T16:20:00Z";

/// Writes a payments CSV with the standard header and the given raw rows.
pub fn payments_csv(rows: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "id, payer, payee, amount, currency, escrow, escrow_days").unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

/// Formats one well-formed payment row between `PAYER` and `PAYEE`.
pub fn payment_row(id: u64, amount: &str, currency: &str, escrow_days: Option<u32>) -> String {
    match escrow_days {
        Some(days) => format!("{id}, {PAYER}, {PAYEE}, {amount}, {currency}, true, {days}"),
        None => format!("{id}, {PAYER}, {PAYEE}, {amount}, {currency}, false,"),
    }
}
