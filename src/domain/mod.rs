//! Pure business rules: loyalty tiers, payment fees and the escrow lifecycle.
//!
//! Nothing in here performs I/O or reads the clock; time is always passed in.

pub mod escrow;
pub mod payment;
pub mod ports;
pub mod tier;
