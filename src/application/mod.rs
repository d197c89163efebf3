//! Application layer orchestrating the domain rules.
//!
//! This module defines the `PaymentService`, which prices incoming payment
//! requests and walks the resulting records through the escrow lifecycle,
//! persisting them through the `EscrowStore` port.

pub mod service;
