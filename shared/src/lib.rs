//! Shared types and domain rules for the Pharmacy POS engine
//!
//! This crate holds everything about stock, costing, ledgers and refunds that
//! can be decided without touching the database. The backend loads current
//! state under lock, asks these functions what the next state is, and writes
//! the result back inside one transaction.

pub mod error;
pub mod models;
pub mod validation;

pub use error::*;
pub use models::*;
pub use validation::*;
