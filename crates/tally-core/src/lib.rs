//! tally-core - Core library for Tally
//!
//! Two-party shared-expense ledger: each side of a pair owns its own copy
//! of every debt, a proportional splitting engine turns shared receipts
//! into exact subunit obligations, and a reconciliation protocol keeps the
//! mirrored rows in agreement without either side holding authority over
//! the other's copy.

pub mod allocation;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod projection;
pub mod reconcile;
pub mod settlement;

pub use error::{Error, Result};
pub use models::{AccountId, DebtId, DebtRecord, ReceiptId, UserId};
