//! Database layer for Tally

mod connection;
mod debt_repository;
mod intention_repository;
mod migrations;
mod receipt_repository;

pub use connection::Database;
pub use debt_repository::{require_debt, DebtRepository, SqliteDebtRepository};
pub use intention_repository::{IntentionRepository, SqliteIntentionRepository};
pub use receipt_repository::{require_receipt, ReceiptRepository, SqliteReceiptRepository};
