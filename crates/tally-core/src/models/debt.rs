//! Debt record model and its closed set of mutations

use serde::{Deserialize, Serialize};

use super::{AccountId, DebtId, ReceiptId, UserId};

/// One side's view of a shared debt.
///
/// Each owner holds an independent row for the same logical `DebtId`; the
/// two mirrored rows may diverge and are reconciled through the sync
/// protocol. `amount_subunits` is owner-relative: positive means the
/// counterparty owes the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtRecord {
    /// Logical debt identifier, shared with the counterparty's mirrored row
    pub id: DebtId,
    /// Account that owns this row
    pub owner_account_id: AccountId,
    /// The other party of the debt
    pub counterparty_user_id: UserId,
    /// Signed amount in currency subunits, sign relative to the owner
    pub amount_subunits: i64,
    /// ISO 4217 currency code
    pub currency_code: String,
    /// Business date (unix ms)
    pub timestamp: i64,
    /// Set when this row was reconciled against a specific counterparty state
    pub locked_timestamp: Option<i64>,
    /// Free-form note
    pub note: String,
    /// Set when the debt originated from a shared receipt
    pub receipt_id: Option<ReceiptId>,
}

impl DebtRecord {
    /// Create a new unreconciled debt record owned by `owner`
    #[must_use]
    pub fn new(
        owner: AccountId,
        counterparty: UserId,
        amount_subunits: i64,
        currency_code: impl Into<String>,
    ) -> Self {
        Self {
            id: DebtId::new(),
            owner_account_id: owner,
            counterparty_user_id: counterparty,
            amount_subunits,
            currency_code: currency_code.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            locked_timestamp: None,
            note: String::new(),
            receipt_id: None,
        }
    }

    /// Whether this row has been reconciled at some point
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked_timestamp.is_some()
    }
}

/// The closed set of edits a caller can make to their own debt row.
///
/// Every edit invalidates any prior reconciliation, so `apply` always
/// clears `locked_timestamp`; the pair re-enters the unsynced state until
/// the counterparty accepts again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtMutation {
    AmountChanged(i64),
    TimestampChanged(i64),
    NoteChanged(String),
    CurrencyChanged(String),
}

/// Apply a single mutation, returning the updated record
#[must_use]
pub fn apply(mut record: DebtRecord, mutation: DebtMutation) -> DebtRecord {
    match mutation {
        DebtMutation::AmountChanged(amount) => record.amount_subunits = amount,
        DebtMutation::TimestampChanged(timestamp) => record.timestamp = timestamp,
        DebtMutation::NoteChanged(note) => record.note = note,
        DebtMutation::CurrencyChanged(currency) => record.currency_code = currency,
    }
    record.locked_timestamp = None;
    record
}
