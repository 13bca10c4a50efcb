//! Two-party reconciliation protocol
//!
//! Evaluated per logical debt id from the perspective of the querying
//! account. The decision function is stateless; `accept` is the only
//! transition and runs copy-then-delete in one transaction so a
//! half-applied acceptance is structurally impossible.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{
    DebtRepository, IntentionRepository, SqliteDebtRepository, SqliteIntentionRepository,
};
use crate::error::{Error, Result};
use crate::models::{AccountId, DebtId, DebtRecord, UserId};

/// Divergence state of one logical debt, relative to the querying account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// No counterparty record exists at all
    Nosync,
    /// Both sides reconciled to the same timestamp
    Sync,
    /// Divergent with no pending proposal
    Unsync,
    /// The querying side has proposed and awaits the counterparty
    UnsyncPendingSelf,
    /// The counterparty has proposed; the querying side may accept
    UnsyncPendingRemote,
}

/// Classify the divergence of `debt_id` as seen by `account`.
///
/// The querying side must hold its own row; `NotFound` otherwise.
pub fn status(conn: &Connection, debt_id: DebtId, account: &AccountId) -> Result<SyncStatus> {
    let debts = SqliteDebtRepository::new(conn);
    let intentions = SqliteIntentionRepository::new(conn);

    let own = debts
        .get(account, debt_id)?
        .ok_or_else(|| Error::NotFound(format!("debt {debt_id} for account {account}")))?;
    let counterpart = debts.counterpart(account, debt_id)?;

    if let (Some(own_locked), Some(other)) = (own.locked_timestamp, &counterpart) {
        if other.locked_timestamp == Some(own_locked) {
            return Ok(SyncStatus::Sync);
        }
    }

    match intentions.get(debt_id)? {
        None if counterpart.is_none() => Ok(SyncStatus::Nosync),
        None => Ok(SyncStatus::Unsync),
        Some(intention) if &intention.owner_account_id == account => {
            Ok(SyncStatus::UnsyncPendingSelf)
        }
        Some(_) => Ok(SyncStatus::UnsyncPendingRemote),
    }
}

/// Result of accepting a counterparty's proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOutcome {
    /// The accepting side's row before the transition, for caller-side
    /// cache reconciliation
    pub previous: Option<DebtRecord>,
    /// The committed row after adopting the proposal
    pub record: DebtRecord,
    /// Whether the accepting side's row was created by this acceptance
    pub created: bool,
}

/// Adopt the counterparty's pending proposal for `debt_id`.
///
/// Copies the proposer's financial fields (amount negated, since signs are
/// owner-relative) onto the accepting side's row, stamps the proposed
/// `locked_timestamp`, and deletes the intention, all in one transaction.
///
/// A vanished intention surfaces as `NotFound`: that is the normal outcome
/// of racing a concurrent acceptance or supersession, and callers should
/// re-query `status` rather than treat it as failure.
pub fn accept(conn: &mut Connection, debt_id: DebtId, account: &AccountId) -> Result<AcceptOutcome> {
    let tx = conn.transaction()?;

    let outcome = {
        let debts = SqliteDebtRepository::new(&tx);
        let intentions = SqliteIntentionRepository::new(&tx);

        let intention = intentions
            .get(debt_id)?
            .ok_or_else(|| Error::NotFound(format!("no pending intention for debt {debt_id}")))?;
        if &intention.owner_account_id == account {
            return Err(Error::Conflict(format!(
                "debt {debt_id} is pending on the counterparty, not on {account}"
            )));
        }

        let proposer = debts
            .get(&intention.owner_account_id, debt_id)?
            .ok_or_else(|| {
                Error::InternalInvariant(format!(
                    "intention for debt {debt_id} has no proposer row"
                ))
            })?;

        let previous = debts.get(account, debt_id)?;
        let created = previous.is_none();

        let record = DebtRecord {
            id: debt_id,
            owner_account_id: account.clone(),
            counterparty_user_id: UserId::from(intention.owner_account_id.as_str()),
            // Owner-relative sign: what the proposer is owed, this side owes
            amount_subunits: -proposer.amount_subunits,
            currency_code: proposer.currency_code.clone(),
            timestamp: proposer.timestamp,
            locked_timestamp: Some(intention.locked_timestamp),
            note: proposer.note.clone(),
            receipt_id: proposer.receipt_id,
        };

        debts.upsert(&record)?;
        intentions.remove(debt_id)?;

        tracing::debug!(
            debt_id = %debt_id,
            account = %account,
            amount = record.amount_subunits,
            created,
            "accepted reconciliation proposal"
        );

        AcceptOutcome {
            previous,
            record,
            created,
        }
    };

    tx.commit()?;
    Ok(outcome)
}
