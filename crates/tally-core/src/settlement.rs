//! Settlement calculator
//!
//! Translates a locked receipt's allocation into debt-record mutations on
//! the owner's side of the ledger, each paired with a sync intention toward
//! the affected participant. This is the single place one party's action
//! writes into the pair's shared reconciliation state, and it always goes
//! through an intention, never directly into the counterparty's row.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::allocation::{receipt_sums, ParticipantSum};
use crate::db::{
    require_receipt, DebtRepository, IntentionRepository, ReceiptRepository, SqliteDebtRepository,
    SqliteIntentionRepository, SqliteReceiptRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    AccountId, DebtId, DebtRecord, ParticipantRole, PendingId, ReceiptId, SyncIntention, UserId,
};

/// Before/after view of one participant's debt row, emitted for the
/// notification layer's optimistic-update reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtChange {
    pub user_id: UserId,
    pub before: Option<DebtRecord>,
    pub after: Option<DebtRecord>,
}

/// Outcome of one settlement transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub receipt_id: ReceiptId,
    pub changes: Vec<DebtChange>,
    /// Ids of rows created by this settlement, stable only after commit
    pub created_debts: Vec<DebtId>,
}

/// Settle a locked receipt: upsert each non-owner participant's debt row on
/// the owner's side together with a matching sync intention, and remove the
/// pair where a participant's net obligation dropped to zero.
///
/// Runs in a single transaction; a debt row without its matching intention
/// is never observable.
pub fn settle(
    conn: &mut Connection,
    receipt_id: ReceiptId,
    acting_account: &AccountId,
) -> Result<SettlementResult> {
    let tx = conn.transaction()?;
    let mut created: Vec<PendingId> = Vec::new();

    let changes = {
        let receipts = SqliteReceiptRepository::new(&tx);
        let debts = SqliteDebtRepository::new(&tx);
        let intentions = SqliteIntentionRepository::new(&tx);

        let receipt = require_receipt(&receipts, receipt_id)?;
        if &receipt.owner_account_id != acting_account {
            return Err(Error::Forbidden(format!(
                "account {acting_account} does not own receipt {receipt_id}"
            )));
        }
        let Some(locked_timestamp) = receipt.locked_timestamp else {
            return Err(Error::Conflict(format!(
                "receipt {receipt_id} is not locked yet"
            )));
        };

        let items = receipts.items(receipt_id)?;
        let consumers = receipts.consumers(receipt_id)?;
        let participants = receipts.participants(receipt_id)?;

        let payer = participants
            .iter()
            .find(|p| p.role == ParticipantRole::Owner)
            .map(|p| p.user_id.clone());
        let sums = receipt_sums(&items, &consumers, payer.as_ref())?;

        // A consumer who was never added as a participant gets no debt row;
        // their share stays with the payer until they are invited
        for user_id in sums.keys() {
            if !participants.iter().any(|p| &p.user_id == user_id) {
                tracing::warn!(
                    receipt_id = %receipt_id,
                    user = %user_id,
                    "consumer is not a participant, skipping their share"
                );
            }
        }

        let mut changes = Vec::new();

        for participant in participants
            .iter()
            .filter(|p| p.role != ParticipantRole::Owner)
        {
            let net = sums
                .get(&participant.user_id)
                .map_or(0, ParticipantSum::net_subunits);
            let existing =
                debts.find_by_receipt(acting_account, &participant.user_id, receipt_id)?;

            if net == 0 {
                if let Some(record) = existing {
                    tracing::debug!(
                        debt_id = %record.id,
                        user = %participant.user_id,
                        "participant net dropped to zero, removing debt and intention"
                    );
                    debts.delete(acting_account, record.id)?;
                    intentions.remove(record.id)?;
                    changes.push(DebtChange {
                        user_id: participant.user_id.clone(),
                        before: Some(record),
                        after: None,
                    });
                }
                continue;
            }

            let (before, mut record) = match existing {
                Some(record) => (Some(record.clone()), record),
                None => {
                    let pending = PendingId::mint();
                    created.push(pending);
                    let record = DebtRecord {
                        id: pending.provisional(),
                        owner_account_id: acting_account.clone(),
                        counterparty_user_id: participant.user_id.clone(),
                        amount_subunits: 0,
                        currency_code: receipt.currency_code.clone(),
                        timestamp: locked_timestamp,
                        locked_timestamp: None,
                        note: String::new(),
                        receipt_id: Some(receipt_id),
                    };
                    (None, record)
                }
            };

            record.amount_subunits = net;
            record.currency_code = receipt.currency_code.clone();
            record.timestamp = locked_timestamp;
            record.locked_timestamp = Some(locked_timestamp);

            debts.upsert(&record)?;
            intentions.create(&SyncIntention {
                debt_id: record.id,
                owner_account_id: acting_account.clone(),
                locked_timestamp,
            })?;

            tracing::debug!(
                debt_id = %record.id,
                user = %participant.user_id,
                amount = net,
                "settled participant obligation"
            );

            changes.push(DebtChange {
                user_id: participant.user_id.clone(),
                before,
                after: Some(record),
            });
        }

        verify_no_orphans(&debts, &intentions, acting_account, &changes, locked_timestamp)?;
        changes
    };

    tx.commit()?;

    Ok(SettlementResult {
        receipt_id,
        changes,
        created_debts: created.into_iter().map(PendingId::into_stable).collect(),
    })
}

/// Re-read every touched pair inside the transaction: a written debt row
/// must carry exactly one matching intention and the agreed timestamp, and
/// a removed row must leave no intention behind. Failure aborts the
/// transaction; this signals a bug, not a race.
fn verify_no_orphans(
    debts: &impl DebtRepository,
    intentions: &impl IntentionRepository,
    owner: &AccountId,
    changes: &[DebtChange],
    locked_timestamp: i64,
) -> Result<()> {
    for change in changes {
        match &change.after {
            Some(record) => {
                let stored = debts.get(owner, record.id)?.ok_or_else(|| {
                    Error::InternalInvariant(format!("debt {} missing after upsert", record.id))
                })?;
                let intention = intentions.get(record.id)?.ok_or_else(|| {
                    Error::InternalInvariant(format!("debt {} has no intention", record.id))
                })?;
                if stored.locked_timestamp != Some(locked_timestamp)
                    || intention.locked_timestamp != locked_timestamp
                {
                    return Err(Error::InternalInvariant(format!(
                        "debt {} and its intention disagree on locked timestamp",
                        record.id
                    )));
                }
            }
            None => {
                if let Some(before) = &change.before {
                    if intentions.get(before.id)?.is_some() {
                        return Err(Error::InternalInvariant(format!(
                            "removed debt {} left an orphan intention",
                            before.id
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}
