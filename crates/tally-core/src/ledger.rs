//! Ledger operations exposed to callers
//!
//! Thin service layer over the repositories: attaches the authenticated
//! account to every operation and enforces ownership before any write.
//! The account id itself is trusted as supplied by the identity provider.

use rusqlite::Connection;

use crate::db::{
    require_receipt, DebtRepository, ReceiptRepository, SqliteDebtRepository,
    SqliteReceiptRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    apply, AccountId, Consumer, DebtId, DebtMutation, DebtRecord, ItemId, Participant,
    ParticipantRole, Receipt, ReceiptId, ReceiptItem, UserId,
};

/// Record a new obligation on the caller's own ledger.
///
/// The counterparty learns about it only once a settlement or manual share
/// pushes an intention; until then the debt is in the `Nosync` state.
pub fn record_debt(
    conn: &Connection,
    account: &AccountId,
    counterparty: UserId,
    amount_subunits: i64,
    currency_code: &str,
    note: &str,
) -> Result<DebtRecord> {
    if currency_code.trim().is_empty() {
        return Err(Error::InvalidAllocation("empty currency code".to_string()));
    }

    let mut record = DebtRecord::new(account.clone(), counterparty, amount_subunits, currency_code);
    record.note = note.to_string();

    SqliteDebtRepository::new(conn).insert(&record)?;
    Ok(record)
}

/// Apply a batch of mutations to the caller's own debt row.
///
/// Any edit clears the row's reconciliation lock; the pair re-enters
/// `Unsync` until the counterparty accepts again.
pub fn update_debt(
    conn: &mut Connection,
    account: &AccountId,
    debt_id: DebtId,
    mutations: Vec<DebtMutation>,
) -> Result<DebtRecord> {
    let tx = conn.transaction()?;

    let record = {
        let debts = SqliteDebtRepository::new(&tx);

        let record = match debts.get(account, debt_id)? {
            Some(record) => record,
            None if debts.counterpart(account, debt_id)?.is_some() => {
                return Err(Error::Forbidden(format!(
                    "debt {debt_id} is not owned by account {account}"
                )));
            }
            None => {
                return Err(Error::NotFound(format!(
                    "debt {debt_id} for account {account}"
                )));
            }
        };

        let record = mutations.into_iter().fold(record, apply);
        debts.upsert(&record)?;
        record
    };

    tx.commit()?;
    Ok(record)
}

/// One side's full ledger, newest first
pub fn list_debts(conn: &Connection, account: &AccountId) -> Result<Vec<DebtRecord>> {
    SqliteDebtRepository::new(conn).list_for_owner(account)
}

/// Create a receipt owned by the caller, with the caller attached as the
/// owner participant
pub fn create_receipt(conn: &Connection, account: &AccountId, currency_code: &str) -> Result<Receipt> {
    if currency_code.trim().is_empty() {
        return Err(Error::InvalidAllocation("empty currency code".to_string()));
    }

    let receipts = SqliteReceiptRepository::new(conn);
    let receipt = Receipt::new(account.clone(), currency_code);
    receipts.create(&receipt)?;
    receipts.upsert_participant(&Participant {
        receipt_id: receipt.id,
        user_id: UserId::from(account.as_str()),
        role: ParticipantRole::Owner,
        resolved: false,
    })?;
    Ok(receipt)
}

/// Add an item to an unlocked receipt (owner or editor)
pub fn add_item(
    conn: &Connection,
    account: &AccountId,
    receipt_id: ReceiptId,
    price_subunits: i64,
    quantity: i64,
) -> Result<ReceiptItem> {
    if price_subunits < 0 || quantity < 0 {
        return Err(Error::InvalidAllocation(
            "price and quantity must be non-negative".to_string(),
        ));
    }

    let receipts = SqliteReceiptRepository::new(conn);
    ensure_can_edit(&receipts, receipt_id, account)?;

    let item = ReceiptItem::new(receipt_id, price_subunits, quantity);
    receipts.add_item(&item)?;
    Ok(item)
}

/// Set a user's part weight on an item (owner or editor)
pub fn set_consumer(
    conn: &Connection,
    account: &AccountId,
    receipt_id: ReceiptId,
    item_id: ItemId,
    user_id: UserId,
    part: i64,
) -> Result<()> {
    if part <= 0 {
        return Err(Error::InvalidAllocation(format!(
            "part {part} must be positive"
        )));
    }

    let receipts = SqliteReceiptRepository::new(conn);
    ensure_can_edit(&receipts, receipt_id, account)?;
    receipts.set_consumer(
        receipt_id,
        &Consumer {
            item_id,
            user_id,
            part,
        },
    )
}

/// Attach a participant to an unlocked receipt (owner only)
pub fn add_participant(
    conn: &Connection,
    account: &AccountId,
    receipt_id: ReceiptId,
    user_id: UserId,
    role: ParticipantRole,
) -> Result<()> {
    let receipts = SqliteReceiptRepository::new(conn);
    ensure_owner(&receipts, receipt_id, account)?;
    receipts.upsert_participant(&Participant {
        receipt_id,
        user_id,
        role,
        resolved: false,
    })
}

/// Freeze the receipt's shares for settlement (owner only)
pub fn lock_receipt(conn: &Connection, account: &AccountId, receipt_id: ReceiptId) -> Result<Receipt> {
    let receipts = SqliteReceiptRepository::new(conn);
    ensure_owner(&receipts, receipt_id, account)?;
    receipts.lock(receipt_id, chrono::Utc::now().timestamp_millis())
}

/// Acknowledge the settlement of a locked receipt for the calling
/// participant; the only receipt mutation allowed after lock
pub fn mark_resolved(conn: &Connection, account: &AccountId, receipt_id: ReceiptId) -> Result<()> {
    let receipts = SqliteReceiptRepository::new(conn);
    require_receipt(&receipts, receipt_id)?;
    receipts.mark_resolved(receipt_id, &UserId::from(account.as_str()), true)
}

fn ensure_owner(
    receipts: &impl ReceiptRepository,
    receipt_id: ReceiptId,
    account: &AccountId,
) -> Result<()> {
    let receipt = require_receipt(receipts, receipt_id)?;
    if &receipt.owner_account_id != account {
        return Err(Error::Forbidden(format!(
            "account {account} does not own receipt {receipt_id}"
        )));
    }
    Ok(())
}

fn ensure_can_edit(
    receipts: &impl ReceiptRepository,
    receipt_id: ReceiptId,
    account: &AccountId,
) -> Result<()> {
    let receipt = require_receipt(receipts, receipt_id)?;
    if &receipt.owner_account_id == account {
        return Ok(());
    }

    let is_editor = receipts.participants(receipt_id)?.iter().any(|p| {
        p.user_id.as_str() == account.as_str() && p.role == ParticipantRole::Editor
    });
    if is_editor {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "account {account} may not edit receipt {receipt_id}"
        )))
    }
}
