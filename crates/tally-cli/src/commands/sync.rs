//! Settlement and reconciliation subcommands

use tally_core::db::Database;
use tally_core::projection::balances;
use tally_core::reconcile::{accept, status, SyncStatus};
use tally_core::settlement::settle;
use tally_core::AccountId;

use super::{format_amount, parse_id};
use crate::error::Result;

pub fn settle_receipt(db: &mut Database, account: &AccountId, receipt: &str) -> Result<()> {
    let result = settle(db.connection_mut(), parse_id(receipt)?, account)?;

    if result.changes.is_empty() {
        println!("Nothing to settle");
        return Ok(());
    }
    for change in &result.changes {
        match &change.after {
            Some(record) => println!(
                "{} owes {}",
                change.user_id,
                format_amount(record.amount_subunits, &record.currency_code)
            ),
            None => println!("{} settled up, debt removed", change.user_id),
        }
    }
    Ok(())
}

pub fn show_status(db: &Database, account: &AccountId, debt: &str) -> Result<()> {
    let state = status(db.connection(), parse_id(debt)?, account)?;
    let text = match state {
        SyncStatus::Nosync => "nosync (counterparty has no record)",
        SyncStatus::Sync => "sync",
        SyncStatus::Unsync => "unsync (diverged, no pending proposal)",
        SyncStatus::UnsyncPendingSelf => "pending on counterparty (you proposed)",
        SyncStatus::UnsyncPendingRemote => "pending on you (run `tally accept`)",
    };
    println!("{text}");
    Ok(())
}

pub fn accept_intention(db: &mut Database, account: &AccountId, debt: &str) -> Result<()> {
    let outcome = accept(db.connection_mut(), parse_id(debt)?, account)?;
    let verb = if outcome.created { "created" } else { "updated" };
    println!(
        "Accepted: {} your record at {}",
        verb,
        format_amount(outcome.record.amount_subunits, &outcome.record.currency_code)
    );
    Ok(())
}

pub fn show_balances(db: &Database, account: &AccountId, json: bool) -> Result<()> {
    let entries = balances(db.connection(), account)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No debts recorded");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {}  ({} debt(s))",
            entry.counterparty_user_id,
            format_amount(entry.net_subunits, &entry.currency_code),
            entry.debt_count
        );
    }
    Ok(())
}
