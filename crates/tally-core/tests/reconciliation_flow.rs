//! End-to-end flow: receipt -> settlement -> reconciliation
//!
//! Exercises the full pair lifecycle against one database: the owner locks
//! and settles a shared receipt, the counterparty accepts the resulting
//! proposal, and racing proposals resolve without ever leaving a debt row
//! and its intention in disagreement.

use pretty_assertions::assert_eq;
use tally_core::db::{
    Database, DebtRepository, IntentionRepository, SqliteDebtRepository,
    SqliteIntentionRepository,
};
use tally_core::ledger;
use tally_core::models::{ParticipantRole, SyncIntention, UserId};
use tally_core::reconcile::{accept, status, SyncStatus};
use tally_core::settlement::settle;
use tally_core::{AccountId, Error};

fn alice() -> AccountId {
    AccountId::from("alice")
}

fn bob() -> AccountId {
    AccountId::from("bob")
}

/// Owner-side setup: receipt with one 500-subunit item consumed by bob
fn settled_receipt(db: &mut Database) -> tally_core::DebtId {
    let receipt = ledger::create_receipt(db.connection(), &alice(), "EUR").unwrap();
    ledger::add_participant(
        db.connection(),
        &alice(),
        receipt.id,
        UserId::from("bob"),
        ParticipantRole::Editor,
    )
    .unwrap();
    let item = ledger::add_item(db.connection(), &alice(), receipt.id, 500, 1).unwrap();
    ledger::set_consumer(
        db.connection(),
        &alice(),
        receipt.id,
        item.id,
        UserId::from("bob"),
        1,
    )
    .unwrap();
    ledger::lock_receipt(db.connection(), &alice(), receipt.id).unwrap();

    let result = settle(db.connection_mut(), receipt.id, &alice()).unwrap();
    assert_eq!(result.created_debts.len(), 1);
    result.created_debts[0]
}

#[test]
fn owner_settles_and_participant_accepts() {
    let mut db = Database::open_in_memory().unwrap();
    let debt_id = settled_receipt(&mut db);

    // Owner sees the proposal as pending on itself
    assert_eq!(
        status(db.connection(), debt_id, &alice()).unwrap(),
        SyncStatus::UnsyncPendingSelf
    );

    let outcome = accept(db.connection_mut(), debt_id, &bob()).unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.record.amount_subunits, -500);

    let debts = SqliteDebtRepository::new(db.connection());
    let alice_row = debts.get(&alice(), debt_id).unwrap().unwrap();
    let bob_row = debts.get(&bob(), debt_id).unwrap().unwrap();
    assert_eq!(alice_row.locked_timestamp, bob_row.locked_timestamp);
    assert_eq!(alice_row.amount_subunits + bob_row.amount_subunits, 0);

    let intentions = SqliteIntentionRepository::new(db.connection());
    assert!(intentions.get(debt_id).unwrap().is_none());

    assert_eq!(
        status(db.connection(), debt_id, &alice()).unwrap(),
        SyncStatus::Sync
    );
    assert_eq!(
        status(db.connection(), debt_id, &bob()).unwrap(),
        SyncStatus::Sync
    );
}

#[test]
fn second_accept_is_a_normal_race_outcome() {
    let mut db = Database::open_in_memory().unwrap();
    let debt_id = settled_receipt(&mut db);

    accept(db.connection_mut(), debt_id, &bob()).unwrap();
    let err = accept(db.connection_mut(), debt_id, &bob()).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Re-querying status presents the now-current state
    assert_eq!(
        status(db.connection(), debt_id, &bob()).unwrap(),
        SyncStatus::Sync
    );

    // The amount was applied exactly once
    let debts = SqliteDebtRepository::new(db.connection());
    assert_eq!(
        debts.get(&bob(), debt_id).unwrap().unwrap().amount_subunits,
        -500
    );
}

#[test]
fn racing_counter_proposal_conflicts_cleanly() {
    let mut db = Database::open_in_memory().unwrap();
    let debt_id = settled_receipt(&mut db);

    // Bob tries to register his own proposal on the same debt while
    // alice's is still outstanding
    let intentions = SqliteIntentionRepository::new(db.connection());
    let err = intentions
        .create(&SyncIntention {
            debt_id,
            owner_account_id: bob(),
            locked_timestamp: 9_999,
        })
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // The loser's attempt left no intermediate state: the debt row and the
    // surviving intention still agree on the locked timestamp
    let debts = SqliteDebtRepository::new(db.connection());
    let row = debts.get(&alice(), debt_id).unwrap().unwrap();
    let intention = intentions.get(debt_id).unwrap().unwrap();
    assert_eq!(row.locked_timestamp, Some(intention.locked_timestamp));
    assert_eq!(intention.owner_account_id, alice());
}

#[test]
fn edit_after_sync_reenters_unsync() {
    let mut db = Database::open_in_memory().unwrap();
    let debt_id = settled_receipt(&mut db);
    accept(db.connection_mut(), debt_id, &bob()).unwrap();

    // Bob amends his copy; his lock clears and the pair diverges
    ledger::update_debt(
        db.connection_mut(),
        &bob(),
        debt_id,
        vec![tally_core::models::DebtMutation::AmountChanged(-450)],
    )
    .unwrap();

    assert_eq!(
        status(db.connection(), debt_id, &bob()).unwrap(),
        SyncStatus::Unsync
    );
    assert_eq!(
        status(db.connection(), debt_id, &alice()).unwrap(),
        SyncStatus::Unsync
    );
}

#[test]
fn manual_debt_starts_nosync() {
    let db = Database::open_in_memory().unwrap();
    let record = ledger::record_debt(
        db.connection(),
        &alice(),
        UserId::from("bob"),
        700,
        "EUR",
        "cinema",
    )
    .unwrap();

    assert_eq!(
        status(db.connection(), record.id, &alice()).unwrap(),
        SyncStatus::Nosync
    );
}
