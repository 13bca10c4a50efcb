//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|v| v != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: ledger and receipt schema
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Debt ledger: one independently-owned row per (owner, logical debt id)
        "CREATE TABLE IF NOT EXISTS debts (
            id TEXT NOT NULL,
            owner_account_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            amount INTEGER NOT NULL,
            currency_code TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            locked_timestamp INTEGER,
            note TEXT NOT NULL DEFAULT '',
            receipt_id TEXT,
            PRIMARY KEY (owner_account_id, id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_debts_owner ON debts(owner_account_id)",
        // Pending reconciliation proposals; the UNIQUE debt_id is the
        // concurrency-control primitive for racing settlements
        "CREATE TABLE IF NOT EXISTS debts_sync_intentions (
            debt_id TEXT PRIMARY KEY,
            owner_account_id TEXT NOT NULL,
            locked_timestamp INTEGER NOT NULL
        )",
        // Receipts
        "CREATE TABLE IF NOT EXISTS receipts (
            id TEXT PRIMARY KEY,
            owner_account_id TEXT NOT NULL,
            currency_code TEXT NOT NULL,
            locked_timestamp INTEGER
        )",
        "CREATE TABLE IF NOT EXISTS receipt_items (
            id TEXT PRIMARY KEY,
            receipt_id TEXT NOT NULL REFERENCES receipts(id) ON DELETE CASCADE,
            price INTEGER NOT NULL,
            quantity INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_receipt_items_receipt ON receipt_items(receipt_id)",
        "CREATE TABLE IF NOT EXISTS receipt_item_consumers (
            item_id TEXT NOT NULL REFERENCES receipt_items(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            part INTEGER NOT NULL,
            PRIMARY KEY (item_id, user_id)
        )",
        "CREATE TABLE IF NOT EXISTS receipt_participants (
            receipt_id TEXT NOT NULL REFERENCES receipts(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            role TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (receipt_id, user_id)
        )",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        tx.execute(stmt, [])?;
    }

    tx.commit()?;
    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: indexes for settlement lookups and balance projections
fn migrate_v2(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_debts_receipt ON debts(receipt_id)",
        "CREATE INDEX IF NOT EXISTS idx_debts_owner_user ON debts(owner_account_id, user_id)",
        "CREATE INDEX IF NOT EXISTS idx_receipts_owner ON receipts(owner_account_id)",
        "INSERT INTO schema_version (version) VALUES (2)",
    ];

    for stmt in statements {
        tx.execute(stmt, [])?;
    }

    tx.commit()?;
    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
