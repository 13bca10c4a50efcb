//! Read-model projections
//!
//! Balances are rebuilt from the ledger table on demand by a single
//! aggregate query. There is deliberately no incremental patching of
//! cached copies; a stale projection is recomputed, never repaired.

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{AccountId, UserId};

/// Net position against one counterparty in one currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub counterparty_user_id: UserId,
    pub currency_code: String,
    /// Positive means the counterparty owes this account
    pub net_subunits: i64,
    pub debt_count: i64,
}

/// Rebuild the caller's balance summary from their ledger rows
pub fn balances(conn: &Connection, account: &AccountId) -> Result<Vec<BalanceEntry>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, currency_code, SUM(amount), COUNT(*)
         FROM debts
         WHERE owner_account_id = ?1
         GROUP BY user_id, currency_code
         ORDER BY user_id, currency_code",
    )?;

    let entries = stmt
        .query_map(params![account.as_str()], |row| {
            Ok(BalanceEntry {
                counterparty_user_id: UserId::from(row.get::<_, String>(0)?),
                currency_code: row.get(1)?,
                net_subunits: row.get(2)?,
                debt_count: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}
