//! Debt ledger repository implementation

use crate::error::{Error, Result};
use crate::models::{AccountId, DebtId, DebtRecord, ReceiptId, UserId};
use rusqlite::{params, Connection};

/// Trait for debt ledger storage operations
pub trait DebtRepository {
    /// Insert a new debt row; fails with `Conflict` if (owner, id) exists
    fn insert(&self, record: &DebtRecord) -> Result<()>;

    /// Create-or-update a debt row keyed by (owner, id)
    fn upsert(&self, record: &DebtRecord) -> Result<()>;

    /// Get one owner's row for a logical debt id
    fn get(&self, owner: &AccountId, id: DebtId) -> Result<Option<DebtRecord>>;

    /// Find an owner's receipt-originated row for a given counterparty
    fn find_by_receipt(
        &self,
        owner: &AccountId,
        counterparty: &UserId,
        receipt_id: ReceiptId,
    ) -> Result<Option<DebtRecord>>;

    /// Find the other side's row for a logical debt id, if it exists
    fn counterpart(&self, excluding_owner: &AccountId, id: DebtId) -> Result<Option<DebtRecord>>;

    /// List all rows owned by an account, newest first
    fn list_for_owner(&self, owner: &AccountId) -> Result<Vec<DebtRecord>>;

    /// Delete an owner's row; returns whether a row was removed
    fn delete(&self, owner: &AccountId, id: DebtId) -> Result<bool>;
}

/// `SQLite` implementation of `DebtRepository`
pub struct SqliteDebtRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDebtRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a debt record from a database row
    fn parse_debt(row: &rusqlite::Row<'_>) -> rusqlite::Result<DebtRecord> {
        let id: String = row.get(0)?;
        let receipt_id: Option<String> = row.get(8)?;
        Ok(DebtRecord {
            id: id.parse().map_err(|e| parse_error(0, e))?,
            owner_account_id: AccountId::from(row.get::<_, String>(1)?),
            counterparty_user_id: UserId::from(row.get::<_, String>(2)?),
            amount_subunits: row.get(3)?,
            currency_code: row.get(4)?,
            timestamp: row.get(5)?,
            locked_timestamp: row.get(6)?,
            note: row.get(7)?,
            receipt_id: receipt_id
                .map(|raw| raw.parse().map_err(|e| parse_error(8, e)))
                .transpose()?,
        })
    }
}

fn parse_error(column: usize, err: uuid::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

const SELECT_COLUMNS: &str = "id, owner_account_id, user_id, amount, currency_code, \
                              timestamp, locked_timestamp, note, receipt_id";

impl DebtRepository for SqliteDebtRepository<'_> {
    fn insert(&self, record: &DebtRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO debts (id, owner_account_id, user_id, amount, currency_code,
                                timestamp, locked_timestamp, note, receipt_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id.as_str(),
                record.owner_account_id.as_str(),
                record.counterparty_user_id.as_str(),
                record.amount_subunits,
                record.currency_code,
                record.timestamp,
                record.locked_timestamp,
                record.note,
                record.receipt_id.map(|id| id.as_str()),
            ],
        )?;
        Ok(())
    }

    fn upsert(&self, record: &DebtRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO debts (id, owner_account_id, user_id, amount, currency_code,
                                timestamp, locked_timestamp, note, receipt_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(owner_account_id, id) DO UPDATE SET
                user_id = excluded.user_id,
                amount = excluded.amount,
                currency_code = excluded.currency_code,
                timestamp = excluded.timestamp,
                locked_timestamp = excluded.locked_timestamp,
                note = excluded.note,
                receipt_id = excluded.receipt_id",
            params![
                record.id.as_str(),
                record.owner_account_id.as_str(),
                record.counterparty_user_id.as_str(),
                record.amount_subunits,
                record.currency_code,
                record.timestamp,
                record.locked_timestamp,
                record.note,
                record.receipt_id.map(|id| id.as_str()),
            ],
        )?;
        Ok(())
    }

    fn get(&self, owner: &AccountId, id: DebtId) -> Result<Option<DebtRecord>> {
        let result = self.conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM debts WHERE owner_account_id = ?1 AND id = ?2"),
            params![owner.as_str(), id.as_str()],
            Self::parse_debt,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn find_by_receipt(
        &self,
        owner: &AccountId,
        counterparty: &UserId,
        receipt_id: ReceiptId,
    ) -> Result<Option<DebtRecord>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM debts
                 WHERE owner_account_id = ?1 AND user_id = ?2 AND receipt_id = ?3"
            ),
            params![owner.as_str(), counterparty.as_str(), receipt_id.as_str()],
            Self::parse_debt,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn counterpart(&self, excluding_owner: &AccountId, id: DebtId) -> Result<Option<DebtRecord>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM debts
                 WHERE id = ?1 AND owner_account_id != ?2"
            ),
            params![id.as_str(), excluding_owner.as_str()],
            Self::parse_debt,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_for_owner(&self, owner: &AccountId) -> Result<Vec<DebtRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM debts
             WHERE owner_account_id = ?1
             ORDER BY timestamp DESC, id DESC"
        ))?;

        let records = stmt
            .query_map(params![owner.as_str()], Self::parse_debt)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    fn delete(&self, owner: &AccountId, id: DebtId) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM debts WHERE owner_account_id = ?1 AND id = ?2",
            params![owner.as_str(), id.as_str()],
        )?;
        Ok(rows > 0)
    }
}

/// Fetch an owner's row, failing with `NotFound` when absent
pub fn require_debt(
    repo: &impl DebtRepository,
    owner: &AccountId,
    id: DebtId,
) -> Result<DebtRecord> {
    repo.get(owner, id)?
        .ok_or_else(|| Error::NotFound(format!("debt {id} for account {owner}")))
}
