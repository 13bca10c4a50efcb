//! Sync intention repository implementation
//!
//! At most one intention exists per logical debt id; the UNIQUE primary key
//! on `debt_id` is what resolves racing settlements.

use crate::error::{Error, Result};
use crate::models::{AccountId, DebtId, SyncIntention};
use rusqlite::{params, Connection};

/// Trait for sync intention storage operations
pub trait IntentionRepository {
    /// Register (or supersede) a reconciliation proposal.
    ///
    /// Idempotent for the same proposer: re-proposing updates
    /// `locked_timestamp` last-writer-wins. A proposal for a debt that
    /// already carries another side's intention fails with `Conflict`.
    fn create(&self, intention: &SyncIntention) -> Result<()>;

    /// Remove an intention; no-op if absent
    fn remove(&self, debt_id: DebtId) -> Result<()>;

    /// Get the outstanding intention for a debt, if any
    fn get(&self, debt_id: DebtId) -> Result<Option<SyncIntention>>;
}

/// `SQLite` implementation of `IntentionRepository`
pub struct SqliteIntentionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteIntentionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_intention(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncIntention> {
        let debt_id: String = row.get(0)?;
        Ok(SyncIntention {
            debt_id: debt_id.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            owner_account_id: AccountId::from(row.get::<_, String>(1)?),
            locked_timestamp: row.get(2)?,
        })
    }
}

impl IntentionRepository for SqliteIntentionRepository<'_> {
    fn create(&self, intention: &SyncIntention) -> Result<()> {
        // Single guarded statement: the upsert only fires when the existing
        // row belongs to the same proposer, so a concurrent proposal from
        // the other side can never be silently overwritten
        let affected = self.conn.execute(
            "INSERT INTO debts_sync_intentions (debt_id, owner_account_id, locked_timestamp)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(debt_id) DO UPDATE SET
                locked_timestamp = excluded.locked_timestamp
             WHERE debts_sync_intentions.owner_account_id = excluded.owner_account_id",
            params![
                intention.debt_id.as_str(),
                intention.owner_account_id.as_str(),
                intention.locked_timestamp,
            ],
        )?;

        if affected == 0 {
            let holder = self
                .get(intention.debt_id)?
                .map_or_else(|| "another account".to_string(), |e| e.owner_account_id.to_string());
            return Err(Error::Conflict(format!(
                "debt {} already has a pending intention from {holder}",
                intention.debt_id
            )));
        }
        Ok(())
    }

    fn remove(&self, debt_id: DebtId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM debts_sync_intentions WHERE debt_id = ?1",
            params![debt_id.as_str()],
        )?;
        Ok(())
    }

    fn get(&self, debt_id: DebtId) -> Result<Option<SyncIntention>> {
        let result = self.conn.query_row(
            "SELECT debt_id, owner_account_id, locked_timestamp
             FROM debts_sync_intentions WHERE debt_id = ?1",
            params![debt_id.as_str()],
            Self::parse_intention,
        );

        match result {
            Ok(intention) => Ok(Some(intention)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn intention(debt_id: DebtId, owner: &str, locked: i64) -> SyncIntention {
        SyncIntention {
            debt_id,
            owner_account_id: AccountId::from(owner),
            locked_timestamp: locked,
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let repo = SqliteIntentionRepository::new(db.connection());

        let debt_id = DebtId::new();
        repo.create(&intention(debt_id, "alice", 100)).unwrap();

        let fetched = repo.get(debt_id).unwrap().unwrap();
        assert_eq!(fetched.owner_account_id.as_str(), "alice");
        assert_eq!(fetched.locked_timestamp, 100);
    }

    #[test]
    fn test_create_same_proposer_is_lww() {
        let db = setup();
        let repo = SqliteIntentionRepository::new(db.connection());

        let debt_id = DebtId::new();
        repo.create(&intention(debt_id, "alice", 100)).unwrap();
        repo.create(&intention(debt_id, "alice", 100)).unwrap(); // idempotent
        repo.create(&intention(debt_id, "alice", 200)).unwrap(); // supersedes

        let fetched = repo.get(debt_id).unwrap().unwrap();
        assert_eq!(fetched.locked_timestamp, 200);
    }

    #[test]
    fn test_create_other_proposer_is_conflict() {
        let db = setup();
        let repo = SqliteIntentionRepository::new(db.connection());

        let debt_id = DebtId::new();
        repo.create(&intention(debt_id, "alice", 100)).unwrap();

        let err = repo.create(&intention(debt_id, "bob", 200)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // The original proposal stands
        let fetched = repo.get(debt_id).unwrap().unwrap();
        assert_eq!(fetched.owner_account_id.as_str(), "alice");
        assert_eq!(fetched.locked_timestamp, 100);
    }

    #[test]
    fn test_create_does_not_overwrite_row_committed_underneath() {
        let db = setup();
        let repo = SqliteIntentionRepository::new(db.connection());

        // A counterparty's proposal lands through another connection, so
        // no prior read through this repository has seen it
        let debt_id = DebtId::new();
        db.connection()
            .execute(
                "INSERT INTO debts_sync_intentions (debt_id, owner_account_id, locked_timestamp)
                 VALUES (?1, 'bob', 500)",
                params![debt_id.as_str()],
            )
            .unwrap();

        let err = repo.create(&intention(debt_id, "alice", 600)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let fetched = repo.get(debt_id).unwrap().unwrap();
        assert_eq!(fetched.owner_account_id.as_str(), "bob");
        assert_eq!(fetched.locked_timestamp, 500);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let db = setup();
        let repo = SqliteIntentionRepository::new(db.connection());

        let debt_id = DebtId::new();
        repo.create(&intention(debt_id, "alice", 100)).unwrap();

        repo.remove(debt_id).unwrap();
        repo.remove(debt_id).unwrap(); // absent, still Ok
        assert!(repo.get(debt_id).unwrap().is_none());
    }
}
