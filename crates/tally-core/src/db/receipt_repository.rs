//! Receipt repository implementation
//!
//! Receipts, their items, per-item consumers and participants. Once a
//! receipt's `locked_timestamp` is set the whole aggregate is frozen; the
//! only mutation still allowed is a participant's `resolved` flag.

use crate::error::{Error, Result};
use crate::models::{
    AccountId, Consumer, ItemId, Participant, ParticipantRole, Receipt, ReceiptId, ReceiptItem,
    UserId,
};
use rusqlite::{params, Connection};

/// Trait for receipt storage operations
pub trait ReceiptRepository {
    /// Insert a new receipt
    fn create(&self, receipt: &Receipt) -> Result<()>;

    /// Get a receipt by id
    fn get(&self, id: ReceiptId) -> Result<Option<Receipt>>;

    /// Add an item; fails with `Conflict` if the receipt is locked
    fn add_item(&self, item: &ReceiptItem) -> Result<()>;

    /// Set a user's part on an item (create-or-update); fails if locked
    fn set_consumer(&self, receipt_id: ReceiptId, consumer: &Consumer) -> Result<()>;

    /// Attach or update a participant; fails if locked
    fn upsert_participant(&self, participant: &Participant) -> Result<()>;

    /// Freeze the receipt for settlement; fails with `Conflict` if already locked
    fn lock(&self, id: ReceiptId, locked_timestamp: i64) -> Result<Receipt>;

    /// Flip a participant's settlement acknowledgement, allowed after lock
    fn mark_resolved(&self, receipt_id: ReceiptId, user_id: &UserId, resolved: bool) -> Result<()>;

    /// All items on a receipt
    fn items(&self, receipt_id: ReceiptId) -> Result<Vec<ReceiptItem>>;

    /// All per-item consumers across a receipt
    fn consumers(&self, receipt_id: ReceiptId) -> Result<Vec<Consumer>>;

    /// All participants of a receipt
    fn participants(&self, receipt_id: ReceiptId) -> Result<Vec<Participant>>;
}

/// `SQLite` implementation of `ReceiptRepository`
pub struct SqliteReceiptRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteReceiptRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_receipt(row: &rusqlite::Row<'_>) -> rusqlite::Result<Receipt> {
        let id: String = row.get(0)?;
        Ok(Receipt {
            id: id.parse().map_err(|e| text_parse_error(0, e))?,
            owner_account_id: AccountId::from(row.get::<_, String>(1)?),
            currency_code: row.get(2)?,
            locked_timestamp: row.get(3)?,
        })
    }

    fn ensure_unlocked(&self, receipt_id: ReceiptId) -> Result<()> {
        let receipt = require_receipt(self, receipt_id)?;
        if receipt.is_locked() {
            return Err(Error::Conflict(format!(
                "receipt {receipt_id} is locked and read-only"
            )));
        }
        Ok(())
    }
}

fn text_parse_error(column: usize, err: uuid::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

impl ReceiptRepository for SqliteReceiptRepository<'_> {
    fn create(&self, receipt: &Receipt) -> Result<()> {
        self.conn.execute(
            "INSERT INTO receipts (id, owner_account_id, currency_code, locked_timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                receipt.id.as_str(),
                receipt.owner_account_id.as_str(),
                receipt.currency_code,
                receipt.locked_timestamp,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: ReceiptId) -> Result<Option<Receipt>> {
        let result = self.conn.query_row(
            "SELECT id, owner_account_id, currency_code, locked_timestamp
             FROM receipts WHERE id = ?1",
            params![id.as_str()],
            Self::parse_receipt,
        );

        match result {
            Ok(receipt) => Ok(Some(receipt)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn add_item(&self, item: &ReceiptItem) -> Result<()> {
        self.ensure_unlocked(item.receipt_id)?;
        self.conn.execute(
            "INSERT INTO receipt_items (id, receipt_id, price, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                item.id.as_str(),
                item.receipt_id.as_str(),
                item.price_subunits,
                item.quantity,
            ],
        )?;
        Ok(())
    }

    fn set_consumer(&self, receipt_id: ReceiptId, consumer: &Consumer) -> Result<()> {
        self.ensure_unlocked(receipt_id)?;
        self.conn.execute(
            "INSERT INTO receipt_item_consumers (item_id, user_id, part)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(item_id, user_id) DO UPDATE SET part = excluded.part",
            params![
                consumer.item_id.as_str(),
                consumer.user_id.as_str(),
                consumer.part,
            ],
        )?;
        Ok(())
    }

    fn upsert_participant(&self, participant: &Participant) -> Result<()> {
        self.ensure_unlocked(participant.receipt_id)?;
        self.conn.execute(
            "INSERT INTO receipt_participants (receipt_id, user_id, role, resolved)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(receipt_id, user_id) DO UPDATE SET
                role = excluded.role,
                resolved = excluded.resolved",
            params![
                participant.receipt_id.as_str(),
                participant.user_id.as_str(),
                participant.role.as_str(),
                i32::from(participant.resolved),
            ],
        )?;
        Ok(())
    }

    fn lock(&self, id: ReceiptId, locked_timestamp: i64) -> Result<Receipt> {
        let rows = self.conn.execute(
            "UPDATE receipts SET locked_timestamp = ?1
             WHERE id = ?2 AND locked_timestamp IS NULL",
            params![locked_timestamp, id.as_str()],
        )?;

        if rows == 0 {
            // Either absent or already locked by a racing caller
            return match self.get(id)? {
                Some(_) => Err(Error::Conflict(format!("receipt {id} is already locked"))),
                None => Err(Error::NotFound(format!("receipt {id}"))),
            };
        }

        require_receipt(self, id)
    }

    fn mark_resolved(&self, receipt_id: ReceiptId, user_id: &UserId, resolved: bool) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE receipt_participants SET resolved = ?1
             WHERE receipt_id = ?2 AND user_id = ?3",
            params![i32::from(resolved), receipt_id.as_str(), user_id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(format!(
                "participant {user_id} on receipt {receipt_id}"
            )));
        }
        Ok(())
    }

    fn items(&self, receipt_id: ReceiptId) -> Result<Vec<ReceiptItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, receipt_id, price, quantity
             FROM receipt_items WHERE receipt_id = ?1 ORDER BY id",
        )?;

        let items = stmt
            .query_map(params![receipt_id.as_str()], |row| {
                let id: String = row.get(0)?;
                let receipt: String = row.get(1)?;
                Ok(ReceiptItem {
                    id: id.parse().map_err(|e| text_parse_error(0, e))?,
                    receipt_id: receipt.parse().map_err(|e| text_parse_error(1, e))?,
                    price_subunits: row.get(2)?,
                    quantity: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    fn consumers(&self, receipt_id: ReceiptId) -> Result<Vec<Consumer>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.item_id, c.user_id, c.part
             FROM receipt_item_consumers c
             JOIN receipt_items i ON i.id = c.item_id
             WHERE i.receipt_id = ?1
             ORDER BY c.item_id, c.user_id",
        )?;

        let consumers = stmt
            .query_map(params![receipt_id.as_str()], |row| {
                let item_id: String = row.get(0)?;
                Ok(Consumer {
                    item_id: item_id.parse().map_err(|e| text_parse_error(0, e))?,
                    user_id: UserId::from(row.get::<_, String>(1)?),
                    part: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(consumers)
    }

    fn participants(&self, receipt_id: ReceiptId) -> Result<Vec<Participant>> {
        let mut stmt = self.conn.prepare(
            "SELECT receipt_id, user_id, role, resolved
             FROM receipt_participants WHERE receipt_id = ?1 ORDER BY user_id",
        )?;

        let participants = stmt
            .query_map(params![receipt_id.as_str()], |row| {
                let receipt: String = row.get(0)?;
                let role: String = row.get(2)?;
                Ok((
                    receipt,
                    UserId::from(row.get::<_, String>(1)?),
                    role,
                    row.get::<_, i32>(3)? != 0,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        participants
            .into_iter()
            .map(|(receipt, user_id, role, resolved)| {
                Ok(Participant {
                    receipt_id: receipt
                        .parse()
                        .map_err(|_| Error::Database("invalid receipt id in row".to_string()))?,
                    user_id,
                    role: ParticipantRole::parse(&role)
                        .ok_or_else(|| Error::Database(format!("unknown role '{role}'")))?,
                    resolved,
                })
            })
            .collect()
    }
}

/// Fetch a receipt, failing with `NotFound` when absent
pub fn require_receipt(repo: &impl ReceiptRepository, id: ReceiptId) -> Result<Receipt> {
    repo.get(id)?
        .ok_or_else(|| Error::NotFound(format!("receipt {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_receipt(repo: &SqliteReceiptRepository<'_>) -> Receipt {
        let receipt = Receipt::new(AccountId::from("alice"), "EUR");
        repo.create(&receipt).unwrap();
        receipt
    }

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let repo = SqliteReceiptRepository::new(db.connection());

        let receipt = make_receipt(&repo);
        let fetched = repo.get(receipt.id).unwrap().unwrap();
        assert_eq!(fetched, receipt);
    }

    #[test]
    fn test_items_and_consumers() {
        let db = setup();
        let repo = SqliteReceiptRepository::new(db.connection());

        let receipt = make_receipt(&repo);
        let item = ReceiptItem::new(receipt.id, 300, 1);
        repo.add_item(&item).unwrap();
        repo.set_consumer(
            receipt.id,
            &Consumer {
                item_id: item.id,
                user_id: UserId::from("bob"),
                part: 2,
            },
        )
        .unwrap();

        assert_eq!(repo.items(receipt.id).unwrap().len(), 1);
        let consumers = repo.consumers(receipt.id).unwrap();
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].part, 2);
    }

    #[test]
    fn test_lock_freezes_receipt() {
        let db = setup();
        let repo = SqliteReceiptRepository::new(db.connection());

        let receipt = make_receipt(&repo);
        let item = ReceiptItem::new(receipt.id, 100, 1);
        repo.add_item(&item).unwrap();

        let locked = repo.lock(receipt.id, 42).unwrap();
        assert_eq!(locked.locked_timestamp, Some(42));

        let err = repo.add_item(&ReceiptItem::new(receipt.id, 50, 1)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = repo.lock(receipt.id, 43).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_lock_missing_receipt_is_not_found() {
        let db = setup();
        let repo = SqliteReceiptRepository::new(db.connection());

        let err = repo.lock(ReceiptId::new(), 42).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_mark_resolved_allowed_after_lock() {
        let db = setup();
        let repo = SqliteReceiptRepository::new(db.connection());

        let receipt = make_receipt(&repo);
        repo.upsert_participant(&Participant {
            receipt_id: receipt.id,
            user_id: UserId::from("bob"),
            role: ParticipantRole::Editor,
            resolved: false,
        })
        .unwrap();
        repo.lock(receipt.id, 42).unwrap();

        repo.mark_resolved(receipt.id, &UserId::from("bob"), true).unwrap();

        let participants = repo.participants(receipt.id).unwrap();
        assert!(participants[0].resolved);
    }

    #[test]
    fn test_mark_resolved_unknown_participant() {
        let db = setup();
        let repo = SqliteReceiptRepository::new(db.connection());

        let receipt = make_receipt(&repo);
        let err = repo
            .mark_resolved(receipt.id, &UserId::from("mallory"), true)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
