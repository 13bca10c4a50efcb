//! Receipt, item, consumer and participant models

use serde::{Deserialize, Serialize};

use super::{AccountId, ItemId, ReceiptId, UserId};

/// A shared receipt owned by one account.
///
/// Items and consumers are editable until `locked_timestamp` is set; from
/// then on the receipt is frozen and only participants' `resolved` flags
/// may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub owner_account_id: AccountId,
    pub currency_code: String,
    /// Set once participants' shares are frozen for settlement
    pub locked_timestamp: Option<i64>,
}

impl Receipt {
    #[must_use]
    pub fn new(owner: AccountId, currency_code: impl Into<String>) -> Self {
        Self {
            id: ReceiptId::new(),
            owner_account_id: owner,
            currency_code: currency_code.into(),
            locked_timestamp: None,
        }
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked_timestamp.is_some()
    }
}

/// A line on a receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: ItemId,
    pub receipt_id: ReceiptId,
    /// Unit price in currency subunits
    pub price_subunits: i64,
    pub quantity: i64,
}

impl ReceiptItem {
    #[must_use]
    pub fn new(receipt_id: ReceiptId, price_subunits: i64, quantity: i64) -> Self {
        Self {
            id: ItemId::new(),
            receipt_id,
            price_subunits,
            quantity,
        }
    }
}

/// A user's weighted claim on one item.
///
/// The user's share of the item is `part / sum of parts for that item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub item_id: ItemId,
    pub user_id: UserId,
    /// Positive integer weight
    pub part: i64,
}

/// Access role of a receipt participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Owner,
    Editor,
    Viewer,
}

impl ParticipantRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "owner" => Some(Self::Owner),
            "editor" => Some(Self::Editor),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

/// A user attached to a receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub receipt_id: ReceiptId,
    pub user_id: UserId,
    pub role: ParticipantRole,
    /// Whether this participant has acknowledged the settlement
    pub resolved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_receipt_is_unlocked() {
        let receipt = Receipt::new(AccountId::from("alice"), "EUR");
        assert!(!receipt.is_locked());
        assert_eq!(receipt.currency_code, "EUR");
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [
            ParticipantRole::Owner,
            ParticipantRole::Editor,
            ParticipantRole::Viewer,
        ] {
            assert_eq!(ParticipantRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(ParticipantRole::parse("admin"), None);
    }
}
