//! Identifier newtypes
//!
//! Ids minted by this system (debts, receipts, items) are UUID v7 so they
//! sort by creation time. Account and user ids come from the external
//! identity provider and are carried as opaque strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new unique id using UUID v7
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Get the string representation of this id
            #[must_use]
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id! {
    /// Logical debt identifier, shared across both owners' mirrored rows
    DebtId
}

uuid_id! {
    /// Receipt identifier
    ReceiptId
}

uuid_id! {
    /// Receipt item identifier
    ItemId
}

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id! {
    /// Authenticated account id supplied by the identity provider
    AccountId
}

string_id! {
    /// User id of a counterparty or receipt participant
    UserId
}

/// A debt id minted before its transaction commits.
///
/// Settlement creates new ledger rows inside a transaction; until that
/// transaction commits the id is provisional and must not leak to callers.
/// `into_stable` is the single place a pending id becomes a real `DebtId`,
/// called only after commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingId(DebtId);

impl PendingId {
    #[must_use]
    pub fn mint() -> Self {
        Self(DebtId::new())
    }

    /// The provisional id, for binding into statements inside the transaction
    #[must_use]
    pub const fn provisional(&self) -> DebtId {
        self.0
    }

    /// Promote to a stable id once the enclosing transaction has committed
    #[must_use]
    pub const fn into_stable(self) -> DebtId {
        self.0
    }
}
