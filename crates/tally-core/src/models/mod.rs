//! Data models for Tally

mod debt;
mod id;
mod intention;
mod receipt;

pub use debt::{apply, DebtMutation, DebtRecord};
pub use id::{AccountId, DebtId, ItemId, PendingId, ReceiptId, UserId};
pub use intention::SyncIntention;
pub use receipt::{Consumer, Participant, ParticipantRole, Receipt, ReceiptItem};
