//! Sync intention model

use serde::{Deserialize, Serialize};

use super::{AccountId, DebtId};

/// An unacknowledged push from one debt owner to the other.
///
/// At most one intention exists per logical debt id. It records which side
/// proposed (`owner_account_id`) and the `locked_timestamp` that side wants
/// the counterparty to adopt. Created when settlement propagates a change,
/// destroyed exactly once, on acceptance or supersession by a newer
/// settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncIntention {
    pub debt_id: DebtId,
    /// The side for whom the intention is registered (the proposer)
    pub owner_account_id: AccountId,
    /// The reconciliation timestamp the counterparty should adopt
    pub locked_timestamp: i64,
}
