//! LeaseState - derived coordination state of one job.
//!
//! Never stored. Recomputed from the full comment ledger whenever a decision
//! is needed (see `ledger::ClaimLedger::lease_state`).

use chrono::{DateTime, Utc};

use super::delivery::DeliveryStatus;

/// State transitions per job:
/// - Unclaimed -> Active -> Terminal(Delivered | Failed)
/// - Active -> Expired (no terminal record before the claim timeout)
///
/// `Expired` behaves like `Unclaimed` for decision purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    /// No claim record exists.
    Unclaimed,

    /// The most recent claim is still within its timeout.
    Active { started_at: DateTime<Utc> },

    /// The most recent claim is older than the timeout. `started_at` is
    /// `None` when its timestamp was missing or unparsable.
    Expired { started_at: Option<DateTime<Utc>> },

    /// A delivered/failed record exists. Claims no longer matter.
    Terminal(DeliveryStatus),
}

impl LeaseState {
    /// May this node append a new claim?
    pub fn is_reclaimable(&self) -> bool {
        matches!(self, LeaseState::Unclaimed | LeaseState::Expired { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LeaseState::Terminal(_))
    }
}
