//! Claim and delivery records.
//!
//! A record is one comment on a task's post. Records are only ever appended;
//! the platform's comment list is the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CommentId, JobId};

/// Status carried by a claim/delivery comment.
///
/// Serialized as SCREAMING_SNAKE_CASE to match the wire markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Claiming,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    /// Every status, in declaration order.
    pub const ALL: [DeliveryStatus; 3] = [
        DeliveryStatus::Claiming,
        DeliveryStatus::Delivered,
        DeliveryStatus::Failed,
    ];

    /// Bold marker that identifies the status inside a comment.
    pub fn marker(self) -> &'static str {
        match self {
            DeliveryStatus::Claiming => "**CLAIMING**",
            DeliveryStatus::Delivered => "**DELIVERED**",
            DeliveryStatus::Failed => "**FAILED**",
        }
    }

    /// Terminal records close a task for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }
}

/// A record this node wants to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub job_id: JobId,
    pub status: DeliveryStatus,
    pub result: String,
    pub delivered_at: DateTime<Utc>,
}

impl Delivery {
    pub fn claiming(job_id: JobId, at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: DeliveryStatus::Claiming,
            result: String::new(),
            delivered_at: at,
        }
    }

    pub fn delivered(job_id: JobId, result: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: DeliveryStatus::Delivered,
            result: result.into(),
            delivered_at: at,
        }
    }

    pub fn failed(job_id: JobId, reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            status: DeliveryStatus::Failed,
            result: reason.into(),
            delivered_at: at,
        }
    }
}

/// A record read back from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub job_id: JobId,
    pub status: DeliveryStatus,
    /// Result body for terminal records; empty for claims.
    pub payload: String,
    /// Platform-assigned timestamp, verbatim.
    pub timestamp: Option<String>,
    pub comment_id: Option<CommentId>,
}
