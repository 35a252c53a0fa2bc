//! Delivery Codec - claim/delivery records to and from comment text.
//!
//! The formats must match other swarm implementations bit for bit:
//!
//! ```text
//! 🐝 **CLAIMING**: `job_id=<id>`\n\n*Working on it...*
//! ✅ **DELIVERED**: `job_id=<id>`\n\n<result>\n\n---\n*Delivered by MoltSwarm node at <time>*
//! ❌ **FAILED**: `job_id=<id>`\n\n<reason>\n\n---\n*Failed at <time>*
//! ```

use std::sync::LazyLock;

use chrono::SecondsFormat;
use regex::Regex;

use crate::domain::{ClaimRecord, Comment, Delivery, DeliveryStatus, JobId};

static JOB_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"job_id[=:]([^\s`"]+)"#).expect("valid regex"));

const FOOTER_SEPARATOR: &str = "\n\n---\n";

impl Delivery {
    /// Comment body for this record.
    pub fn to_comment(&self) -> String {
        let at = self.delivered_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        match self.status {
            DeliveryStatus::Claiming => {
                format!("🐝 **CLAIMING**: `job_id={}`\n\n*Working on it...*", self.job_id)
            }
            DeliveryStatus::Delivered => format!(
                "✅ **DELIVERED**: `job_id={}`\n\n{}{FOOTER_SEPARATOR}*Delivered by MoltSwarm node at {at}*",
                self.job_id, self.result
            ),
            DeliveryStatus::Failed => format!(
                "❌ **FAILED**: `job_id={}`\n\n{}{FOOTER_SEPARATOR}*Failed at {at}*",
                self.job_id, self.result
            ),
        }
    }
}

impl ClaimRecord {
    /// Parse a comment body. `None` for ordinary comments.
    pub fn from_text(text: &str) -> Option<Self> {
        let job_id = JOB_ID_REGEX.captures(text)?.get(1)?.as_str();
        // The header marker comes first; a payload may quote other markers.
        let (_, status) = DeliveryStatus::ALL
            .into_iter()
            .filter_map(|s| text.find(s.marker()).map(|at| (at, s)))
            .min_by_key(|(at, _)| *at)?;
        let payload = if status.is_terminal() {
            extract_payload(text)
        } else {
            String::new()
        };

        Some(Self {
            job_id: JobId::new(job_id),
            status,
            payload,
            timestamp: None,
            comment_id: None,
        })
    }

    /// Parse a platform comment, keeping its id and timestamp.
    pub fn from_comment(comment: &Comment) -> Option<Self> {
        let mut record = Self::from_text(&comment.content)?;
        record.timestamp = comment.created_at.clone();
        record.comment_id = Some(comment.id.clone());
        Some(record)
    }
}

// Text between the header line and the footer. Falls back to everything
// after the header when the footer is missing.
fn extract_payload(text: &str) -> String {
    let body = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    let body = body.strip_prefix('\n').unwrap_or(body);
    let body = body
        .rsplit_once(FOOTER_SEPARATOR)
        .map(|(payload, _)| payload)
        .unwrap_or(body);
    body.trim_end().to_string()
}
