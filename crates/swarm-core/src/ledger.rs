//! Claim Ledger Reader - derives lease state from a post's comment stream.
//!
//! The comment list of a task post is the only shared state between nodes.
//! It is append-only, unordered as far as this code is concerned, and
//! eventually consistent. Reading it and then appending a claim is NOT atomic:
//! two nodes can both observe a reclaimable job and both claim it, and both
//! will then run their handlers. The platform has no compare-and-swap, so the
//! "one active claimant" property is best-effort only.

use chrono::{DateTime, Utc};

use crate::domain::{ClaimRecord, Comment, DeliveryStatus, JobId, LeaseState, parse_timestamp};

/// All claim/delivery records found on one post.
#[derive(Debug, Clone, Default)]
pub struct ClaimLedger {
    records: Vec<ClaimRecord>,
}

impl ClaimLedger {
    pub fn new(records: Vec<ClaimRecord>) -> Self {
        Self { records }
    }

    /// Parse every comment; ordinary comments are ignored.
    pub fn from_comments(comments: &[Comment]) -> Self {
        Self::new(comments.iter().filter_map(ClaimRecord::from_comment).collect())
    }

    pub fn records(&self) -> &[ClaimRecord] {
        &self.records
    }

    pub fn records_for<'a>(&'a self, job_id: &JobId) -> impl Iterator<Item = &'a ClaimRecord> + use<'a> {
        let job_id = job_id.clone();
        self.records.iter().filter(move |r| r.job_id == job_id)
    }

    /// Authoritative claim: the one with the greatest timestamp.
    ///
    /// Records whose timestamp does not parse rank below every parsable one;
    /// among equals the raw string decides.
    pub fn latest_claim(&self, job_id: &JobId) -> Option<&ClaimRecord> {
        self.records_for(job_id)
            .filter(|r| r.status == DeliveryStatus::Claiming)
            .max_by_key(|r| ordering_key(*r))
    }

    /// First terminal record for the job, if any.
    pub fn terminal_record(&self, job_id: &JobId) -> Option<&ClaimRecord> {
        self.records_for(job_id)
            .filter(|r| r.status.is_terminal())
            .min_by_key(|r| ordering_key(*r))
    }

    /// Derive the lease state of `job_id` at `now`.
    pub fn lease_state(&self, job_id: &JobId, claim_timeout_secs: u64, now: DateTime<Utc>) -> LeaseState {
        if let Some(terminal) = self.terminal_record(job_id) {
            return LeaseState::Terminal(terminal.status);
        }
        let Some(claim) = self.latest_claim(job_id) else {
            return LeaseState::Unclaimed;
        };
        match claim.timestamp.as_deref().and_then(parse_timestamp) {
            Some(started_at) if !lease_elapsed(started_at, claim_timeout_secs, now) => {
                LeaseState::Active { started_at }
            }
            Some(started_at) => LeaseState::Expired {
                started_at: Some(started_at),
            },
            // Unknown start: treat as already expired rather than stall forever.
            None => LeaseState::Expired { started_at: None },
        }
    }
}

/// `now - started_at > timeout`, at millisecond resolution.
pub fn lease_elapsed(started_at: DateTime<Utc>, claim_timeout_secs: u64, now: DateTime<Utc>) -> bool {
    let elapsed_ms = i128::from(now.signed_duration_since(started_at).num_milliseconds());
    elapsed_ms > i128::from(claim_timeout_secs) * 1000
}

fn ordering_key(record: &ClaimRecord) -> (Option<DateTime<Utc>>, Option<&str>) {
    let raw = record.timestamp.as_deref();
    (raw.and_then(parse_timestamp), raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, 10, 0, 0).unwrap()
    }

    fn comment(id: &str, content: &str, created_at: Option<DateTime<Utc>>) -> Comment {
        Comment {
            id: id.into(),
            content: content.to_string(),
            author: None,
            parent_id: None,
            created_at: created_at.map(|t| t.to_rfc3339()),
        }
    }

    fn claim(id: &str, job: &str, at: Option<DateTime<Utc>>) -> Comment {
        comment(id, &format!("🐝 **CLAIMING**: `job_id={job}`\n\n*Working on it...*"), at)
    }

    fn j1() -> JobId {
        JobId::new("J1")
    }

    #[test]
    fn no_records_means_unclaimed() {
        let ledger = ClaimLedger::from_comments(&[comment("c1", "Great post!", Some(t0()))]);
        assert_eq!(ledger.lease_state(&j1(), 3600, t0()), LeaseState::Unclaimed);
    }

    #[rstest]
    #[case(3601, false)]
    #[case(3600, true)]
    #[case(3000, true)]
    fn single_claim_expires_after_timeout(#[case] secs_later: i64, #[case] active: bool) {
        let ledger = ClaimLedger::from_comments(&[claim("c1", "J1", Some(t0()))]);
        let state = ledger.lease_state(&j1(), 3600, t0() + Duration::seconds(secs_later));
        if active {
            assert_eq!(state, LeaseState::Active { started_at: t0() });
        } else {
            assert_eq!(state, LeaseState::Expired { started_at: Some(t0()) });
            assert!(state.is_reclaimable());
        }
    }

    #[test]
    fn latest_claim_is_authoritative() {
        let later = t0() + Duration::seconds(10);
        let ledger = ClaimLedger::from_comments(&[
            claim("late", "J1", Some(later)),
            claim("early", "J1", Some(t0())),
        ]);
        let latest = ledger.latest_claim(&j1()).unwrap();
        assert_eq!(latest.comment_id.as_ref().unwrap().as_str(), "late");

        // Old claim alone would be expired; the newer one keeps the lease alive.
        let now = t0() + Duration::seconds(3605);
        assert_eq!(ledger.lease_state(&j1(), 3600, now), LeaseState::Active { started_at: later });
    }

    #[test]
    fn timezones_are_compared_as_instants() {
        let ledger = ClaimLedger::from_comments(&[
            comment("utc", "🐝 **CLAIMING**: `job_id=J1`", None),
            comment("tokyo", "🐝 **CLAIMING**: `job_id=J1`", None),
        ]);
        let mut records = ledger.records().to_vec();
        records[0].timestamp = Some("2025-02-03T10:00:05Z".into());
        records[1].timestamp = Some("2025-02-03T19:00:00+09:00".into());
        let ledger = ClaimLedger::new(records);
        assert_eq!(ledger.latest_claim(&j1()).unwrap().comment_id.as_ref().unwrap().as_str(), "utc");
    }

    #[rstest]
    #[case(DeliveryStatus::Delivered, "✅ **DELIVERED**: `job_id=J1`\n\nok")]
    #[case(DeliveryStatus::Failed, "❌ **FAILED**: `job_id=J1`\n\nnope")]
    fn terminal_record_wins_over_any_claim(#[case] status: DeliveryStatus, #[case] text: &str) {
        let ledger = ClaimLedger::from_comments(&[
            claim("c1", "J1", Some(t0())),
            comment("c2", text, Some(t0() + Duration::seconds(5))),
            claim("c3", "J1", Some(t0() + Duration::seconds(60))),
        ]);
        assert_eq!(ledger.lease_state(&j1(), 3600, t0()), LeaseState::Terminal(status));
        assert_eq!(
            ledger.lease_state(&j1(), 1, t0() + Duration::days(30)),
            LeaseState::Terminal(status)
        );
    }

    #[test]
    fn missing_timestamp_counts_as_expired() {
        let ledger = ClaimLedger::from_comments(&[claim("c1", "J1", None)]);
        assert_eq!(
            ledger.lease_state(&j1(), 3600, t0()),
            LeaseState::Expired { started_at: None }
        );
    }

    #[test]
    fn unparsable_timestamp_ranks_below_parsable_ones() {
        let mut records = ClaimLedger::from_comments(&[
            claim("bad", "J1", None),
            claim("good", "J1", Some(t0())),
        ])
        .records()
        .to_vec();
        records[0].timestamp = Some("yesterday-ish".into());
        let ledger = ClaimLedger::new(records);
        assert_eq!(ledger.latest_claim(&j1()).unwrap().comment_id.as_ref().unwrap().as_str(), "good");
        assert!(matches!(ledger.lease_state(&j1(), 3600, t0()), LeaseState::Active { .. }));
    }

    #[test]
    fn other_jobs_do_not_interfere() {
        let ledger = ClaimLedger::from_comments(&[
            claim("c1", "J10", Some(t0())),
            comment("c2", "✅ **DELIVERED**: `job_id=J2`\n\nok", Some(t0())),
        ]);
        assert_eq!(ledger.lease_state(&j1(), 3600, t0()), LeaseState::Unclaimed);
        assert_eq!(ledger.records_for(&JobId::new("J10")).count(), 1);
    }
}
