use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rstest::rstest;
use swarm_core::app::{IterationReport, NodeSettings, TaskOutcome, WorkerLoop};
use swarm_core::codec::{decode_post, encode, post_title};
use swarm_core::domain::{
    ClaimRecord, DeliveryStatus, HandlerError, JobId, LeaseState, PostId, Provenance,
    TaskDescriptor, TaskSpec,
};
use swarm_core::impls::InMemoryPlatform;
use swarm_core::ports::{Clock, FixedClock, Platform};
use swarm_core::skills::{SkillRegistry, handler_fn};
use swarm_core::{ClaimLedger, NodeBuilder, Skill, SwarmError, SwarmNode};
use tokio::sync::{Notify, watch};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 3, 10, 0, 0).unwrap()
}

struct Harness {
    clock: Arc<FixedClock>,
    platform: Arc<InMemoryPlatform>,
    calls: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(FixedClock::new(t0()));
        let platform = Arc::new(InMemoryPlatform::new(clock.clone()).with_agent_name("worker-1"));
        Self {
            clock,
            platform,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish the canonical scenario task and return its post id.
    async fn publish(&self, job_id: &str, reward: bool) -> PostId {
        let mut spec = TaskSpec::new(job_id, 3600);
        spec.skills = vec!["#SKILL_CODE".into()];
        spec.reward_karma = reward;
        spec.title = "X".into();
        let task = TaskDescriptor::new(spec, Provenance::default()).unwrap();
        self.platform
            .create_post("general", &post_title(&task), &encode(&task))
            .await
            .unwrap()
    }

    fn node(&self, settings: NodeSettings) -> SwarmNode {
        let calls = self.calls.clone();
        let handler = handler_fn(move |task: TaskDescriptor| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, HandlerError>(format!("result for {}", task.job_id()))
            }
        });
        NodeBuilder::new()
            .platform(self.platform.clone())
            .clock(self.clock.clone())
            .settings(settings)
            .register_skill(Skill::new("code", handler).with_tags(["#SKILL_CODE"]))
            .build()
            .unwrap()
    }

    fn default_node(&self) -> SwarmNode {
        self.node(NodeSettings::default())
    }

    fn records(&self, post_id: &PostId) -> Vec<ClaimRecord> {
        self.platform
            .comments(post_id)
            .iter()
            .filter_map(ClaimRecord::from_comment)
            .collect()
    }
}

#[tokio::test]
async fn claims_delivers_and_upvotes_an_open_task() {
    let h = Harness::new();
    let post_id = h.publish("t1", true).await;

    let report = h.default_node().worker().run_once().await.unwrap();

    assert_eq!(
        report,
        IterationReport {
            discovered: 1,
            eligible: 1,
            claimed: 1,
            delivered: 1,
            rewarded: 1,
            ..IterationReport::default()
        }
    );

    let comments = h.platform.comments(&post_id);
    assert_eq!(comments.len(), 2);
    assert!(comments[0].content.contains("job_id=t1"));
    assert!(comments[0].content.contains("**CLAIMING**"));
    assert!(comments[1].content.contains("job_id=t1"));
    assert!(comments[1].content.contains("**DELIVERED**"));
    assert!(comments[1].content.contains("result for t1"));
    assert_eq!(h.platform.upvotes(), vec![post_id.clone()]);

    let ledger = ClaimLedger::from_comments(&comments);
    assert_eq!(
        ledger.lease_state(&JobId::new("t1"), 3600, h.clock.now()),
        LeaseState::Terminal(DeliveryStatus::Delivered)
    );
}

#[tokio::test]
async fn active_claim_by_another_node_is_respected() {
    let h = Harness::new();
    let post_id = h.publish("t1", true).await;
    let claimed_at = (t0() - Duration::seconds(600)).to_rfc3339();
    h.platform.insert_comment(
        &post_id,
        "🐝 **CLAIMING**: `job_id=t1`\n\n*Working on it...*",
        Some(claimed_at.as_str()),
    );

    let report = h.default_node().worker().run_once().await.unwrap();

    assert_eq!(report.skipped_claimed, 1);
    assert_eq!(report.claimed, 0);
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.platform.comments(&post_id).len(), 1);
}

#[tokio::test]
async fn expired_claim_is_taken_over() {
    let h = Harness::new();
    let post_id = h.publish("t1", false).await;
    let claimed_at = (t0() - Duration::seconds(3601)).to_rfc3339();
    h.platform.insert_comment(
        &post_id,
        "🐝 **CLAIMING**: `job_id=t1`\n\n*Working on it...*",
        Some(claimed_at.as_str()),
    );

    let report = h.default_node().worker().run_once().await.unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.rewarded, 0);
    let statuses: Vec<DeliveryStatus> = h.records(&post_id).iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [DeliveryStatus::Claiming, DeliveryStatus::Claiming, DeliveryStatus::Delivered]
    );
    assert!(h.platform.upvotes().is_empty());
}

#[tokio::test]
async fn claim_without_timestamp_does_not_block_forever() {
    let h = Harness::new();
    let post_id = h.publish("t1", false).await;
    h.platform
        .insert_comment(&post_id, "🐝 **CLAIMING**: `job_id=t1`", None);

    let report = h.default_node().worker().run_once().await.unwrap();
    assert_eq!(report.delivered, 1);
}

#[tokio::test]
async fn finished_tasks_are_left_alone() {
    let h = Harness::new();
    let post_id = h.publish("t1", true).await;
    h.platform.insert_comment(
        &post_id,
        "❌ **FAILED**: `job_id=t1`\n\nout of memory\n\n---\n*Failed at 2025-02-03T09:00:00Z*",
        Some("2025-02-03T09:00:00Z"),
    );

    let report = h.default_node().worker().run_once().await.unwrap();

    assert_eq!(report.skipped_terminal, 1);
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.platform.comments(&post_id).len(), 1);
}

#[tokio::test]
async fn handler_failure_leaves_only_the_claim() {
    let h = Harness::new();
    let post_id = h.publish("t1", true).await;
    let node = NodeBuilder::new()
        .platform(h.platform.clone())
        .clock(h.clock.clone())
        .register_skill(
            Skill::new(
                "code",
                handler_fn(|_t: TaskDescriptor| async { Err::<String, _>(HandlerError::new("compiler crashed")) }),
            )
            .with_tags(["#SKILL_CODE"]),
        )
        .build()
        .unwrap();

    let report = node.worker().run_once().await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.claimed, 1);
    assert_eq!(report.delivered, 0);
    let statuses: Vec<DeliveryStatus> = h.records(&post_id).iter().map(|r| r.status).collect();
    assert_eq!(statuses, [DeliveryStatus::Claiming]);
    assert!(h.platform.upvotes().is_empty());

    // Once the lease runs out another node may pick it up.
    h.clock.advance(Duration::seconds(3601));
    let task = decode_post(&h.platform.posts()[0]).unwrap();
    let ledger = ClaimLedger::from_comments(&h.platform.comments(&post_id));
    assert!(ledger.lease_state(task.job_id(), task.claim_timeout_secs(), h.clock.now()).is_reclaimable());
}

#[tokio::test]
async fn failed_upvote_does_not_undo_the_delivery() {
    let h = Harness::new();
    let post_id = h.publish("t1", true).await;
    h.platform.fail_upvotes(true);

    let report = h.default_node().worker().run_once().await.unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.rewarded, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(h.records(&post_id).last().unwrap().status, DeliveryStatus::Delivered);
}

#[tokio::test]
async fn transport_failure_on_one_task_does_not_stop_the_others() {
    let h = Harness::new();
    let broken = h.publish("t1", false).await;
    let healthy = h.publish("t2", false).await;
    h.platform.fail_comments_on(&broken);

    let report = h.default_node().worker().run_once().await.unwrap();

    assert_eq!(report.eligible, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.delivered, 1);
    assert!(h.platform.comments(&broken).is_empty());
    assert_eq!(h.records(&healthy).len(), 2);
}

#[tokio::test]
async fn auto_claim_off_only_observes() {
    let h = Harness::new();
    let post_id = h.publish("t1", true).await;
    let node = h.node(NodeSettings {
        auto_claim: false,
        ..NodeSettings::default()
    });

    let report = node.worker().run_once().await.unwrap();

    assert_eq!(report.eligible, 1);
    assert_eq!(report.claimed, 0);
    assert!(h.platform.comments(&post_id).is_empty());
}

#[tokio::test]
async fn tasks_outside_capabilities_or_past_deadline_are_ignored() {
    let h = Harness::new();

    let mut rust = TaskSpec::new("rust-1", 3600);
    rust.skills = vec!["#SKILL_RUST".into()];
    let mut late = TaskSpec::new("late-1", 3600);
    late.skills = vec!["#SKILL_CODE".into()];
    late.deadline = Some("2025-02-03T09:59:59Z".into());
    for spec in [rust, late] {
        let task = TaskDescriptor::new(spec, Provenance::default()).unwrap();
        h.platform
            .create_post("general", &post_title(&task), &encode(&task))
            .await
            .unwrap();
    }
    h.platform
        .create_post("general", "hello", "just saying hi")
        .await
        .unwrap();

    let report = h.default_node().worker().run_once().await.unwrap();

    assert_eq!(report.discovered, 3);
    assert_eq!(report.eligible, 0);
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn process_task_reports_lease_decisions() {
    let h = Harness::new();
    let post_id = h.publish("t1", false).await;
    let node = h.default_node();
    let task = decode_post(&h.platform.posts()[0]).unwrap();

    let first = node.worker().process_task(&task).await.unwrap();
    assert!(matches!(first, TaskOutcome::Delivered { rewarded: false, .. }));

    let second = node.worker().process_task(&task).await.unwrap();
    assert_eq!(second, TaskOutcome::Terminal(DeliveryStatus::Delivered));
    assert_eq!(h.records(&post_id).len(), 2);
}

#[tokio::test]
async fn discovery_failure_is_an_iteration_error() {
    let h = Harness::new();
    h.platform.fail_feeds(true);

    let err = h.default_node().worker().run_once().await.unwrap_err();
    assert!(matches!(err, SwarmError::Platform(_)));
}

#[tokio::test]
async fn node_advertises_profile_and_stops_on_request() {
    let h = Harness::new();
    let post_id = h.publish("t1", false).await;
    let node = h.node(NodeSettings {
        description: "Writes code".into(),
        poll_interval: StdDuration::from_secs(3600),
        ..NodeSettings::default()
    });

    let handle = node.start().await;
    assert_eq!(
        h.platform.profile().as_deref(),
        Some("Writes code\n\nSkills: #SKILL_CODE")
    );

    // The first iteration runs right away; wait for its delivery.
    for _ in 0..200 {
        if h.records(&post_id).len() == 2 {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    assert_eq!(h.records(&post_id).len(), 2);

    tokio::time::timeout(StdDuration::from_secs(5), handle.shutdown_and_join())
        .await
        .expect("node stops while waiting for the next poll");
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn job_id_that_cannot_be_quoted_back_is_never_claimed() {
    let h = Harness::new();
    let body = "```json\n{\"swarm\": {\"job_id\": \"sort list\", \"skills\": [\"#SKILL_CODE\"], \"claim_timeout\": 3600}}\n```";
    let post_id = h
        .platform
        .create_post("general", "[SWARM_JOB] sort list", body)
        .await
        .unwrap();
    let node = h.default_node();

    for _ in 0..3 {
        let report = node.worker().run_once().await.unwrap();
        assert_eq!(report.discovered, 1);
        assert_eq!(report.eligible, 0);
    }
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert!(h.platform.comments(&post_id).is_empty());
}

#[rstest]
#[case::stop_flag(true)]
#[case::dropped_sender(false)]
#[tokio::test]
async fn stop_lets_the_running_task_finish_and_starts_no_other(#[case] send_stop: bool) {
    let h = Harness::new();
    let first = h.publish("t1", false).await;
    let second = h.publish("t2", false).await;

    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let handler = handler_fn({
        let (started, release, seen) = (started.clone(), release.clone(), seen.clone());
        move |task: TaskDescriptor| {
            let (started, release, seen) = (started.clone(), release.clone(), seen.clone());
            async move {
                seen.lock().unwrap().push(task.job_id().to_string());
                started.notify_one();
                release.notified().await;
                Ok::<_, HandlerError>("done".to_string())
            }
        }
    });
    let mut registry = SkillRegistry::new();
    registry.register_skill(Skill::new("code", handler).with_tags(["#SKILL_CODE"]));
    let worker = Arc::new(WorkerLoop::new(
        h.platform.clone(),
        Arc::new(registry),
        h.clock.clone(),
        NodeSettings {
            poll_interval: StdDuration::from_secs(3600),
            ..NodeSettings::default()
        },
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let join = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run(shutdown_rx).await }
    });

    tokio::time::timeout(StdDuration::from_secs(5), started.notified())
        .await
        .expect("first handler starts");
    let _kept_tx = if send_stop {
        shutdown_tx.send(true).unwrap();
        Some(shutdown_tx)
    } else {
        drop(shutdown_tx);
        None
    };
    release.notify_one();

    tokio::time::timeout(StdDuration::from_secs(5), join)
        .await
        .expect("loop exits after the running task")
        .unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    let (finished, untouched) = if seen[0] == "t1" { (first, second) } else { (second, first) };
    let statuses: Vec<DeliveryStatus> = h.records(&finished).iter().map(|r| r.status).collect();
    assert_eq!(statuses, [DeliveryStatus::Claiming, DeliveryStatus::Delivered]);
    assert!(h.platform.comments(&untouched).is_empty());
}
