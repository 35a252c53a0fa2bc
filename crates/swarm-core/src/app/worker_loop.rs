//! WorkerLoop - discover, filter, lease, claim, execute, deliver.
//!
//! # Flow (one iteration)
//! 1. Read the personalized and the global feed
//! 2. Decode every post; non-tasks and expired tasks are dropped
//! 3. Keep tasks matching this node's capabilities and registry
//! 4. Per task, sequentially: read the comment ledger, derive the lease,
//!    append a claim if reclaimable, run the handler, append the delivery,
//!    upvote when a reward was offered
//!
//! A failure while processing one task is logged and the loop moves on to
//! the next one. A failing handler leaves only its claim behind; no `FAILED`
//! record is written, so the task becomes reclaimable once the lease expires.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::status::IterationReport;
use crate::codec::decode_post;
use crate::config::NodeConfig;
use crate::domain::{
    CommentId, DecodeError, Delivery, DeliveryStatus, HandlerError, LeaseState, Post, PostId,
    TaskDescriptor,
};
use crate::error::SwarmError;
use crate::ledger::ClaimLedger;
use crate::ports::{Clock, CommentSort, FeedSort, Platform, PlatformError};
use crate::skills::{SkillHandler, SkillRegistry};

/// Node settings consumed by the loop. Fixed for the lifetime of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSettings {
    pub name: String,
    pub description: String,
    /// Capability tags a task must intersect. Empty means "use the registry's tags".
    pub capabilities: Vec<String>,
    pub poll_interval: Duration,
    pub auto_claim: bool,
    /// Upvote posts whose task offers a reputation reward.
    pub reward_reputation: bool,
    pub feed_limit: usize,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self::from_config(&NodeConfig::default())
    }
}

impl NodeSettings {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            capabilities: config.skills.clone(),
            poll_interval: config.check_interval(),
            auto_claim: config.auto_claim,
            reward_reputation: config.reward_reputation,
            feed_limit: config.feed_limit,
        }
    }
}

/// What happened to one eligible task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Claimed, executed and delivered.
    Delivered { comment_id: CommentId, rewarded: bool },
    /// Someone holds a claim that has not expired yet.
    AlreadyClaimed { started_at: DateTime<Utc> },
    /// A delivered/failed record already exists.
    Terminal(DeliveryStatus),
    /// Nothing in the registry matches any longer.
    NoHandler,
}

pub struct WorkerLoop {
    platform: Arc<dyn Platform>,
    registry: Arc<SkillRegistry>,
    clock: Arc<dyn Clock>,
    settings: NodeSettings,
}

impl WorkerLoop {
    pub fn new(
        platform: Arc<dyn Platform>,
        registry: Arc<SkillRegistry>,
        clock: Arc<dyn Clock>,
        settings: NodeSettings,
    ) -> Self {
        Self {
            platform,
            registry,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &NodeSettings {
        &self.settings
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// Posts from both feeds, personalized first, each post once.
    ///
    /// One failing feed is tolerated; only when both fail is discovery an error.
    pub async fn discover(&self) -> Result<Vec<Post>, PlatformError> {
        let limit = self.settings.feed_limit;
        let personalized = self.platform.get_personalized_feed(FeedSort::New, limit).await;
        let global = self.platform.get_feed(FeedSort::New, limit, None).await;

        let feeds = match (personalized, global) {
            (Err(e), Err(_)) => return Err(e),
            (personalized, global) => [("personalized", personalized), ("global", global)],
        };

        let mut seen = HashSet::new();
        let mut posts = Vec::new();
        for (feed, result) in feeds {
            match result {
                Ok(batch) => posts.extend(batch.into_iter().filter(|p| seen.insert(p.id.clone()))),
                Err(e) => warn!(feed, error = %e, "feed read failed"),
            }
        }
        Ok(posts)
    }

    /// Capability filter: the task must intersect this node's advertised tags
    /// and some registered skill.
    pub fn is_eligible(&self, task: &TaskDescriptor) -> bool {
        let skills = task.required_skills();
        let capable = if self.settings.capabilities.is_empty() {
            true
        } else {
            task.matches_skills(&self.settings.capabilities)
        };
        capable && self.registry.can_handle(skills)
    }

    /// Run the claim protocol and the handler for one task.
    ///
    /// Claiming is optimistic: the ledger read and the claim append are two
    /// separate remote calls, so a concurrent node may claim in between.
    pub async fn process_task(&self, task: &TaskDescriptor) -> Result<TaskOutcome, SwarmError> {
        let job_id = task.job_id();
        let post_id = source_post(task)?;

        let comments = self.platform.get_comments(post_id, CommentSort::New).await?;
        let ledger = ClaimLedger::from_comments(&comments);
        match ledger.lease_state(job_id, task.claim_timeout_secs(), self.clock.now()) {
            LeaseState::Terminal(status) => {
                debug!(%job_id, ?status, "task already finished");
                return Ok(TaskOutcome::Terminal(status));
            }
            LeaseState::Active { started_at } => {
                info!(%job_id, %started_at, "task already claimed");
                return Ok(TaskOutcome::AlreadyClaimed { started_at });
            }
            LeaseState::Expired { started_at } => {
                info!(%job_id, ?started_at, "claim expired, reclaiming");
            }
            LeaseState::Unclaimed => {}
        }

        let Some(skill) = self.registry.find_skill(task.required_skills()) else {
            warn!(%job_id, "no handler found");
            return Ok(TaskOutcome::NoHandler);
        };
        let skill_name = skill.name().to_string();

        let claim = Delivery::claiming(job_id.clone(), self.clock.now());
        self.platform.add_comment(post_id, &claim.to_comment(), None).await?;
        info!(%job_id, %post_id, skill = %skill_name, "claimed task");

        let result = run_handler(skill.handler(), task.clone()).await?;

        let delivery = Delivery::delivered(job_id.clone(), result, self.clock.now());
        let comment_id = self
            .platform
            .add_comment(post_id, &delivery.to_comment(), None)
            .await?;
        info!(%job_id, %post_id, %comment_id, "delivered task");

        let rewarded = if task.rewards_reputation() && self.settings.reward_reputation {
            self.reward(task, post_id).await
        } else {
            false
        };

        Ok(TaskOutcome::Delivered { comment_id, rewarded })
    }

    // Best effort: the delivery stands whether or not the upvote lands.
    async fn reward(&self, task: &TaskDescriptor, post_id: &PostId) -> bool {
        match self.platform.upvote_post(post_id).await {
            Ok(()) => {
                info!(job_id = %task.job_id(), %post_id, "upvoted task");
                true
            }
            Err(e) => {
                warn!(job_id = %task.job_id(), %post_id, error = %e, "failed to upvote");
                false
            }
        }
    }

    /// One full iteration, never interrupted.
    pub async fn run_once(&self) -> Result<IterationReport, SwarmError> {
        self.iterate(|| false).await
    }

    /// One iteration; `should_stop` is polled before each task.
    async fn iterate<F>(&self, should_stop: F) -> Result<IterationReport, SwarmError>
    where
        F: Fn() -> bool,
    {
        let posts = self.discover().await?;
        let now = self.clock.now();
        let mut report = IterationReport {
            discovered: posts.len(),
            ..IterationReport::default()
        };

        let tasks = posts.iter().filter_map(|post| match decode_post(post) {
            Ok(task) if task.is_expired(now) => {
                debug!(job_id = %task.job_id(), "task past its deadline");
                None
            }
            Ok(task) => Some(task),
            Err(DecodeError::NoEnvelope) => None,
            Err(e) => {
                debug!(post_id = %post.id, error = %e, "skipping undecodable post");
                None
            }
        });

        for task in tasks {
            if !self.is_eligible(&task) {
                continue;
            }
            report.eligible += 1;

            if !self.settings.auto_claim {
                info!(job_id = %task.job_id(), title = task.title(), "found task (auto_claim disabled)");
                continue;
            }
            if should_stop() {
                info!("stop requested, leaving remaining tasks");
                break;
            }

            match self.process_task(&task).await {
                Ok(TaskOutcome::Delivered { rewarded, .. }) => {
                    report.claimed += 1;
                    report.delivered += 1;
                    if rewarded {
                        report.rewarded += 1;
                    }
                }
                Ok(TaskOutcome::AlreadyClaimed { .. }) => report.skipped_claimed += 1,
                Ok(TaskOutcome::Terminal(_)) => report.skipped_terminal += 1,
                Ok(TaskOutcome::NoHandler) => {}
                Err(e) => {
                    // A handler only runs after its claim was appended.
                    if matches!(e, SwarmError::Handler(_)) {
                        report.claimed += 1;
                    }
                    report.failed += 1;
                    error!(job_id = %task.job_id(), kind = %e.kind(), error = %e, "error processing task");
                }
            }
        }

        Ok(report)
    }

    /// Iterate until `shutdown_rx` turns true (or its sender is dropped).
    ///
    /// The flag is checked before each iteration and between tasks; an
    /// iteration in progress, including a running handler, is never cut short.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            node = %self.settings.name,
            tags = ?self.registry.tags(),
            interval_secs = self.settings.poll_interval.as_secs(),
            "worker loop started"
        );

        loop {
            if stop_requested(&shutdown_rx) {
                break;
            }

            let stop_rx = shutdown_rx.clone();
            match self.iterate(|| stop_requested(&stop_rx)).await {
                Ok(report) => info!(
                    discovered = report.discovered,
                    eligible = report.eligible,
                    delivered = report.delivered,
                    skipped_claimed = report.skipped_claimed,
                    skipped_terminal = report.skipped_terminal,
                    failed = report.failed,
                    "iteration finished"
                ),
                Err(e) => error!(kind = %e.kind(), error = %e, "error in work loop"),
            }

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        info!(node = %self.settings.name, "worker loop stopped");
    }
}

// A dropped sender counts as a stop request.
fn stop_requested(rx: &watch::Receiver<bool>) -> bool {
    let stop = *rx.borrow();
    stop || rx.has_changed().is_err()
}

fn source_post(task: &TaskDescriptor) -> Result<&PostId, SwarmError> {
    task.post_id()
        .ok_or_else(|| DecodeError::Malformed(format!("task {} has no source post", task.job_id())).into())
}

// Runs on its own tokio task so a panicking handler is reported like any
// other handler failure.
async fn run_handler(handler: Arc<dyn SkillHandler>, task: TaskDescriptor) -> Result<String, HandlerError> {
    tokio::spawn(async move { handler.handle(&task).await })
        .await
        .unwrap_or_else(|e| Err(HandlerError::new(format!("handler panicked: {e}"))))
}
