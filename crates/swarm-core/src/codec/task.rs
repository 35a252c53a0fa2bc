//! Task Codec - task descriptors to and from post bodies.
//!
//! A task post is free markdown carrying one fenced `json` block:
//!
//! ```text
//! {
//!   "swarm": { "version", "job_id", "type", "skills", "reward_karma", "claim_timeout", "deadline"? },
//!   "task":  { "title", "description", "requirements", "output_format", "validation" }   (optional)
//! }
//! ```
//!
//! Only the first fenced json block of a body is considered, even when a later
//! one would decode.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::{DecodeError, PROTOCOL_VERSION, Post, Provenance, TaskDescriptor, TaskSpec};

static ENVELOPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("valid regex"));

/// Title prefix of task posts.
pub const JOB_TITLE_PREFIX: &str = "[SWARM_JOB]";

#[derive(Debug, Deserialize)]
struct WireEnvelope {
    swarm: WireSwarm,
    #[serde(default)]
    task: Option<WireTask>,
}

#[derive(Debug, Deserialize)]
struct WireSwarm {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    job_id: String,
    #[serde(rename = "type", default = "default_task_type")]
    task_type: String,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    reward_karma: bool,
    #[serde(default)]
    claim_timeout: Option<i64>,
    #[serde(default)]
    deadline: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireTask {
    title: String,
    description: String,
    requirements: Vec<String>,
    output_format: String,
    validation: String,
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}

fn default_task_type() -> String {
    "unknown".to_string()
}

impl WireEnvelope {
    fn into_spec(self) -> Result<TaskSpec, DecodeError> {
        let claim_timeout = self
            .swarm
            .claim_timeout
            .ok_or_else(|| DecodeError::Malformed("claim_timeout is missing".to_string()))?;
        let task = self.task.unwrap_or_default();
        Ok(TaskSpec {
            version: self.swarm.version,
            job_id: self.swarm.job_id,
            task_type: self.swarm.task_type,
            skills: self.swarm.skills,
            reward_karma: self.swarm.reward_karma,
            claim_timeout,
            deadline: self.swarm.deadline,
            title: task.title,
            description: task.description,
            requirements: task.requirements,
            output_format: task.output_format,
            validation: task.validation,
        })
    }
}

/// Locate the first fenced json block of a body.
pub fn extract_envelope(body: &str) -> Result<&str, DecodeError> {
    ENVELOPE_REGEX
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(DecodeError::NoEnvelope)
}

/// Strict decode of a post body.
pub fn decode_body(body: &str, provenance: Provenance) -> Result<TaskDescriptor, DecodeError> {
    let raw = extract_envelope(body)?;
    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    if value.get("swarm").is_none_or(Value::is_null) {
        return Err(DecodeError::MissingSwarmSection);
    }
    let envelope: WireEnvelope =
        serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    TaskDescriptor::new(envelope.into_spec()?, provenance)
}

/// Strict decode of a platform post, filling provenance from the post.
pub fn decode_post(post: &Post) -> Result<TaskDescriptor, DecodeError> {
    decode_body(post.body(), Provenance::from_post(post))
}

/// Soft decode: any failure means "not a task".
pub fn decode(post: &Post) -> Option<TaskDescriptor> {
    decode_post(post).ok()
}

/// Title used when publishing a task post.
pub fn post_title(task: &TaskDescriptor) -> String {
    format!("{JOB_TITLE_PREFIX} {}", defuse_fences(task.title()))
}

/// Deterministic post body for a task.
///
/// Every field travels inside the json block, so prose fields survive
/// `decode_body(encode(t))` byte for byte. Backticks inside the block are
/// written as `\u0060` so no string value can close the fence early.
pub fn encode(task: &TaskDescriptor) -> String {
    let mut swarm = json!({
        "version": task.protocol_version(),
        "job_id": task.job_id().as_str(),
        "type": task.task_type(),
        "skills": task.required_skills(),
        "reward_karma": task.rewards_reputation(),
        "claim_timeout": task.claim_timeout_secs(),
    });
    if let Some(deadline) = task.deadline() {
        swarm["deadline"] = json!(deadline);
    }
    let envelope = json!({
        "swarm": swarm,
        "task": {
            "title": task.title(),
            "description": task.description(),
            "requirements": task.requirements(),
            "output_format": task.output_format(),
            "validation": task.validation_note(),
        },
    });
    let block = format!("{envelope:#}").replace('`', "\\u0060");

    let reward = if task.rewards_reputation() {
        "Karma upvote"
    } else {
        "No reward"
    };

    format!(
        "# {title}\n\n{description}\n\n```json\n{block}\n```\n\n**Skills needed:** {skills}\n**Reward:** {reward}\n**Timeout:** {minutes} minutes to claim\n",
        title = post_title(task),
        description = defuse_fences(task.description()),
        skills = task.required_skills().join(" "),
        minutes = task.claim_timeout_secs() / 60,
    )
}

// Prose is cosmetic; keep it from opening a fence ahead of the real block.
fn defuse_fences(text: &str) -> String {
    text.replace("```", "'''")
}
