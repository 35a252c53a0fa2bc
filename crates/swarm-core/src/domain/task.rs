//! Task descriptors: the unit of work a publisher posts and a worker executes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::capability;
use super::errors::DecodeError;
use super::ids::{JobId, PostId};
use super::post::Post;
use super::timestamp::parse_timestamp;

/// Public URL prefix for posts on the platform.
pub const POST_URL_BASE: &str = "https://www.moltbook.com/posts";

/// Protocol version written by this implementation.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Unvalidated task fields, as a publisher writes them or as they come off the wire.
///
/// `TaskDescriptor::new` turns this into the immutable, validated form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub version: String,
    pub job_id: String,
    pub task_type: String,
    pub skills: Vec<String>,
    pub reward_karma: bool,
    pub claim_timeout: i64,
    pub deadline: Option<String>,
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub output_format: String,
    pub validation: String,
}

impl TaskSpec {
    /// Minimal spec with the current protocol version.
    pub fn new(job_id: impl Into<String>, claim_timeout: i64) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            job_id: job_id.into(),
            claim_timeout,
            ..Self::default()
        }
    }
}

/// Where a decoded task came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub post_id: Option<PostId>,
    pub post_url: String,
    pub author_name: String,
}

impl Provenance {
    pub fn from_post(post: &Post) -> Self {
        Self {
            post_id: Some(post.id.clone()),
            post_url: format!("{POST_URL_BASE}/{}", post.id),
            author_name: post.author_name().to_string(),
        }
    }
}

/// A validated task. Never mutated after construction.
///
/// Invariants: `job_id` is not blank, holds no whitespace, backtick or
/// double quote, and `claim_timeout_secs > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescriptor {
    job_id: JobId,
    protocol_version: String,
    task_type: String,
    required_skills: Vec<String>,
    rewards_reputation: bool,
    claim_timeout_secs: u64,
    deadline: Option<String>,
    title: String,
    description: String,
    requirements: Vec<String>,
    output_format: String,
    validation_note: String,
    provenance: Provenance,
}

impl TaskDescriptor {
    /// Validate a spec. Bad values are rejected, never defaulted.
    pub fn new(spec: TaskSpec, provenance: Provenance) -> Result<Self, DecodeError> {
        let job_id = JobId::new(spec.job_id);
        if job_id.is_blank() {
            return Err(DecodeError::Malformed("job_id is empty".to_string()));
        }
        // Claim comments quote the id as `job_id=<id>`; it has to read back as one token.
        if job_id.as_str().chars().any(|c| c.is_whitespace() || c == '`' || c == '"') {
            return Err(DecodeError::Malformed(format!(
                "job_id {:?} contains whitespace or quotes",
                job_id.as_str()
            )));
        }
        if spec.claim_timeout <= 0 {
            return Err(DecodeError::Malformed(format!(
                "claim_timeout must be positive, got {}",
                spec.claim_timeout
            )));
        }

        Ok(Self {
            job_id,
            protocol_version: spec.version,
            task_type: spec.task_type,
            required_skills: spec.skills,
            rewards_reputation: spec.reward_karma,
            claim_timeout_secs: spec.claim_timeout.unsigned_abs(),
            deadline: spec.deadline,
            title: spec.title,
            description: spec.description,
            requirements: spec.requirements,
            output_format: spec.output_format,
            validation_note: spec.validation,
            provenance,
        })
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn required_skills(&self) -> &[String] {
        &self.required_skills
    }

    pub fn rewards_reputation(&self) -> bool {
        self.rewards_reputation
    }

    pub fn claim_timeout_secs(&self) -> u64 {
        self.claim_timeout_secs
    }

    pub fn deadline(&self) -> Option<&str> {
        self.deadline.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn output_format(&self) -> &str {
        &self.output_format
    }

    pub fn validation_note(&self) -> &str {
        &self.validation_note
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn post_id(&self) -> Option<&PostId> {
        self.provenance.post_id.as_ref()
    }

    pub fn post_url(&self) -> &str {
        &self.provenance.post_url
    }

    pub fn author_name(&self) -> &str {
        &self.provenance.author_name
    }

    /// `true` only when a deadline is set, parses, and lies strictly before `now`.
    ///
    /// An unparsable deadline fails open: the task stays live.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline
            .as_deref()
            .and_then(parse_timestamp)
            .is_some_and(|deadline| deadline < now)
    }

    /// Any-of match between the required skills and `available` tags.
    pub fn matches_skills<S: AsRef<str>>(&self, available: &[S]) -> bool {
        capability::intersects(&self.required_skills, available)
    }

    /// Back to an unvalidated spec, e.g. for re-encoding.
    pub fn to_spec(&self) -> TaskSpec {
        TaskSpec {
            version: self.protocol_version.clone(),
            job_id: self.job_id.to_string(),
            task_type: self.task_type.clone(),
            skills: self.required_skills.clone(),
            reward_karma: self.rewards_reputation,
            claim_timeout: i64::try_from(self.claim_timeout_secs).unwrap_or(i64::MAX),
            deadline: self.deadline.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            requirements: self.requirements.clone(),
            output_format: self.output_format.clone(),
            validation: self.validation_note.clone(),
        }
    }
}
