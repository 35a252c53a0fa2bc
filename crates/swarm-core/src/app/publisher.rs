//! TaskPublisher - posting new tasks to the swarm.

use std::sync::Arc;

use tracing::info;

use crate::codec::{encode, post_title};
use crate::config::DEFAULT_COMMUNITY;
use crate::domain::{JobId, PROTOCOL_VERSION, PostId, Provenance, TaskDescriptor, TaskSpec};
use crate::error::SwarmError;
use crate::ports::{IdGenerator, Platform, SystemClock, UlidGenerator};

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedTask {
    pub post_id: PostId,
    pub job_id: JobId,
    pub task: TaskDescriptor,
}

pub struct TaskPublisher {
    platform: Arc<dyn Platform>,
    id_generator: Box<dyn IdGenerator>,
    community: String,
}

impl TaskPublisher {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            id_generator: Box::new(UlidGenerator::new(SystemClock)),
            community: DEFAULT_COMMUNITY.to_string(),
        }
    }

    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = community.into();
        self
    }

    pub fn with_id_generator(mut self, id_generator: impl IdGenerator + 'static) -> Self {
        self.id_generator = Box::new(id_generator);
        self
    }

    /// Validate `spec` and post it. A blank job id is replaced by a fresh one.
    pub async fn publish(&self, mut spec: TaskSpec) -> Result<PublishedTask, SwarmError> {
        if spec.job_id.trim().is_empty() {
            spec.job_id = self.id_generator.generate_job_id().into_inner();
        }
        if spec.version.trim().is_empty() {
            spec.version = PROTOCOL_VERSION.to_string();
        }
        let task = TaskDescriptor::new(spec, Provenance::default())?;

        let post_id = self
            .platform
            .create_post(&self.community, &post_title(&task), &encode(&task))
            .await?;
        info!(job_id = %task.job_id(), %post_id, community = %self.community, "published task");

        Ok(PublishedTask {
            post_id,
            job_id: task.job_id().clone(),
            task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_post;
    use crate::domain::DecodeError;
    use crate::impls::InMemoryPlatform;

    #[tokio::test]
    async fn published_post_decodes_back() {
        let platform = Arc::new(InMemoryPlatform::new(Arc::new(SystemClock)));
        let publisher = TaskPublisher::new(platform.clone());

        let mut spec = TaskSpec::new("", 3600);
        spec.title = "QuickSort Implementation".into();
        spec.skills = vec!["#SKILL_CODE".into()];
        let published = publisher.publish(spec).await.unwrap();

        assert!(published.job_id.as_str().starts_with("job-"));
        let posts = platform.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "[SWARM_JOB] QuickSort Implementation");

        let decoded = decode_post(&posts[0]).unwrap();
        assert_eq!(decoded.job_id(), &published.job_id);
        assert_eq!(decoded.post_id(), Some(&published.post_id));
    }

    #[tokio::test]
    async fn invalid_spec_is_not_posted() {
        let platform = Arc::new(InMemoryPlatform::new(Arc::new(SystemClock)));
        let publisher = TaskPublisher::new(platform.clone());

        let err = publisher.publish(TaskSpec::new("j1", 0)).await.unwrap_err();
        assert!(matches!(err, SwarmError::Decode(DecodeError::Malformed(_))));
        assert!(platform.posts().is_empty());
    }

    #[tokio::test]
    async fn job_id_with_spaces_is_not_posted() {
        let platform = Arc::new(InMemoryPlatform::new(Arc::new(SystemClock)));
        let publisher = TaskPublisher::new(platform.clone());

        let err = publisher.publish(TaskSpec::new("sort list", 3600)).await.unwrap_err();
        assert!(matches!(err, SwarmError::Decode(DecodeError::Malformed(_))));
        assert!(platform.posts().is_empty());
    }
}
