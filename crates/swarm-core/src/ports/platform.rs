//! Platform port - the remote social platform the swarm coordinates through.
//!
//! Posts carry tasks, comments carry claims and deliveries. Implementations
//! are expected to resolve rate limiting themselves (pause and retry the same
//! call); everything else is reported as a `PlatformError` and treated by the
//! worker loop as a per-task soft failure.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Comment, CommentId, Post, PostId};

/// Feed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedSort {
    Hot,
    #[default]
    New,
    Top,
    Rising,
}

impl FeedSort {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedSort::Hot => "hot",
            FeedSort::New => "new",
            FeedSort::Top => "top",
            FeedSort::Rising => "rising",
        }
    }
}

/// Comment ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSort {
    Top,
    #[default]
    New,
    Controversial,
}

impl CommentSort {
    pub fn as_str(self) -> &'static str {
        match self {
            CommentSort::Top => "top",
            CommentSort::New => "new",
            CommentSort::Controversial => "controversial",
        }
    }
}

/// Remote call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// Network or TLS failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// Still rate limited after the retry budget was spent.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The platform answered `success: false`.
    #[error("api error: {0}")]
    Api(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Operations the node consumes.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn create_post(&self, community: &str, title: &str, body: &str) -> Result<PostId, PlatformError>;

    async fn get_feed(
        &self,
        sort: FeedSort,
        limit: usize,
        community: Option<&str>,
    ) -> Result<Vec<Post>, PlatformError>;

    async fn get_personalized_feed(&self, sort: FeedSort, limit: usize) -> Result<Vec<Post>, PlatformError>;

    async fn get_comments(&self, post_id: &PostId, sort: CommentSort) -> Result<Vec<Comment>, PlatformError>;

    async fn add_comment(
        &self,
        post_id: &PostId,
        body: &str,
        parent_id: Option<&CommentId>,
    ) -> Result<CommentId, PlatformError>;

    async fn upvote_post(&self, post_id: &PostId) -> Result<(), PlatformError>;

    async fn update_profile(&self, description: &str) -> Result<(), PlatformError>;
}
