//! InMemoryPlatform - `Platform` kept in process memory.
//!
//! Used by tests and for local dry runs. Comments are append-only and stamped
//! from the injected `Clock`, just like the real platform stamps them. A few
//! switches make individual operations fail so error paths can be driven.
//!
//! # Example
//! ```ignore
//! let clock = Arc::new(FixedClock::new(t0));
//! let platform = InMemoryPlatform::new(clock.clone());
//! let post_id = platform.create_post("general", "[SWARM_JOB] X", &body).await?;
//! platform.fail_upvotes(true);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::SecondsFormat;

use crate::domain::{Author, Comment, CommentId, Post, PostId};
use crate::ports::{Clock, CommentSort, FeedSort, Platform, PlatformError};

const DEFAULT_AGENT_NAME: &str = "local-agent";

#[derive(Debug, Clone)]
struct StoredPost {
    community: String,
    post: Post,
}

#[derive(Debug, Default)]
struct State {
    posts: Vec<StoredPost>,
    personalized: Vec<Post>,
    comments: HashMap<PostId, Vec<Comment>>,
    upvotes: Vec<PostId>,
    profile: Option<String>,
    next_id: u64,
    failing_comment_posts: HashSet<PostId>,
    fail_upvotes: bool,
    fail_feeds: bool,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn knows(&self, post_id: &PostId) -> bool {
        self.posts.iter().any(|p| &p.post.id == post_id)
            || self.personalized.iter().any(|p| &p.id == post_id)
    }
}

pub struct InMemoryPlatform {
    agent_name: String,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl InMemoryPlatform {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            clock,
            state: Mutex::new(State::default()),
        }
    }

    /// Name written as the author of posts and comments made through this value.
    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = name.into();
        self
    }

    // Nothing panics while the lock is held, but a poisoned state is still usable.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn now_string(&self) -> String {
        self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn author(&self) -> Option<Author> {
        Some(Author {
            name: self.agent_name.clone(),
            description: None,
        })
    }

    /// Seed a post into the global feed of `community`.
    pub fn insert_post(&self, community: &str, post: Post) {
        self.state().posts.push(StoredPost {
            community: community.to_string(),
            post,
        });
    }

    /// Seed a post that only shows up in the personalized feed.
    pub fn insert_personalized_post(&self, post: Post) {
        self.state().personalized.push(post);
    }

    /// Seed a comment with an explicit timestamp (`None` leaves it unset).
    pub fn insert_comment(&self, post_id: &PostId, content: &str, created_at: Option<&str>) -> CommentId {
        let mut state = self.state();
        let id = CommentId::new(state.next_id("c"));
        state.comments.entry(post_id.clone()).or_default().push(Comment {
            id: id.clone(),
            content: content.to_string(),
            author: None,
            parent_id: None,
            created_at: created_at.map(str::to_string),
        });
        id
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state().posts.iter().map(|p| p.post.clone()).collect()
    }

    /// Comments on a post in the order they were appended.
    pub fn comments(&self, post_id: &PostId) -> Vec<Comment> {
        self.state().comments.get(post_id).cloned().unwrap_or_default()
    }

    pub fn upvotes(&self) -> Vec<PostId> {
        self.state().upvotes.clone()
    }

    pub fn profile(&self) -> Option<String> {
        self.state().profile.clone()
    }

    /// Make `add_comment` fail for one post.
    pub fn fail_comments_on(&self, post_id: &PostId) {
        self.state().failing_comment_posts.insert(post_id.clone());
    }

    pub fn fail_upvotes(&self, fail: bool) {
        self.state().fail_upvotes = fail;
    }

    /// Make both feed reads fail.
    pub fn fail_feeds(&self, fail: bool) {
        self.state().fail_feeds = fail;
    }
}

fn unavailable(what: &str) -> PlatformError {
    PlatformError::Http {
        status: 503,
        message: format!("{what} unavailable"),
    }
}

fn not_found(post_id: &PostId) -> PlatformError {
    PlatformError::Http {
        status: 404,
        message: format!("post {post_id} not found"),
    }
}

// Newest first, like the platform's `new` ordering.
fn newest_first(mut posts: Vec<Post>, limit: usize) -> Vec<Post> {
    posts.reverse();
    posts.truncate(limit);
    posts
}

#[async_trait]
impl Platform for InMemoryPlatform {
    async fn create_post(&self, community: &str, title: &str, body: &str) -> Result<PostId, PlatformError> {
        let created_at = self.now_string();
        let author = self.author();
        let mut state = self.state();
        let id = PostId::new(state.next_id("p"));
        state.posts.push(StoredPost {
            community: community.to_string(),
            post: Post {
                id: id.clone(),
                title: title.to_string(),
                content: Some(body.to_string()),
                author,
                created_at: Some(created_at),
            },
        });
        Ok(id)
    }

    async fn get_feed(
        &self,
        _sort: FeedSort,
        limit: usize,
        community: Option<&str>,
    ) -> Result<Vec<Post>, PlatformError> {
        let state = self.state();
        if state.fail_feeds {
            return Err(unavailable("feed"));
        }
        let posts = state
            .posts
            .iter()
            .filter(|p| community.is_none_or(|c| p.community == c))
            .map(|p| p.post.clone())
            .collect();
        Ok(newest_first(posts, limit))
    }

    async fn get_personalized_feed(&self, _sort: FeedSort, limit: usize) -> Result<Vec<Post>, PlatformError> {
        let state = self.state();
        if state.fail_feeds {
            return Err(unavailable("personalized feed"));
        }
        Ok(newest_first(state.personalized.clone(), limit))
    }

    async fn get_comments(&self, post_id: &PostId, sort: CommentSort) -> Result<Vec<Comment>, PlatformError> {
        let state = self.state();
        if !state.knows(post_id) {
            return Err(not_found(post_id));
        }
        let mut comments = state.comments.get(post_id).cloned().unwrap_or_default();
        if sort == CommentSort::New {
            comments.reverse();
        }
        Ok(comments)
    }

    async fn add_comment(
        &self,
        post_id: &PostId,
        body: &str,
        parent_id: Option<&CommentId>,
    ) -> Result<CommentId, PlatformError> {
        let created_at = self.now_string();
        let author = self.author();
        let mut state = self.state();
        if !state.knows(post_id) {
            return Err(not_found(post_id));
        }
        if state.failing_comment_posts.contains(post_id) {
            return Err(unavailable("comments"));
        }
        let id = CommentId::new(state.next_id("c"));
        state.comments.entry(post_id.clone()).or_default().push(Comment {
            id: id.clone(),
            content: body.to_string(),
            author,
            parent_id: parent_id.cloned(),
            created_at: Some(created_at),
        });
        Ok(id)
    }

    async fn upvote_post(&self, post_id: &PostId) -> Result<(), PlatformError> {
        let mut state = self.state();
        if state.fail_upvotes {
            return Err(unavailable("upvote"));
        }
        if !state.knows(post_id) {
            return Err(not_found(post_id));
        }
        state.upvotes.push(post_id.clone());
        Ok(())
    }

    async fn update_profile(&self, description: &str) -> Result<(), PlatformError> {
        self.state().profile = Some(description.to_string());
        Ok(())
    }
}
