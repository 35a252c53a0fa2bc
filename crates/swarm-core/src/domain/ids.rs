//! Domain identifiers (strongly-typed IDs).
//!
//! Every identifier in the swarm protocol is an opaque string minted by someone
//! else: job ids by the publisher of a task, post and comment ids by the remote
//! platform. `Id<T>` keeps them apart at compile time while staying a plain
//! string on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for the different identifier kinds.
pub trait IdMarker: Send + Sync + 'static {
    /// Human readable kind, used in debug output.
    fn kind() -> &'static str;
}

/// Generic string identifier.
///
/// `T` only exists at compile time; a `JobId` can never be passed where a
/// `PostId` is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ========================================
// Markers
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {}

impl IdMarker for Job {
    fn kind() -> &'static str {
        "job"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Post {}

impl IdMarker for Post {
    fn kind() -> &'static str {
        "post"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Comment {}

impl IdMarker for Comment {
    fn kind() -> &'static str {
        "comment"
    }
}

/// Identifier of one task instance, carried through every claim/delivery record.
pub type JobId = Id<Job>;

/// Identifier of a post on the remote platform.
pub type PostId = Id<Post>;

/// Identifier of a comment on the remote platform.
pub type CommentId = Id<Comment>;
