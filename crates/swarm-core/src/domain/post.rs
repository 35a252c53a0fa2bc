//! Records read from the remote platform: posts, comments, authors.
//!
//! Field names follow the platform's JSON. Everything the protocol does not
//! strictly need is optional so a sparse or partially broken record still
//! deserializes.

use serde::{Deserialize, Serialize};

use super::ids::{CommentId, PostId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,

    #[serde(default)]
    pub title: String,

    /// Markdown body. Link posts have none.
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub author: Option<Author>,

    #[serde(default)]
    pub created_at: Option<String>,
}

impl Post {
    pub fn body(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub author: Option<Author>,

    #[serde(default)]
    pub parent_id: Option<CommentId>,

    /// Platform-assigned creation time (ISO-8601 string).
    #[serde(default)]
    pub created_at: Option<String>,
}
