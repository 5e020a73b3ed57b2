use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;

/// Store-assigned post identifier.
pub type PostId = i32;

/// Post entity - represents a blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attribute changes accepted from a client.
///
/// The outer `Option` tells whether the field was submitted at all; the inner
/// one carries an explicit `null`. Fields left at `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostChanges {
    pub title: Option<Option<String>>,
    pub content: Option<Option<String>>,
}

/// Writable attributes of a post with pending changes applied, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PostDraft {
    /// Overlay `changes` on this draft.
    pub fn apply(mut self, changes: PostChanges) -> Self {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        self
    }

    /// Check the draft against the post invariants.
    pub fn validate(self) -> Result<PostAttributes, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = match self.title {
            Some(title) if !title.trim().is_empty() => title,
            _ => {
                errors.add("title", "can't be blank");
                String::new()
            }
        };

        errors.into_result()?;

        Ok(PostAttributes {
            title,
            content: self.content,
        })
    }
}

impl From<&Post> for PostDraft {
    fn from(post: &Post) -> Self {
        Self {
            title: Some(post.title.clone()),
            content: post.content.clone(),
        }
    }
}

/// Validated writable attributes - the only values a store may persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAttributes {
    pub title: String,
    pub content: Option<String>,
}

impl PostAttributes {
    /// Validate `changes` as a brand new post.
    pub fn for_create(changes: PostChanges) -> Result<Self, ValidationErrors> {
        PostDraft::default().apply(changes).validate()
    }

    /// Validate `changes` applied on top of an existing post.
    pub fn for_update(post: &Post, changes: PostChanges) -> Result<Self, ValidationErrors> {
        PostDraft::from(post).apply(changes).validate()
    }

    /// Whether writing these attributes would leave `post` as it is.
    pub fn matches(&self, post: &Post) -> bool {
        self.title == post.title && self.content == post.content
    }

    /// Build a fresh post from these attributes.
    pub fn into_post(self, id: PostId, now: DateTime<Utc>) -> Post {
        Post {
            id,
            title: self.title,
            content: self.content,
            created_at: now,
            updated_at: now,
        }
    }

    /// Write these attributes onto `post`, refreshing `updated_at`.
    pub fn assign_to(self, post: &mut Post, now: DateTime<Utc>) {
        post.title = self.title;
        post.content = self.content;
        post.updated_at = now;
    }
}
