//! In-memory post store - used when no database is configured, and in tests.
//!
//! Note: Data is lost on process restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use posts_core::domain::{Post, PostAttributes, PostChanges, PostId};
use posts_core::error::RepoError;
use posts_core::ports::PostRepository;

#[derive(Default)]
struct Table {
    rows: BTreeMap<PostId, Post>,
    last_id: PostId,
}

/// In-memory post repository backed by an ordered map behind an async RwLock.
#[derive(Default)]
pub struct InMemoryPostRepository {
    table: RwLock<Table>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn list(&self) -> Result<Vec<Post>, RepoError> {
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, RepoError> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn count(&self) -> Result<u64, RepoError> {
        let table = self.table.read().await;
        Ok(table.rows.len() as u64)
    }

    async fn create(&self, changes: PostChanges) -> Result<Post, RepoError> {
        let attrs = PostAttributes::for_create(changes)?;

        let mut table = self.table.write().await;
        let id = table
            .last_id
            .checked_add(1)
            .ok_or_else(|| RepoError::Query("post id sequence exhausted".to_string()))?;
        table.last_id = id;

        let post = attrs.into_post(id, Utc::now());
        table.rows.insert(id, post.clone());

        tracing::debug!(post_id = id, "Inserted post");
        Ok(post)
    }

    async fn update(&self, post: Post, changes: PostChanges) -> Result<Post, RepoError> {
        let mut table = self.table.write().await;
        let stored = table.rows.get_mut(&post.id).ok_or(RepoError::NotFound)?;

        let attrs = PostAttributes::for_update(stored, changes)?;
        if !attrs.matches(stored) {
            attrs.assign_to(stored, Utc::now());
            tracing::debug!(post_id = post.id, "Updated post");
        }

        Ok(stored.clone())
    }

    async fn delete(&self, post: Post) -> Result<(), RepoError> {
        let mut table = self.table.write().await;
        table.rows.remove(&post.id).ok_or(RepoError::NotFound)?;

        tracing::debug!(post_id = post.id, "Deleted post");
        Ok(())
    }
}
