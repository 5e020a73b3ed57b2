use async_trait::async_trait;

use crate::domain::{Post, PostChanges, PostId};
use crate::error::RepoError;

/// Post store - owns the canonical records and enforces post validation.
///
/// Writes validate through [`crate::domain::PostAttributes`] and return
/// [`RepoError::Invalid`] without touching stored state when that fails.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// All posts in the store's natural (ascending id) order.
    async fn list(&self) -> Result<Vec<Post>, RepoError>;

    /// Find a post by its id.
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, RepoError>;

    /// Number of stored posts.
    async fn count(&self) -> Result<u64, RepoError>;

    /// Persist a new post built from `changes`.
    async fn create(&self, changes: PostChanges) -> Result<Post, RepoError>;

    /// Apply `changes` to a previously loaded post.
    async fn update(&self, post: Post, changes: PostChanges) -> Result<Post, RepoError>;

    /// Remove a previously loaded post.
    async fn delete(&self, post: Post) -> Result<(), RepoError>;
}
