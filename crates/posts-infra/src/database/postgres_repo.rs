//! PostgreSQL post store built on SeaORM.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{
    ActiveModelTrait, DbConn, DbErr, EntityTrait, PaginatorTrait, QueryOrder, SqlErr,
};

use posts_core::domain::{Post, PostAttributes, PostChanges, PostId};
use posts_core::error::RepoError;
use posts_core::ports::PostRepository;

use super::entity::post::{self, Entity as PostEntity};

/// PostgreSQL post repository.
pub struct SeaOrmPostRepository {
    pub(super) db: DbConn,
}

impl SeaOrmPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

pub(super) fn read_error(err: DbErr) -> RepoError {
    match err {
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        other => RepoError::Query(other.to_string()),
    }
}

pub(super) fn write_error(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg))
        | Some(SqlErr::ForeignKeyConstraintViolation(msg)) => RepoError::Constraint(msg),
        _ => read_error(err),
    }
}

#[async_trait]
impl PostRepository for SeaOrmPostRepository {
    async fn list(&self) -> Result<Vec<Post>, RepoError> {
        let models = PostEntity::find()
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await
            .map_err(read_error)?;

        tracing::debug!(count = models.len(), "Loaded posts");
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, RepoError> {
        tracing::debug!(post_id = id, "Finding post by id");

        let model = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(read_error)?;

        Ok(model.map(Into::into))
    }

    async fn count(&self) -> Result<u64, RepoError> {
        PostEntity::find().count(&self.db).await.map_err(read_error)
    }

    async fn create(&self, changes: PostChanges) -> Result<Post, RepoError> {
        let attrs = PostAttributes::for_create(changes)?;
        let now = Utc::now();

        let model = post::ActiveModel {
            title: Set(attrs.title),
            content: Set(attrs.content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(write_error)?;

        tracing::debug!(post_id = model.id, "Inserted post");
        Ok(model.into())
    }

    async fn update(&self, post: Post, changes: PostChanges) -> Result<Post, RepoError> {
        let attrs = PostAttributes::for_update(&post, changes)?;
        if attrs.matches(&post) {
            return Ok(post);
        }

        // Only columns that differ from the loaded copy are written.
        let mut model = post::ActiveModel {
            id: Unchanged(post.id),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };
        if attrs.title != post.title {
            model.title = Set(attrs.title);
        }
        if attrs.content != post.content {
            model.content = Set(attrs.content);
        }

        let result = model.update(&self.db).await;

        match result {
            Ok(model) => {
                tracing::debug!(post_id = model.id, "Updated post");
                Ok(model.into())
            }
            Err(DbErr::RecordNotUpdated) => Err(RepoError::NotFound),
            Err(e) => Err(write_error(e)),
        }
    }

    async fn delete(&self, post: Post) -> Result<(), RepoError> {
        let result = PostEntity::delete_by_id(post.id)
            .exec(&self.db)
            .await
            .map_err(write_error)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        tracing::debug!(post_id = post.id, "Deleted post");
        Ok(())
    }
}
