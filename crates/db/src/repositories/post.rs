//! Post repository for database operations.
//!
//! Implements post CRUD operations using SeaORM.

use chrono::Utc;
use sea_orm::prelude::{DateTimeWithTimeZone, Uuid};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use tracing::debug;

use crate::entities::posts;
use quill_core::post::{NewPost, Post, PostError, PostRepository as PostRepoTrait, PostUpdate};
use quill_shared::PostId;

/// Listing row. `raw_image` is never read back for listings.
#[derive(Debug, FromQueryResult)]
struct PostListRow {
    id: Uuid,
    title: String,
    caption: String,
    image_url: String,
    storage_file_id: Option<String>,
    version: i32,
    created_at: DateTimeWithTimeZone,
    updated_at: DateTimeWithTimeZone,
}

impl From<PostListRow> for Post {
    fn from(row: PostListRow) -> Self {
        Self {
            id: PostId::from_uuid(row.id),
            title: row.title,
            caption: row.caption,
            image_url: row.image_url,
            storage_file_id: row.storage_file_id,
            raw_image: None,
            version: row.version,
            created_at: row.created_at.with_timezone(&Utc),
            updated_at: row.updated_at.with_timezone(&Utc),
        }
    }
}

/// Post repository implementation.
#[derive(Debug, Clone)]
pub struct PostRepository {
    db: DatabaseConnection,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: PostId) -> Result<Option<posts::Model>, PostError> {
        posts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)
    }
}

impl PostRepoTrait for PostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post, PostError> {
        let now = Utc::now().into();
        let active_model = posts::ActiveModel {
            id: Set(post.id.into_inner()),
            title: Set(post.title),
            caption: Set(post.caption),
            image_url: Set(post.image_url),
            storage_file_id: Set(post.storage_file_id),
            raw_image: Set(post.raw_image),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(db_error)?;

        Ok(to_domain(model))
    }

    async fn find_all(&self) -> Result<Vec<Post>, PostError> {
        let rows = posts::Entity::find()
            .select_only()
            .columns([
                posts::Column::Id,
                posts::Column::Title,
                posts::Column::Caption,
                posts::Column::ImageUrl,
                posts::Column::StorageFileId,
                posts::Column::Version,
                posts::Column::CreatedAt,
                posts::Column::UpdatedAt,
            ])
            .order_by_desc(posts::Column::CreatedAt)
            .order_by_desc(posts::Column::Id)
            .into_model::<PostListRow>()
            .all(&self.db)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostError> {
        Ok(self.find_model(id).await?.map(to_domain))
    }

    async fn update(
        &self,
        id: PostId,
        expected_version: i32,
        update: PostUpdate,
    ) -> Result<Post, PostError> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();

        // Compare-and-set on the version column keeps the write atomic.
        let mut stmt = posts::Entity::update_many()
            .col_expr(
                posts::Column::Version,
                Expr::col(posts::Column::Version).add(1),
            )
            .col_expr(posts::Column::UpdatedAt, Expr::value(now))
            .filter(posts::Column::Id.eq(id.into_inner()))
            .filter(posts::Column::Version.eq(expected_version));

        if let Some(title) = update.changes.title {
            stmt = stmt.col_expr(posts::Column::Title, Expr::value(title));
        }
        if let Some(caption) = update.changes.caption {
            stmt = stmt.col_expr(posts::Column::Caption, Expr::value(caption));
        }
        if let Some(image) = update.image {
            stmt = stmt
                .col_expr(posts::Column::ImageUrl, Expr::value(image.image_url))
                .col_expr(
                    posts::Column::StorageFileId,
                    Expr::value(image.storage_file_id),
                )
                .col_expr(posts::Column::RawImage, Expr::value(image.raw_image));
        }

        let updated = stmt.exec_with_returning(&self.db).await.map_err(db_error)?;

        match updated.into_iter().next() {
            Some(model) => Ok(to_domain(model)),
            None if self.find_model(id).await?.is_some() => {
                debug!(post_id = %id, expected_version, "Post version mismatch");
                Err(PostError::Conflict(id))
            }
            None => Err(PostError::NotFound(id)),
        }
    }

    async fn delete(&self, id: PostId) -> Result<Option<Post>, PostError> {
        let Some(model) = self.find_model(id).await? else {
            return Ok(None);
        };

        let result = posts::Entity::delete_by_id(id.into_inner())
            .exec(&self.db)
            .await
            .map_err(db_error)?;

        Ok((result.rows_affected > 0).then(|| to_domain(model)))
    }
}

fn db_error(err: DbErr) -> PostError {
    PostError::repository(err.to_string())
}

/// Convert database model to domain model.
fn to_domain(model: posts::Model) -> Post {
    Post {
        id: PostId::from_uuid(model.id),
        title: model.title,
        caption: model.caption,
        image_url: model.image_url,
        storage_file_id: model.storage_file_id,
        raw_image: model.raw_image,
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
