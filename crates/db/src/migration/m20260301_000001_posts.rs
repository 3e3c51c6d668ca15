//! Posts migration.
//!
//! Creates the posts table holding post metadata and image references.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(POSTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS posts CASCADE;")
            .await?;
        Ok(())
    }
}

const POSTS_SQL: &str = r"
CREATE TABLE posts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    title TEXT NOT NULL DEFAULT '',
    caption TEXT NOT NULL DEFAULT '',
    image_url TEXT NOT NULL,
    storage_file_id TEXT,
    raw_image BYTEA,
    version INTEGER NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_image_url_not_blank CHECK (length(image_url) > 0),
    CONSTRAINT chk_version_positive CHECK (version > 0)
);

-- Listing is newest-first
CREATE INDEX idx_posts_created ON posts(created_at DESC, id DESC);

-- Lookup by provider file id when reconciling orphaned objects
CREATE INDEX idx_posts_storage_file ON posts(storage_file_id) WHERE storage_file_id IS NOT NULL;
";
