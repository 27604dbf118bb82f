use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Uploaded-image record; the file itself lives in the image store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}

impl Image {
    pub async fn list(db: &PgPool) -> Result<Vec<Image>, sqlx::Error> {
        sqlx::query_as::<_, Image>(
            r#"
            SELECT id, name, created_at
            FROM images
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await
    }

    pub async fn create(db: &PgPool, name: &str) -> Result<Image, sqlx::Error> {
        sqlx::query_as::<_, Image>(
            r#"
            INSERT INTO images (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
