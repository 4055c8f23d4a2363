use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Caption record with its source image bytes, stored verbatim.
#[derive(Debug, Clone, FromRow)]
pub struct Caption {
    pub id: Uuid,
    pub user_id: Uuid,
    pub caption: String,
    pub image_data: Vec<u8>,
    pub created_at: OffsetDateTime,
}

impl Caption {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        caption: &str,
        image_data: &[u8],
    ) -> anyhow::Result<Caption> {
        let row = sqlx::query_as::<_, Caption>(
            r#"
            INSERT INTO captions (user_id, caption, image_data)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, caption, image_data, created_at
            "#,
        )
        .bind(user_id)
        .bind(caption)
        .bind(image_data)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// All captions for one user, newest first.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Caption>> {
        let rows = sqlx::query_as::<_, Caption>(
            r#"
            SELECT id, user_id, caption, image_data, created_at
            FROM captions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Every stored caption, newest first.
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Caption>> {
        let rows = sqlx::query_as::<_, Caption>(
            r#"
            SELECT id, user_id, caption, image_data, created_at
            FROM captions
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Delete all captions belonging to a user, returning how many went away.
    pub async fn delete_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM captions WHERE user_id = $1")
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
