use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::EngagementRepository;
use crate::error::{AppError, Result};
use crate::models::{EngagementKind, Like, Notification};

/// Like ledger and the notifications written next to it
#[derive(Clone)]
pub struct PgEngagementRepository {
    pool: PgPool,
}

impl PgEngagementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngagementRepository for PgEngagementRepository {
    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<Like> {
        // No ON CONFLICT: the primary key is what makes a second like fail.
        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO post_engagements (user_id, post_id, kind)
            VALUES ($1, $2, $3)
            RETURNING user_id, post_id, kind, created_at
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .bind(EngagementKind::Like)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match AppError::from(err) {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("user {} already likes post {}", user_id, post_id))
            }
            other => other,
        })?;

        Ok(like)
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM post_engagements
            WHERE user_id = $1 AND post_id = $2 AND kind = $3
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .bind(EngagementKind::Like)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn like_exists(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM post_engagements
                WHERE user_id = $1 AND post_id = $2 AND kind = $3
            )
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .bind(EngagementKind::Like)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM post_engagements
            WHERE post_id = $1 AND kind = $2
            "#,
        )
        .bind(post_id)
        .bind(EngagementKind::Like)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn insert_notification(&self, notification: Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, kind, post_id, notification_for, user_id, seen, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id)
        .bind(notification.kind)
        .bind(notification.post_id)
        .bind(notification.notification_for)
        .bind(notification.user_id)
        .bind(notification.seen)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_like_notification(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM notifications
            WHERE user_id = $1 AND post_id = $2 AND kind = $3
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .bind(EngagementKind::Like)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
