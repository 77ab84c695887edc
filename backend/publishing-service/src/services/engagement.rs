/// Engagement service - like ledger, cached like counters and reconciliation
///
/// The ledger row is the fact; `posts.total_likes` is a cache of the ledger
/// count. Every like is two single-row writes in a fixed order:
/// ledger first, counter second. If the process dies in between, the counter
/// is one short until `reconcile_likes` rewrites it from the ledger.
use chrono::Utc;
use uuid::Uuid;

use crate::db::Repositories;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{EngagementKind, Notification};

/// Result of a full reconciliation sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: u64,
    pub corrected: u64,
    pub failed: u64,
}

#[derive(Clone)]
pub struct EngagementService {
    repos: Repositories,
}

fn outcome(err: &AppError) -> &'static str {
    match err {
        AppError::Conflict(_) => "conflict",
        AppError::NotFound(_) => "not_found",
        AppError::Forbidden(_) => "forbidden",
        _ => "error",
    }
}

impl EngagementService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Record that `user_id` likes `post_id`; returns the new `total_likes`.
    pub async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<i64> {
        let result = self.like_inner(user_id, post_id).await;
        match &result {
            Ok(_) => metrics::record_like_operation("like", "ok"),
            Err(err) => metrics::record_like_operation("like", outcome(err)),
        }
        result
    }

    async fn like_inner(&self, user_id: Uuid, post_id: Uuid) -> Result<i64> {
        let post = self
            .repos
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        if post.is_draft() {
            return Err(AppError::Forbidden("drafts can not be liked".to_string()));
        }

        self.repos.engagement.insert_like(user_id, post_id).await?;

        let total_likes = match self.repos.posts.adjust_likes(post_id, 1).await {
            Ok(total) => total,
            Err(err) => {
                tracing::error!(
                    %post_id,
                    %user_id,
                    error = %err,
                    "like recorded but counter increment failed; awaiting reconciliation"
                );
                return Err(AppError::Internal(
                    "like recorded but counter update failed".to_string(),
                ));
            }
        };

        let notification = Notification {
            id: Uuid::new_v4(),
            kind: EngagementKind::Like,
            post_id,
            notification_for: post.author_id,
            user_id,
            seen: false,
            created_at: Utc::now(),
        };
        if let Err(err) = self.repos.engagement.insert_notification(notification).await {
            tracing::warn!(%post_id, %user_id, error = %err, "like notification not written");
        }

        tracing::debug!(%post_id, %user_id, total_likes, "post liked");
        Ok(total_likes)
    }

    /// Remove the like of `user_id` on `post_id`; returns the new `total_likes`.
    pub async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<i64> {
        let result = self.unlike_inner(user_id, post_id).await;
        match &result {
            Ok(_) => metrics::record_like_operation("unlike", "ok"),
            Err(err) => metrics::record_like_operation("unlike", outcome(err)),
        }
        result
    }

    async fn unlike_inner(&self, user_id: Uuid, post_id: Uuid) -> Result<i64> {
        if !self.repos.engagement.delete_like(user_id, post_id).await? {
            return Err(AppError::NotFound(format!(
                "user {} does not like post {}",
                user_id, post_id
            )));
        }

        let total_likes = match self.repos.posts.adjust_likes(post_id, -1).await {
            Ok(total) => total,
            Err(err) => {
                tracing::error!(
                    %post_id,
                    %user_id,
                    error = %err,
                    "like removed but counter decrement failed; awaiting reconciliation"
                );
                return Err(AppError::Internal(
                    "like removed but counter update failed".to_string(),
                ));
            }
        };

        if let Err(err) = self
            .repos
            .engagement
            .delete_like_notification(user_id, post_id)
            .await
        {
            tracing::warn!(%post_id, %user_id, error = %err, "like notification not removed");
        }

        tracing::debug!(%post_id, %user_id, total_likes, "post unliked");
        Ok(total_likes)
    }

    /// Like when `currently_liked` is false, unlike otherwise. Returns
    /// whether the user likes the post afterwards.
    pub async fn toggle_like(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        currently_liked: bool,
    ) -> Result<bool> {
        if currently_liked {
            self.unlike(user_id, post_id).await?;
            Ok(false)
        } else {
            self.like(user_id, post_id).await?;
            Ok(true)
        }
    }

    pub async fn is_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        self.repos.engagement.like_exists(user_id, post_id).await
    }

    /// Rewrite the cached counter from the ledger. Returns true when the
    /// cached value was wrong.
    ///
    /// The count and the write happen in one repository call that holds the
    /// post row, so counter writes arriving meanwhile wait for it. A like
    /// whose ledger write lands before the recount and whose counter write
    /// lands after it leaves the counter one high until the next sweep.
    pub async fn reconcile_likes(&self, post_id: Uuid) -> Result<bool> {
        let recount = self.repos.posts.recount_likes(post_id).await?;
        if !recount.corrected() {
            return Ok(false);
        }

        metrics::record_reconcile_correction();
        tracing::info!(
            %post_id,
            cached = recount.previous,
            ledger = recount.total_likes,
            "like counter corrected from ledger"
        );
        Ok(true)
    }

    /// Reconcile every post, `batch_size` ids at a time.
    pub async fn reconcile_all(&self, batch_size: i64) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut after = None;

        loop {
            let ids = self
                .repos
                .posts
                .list_post_ids(after, batch_size.max(1))
                .await?;
            let Some(last) = ids.last().copied() else {
                break;
            };

            for post_id in ids {
                report.scanned += 1;
                match self.reconcile_likes(post_id).await {
                    Ok(true) => report.corrected += 1,
                    Ok(false) => {}
                    Err(err) => {
                        report.failed += 1;
                        tracing::warn!(%post_id, error = %err, "like reconciliation failed");
                    }
                }
            }

            after = Some(last);
        }

        Ok(report)
    }
}
