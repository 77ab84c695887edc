/// Read accounting: one read per non-edit fetch, on the post and its author
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::Repositories;
use crate::error::Result;
use crate::metrics;

#[derive(Clone)]
pub struct ReadAccounting {
    repos: Repositories,
}

impl ReadAccounting {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Increment the post's `total_reads`, then the author's.
    ///
    /// Two independent increments: if the second fails the post keeps its
    /// extra read.
    pub async fn record(&self, post_id: Uuid, author_id: Uuid) -> Result<()> {
        self.repos.posts.increment_reads(post_id).await?;
        self.repos.authors.increment_total_reads(author_id).await?;
        Ok(())
    }

    /// Fire-and-forget variant used by reads. Errors are logged and counted,
    /// never returned to the reader.
    pub fn record_in_background(&self, post_id: Uuid, author_id: Uuid) -> JoinHandle<()> {
        let accounting = self.clone();
        tokio::spawn(async move {
            match accounting.record(post_id, author_id).await {
                Ok(()) => metrics::record_read("success"),
                Err(err) => {
                    metrics::record_read("error");
                    tracing::warn!(
                        %post_id,
                        %author_id,
                        error = %err,
                        "read accounting failed"
                    );
                }
            }
        })
    }
}
