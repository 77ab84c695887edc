/// Database access layer
///
/// Repository traits for the three stores the core writes to, with a
/// PostgreSQL implementation per trait and one in-memory implementation
/// covering all of them.
///
/// Every counter write is a single-field atomic increment. Nothing here
/// spans two documents: multi-document sequences are ordered by the
/// services.
pub mod author_repo;
pub mod like_repo;
pub mod memory;
pub mod post_repo;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Author, AuthorSummary, Like, LikeRecount, NewAuthor, NewPost, Notification, Post, PostChanges,
    PostUpdate, ProfileUpdate,
};
use crate::query::{PostFilter, PostSort};

pub use author_repo::PgAuthorRepository;
pub use like_repo::PgEngagementRepository;
pub use memory::MemoryStore;
pub use post_repo::PgPostRepository;

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post. A taken slug fails with `Conflict`.
    async fn insert_post(&self, post: NewPost) -> Result<Post>;

    /// Overwrite the mutable fields of the post with `slug`.
    ///
    /// Sets `published_at` the first time the post becomes published and
    /// reports that transition in `PostUpdate::first_publish`.
    async fn update_post(&self, slug: &str, changes: PostChanges) -> Result<PostUpdate>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    async fn find_by_id(&self, post_id: Uuid) -> Result<Option<Post>>;

    async fn list_posts(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>>;

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64>;

    async fn increment_reads(&self, post_id: Uuid) -> Result<()>;

    /// Add `delta` to `total_likes` (never below zero) and return the new value.
    async fn adjust_likes(&self, post_id: Uuid, delta: i64) -> Result<i64>;

    async fn set_total_likes(&self, post_id: Uuid, total_likes: i64) -> Result<()>;

    /// Replace `total_likes` with the ledger count in one step, holding the
    /// post row while counting.
    async fn recount_likes(&self, post_id: Uuid) -> Result<LikeRecount>;

    /// Ids in ascending order, strictly after `after`; used for batch scans.
    async fn list_post_ids(&self, after: Option<Uuid>, limit: i64) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait AuthorRepository: Send + Sync {
    /// A taken username fails with `Conflict`.
    async fn insert_author(&self, author: NewAuthor) -> Result<Author>;

    async fn find_author(&self, author_id: Uuid) -> Result<Option<Author>>;

    async fn find_author_by_username(&self, username: &str) -> Result<Option<Author>>;

    /// Case-insensitive username substring search.
    async fn search_authors(&self, query: &str, limit: i64) -> Result<Vec<AuthorSummary>>;

    /// Overwrite username, bio and links. A taken username fails with `Conflict`.
    async fn update_profile(&self, author_id: Uuid, update: ProfileUpdate) -> Result<Author>;

    async fn increment_total_posts(&self, author_id: Uuid) -> Result<()>;

    async fn increment_total_reads(&self, author_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// Insert the like ledger entry. An existing entry fails with `Conflict`.
    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<Like>;

    /// Returns false when there was no entry to delete.
    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    async fn like_exists(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    async fn count_likes(&self, post_id: Uuid) -> Result<i64>;

    async fn insert_notification(&self, notification: Notification) -> Result<()>;

    async fn delete_like_notification(&self, user_id: Uuid, post_id: Uuid) -> Result<()>;
}

/// The repositories a service instance works against
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn PostRepository>,
    pub authors: Arc<dyn AuthorRepository>,
    pub engagement: Arc<dyn EngagementRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            authors: Arc::new(PgAuthorRepository::new(pool.clone())),
            engagement: Arc::new(PgEngagementRepository::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            posts: store.clone(),
            authors: store.clone(),
            engagement: store,
        }
    }
}
