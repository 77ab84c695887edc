//! In-process store backing all three repositories.
//!
//! Used for `STORAGE_BACKEND=memory` and by the test suites. Each counter
//! write happens under the owning shard lock of a single map entry, which is
//! the same per-document atomicity the Postgres repositories rely on.
//!
//! Refs into a map are never held while the same map is entered again.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{AuthorRepository, EngagementRepository, PostRepository};
use crate::error::{AppError, Result};
use crate::models::{
    AccountInfo, Author, AuthorSummary, EngagementKind, Like, LikeRecount, NewAuthor, NewPost,
    Notification, Post, PostChanges, PostState, PostUpdate, ProfileUpdate, SocialLinks,
};
use crate::query::{PostFilter, PostSort};

type LikeKey = (Uuid, Uuid, EngagementKind);

#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: DashMap<Uuid, Post>,
    slugs: DashMap<String, Uuid>,
    authors: DashMap<Uuid, Author>,
    usernames: DashMap<String, Uuid>,
    likes: DashMap<LikeKey, Like>,
    notifications: DashMap<Uuid, Notification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications addressed to `author_id`, oldest first
    pub fn notifications_for(&self, author_id: Uuid) -> Vec<Notification> {
        let mut found: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.notification_for == author_id)
            .map(|n| n.value().clone())
            .collect();
        found.sort_by_key(|n| n.created_at);
        found
    }

    fn hydrate(&self, mut post: Post) -> Post {
        if let Some(author) = self.authors.get(&post.author_id) {
            post.author = author.summary();
        }
        post
    }

    fn with_post<T>(&self, post_id: Uuid, f: impl FnOnce(&mut Post) -> T) -> Result<T> {
        let mut post = self
            .posts
            .get_mut(&post_id)
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;
        Ok(f(post.value_mut()))
    }

    fn with_author<T>(&self, author_id: Uuid, f: impl FnOnce(&mut Author) -> T) -> Result<T> {
        let mut author = self
            .authors
            .get_mut(&author_id)
            .ok_or_else(|| AppError::NotFound(format!("author {}", author_id)))?;
        Ok(f(author.value_mut()))
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let author = self
            .authors
            .get(&post.author_id)
            .map(|a| a.summary())
            .ok_or_else(|| AppError::NotFound(format!("author {}", post.author_id)))?;

        let now = Utc::now();
        let stored = Post {
            id: post.id,
            slug: post.slug.clone(),
            author_id: post.author_id,
            author,
            title: post.title,
            description: post.description,
            banner: post.banner,
            content: post.content,
            tags: post.tags,
            state: post.state,
            activity: Default::default(),
            published_at: (post.state == PostState::Published).then_some(now),
            created_at: now,
            updated_at: now,
        };

        match self.slugs.entry(post.slug) {
            Entry::Occupied(entry) => Err(AppError::Conflict(format!(
                "unique constraint posts_slug_key violated: {}",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                self.posts.insert(stored.id, stored.clone());
                entry.insert(stored.id);
                Ok(stored)
            }
        }
    }

    async fn update_post(&self, slug: &str, changes: PostChanges) -> Result<PostUpdate> {
        let post_id = self
            .slugs
            .get(slug)
            .map(|id| *id)
            .ok_or_else(|| AppError::NotFound(format!("post {}", slug)))?;

        let (post, first_publish) = self.with_post(post_id, |post| {
            let first_publish =
                changes.state == PostState::Published && post.published_at.is_none();
            let now = Utc::now();

            post.title = changes.title;
            post.description = changes.description;
            post.banner = changes.banner;
            post.content = changes.content;
            post.tags = changes.tags;
            post.state = changes.state;
            post.updated_at = now;
            if first_publish {
                post.published_at = Some(now);
            }

            (post.clone(), first_publish)
        })?;

        Ok(PostUpdate {
            post: self.hydrate(post),
            first_publish,
        })
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let Some(post_id) = self.slugs.get(slug).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(post_id).await
    }

    async fn find_by_id(&self, post_id: Uuid) -> Result<Option<Post>> {
        let post = self.posts.get(&post_id).map(|p| p.value().clone());
        Ok(post.map(|p| self.hydrate(p)))
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        sort: PostSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>> {
        let mut matching: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| filter.matches(p.value()))
            .map(|p| p.value().clone())
            .collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|p| self.hydrate(p))
            .collect())
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        let count = self.posts.iter().filter(|p| filter.matches(p.value())).count();
        Ok(count as i64)
    }

    async fn increment_reads(&self, post_id: Uuid) -> Result<()> {
        self.with_post(post_id, |post| post.activity.total_reads += 1)
    }

    async fn adjust_likes(&self, post_id: Uuid, delta: i64) -> Result<i64> {
        self.with_post(post_id, |post| {
            post.activity.total_likes = (post.activity.total_likes + delta).max(0);
            post.activity.total_likes
        })
    }

    async fn set_total_likes(&self, post_id: Uuid, total_likes: i64) -> Result<()> {
        self.with_post(post_id, |post| post.activity.total_likes = total_likes.max(0))
    }

    async fn recount_likes(&self, post_id: Uuid) -> Result<LikeRecount> {
        self.with_post(post_id, |post| {
            let ledger = self
                .likes
                .iter()
                .filter(|l| l.key().1 == post_id && l.key().2 == EngagementKind::Like)
                .count() as i64;
            let previous = post.activity.total_likes;
            post.activity.total_likes = ledger;
            LikeRecount {
                previous,
                total_likes: ledger,
            }
        })
    }

    async fn list_post_ids(&self, after: Option<Uuid>, limit: i64) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .posts
            .iter()
            .map(|p| *p.key())
            .filter(|id| after.map_or(true, |after| *id > after))
            .collect();
        ids.sort();
        ids.truncate(limit.max(0) as usize);
        Ok(ids)
    }
}

#[async_trait]
impl AuthorRepository for MemoryStore {
    async fn insert_author(&self, author: NewAuthor) -> Result<Author> {
        let stored = Author {
            id: author.id,
            username: author.username.clone(),
            fullname: author.fullname,
            profile_img: author.profile_img,
            bio: author.bio,
            social_links: SocialLinks::default(),
            account_info: AccountInfo::default(),
            joined_at: Utc::now(),
        };

        match self.usernames.entry(author.username) {
            Entry::Occupied(entry) => Err(AppError::Conflict(format!(
                "unique constraint authors_username_key violated: {}",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                self.authors.insert(stored.id, stored.clone());
                entry.insert(stored.id);
                Ok(stored)
            }
        }
    }

    async fn find_author(&self, author_id: Uuid) -> Result<Option<Author>> {
        Ok(self.authors.get(&author_id).map(|a| a.value().clone()))
    }

    async fn find_author_by_username(&self, username: &str) -> Result<Option<Author>> {
        let Some(author_id) = self.usernames.get(username).map(|id| *id) else {
            return Ok(None);
        };
        self.find_author(author_id).await
    }

    async fn search_authors(&self, query: &str, limit: i64) -> Result<Vec<AuthorSummary>> {
        let needle = query.to_lowercase();
        let mut found: Vec<AuthorSummary> = self
            .authors
            .iter()
            .filter(|a| a.username.to_lowercase().contains(&needle))
            .map(|a| a.summary())
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn update_profile(&self, author_id: Uuid, update: ProfileUpdate) -> Result<Author> {
        let current = self
            .authors
            .get(&author_id)
            .map(|a| a.username.clone())
            .ok_or_else(|| AppError::NotFound(format!("author {}", author_id)))?;

        if current != update.username {
            match self.usernames.entry(update.username.clone()) {
                Entry::Occupied(entry) => {
                    return Err(AppError::Conflict(format!(
                        "unique constraint authors_username_key violated: {}",
                        entry.key()
                    )))
                }
                Entry::Vacant(entry) => {
                    entry.insert(author_id);
                }
            }
            self.usernames.remove(&current);
        }

        self.with_author(author_id, |author| {
            author.username = update.username;
            author.bio = update.bio;
            author.social_links = update.social_links;
            author.clone()
        })
    }

    async fn increment_total_posts(&self, author_id: Uuid) -> Result<()> {
        self.with_author(author_id, |a| a.account_info.total_posts += 1)
    }

    async fn increment_total_reads(&self, author_id: Uuid) -> Result<()> {
        self.with_author(author_id, |a| a.account_info.total_reads += 1)
    }
}

#[async_trait]
impl EngagementRepository for MemoryStore {
    async fn insert_like(&self, user_id: Uuid, post_id: Uuid) -> Result<Like> {
        if !self.posts.contains_key(&post_id) {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        match self.likes.entry((user_id, post_id, EngagementKind::Like)) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "user {} already likes post {}",
                user_id, post_id
            ))),
            Entry::Vacant(entry) => {
                let like = Like {
                    user_id,
                    post_id,
                    kind: EngagementKind::Like,
                    created_at: Utc::now(),
                };
                entry.insert(like.clone());
                Ok(like)
            }
        }
    }

    async fn delete_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        Ok(self
            .likes
            .remove(&(user_id, post_id, EngagementKind::Like))
            .is_some())
    }

    async fn like_exists(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        Ok(self
            .likes
            .contains_key(&(user_id, post_id, EngagementKind::Like)))
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<i64> {
        let count = self
            .likes
            .iter()
            .filter(|l| l.key().1 == post_id && l.key().2 == EngagementKind::Like)
            .count();
        Ok(count as i64)
    }

    async fn insert_notification(&self, notification: Notification) -> Result<()> {
        self.notifications.insert(notification.id, notification);
        Ok(())
    }

    async fn delete_like_notification(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        self.notifications.retain(|_, n| {
            !(n.user_id == user_id && n.post_id == post_id && n.kind == EngagementKind::Like)
        });
        Ok(())
    }
}
