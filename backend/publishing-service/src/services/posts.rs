/// Post service - post lifecycle, reads and listings
use async_trait::async_trait;
use page_accumulator::PageSource;
use uuid::Uuid;

use crate::db::Repositories;
use crate::error::{AppError, Result};
use crate::models::{NewPost, Post, PostChanges, PostPayload, PostState};
use crate::query::{PostFilter, PostSort};
use crate::services::reads::ReadAccounting;
use crate::services::slug::assign_slug;

/// Page sizes applied to listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingLimits {
    pub page_size: u32,
    pub max_page_size: u32,
    pub trending_limit: u32,
}

impl Default for ListingLimits {
    fn default() -> Self {
        Self {
            page_size: 5,
            max_page_size: 50,
            trending_limit: 5,
        }
    }
}

/// How a single post is being fetched
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPostOptions {
    /// The caller asked for a draft (the editor loading unpublished work)
    pub allow_draft: bool,
    /// Loading into the editor; no read is counted
    pub edit_mode: bool,
    pub viewer: Option<Uuid>,
}

#[derive(Clone)]
pub struct PostService {
    repos: Repositories,
    reads: ReadAccounting,
    limits: ListingLimits,
}

impl PostService {
    pub fn new(repos: Repositories, limits: ListingLimits) -> Self {
        let reads = ReadAccounting::new(repos.clone());
        Self {
            repos,
            reads,
            limits,
        }
    }

    pub fn limits(&self) -> ListingLimits {
        self.limits
    }

    /// Create the post, or update it when the payload carries a slug.
    ///
    /// An update resolves the slug and the caller's ownership before the
    /// payload is validated.
    pub async fn create_or_update_post(
        &self,
        author_id: Uuid,
        mut payload: PostPayload,
    ) -> Result<Post> {
        payload.normalize();

        match payload.slug.take() {
            Some(slug) => self.update(author_id, &slug, payload).await,
            None => self.create(author_id, payload).await,
        }
    }

    async fn create(&self, author_id: Uuid, payload: PostPayload) -> Result<Post> {
        payload.validate()?;

        let state = payload.target_state();
        let new_post = NewPost {
            id: Uuid::new_v4(),
            slug: assign_slug(&payload.title),
            author_id,
            title: payload.title,
            description: payload.description,
            banner: payload.banner,
            content: payload.content,
            tags: payload.tags,
            state,
        };

        let post = self.repos.posts.insert_post(new_post).await?;
        tracing::info!(
            post_id = %post.id,
            slug = %post.slug,
            %author_id,
            state = post.state.as_str(),
            "post created"
        );

        if state == PostState::Published {
            self.count_first_publish(&post).await?;
        }

        Ok(post)
    }

    async fn update(&self, author_id: Uuid, slug: &str, payload: PostPayload) -> Result<Post> {
        let existing = self
            .repos
            .posts
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", slug)))?;

        if existing.author_id != author_id {
            return Err(AppError::Forbidden(
                "only the author can edit this post".to_string(),
            ));
        }
        payload.validate()?;

        let update = self
            .repos
            .posts
            .update_post(slug, PostChanges::from(payload))
            .await?;
        tracing::info!(
            post_id = %update.post.id,
            slug,
            state = update.post.state.as_str(),
            first_publish = update.first_publish,
            "post updated"
        );

        if update.first_publish {
            self.count_first_publish(&update.post).await?;
        }

        Ok(update.post)
    }

    /// Second write of a first publish. The post is already stored, so a
    /// failure here leaves `total_posts` one short.
    async fn count_first_publish(&self, post: &Post) -> Result<()> {
        if let Err(err) = self.repos.authors.increment_total_posts(post.author_id).await {
            tracing::error!(
                post_id = %post.id,
                author_id = %post.author_id,
                error = %err,
                "post published but total_posts increment failed"
            );
            return Err(AppError::Internal(
                "failed to update the author's post count".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn get_post(&self, slug: &str, options: GetPostOptions) -> Result<Post> {
        let post = self
            .repos
            .posts
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", slug)))?;

        if post.is_draft() {
            if !options.allow_draft {
                return Err(AppError::Forbidden("you can not access draft posts".to_string()));
            }
            if options.viewer != Some(post.author_id) {
                return Err(AppError::Forbidden(
                    "drafts are only visible to their author".to_string(),
                ));
            }
        }

        if !options.edit_mode {
            self.reads.record_in_background(post.id, post.author_id);
        }

        Ok(post)
    }

    /// Effective page size for a requested limit
    pub fn page_size(&self, limit: Option<u32>) -> u32 {
        limit
            .unwrap_or(self.limits.page_size)
            .clamp(1, self.limits.max_page_size.max(1))
    }

    /// Published posts matching `filter`, newest first; `page` is 1-based.
    pub async fn list_posts(
        &self,
        filter: &PostFilter,
        page: u32,
        limit: Option<u32>,
    ) -> Result<Vec<Post>> {
        let page_size = i64::from(self.page_size(limit));
        let offset = i64::from(page.max(1) - 1) * page_size;

        self.repos
            .posts
            .list_posts(filter, PostSort::Latest, page_size, offset)
            .await
    }

    pub async fn count_posts(&self, filter: &PostFilter) -> Result<i64> {
        self.repos.posts.count_posts(filter).await
    }

    pub async fn trending(&self) -> Result<Vec<Post>> {
        self.repos
            .posts
            .list_posts(
                &PostFilter::default(),
                PostSort::Trending,
                i64::from(self.limits.trending_limit),
                0,
            )
            .await
    }
}

#[async_trait]
impl PageSource<PostFilter> for PostService {
    type Item = Post;
    type Error = AppError;

    async fn fetch_page(&self, filter: &PostFilter, page: u32) -> Result<Vec<Post>> {
        self.list_posts(filter, page, None).await
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64> {
        let total = self.count_posts(filter).await?;
        Ok(total.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AuthorRepository, MemoryStore};
    use crate::models::{NewAuthor, PostContent};
    use std::sync::Arc;

    async fn service() -> (PostService, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let author = store
            .insert_author(NewAuthor {
                id: Uuid::new_v4(),
                username: "grace".into(),
                fullname: "Grace Hopper".into(),
                profile_img: String::new(),
                bio: String::new(),
            })
            .await
            .unwrap();
        let service = PostService::new(
            Repositories::in_memory(store.clone()),
            ListingLimits::default(),
        );
        (service, store, author.id)
    }

    fn draft(title: &str) -> PostPayload {
        PostPayload {
            title: title.into(),
            draft: true,
            ..Default::default()
        }
    }

    fn published(title: &str) -> PostPayload {
        PostPayload {
            title: title.into(),
            description: "summary".into(),
            banner: "https://cdn.example.com/b.png".into(),
            content: PostContent {
                blocks: vec![serde_json::json!({"type": "paragraph"})],
                extra: Default::default(),
            },
            tags: vec!["tech".into()],
            draft: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn only_the_author_may_update() {
        let (service, _, author) = service().await;
        let post = service
            .create_or_update_post(author, draft("Mine"))
            .await
            .unwrap();

        let mut payload = draft("Hijacked");
        payload.slug = Some(post.slug.clone());
        let err = service
            .create_or_update_post(Uuid::new_v4(), payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn update_of_unknown_slug_is_not_found() {
        let (service, _, author) = service().await;
        let mut payload = published("Ghost");
        payload.slug = Some("ghost-missing".into());
        let err = service
            .create_or_update_post(author, payload)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn drafts_are_forbidden_without_permission() {
        let (service, _, author) = service().await;
        let post = service
            .create_or_update_post(author, draft("Secret"))
            .await
            .unwrap();

        let err = service
            .get_post(&post.slug, GetPostOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let stranger = GetPostOptions {
            allow_draft: true,
            edit_mode: true,
            viewer: Some(Uuid::new_v4()),
        };
        assert!(service.get_post(&post.slug, stranger).await.is_err());

        let owner = GetPostOptions {
            viewer: Some(author),
            ..stranger
        };
        assert_eq!(service.get_post(&post.slug, owner).await.unwrap().id, post.id);
    }

    #[tokio::test]
    async fn unknown_slug_wins_over_an_invalid_payload() {
        let (service, _, author) = service().await;
        let mut payload = published("Ghost");
        payload.banner.clear();
        payload.slug = Some("ghost-missing".into());
        let err = service
            .create_or_update_post(author, payload)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn ownership_is_checked_before_the_payload() {
        let (service, _, author) = service().await;
        let post = service
            .create_or_update_post(author, draft("Mine"))
            .await
            .unwrap();

        let mut payload = published("Mine");
        payload.tags.clear();
        payload.slug = Some(post.slug.clone());
        let err = service
            .create_or_update_post(Uuid::new_v4(), payload.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = service
            .create_or_update_post(author, payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let (service, _, _) = service().await;
        assert_eq!(service.page_size(None), 5);
        assert_eq!(service.page_size(Some(0)), 1);
        assert_eq!(service.page_size(Some(500)), 50);
    }
}
