//! Shared fixtures: an in-memory store, seeded authors and payload builders.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use publishing_service::db::{AuthorRepository, MemoryStore, PostRepository, Repositories};
use publishing_service::models::{Author, NewAuthor, Post, PostContent, PostPayload};
use publishing_service::services::ListingLimits;
use publishing_service::AppState;
use uuid::Uuid;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limits(ListingLimits::default())
    }

    pub fn with_limits(limits: ListingLimits) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(Repositories::in_memory(store.clone()), limits);
        Self { store, state }
    }

    pub async fn author(&self, username: &str) -> Author {
        self.store
            .insert_author(NewAuthor {
                id: Uuid::new_v4(),
                username: username.to_string(),
                fullname: format!("{} fullname", username),
                profile_img: format!("https://cdn.example.com/{}.png", username),
                bio: String::new(),
            })
            .await
            .expect("insert author")
    }

    pub async fn reload_author(&self, author_id: Uuid) -> Author {
        self.store
            .find_author(author_id)
            .await
            .expect("find author")
            .expect("author exists")
    }

    pub async fn reload_post(&self, slug: &str) -> Post {
        self.store
            .find_by_slug(slug)
            .await
            .expect("find post")
            .expect("post exists")
    }

    /// Wait for background read accounting to reach `expected` on both the
    /// post and its author.
    pub async fn wait_for_reads(&self, slug: &str, expected: i64) -> Post {
        for _ in 0..100 {
            let post = self.reload_post(slug).await;
            let author = self.reload_author(post.author_id).await;
            if post.activity.total_reads >= expected
                && author.account_info.total_reads >= expected
            {
                return post;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.reload_post(slug).await
    }
}

pub fn draft(title: &str) -> PostPayload {
    PostPayload {
        title: title.to_string(),
        draft: true,
        ..Default::default()
    }
}

pub fn published(title: &str, tags: &[&str]) -> PostPayload {
    PostPayload {
        slug: None,
        title: title.to_string(),
        description: format!("About {}", title),
        banner: "https://cdn.example.com/banner.png".to_string(),
        content: PostContent {
            blocks: vec![serde_json::json!({
                "type": "paragraph",
                "data": { "text": title }
            })],
            extra: Default::default(),
        },
        tags: tags.iter().map(|t| t.to_string()).collect(),
        draft: false,
    }
}

/// Same payload, addressed at an existing post
pub fn resave(mut payload: PostPayload, slug: &str) -> PostPayload {
    payload.slug = Some(slug.to_string());
    payload
}
