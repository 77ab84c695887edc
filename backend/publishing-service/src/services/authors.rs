/// Author profiles, author search and profile edits
use uuid::Uuid;
use validator::Validate;

use crate::db::Repositories;
use crate::error::{AppError, Result};
use crate::models::{Author, AuthorSummary, ProfileUpdate};

/// Upper bound on author search results
pub const AUTHOR_SEARCH_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct AuthorService {
    repos: Repositories,
}

impl AuthorService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn get_profile(&self, username: &str) -> Result<Author> {
        self.repos
            .authors
            .find_author_by_username(username.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("author {}", username)))
    }

    /// Authors whose username contains `query`, ignoring case. A blank query
    /// matches nobody.
    pub async fn search(&self, query: &str) -> Result<Vec<AuthorSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.repos
            .authors
            .search_authors(query, AUTHOR_SEARCH_LIMIT)
            .await
    }

    /// Change the author's username, bio and social links.
    ///
    /// A username already held by another author fails with `Conflict`.
    pub async fn update_profile(&self, author_id: Uuid, update: ProfileUpdate) -> Result<Author> {
        let update = update.normalize();
        update.validate()?;

        let author = self.repos.authors.update_profile(author_id, update).await?;
        tracing::info!(%author_id, username = %author.username, "author profile updated");
        Ok(author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AuthorRepository, MemoryStore};
    use crate::models::{NewAuthor, SocialLinks};
    use std::sync::Arc;

    async fn service_with(usernames: &[&str]) -> (AuthorService, Vec<Uuid>) {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for username in usernames {
            let author = store
                .insert_author(NewAuthor {
                    id: Uuid::new_v4(),
                    username: username.to_string(),
                    fullname: String::new(),
                    profile_img: String::new(),
                    bio: String::new(),
                })
                .await
                .unwrap();
            ids.push(author.id);
        }
        (AuthorService::new(Repositories::in_memory(store)), ids)
    }

    fn update(username: &str) -> ProfileUpdate {
        ProfileUpdate {
            username: username.into(),
            bio: "Systems programmer".into(),
            social_links: SocialLinks {
                github: "https://github.com/ken".into(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn update_profile_round_trips() {
        let (service, ids) = service_with(&["ken"]).await;
        let author = service
            .update_profile(ids[0], update("  kthompson "))
            .await
            .unwrap();
        assert_eq!(author.username, "kthompson");
        assert_eq!(author.social_links.github, "https://github.com/ken");

        let profile = service.get_profile("kthompson").await.unwrap();
        assert_eq!(profile.bio, "Systems programmer");
        assert!(service.get_profile("ken").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_profile_rejects_each_invalid_field() {
        let (service, ids) = service_with(&["ken"]).await;

        let err = service.update_profile(ids[0], update("kt")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let mut long_bio = update("ken");
        long_bio.bio = "x".repeat(151);
        let err = service.update_profile(ids[0], long_bio).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let mut wrong_host = update("ken");
        wrong_host.social_links.youtube = "https://vimeo.com/ken".into();
        let err = service.update_profile(ids[0], wrong_host).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let mut no_scheme = update("ken");
        no_scheme.social_links.website = "ken.dev".into();
        let err = service.update_profile(ids[0], no_scheme).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        assert_eq!(service.get_profile("ken").await.unwrap().bio, "");
    }

    #[tokio::test]
    async fn taken_username_conflicts() {
        let (service, ids) = service_with(&["ken", "dmr"]).await;
        let err = service.update_profile(ids[0], update("dmr")).await.unwrap_err();
        assert!(err.is_conflict());

        let unknown = service.update_profile(Uuid::new_v4(), update("bwk")).await;
        assert!(unknown.unwrap_err().is_not_found());
    }
}
