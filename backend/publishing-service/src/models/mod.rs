/// Data models for publishing-service
///
/// - Post: a titled, tagged document that is either a draft or published
/// - Author: the account that writes posts, with denormalized totals
/// - Like / Notification: engagement ledger entries and the author-facing
///   record written alongside them
use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};

pub const MAX_DESCRIPTION_CHARS: usize = 200;
pub const MAX_TAGS: usize = 10;

/// Lifecycle state of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum PostState {
    #[sqlx(rename = "draft")]
    Draft,
    #[sqlx(rename = "published")]
    Published,
}

impl PostState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn from_draft_flag(draft: bool) -> Self {
        if draft {
            Self::Draft
        } else {
            Self::Published
        }
    }
}

/// Engagement counters cached on the post document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub total_likes: i64,
    pub total_reads: i64,
}

/// Rich-text document produced by the editor.
///
/// Only `blocks` is interpreted (for the publish check); everything else is
/// carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostContent {
    #[serde(default)]
    pub blocks: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Author fields embedded in post responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub username: String,
    pub fullname: String,
    pub profile_img: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub slug: String,
    pub author_id: Uuid,
    pub author: AuthorSummary,
    pub title: String,
    pub description: String,
    pub banner: String,
    pub content: PostContent,
    pub tags: Vec<String>,
    pub state: PostState,
    pub activity: Activity,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_draft(&self) -> bool {
        self.state == PostState::Draft
    }
}

/// Denormalized per-author totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub total_posts: i64,
    pub total_reads: i64,
}

/// Profile links shown on the author page. Empty means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub youtube: String,
    pub instagram: String,
    pub facebook: String,
    pub twitter: String,
    pub github: String,
    pub website: String,
}

impl SocialLinks {
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("youtube", &self.youtube),
            ("instagram", &self.instagram),
            ("facebook", &self.facebook),
            ("twitter", &self.twitter),
            ("github", &self.github),
            ("website", &self.website),
        ]
    }

    fn trimmed(self) -> Self {
        Self {
            youtube: self.youtube.trim().to_string(),
            instagram: self.instagram.trim().to_string(),
            facebook: self.facebook.trim().to_string(),
            twitter: self.twitter.trim().to_string(),
            github: self.github.trim().to_string(),
            website: self.website.trim().to_string(),
        }
    }
}

/// Every set link must be an absolute http(s) URL, and each network's link
/// must point at that network's `.com` host. `website` may be any host.
fn validate_social_links(links: &SocialLinks) -> std::result::Result<(), ValidationError> {
    for (network, link) in links.entries() {
        if link.is_empty() {
            continue;
        }

        let host = url::Url::parse(link)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .ok_or_else(|| {
                ValidationError::new("social_link_url").with_message(Cow::Owned(format!(
                    "{} link must be a full URL with http(s) included",
                    network
                )))
            })?;

        if network != "website" && !host.contains(&format!("{}.com", network)) {
            return Err(ValidationError::new("social_link_host")
                .with_message(Cow::Owned(format!("{} link is not valid", network))));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub profile_img: String,
    pub bio: String,
    #[serde(default)]
    pub social_links: SocialLinks,
    pub account_info: AccountInfo,
    pub joined_at: DateTime<Utc>,
}

impl Author {
    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            username: self.username.clone(),
            fullname: self.fullname.clone(),
            profile_img: self.profile_img.clone(),
        }
    }
}

/// Author row as provisioned by the identity service
#[derive(Debug, Clone)]
pub struct NewAuthor {
    pub id: Uuid,
    pub username: String,
    pub fullname: String,
    pub profile_img: String,
    pub bio: String,
}

/// Self-service profile edit by the signed-in author
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 3, message = "username must be at least 3 characters long"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "bio should not be more than 150 characters"))]
    pub bio: String,
    #[serde(default)]
    #[validate(custom(function = "validate_social_links"))]
    pub social_links: SocialLinks,
}

impl ProfileUpdate {
    pub fn normalize(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            bio: self.bio.trim().to_string(),
            social_links: self.social_links.trimmed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    #[sqlx(rename = "like")]
    Like,
}

impl EngagementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
        }
    }
}

/// Ledger entry: its existence is the fact that `user_id` likes `post_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub kind: EngagementKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub kind: EngagementKind,
    pub post_id: Uuid,
    pub notification_for: Uuid,
    pub user_id: Uuid,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

/// Editor submission for creating or re-saving a post.
///
/// `slug` is absent on first submission and carries the assigned slug on
/// every later save of the same post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostPayload {
    #[serde(default, alias = "id")]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "des")]
    pub description: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub content: PostContent,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub draft: bool,
}

impl PostPayload {
    pub fn target_state(&self) -> PostState {
        PostState::from_draft_flag(self.draft)
    }

    /// Trim text fields, lowercase tags and drop duplicate or blank tags.
    pub fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.banner = self.banner.trim().to_string();
        self.slug = self
            .slug
            .take()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags.drain(..) {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        self.tags = tags;
    }

    /// Drafts only need a title; publishing checks the remaining fields in
    /// order and reports the first one that fails.
    pub fn validate(&self) -> Result<()> {
        if self.title.is_empty() {
            return Err(AppError::ValidationError(
                "title: You must provide a title.".to_string(),
            ));
        }

        if self.draft {
            return Ok(());
        }

        let description_len = self.description.chars().count();
        if description_len == 0 || description_len > MAX_DESCRIPTION_CHARS {
            return Err(AppError::ValidationError(format!(
                "description: You must provide the description within {} characters.",
                MAX_DESCRIPTION_CHARS
            )));
        }
        if self.banner.is_empty() {
            return Err(AppError::ValidationError(
                "banner: You must upload the banner image to publish the post.".to_string(),
            ));
        }
        if self.content.blocks.is_empty() {
            return Err(AppError::ValidationError(
                "content: There must be some post content to publish it.".to_string(),
            ));
        }
        if self.tags.is_empty() || self.tags.len() > MAX_TAGS {
            return Err(AppError::ValidationError(format!(
                "tags: Provide between 1 and {} tags to publish the post.",
                MAX_TAGS
            )));
        }

        Ok(())
    }
}

/// Fields written on insert
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: Uuid,
    pub slug: String,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub banner: String,
    pub content: PostContent,
    pub tags: Vec<String>,
    pub state: PostState,
}

/// Mutable fields overwritten on re-submission
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub description: String,
    pub banner: String,
    pub content: PostContent,
    pub tags: Vec<String>,
    pub state: PostState,
}

impl From<PostPayload> for PostChanges {
    fn from(payload: PostPayload) -> Self {
        let state = payload.target_state();
        Self {
            title: payload.title,
            description: payload.description,
            banner: payload.banner,
            content: payload.content,
            tags: payload.tags,
            state,
        }
    }
}

/// Cached like counter before and after a recount from the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeRecount {
    pub previous: i64,
    pub total_likes: i64,
}

impl LikeRecount {
    pub fn corrected(&self) -> bool {
        self.previous != self.total_likes
    }
}

/// Result of an in-place update
#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub post: Post,
    /// True when this update moved a never-published post into `published`.
    pub first_publish: bool,
}
