/// Post handlers - editor submissions, single-post reads and listings
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::middleware::{AuthenticatedUser, OptionalUser};
use crate::models::PostPayload;
use crate::query::PostFilter;
use crate::services::GetPostOptions;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SavedPostResponse {
    pub slug: String,
}

/// Create a post, or update it when the body carries its slug
pub async fn save_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<PostPayload>,
) -> Result<HttpResponse> {
    let post = state
        .posts
        .create_or_update_post(user.0, payload.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(SavedPostResponse { slug: post.slug }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GetPostRequest {
    #[serde(alias = "blog_id")]
    #[validate(length(min = 1, message = "A post slug is required."))]
    pub slug: String,
    /// Caller expects a draft
    #[serde(default)]
    pub draft: bool,
    /// `"edit"` when loading into the editor
    #[serde(default)]
    pub mode: Option<String>,
}

impl GetPostRequest {
    fn edit_mode(&self) -> bool {
        self.mode.as_deref() == Some("edit")
    }
}

pub async fn get_post(
    state: web::Data<AppState>,
    viewer: OptionalUser,
    req: web::Json<GetPostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let options = GetPostOptions {
        allow_draft: req.draft,
        edit_mode: req.edit_mode(),
        viewer: viewer.0,
    };
    let post = state.posts.get_post(req.slug.trim(), options).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "post": post })))
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchPostsRequest {
    #[serde(flatten)]
    pub filter: PostFilter,
    #[serde(default = "first_page")]
    #[validate(range(min = 1, message = "Pages are numbered from 1."))]
    pub page: u32,
    #[serde(default)]
    #[validate(range(min = 1, message = "Limit must be positive."))]
    pub limit: Option<u32>,
}

/// One page of published posts matching the filter
pub async fn search_posts(
    state: web::Data<AppState>,
    req: web::Json<SearchPostsRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();
    let filter = req.filter.normalized();

    let results = state.posts.list_posts(&filter, req.page, req.limit).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "results": results,
        "page": req.page,
    })))
}

/// Number of published posts matching the filter
pub async fn count_posts(
    state: web::Data<AppState>,
    filter: web::Json<PostFilter>,
) -> Result<HttpResponse> {
    let filter = filter.into_inner().normalized();
    let total_docs = state.posts.count_posts(&filter).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "total_docs": total_docs })))
}

pub async fn trending_posts(state: web::Data<AppState>) -> Result<HttpResponse> {
    let posts = state.posts.trending().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "posts": posts })))
}
