/// Author handlers - public profiles, username search and profile edits
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::error::Result;
use crate::middleware::AuthenticatedUser;
use crate::models::ProfileUpdate;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 1, message = "A username is required."))]
    pub username: String,
}

pub async fn get_profile(
    state: web::Data<AppState>,
    req: web::Json<ProfileRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let author = state.authors.get_profile(&req.username).await?;
    Ok(HttpResponse::Ok().json(author))
}

#[derive(Debug, Deserialize)]
pub struct SearchAuthorsRequest {
    #[serde(default)]
    pub query: String,
}

pub async fn search_authors(
    state: web::Data<AppState>,
    req: web::Json<SearchAuthorsRequest>,
) -> Result<HttpResponse> {
    let users = state.authors.search(&req.query).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "users": users })))
}

/// Edit the signed-in author's username, bio and social links
pub async fn update_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<ProfileUpdate>,
) -> Result<HttpResponse> {
    let author = state
        .authors
        .update_profile(user.0, req.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "username": author.username })))
}
