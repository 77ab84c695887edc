/// Like handlers
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::AuthenticatedUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleLikeRequest {
    pub post_id: Uuid,
    /// What the client currently shows for this post
    #[serde(default, alias = "isLikedByUser")]
    pub currently_liked: bool,
}

#[derive(Debug, Serialize)]
pub struct ToggleLikeResponse {
    pub liked_by_user: bool,
}

pub async fn toggle_like(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<ToggleLikeRequest>,
) -> Result<HttpResponse> {
    let liked_by_user = state
        .engagement
        .toggle_like(req.post_id, user.0, req.currently_liked)
        .await?;

    Ok(HttpResponse::Ok().json(ToggleLikeResponse { liked_by_user }))
}

#[derive(Debug, Deserialize)]
pub struct LikeStatusRequest {
    pub post_id: Uuid,
}

pub async fn like_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<LikeStatusRequest>,
) -> Result<HttpResponse> {
    let result = state.engagement.is_liked(user.0, req.post_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "result": result })))
}
