/// HTTP handlers for publishing-service
///
/// - Posts: editor saves, single-post reads, search/count listings, trending
/// - Likes: toggle and status for the signed-in user
/// - Authors: public profile, username search and profile edits
/// - Health: liveness and storage readiness
pub mod authors;
pub mod health;
pub mod likes;
pub mod posts;

use actix_web::web;

use crate::error::AppError;
use crate::metrics;

/// Mount every route. Expects `web::Data<AppState>` and `web::Data<JwtKeys>`
/// to be registered on the `App`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/metrics", web::get().to(metrics::serve_metrics))
    .route("/api/v1/health", web::get().to(health::health_summary))
    .route("/api/v1/health/ready", web::get().to(health::readiness_check))
    .route("/api/v1/health/live", web::get().to(health::liveness_check))
    .service(
        web::scope("/api/v1")
            .service(
                web::scope("/posts")
                    .route("", web::post().to(posts::save_post))
                    .route("/get", web::post().to(posts::get_post))
                    .route("/search", web::post().to(posts::search_posts))
                    .route("/search/count", web::post().to(posts::count_posts))
                    .route("/trending", web::get().to(posts::trending_posts)),
            )
            .service(
                web::scope("/likes")
                    .route("/toggle", web::post().to(likes::toggle_like))
                    .route("/status", web::post().to(likes::like_status)),
            )
            .service(
                web::scope("/authors")
                    .route("/profile", web::post().to(authors::get_profile))
                    .route("/profile/update", web::post().to(authors::update_profile))
                    .route("/search", web::post().to(authors::search_authors)),
            ),
    );
}
