/// Health endpoints
use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::AppState;

async fn check_storage(state: &AppState) -> Result<&'static str, String> {
    match &state.pool {
        Some(pool) => sqlx::query("SELECT 1")
            .fetch_one(pool)
            .await
            .map(|_| "postgres")
            .map_err(|e| format!("PostgreSQL connection failed: {}", e)),
        None => Ok("memory"),
    }
}

pub async fn health_summary(state: web::Data<AppState>) -> HttpResponse {
    match check_storage(&state).await {
        Ok(storage) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "publishing-service",
            "storage": storage,
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": e,
            "service": "publishing-service"
        })),
    }
}

pub async fn readiness_check(state: web::Data<AppState>) -> HttpResponse {
    let ready = check_storage(&state).await;
    let body = serde_json::json!({
        "ready": ready.is_ok(),
        "storage": ready.as_ref().map_or_else(|e| e.clone(), |s| s.to_string()),
        "timestamp": Utc::now().to_rfc3339(),
    });

    if ready.is_ok() {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
