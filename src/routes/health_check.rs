use actix_web::HttpResponse;

use super::ApiResponse;

/// GET /health_check
pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().json(ApiResponse::new(200, serde_json::json!({}), "OK"))
}
