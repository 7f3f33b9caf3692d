use crate::services::metrics::get_metrics;
use axum::{http::header, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

/// Routes advertised by the root health check.
pub const ENDPOINTS: [&str; 2] = ["/ai/skin/check", "/ai/symptoms/check"];

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "DoctorMate AI",
        "endpoints": ENDPOINTS
    }))
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        get_metrics(),
    )
}

/// Fallback for unknown routes, rendered as an error envelope.
pub async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Resource not found"))
}
