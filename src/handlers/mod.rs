pub mod auth;
pub mod import;
pub mod products;

use axum::{http::StatusCode, Json};
use chrono::Utc;
use serde_json::json;

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "catalog-service",
            "time": Utc::now().to_rfc3339(),
        })),
    )
}
