use axum::{http::StatusCode, Json};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, LoginRequest};

/// Demo accounts: (email, password, token, role). Tokens are static and
/// never checked by any other route.
const DEMO_ACCOUNTS: &[(&str, &str, &str, &str)] = &[
    ("admin@lore.com", "password", "SIMULATED_TOKEN_123", "admin"),
    ("cliente@lore.com", "password", "SIMULATED_TOKEN_456", "client"),
];

/// Look a credential pair up in the demo account table.
fn authenticate(email: &str, password: &str) -> Option<(&'static str, &'static str)> {
    DEMO_ACCOUNTS
        .iter()
        .find(|(e, p, _, _)| *e == email && *p == password)
        .map(|(_, _, token, role)| (*token, *role))
}

// ── POST /api/login ───────────────────────────────────────────────────────────

pub async fn login(
    Json(payload): Json<LoginRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let (token, role) = authenticate(&payload.email, &payload.password)
        .ok_or(AppError::Unauthorized)?;

    info!(email = %payload.email, role, "Demo login");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "token": token,
            "user": AuthUser {
                email: payload.email,
                role: role.to_string(),
            },
        })),
    ))
}
