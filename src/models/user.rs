use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public identity echoed back by the demo login endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub email: String,
    pub role: String,
}
