use crate::models::UserResponse;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /auth`, dispatched on `action`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuthRequest {
    SendCode {
        #[serde(default)]
        phone: String,
    },
    VerifyCode {
        #[serde(default)]
        phone: String,
        #[serde(default)]
        code: String,
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendCodeResponse {
    pub success: bool,
    pub message: String,
    pub expires_in: i64,
    /// Only populated when the server runs with `auth.expose_dev_code`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyCodeResponse {
    pub success: bool,
    pub user: UserResponse,
    pub session_token: String,
    /// Seconds until the session token stops being accepted.
    pub expires_in: i64,
}

/// Successful `POST /auth` body; which shape depends on `action`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AuthResponse {
    SignedIn(VerifyCodeResponse),
    CodeSent(SendCodeResponse),
}
