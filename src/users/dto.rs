use serde::{Deserialize, Serialize};

use crate::{error::ApiError, users::repo_types::User};

/// Request body for signup. `age` may be omitted and defaults to 0.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: Option<i64>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for account activation.
#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub token: String,
}

/// Request body for the two send-email endpoints.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Request body for resetting a password with a reset token.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub token: String,
}

/// Partial profile update. Any key outside the four typed fields lands in
/// `extra`, which lets the handler reject the whole patch.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UpdateProfileRequest {
    /// All-or-nothing shape check, before any field is touched: an empty
    /// patch or any unrecognized key rejects the whole request.
    pub fn check_shape(&self) -> Result<(), ApiError> {
        if !self.extra.is_empty() {
            return Err(ApiError::InvalidUpdate);
        }
        if self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.age.is_none()
        {
            return Err(ApiError::InvalidUpdate);
        }
        Ok(())
    }
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// Response returned after activation: the activated record plus a fresh
/// session token (auto-login).
#[derive(Debug, Serialize)]
pub struct ActivatedResponse {
    #[serde(rename = "activatedUser")]
    pub activated_user: User,
    pub token: String,
}

/// Plain confirmation body for endpoints with nothing else to return.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
