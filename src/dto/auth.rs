use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Validated after the email is normalized. Password strength is checked
/// separately so it reports `WeakPassword`.
#[derive(Deserialize, Debug, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    pub password: String,
}

/// OAuth2 password-grant form; `username` carries the email.
#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Deserialize, Debug, ToSchema, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ConfirmResetRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}
