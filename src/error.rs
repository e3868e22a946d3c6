use axum::{
    Json,
    extract::Request,
    http::{HeaderValue, StatusCode, Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

const INTERNAL_DETAIL: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error(
        "Password must be at least 8 characters and contain uppercase, lowercase letters and numbers"
    )]
    WeakPassword,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidToken,

    #[error("Invalid credentials")]
    UnknownSubject,

    #[error("Account not activated")]
    AccountNotActivated,

    #[error("Invalid activation token")]
    InvalidActivationToken,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Not authorized")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid data: referenced record does not exist")]
    InvalidReference,

    #[error("Invalid data: conflicts with an existing record")]
    IntegrityViolation,

    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::WeakPassword
            | AppError::EmailTaken
            | AppError::InvalidActivationToken
            | AppError::InvalidResetToken
            | AppError::InvalidReference => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::Unauthenticated
            | AppError::InvalidToken
            | AppError::UnknownSubject => StatusCode::UNAUTHORIZED,
            AppError::AccountNotActivated | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::IntegrityViolation => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    pub fn detail(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => INTERNAL_DETAIL.to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
    pub status_code: u16,
    pub path: String,
}

/// Marker left on error responses so [`attach_error_path`] can fill in the path.
#[derive(Debug, Clone)]
struct ErrorDetail(String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Database(err) => tracing::error!(error = %err, "database failure"),
            AppError::Internal(err) => tracing::error!(error = ?err, "internal failure"),
            _ => tracing::debug!(status = %status, error = %self, "request rejected"),
        }

        let detail = self.detail();
        let body = ErrorBody {
            detail: detail.clone(),
            status_code: status.as_u16(),
            path: String::new(),
        };
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response.extensions_mut().insert(ErrorDetail(detail));
        response
    }
}

/// Rewrites error bodies to carry the request path.
pub async fn attach_error_path(uri: Uri, request: Request, next: Next) -> Response {
    let path = uri.path().to_owned();
    let response = next.run(request).await;
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let body = ErrorBody {
        detail,
        status_code: parts.status.as_u16(),
        path,
    };
    (parts, Json(body)).into_response()
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
