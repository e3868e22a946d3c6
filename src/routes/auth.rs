use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::auth::{
        ConfirmResetRequest, LoginForm, MessageResponse, RegisterRequest, ResetPasswordRequest,
        TokenResponse,
    },
    error::{AppResult, ErrorBody},
    extract::{AppForm, AppJson, AppPath, ValidatedJson},
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::auth_service::{
        activate_user, confirm_password_reset, current_user, login_user, register_user,
        request_password_reset,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token", post(login))
        .route("/register", post(register))
        .route("/activate/{token}", post(activate))
        .route("/reset-password", post(reset_password))
        .route("/reset-password/confirm", post(confirm_reset_password))
        .route("/users/me", get(me))
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<User>),
        (status = 400, description = "Weak password or email taken", body = ErrorBody),
        (status = 422, description = "Malformed email or missing name", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/token",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Bearer token", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 403, description = "Account not activated", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppForm(form): AppForm<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let resp = login_user(&state, form).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/activate/{token}",
    params(("token" = String, Path, description = "Activation token")),
    responses(
        (status = 200, description = "Account activated", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Unknown or used token", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn activate(
    State(state): State<AppState>,
    AppPath(token): AppPath<String>,
) -> AppResult<Json<ApiResponse<MessageResponse>>> {
    let resp = activate_user(&state, &token).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Reset token issued", body = ApiResponse<MessageResponse>),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<MessageResponse>>> {
    let resp = request_password_reset(&state, &payload.email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/reset-password/confirm",
    request_body = ConfirmResetRequest,
    responses(
        (status = 200, description = "Password updated", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Weak password or invalid token", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn confirm_reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ConfirmResetRequest>,
) -> AppResult<Json<ApiResponse<MessageResponse>>> {
    let resp = confirm_password_reset(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = current_user(&state, &user).await?;
    Ok(Json(resp))
}
