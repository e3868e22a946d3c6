use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::{OsRng, RngCore};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, sea_query::Expr,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::classify_write_error,
    dto::auth::{ConfirmResetRequest, LoginForm, MessageResponse, RegisterRequest, TokenResponse},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    services::notifier::EmailMessage,
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// At least eight characters with an uppercase letter, a lowercase letter and a digit.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(char::is_uppercase)
        && password.chars().any(char::is_lowercase)
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 32 random bytes, hex encoded.
pub fn generate_one_time_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn password_matches(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn register_user(
    state: &AppState,
    mut payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    payload.email = normalize_email(&payload.email);
    payload.validate()?;
    let RegisterRequest {
        email,
        first_name,
        last_name,
        password,
    } = payload;
    if !is_strong_password(&password) {
        return Err(AppError::WeakPassword);
    }

    let exists = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::EmailTaken);
    }

    let password_hash = hash_password(&password)?;
    let activation_token = generate_one_time_token();

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        first_name: Set(first_name.trim().to_string()),
        last_name: Set(last_name.trim().to_string()),
        password_hash: Set(password_hash),
        is_admin: Set(false),
        is_active: Set(false),
        activation_token: Set(Some(activation_token.clone())),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.orm)
    .await
    .map_err(|err| match classify_write_error(err) {
        // Lost a race with a concurrent registration.
        AppError::IntegrityViolation => AppError::EmailTaken,
        other => other,
    })?;

    tracing::info!(user_id = %user.id, "user registered");
    if let Err(err) = state
        .notifier
        .enqueue(EmailMessage::activation(&user.email, &activation_token))
    {
        tracing::warn!(user_id = %user.id, error = %err, "account created but activation not queued");
    }

    Ok(ApiResponse::success("User created", User::from(user), None))
}

/// Consumes the activation token. The conditional update makes a replay,
/// even a concurrent one, match no row.
pub async fn activate_user(state: &AppState, token: &str) -> AppResult<ApiResponse<MessageResponse>> {
    if token.is_empty() {
        return Err(AppError::InvalidActivationToken);
    }

    let result = Users::update_many()
        .col_expr(UserCol::IsActive, Expr::value(true))
        .col_expr(UserCol::ActivationToken, Expr::value(Option::<String>::None))
        .filter(UserCol::ActivationToken.eq(token))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::InvalidActivationToken);
    }

    tracing::info!("account activated");
    Ok(ApiResponse::success(
        "Account activated",
        MessageResponse {
            message: "Account activated".into(),
        },
        None,
    ))
}

/// Stores a fresh reset token and queues its delivery without waiting on it.
pub async fn request_password_reset(
    state: &AppState,
    email: &str,
) -> AppResult<ApiResponse<MessageResponse>> {
    let email = normalize_email(email);
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let reset_token = generate_one_time_token();
    let expires_at = Utc::now()
        .checked_add_signed(state.reset_token_ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let mut active: UserActive = user.into();
    active.reset_token = Set(Some(reset_token.clone()));
    active.reset_token_expires_at = Set(Some(expires_at.fixed_offset()));
    let user = active.update(&state.orm).await?;

    if let Err(err) = state
        .notifier
        .enqueue(EmailMessage::password_reset(&user.email, &reset_token))
    {
        tracing::warn!(user_id = %user.id, error = %err, "reset token stored but not queued");
    }

    Ok(ApiResponse::success(
        "Password reset instructions sent",
        MessageResponse {
            message: "Password reset instructions sent".into(),
        },
        None,
    ))
}

pub async fn confirm_password_reset(
    state: &AppState,
    payload: ConfirmResetRequest,
) -> AppResult<ApiResponse<MessageResponse>> {
    let ConfirmResetRequest {
        token,
        new_password,
    } = payload;
    if !is_strong_password(&new_password) {
        return Err(AppError::WeakPassword);
    }
    if token.is_empty() {
        return Err(AppError::InvalidResetToken);
    }

    let user = Users::find()
        .filter(UserCol::ResetToken.eq(token.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::InvalidResetToken)?;

    let expired = user
        .reset_token_expires_at
        .is_none_or(|expires_at| expires_at.with_timezone(&Utc) <= Utc::now());
    if expired {
        return Err(AppError::InvalidResetToken);
    }

    let password_hash = hash_password(&new_password)?;
    let result = Users::update_many()
        .col_expr(UserCol::PasswordHash, Expr::value(password_hash))
        .col_expr(UserCol::ResetToken, Expr::value(Option::<String>::None))
        .col_expr(
            UserCol::ResetTokenExpiresAt,
            Expr::value(Option::<chrono::DateTime<chrono::FixedOffset>>::None),
        )
        .filter(UserCol::Id.eq(user.id))
        .filter(UserCol::ResetToken.eq(token.as_str()))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::InvalidResetToken);
    }

    tracing::info!(user_id = %user.id, "password reset completed");
    Ok(ApiResponse::success(
        "Password updated",
        MessageResponse {
            message: "Password updated".into(),
        },
        None,
    ))
}

pub async fn login_user(state: &AppState, form: LoginForm) -> AppResult<TokenResponse> {
    let LoginForm { username, password } = form;
    let email = normalize_email(&username);
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::InvalidCredentials),
    };

    if !password_matches(&password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AppError::AccountNotActivated);
    }

    let access_token = state.tokens.issue(user.id)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(TokenResponse {
        access_token,
        token_type: "bearer".into(),
    })
}

pub async fn current_user(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let user = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::UnknownSubject)?;

    Ok(ApiResponse::success(
        "OK",
        User::from(user),
        Some(Meta::empty()),
    ))
}
