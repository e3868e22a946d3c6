mod common;

use std::sync::Arc;

use common::{FailingMailer, PASSWORD, create_user, setup, setup_state};
use orders_api::{
    dto::auth::{ConfirmResetRequest, LoginForm, RegisterRequest},
    entity::users::{Column as UserCol, Entity as Users},
    error::AppError,
    middleware::auth::authenticate,
    services::auth_service,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

fn register_request(email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        password: password.into(),
    }
}

fn login_form(email: &str, password: &str) -> LoginForm {
    LoginForm {
        username: email.into(),
        password: password.into(),
    }
}

// Register -> login refused until activation -> activate -> login -> token authenticates.
#[tokio::test]
async fn register_activate_login_flow() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;

    let weak = auth_service::register_user(state, register_request("ada@example.com", "weakpass")).await;
    assert!(matches!(weak, Err(AppError::WeakPassword)));

    let registered =
        auth_service::register_user(state, register_request("Ada@Example.com", "Strong123")).await?;
    let user = registered.data.expect("user data");
    assert_eq!(user.email, "ada@example.com");
    assert!(!user.is_active);
    assert!(!user.is_admin);

    let stored = Users::find_by_id(user.id).one(&state.orm).await?.expect("stored user");
    assert_ne!(stored.password_hash, "Strong123");
    let activation_token = stored.activation_token.clone().expect("activation token");

    let early = auth_service::login_user(state, login_form("ada@example.com", "Strong123")).await;
    assert!(matches!(early, Err(AppError::AccountNotActivated)));

    let sent = app.mailer.wait_for(1).await;
    assert_eq!(sent[0].to, "ada@example.com");
    assert!(sent[0].body.contains(&activation_token));

    auth_service::activate_user(state, &activation_token).await?;

    let replay = auth_service::activate_user(state, &activation_token).await;
    assert!(matches!(replay, Err(AppError::InvalidActivationToken)));

    let stored = Users::find_by_id(user.id).one(&state.orm).await?.expect("stored user");
    assert!(stored.is_active);
    assert!(stored.activation_token.is_none());

    let token = auth_service::login_user(state, login_form("ada@example.com", "Strong123")).await?;
    assert_eq!(token.token_type, "bearer");

    let auth = authenticate(state, &token.access_token).await?;
    assert_eq!(auth.user_id, user.id);
    assert!(!auth.is_admin);

    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> anyhow::Result<()> {
    let app = setup().await?;

    auth_service::register_user(&app.state, register_request("bob@example.com", "Strong123")).await?;
    let again =
        auth_service::register_user(&app.state, register_request(" BOB@example.com", "Strong456")).await;

    assert!(matches!(again, Err(AppError::EmailTaken)));
    Ok(())
}

#[tokio::test]
async fn malformed_email_or_blank_name_is_rejected() -> anyhow::Result<()> {
    let app = setup().await?;

    for email in ["not-an-email", "@example.com", "al ice@example.com", ""] {
        let result = auth_service::register_user(&app.state, register_request(email, "Strong123")).await;
        assert!(matches!(result, Err(AppError::Validation(_))), "{email:?} was accepted");
    }

    let mut nameless = register_request("grace@example.com", "Strong123");
    nameless.first_name = String::new();
    let result = auth_service::register_user(&app.state, nameless).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    // Structural checks run before the password policy.
    let result = auth_service::register_user(&app.state, register_request("nope", "weak")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    assert!(Users::find().one(&app.state.orm).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn login_does_not_reveal_which_part_was_wrong() -> anyhow::Result<()> {
    let app = setup().await?;
    create_user(&app.state, "carol@example.com", false, true).await?;

    let unknown = auth_service::login_user(&app.state, login_form("nobody@example.com", PASSWORD))
        .await
        .unwrap_err();
    let wrong = auth_service::login_user(&app.state, login_form("carol@example.com", "Wrong1234"))
        .await
        .unwrap_err();

    assert!(matches!(unknown, AppError::InvalidCredentials));
    assert!(matches!(wrong, AppError::InvalidCredentials));
    assert_eq!(unknown.detail(), wrong.detail());
    Ok(())
}

#[tokio::test]
async fn bearer_checks_for_inactive_and_deleted_accounts() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;

    let inactive = create_user(state, "idle@example.com", false, false).await?;
    let token = state.tokens.issue(inactive.id)?;
    assert!(matches!(
        authenticate(state, &token).await,
        Err(AppError::AccountNotActivated)
    ));

    let gone = create_user(state, "gone@example.com", false, true).await?;
    let token = state.tokens.issue(gone.id)?;
    Users::delete_by_id(gone.id).exec(&state.orm).await?;
    assert!(matches!(
        authenticate(state, &token).await,
        Err(AppError::UnknownSubject)
    ));

    assert!(matches!(
        authenticate(state, "definitely.not.valid").await,
        Err(AppError::InvalidToken)
    ));
    Ok(())
}

#[tokio::test]
async fn password_reset_token_is_single_use() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let user = create_user(state, "dave@example.com", false, true).await?;

    auth_service::request_password_reset(state, "dave@example.com").await?;

    let stored = Users::find_by_id(user.id).one(&state.orm).await?.expect("stored user");
    let reset_token = stored.reset_token.expect("reset token");
    assert!(stored.reset_token_expires_at.is_some());

    let sent = app.mailer.wait_for(1).await;
    assert_eq!(sent[0].to, "dave@example.com");
    assert!(sent[0].body.contains(&reset_token));

    let weak = auth_service::confirm_password_reset(
        state,
        ConfirmResetRequest {
            token: reset_token.clone(),
            new_password: "short".into(),
        },
    )
    .await;
    assert!(matches!(weak, Err(AppError::WeakPassword)));

    auth_service::confirm_password_reset(
        state,
        ConfirmResetRequest {
            token: reset_token.clone(),
            new_password: "Renewed456".into(),
        },
    )
    .await?;

    let replay = auth_service::confirm_password_reset(
        state,
        ConfirmResetRequest {
            token: reset_token,
            new_password: "Another789".into(),
        },
    )
    .await;
    assert!(matches!(replay, Err(AppError::InvalidResetToken)));

    let old = auth_service::login_user(state, login_form("dave@example.com", PASSWORD)).await;
    assert!(matches!(old, Err(AppError::InvalidCredentials)));
    auth_service::login_user(state, login_form("dave@example.com", "Renewed456")).await?;

    Ok(())
}

#[tokio::test]
async fn expired_reset_token_is_rejected() -> anyhow::Result<()> {
    let app = setup().await?;
    let mut state = app.state.clone();
    state.reset_token_ttl = chrono::Duration::minutes(-1);
    let user = create_user(&state, "erin@example.com", false, true).await?;

    auth_service::request_password_reset(&state, "erin@example.com").await?;
    let reset_token = Users::find_by_id(user.id)
        .one(&state.orm)
        .await?
        .and_then(|u| u.reset_token)
        .expect("reset token");

    let result = auth_service::confirm_password_reset(
        &state,
        ConfirmResetRequest {
            token: reset_token,
            new_password: "Renewed456".into(),
        },
    )
    .await;

    assert!(matches!(result, Err(AppError::InvalidResetToken)));
    Ok(())
}

#[tokio::test]
async fn reset_for_unknown_email_is_not_found() -> anyhow::Result<()> {
    let app = setup().await?;

    let result = auth_service::request_password_reset(&app.state, "nobody@example.com").await;

    assert!(matches!(result, Err(AppError::NotFound("User"))));
    Ok(())
}

// Delivery failure only reaches the log; the token is stored regardless.
#[tokio::test]
async fn reset_succeeds_when_mail_delivery_fails() -> anyhow::Result<()> {
    let state = setup_state(Arc::new(FailingMailer)).await?;
    create_user(&state, "frank@example.com", false, true).await?;

    auth_service::request_password_reset(&state, "frank@example.com").await?;

    let stored = Users::find()
        .filter(UserCol::Email.eq("frank@example.com"))
        .one(&state.orm)
        .await?
        .expect("stored user");
    assert!(stored.reset_token.is_some());
    Ok(())
}

#[tokio::test]
async fn registration_succeeds_when_mail_delivery_fails() -> anyhow::Result<()> {
    let state = setup_state(Arc::new(FailingMailer)).await?;

    let created =
        auth_service::register_user(&state, register_request("henry@example.com", "Strong123")).await?;

    let user_id = created.data.expect("user data").id;
    let stored = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .expect("stored user");
    assert!(!stored.is_active);
    assert!(stored.activation_token.is_some());
    Ok(())
}
