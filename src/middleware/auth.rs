use axum::{extract::FromRequestParts, http::header};
use sea_orm::{ColumnTrait, Condition};
use uuid::Uuid;

use crate::{
    entity::orders::{Column as OrderCol, Model as OrderModel},
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Read,
    Update,
    Delete,
}

/// Resolves a bearer token to an active user. Every protected operation
/// goes through here.
pub async fn authenticate(state: &AppState, token: &str) -> AppResult<AuthUser> {
    let user = state.tokens.verify(&state.orm, token).await?;
    if !user.is_active {
        return Err(AppError::AccountNotActivated);
    }
    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
        is_admin: user.is_admin,
    })
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Admins may do anything to any order; everyone else only to their own.
/// Creating an order needs no check beyond authentication, the creator
/// becomes its owner.
pub fn authorize_order_access(
    user: &AuthUser,
    order: &OrderModel,
    action: OrderAction,
) -> Result<(), AppError> {
    if user.is_admin || order.user_id == user.user_id {
        return Ok(());
    }
    tracing::warn!(
        user_id = %user.user_id,
        order_id = %order.id,
        action = ?action,
        "order access denied"
    );
    Err(AppError::Forbidden)
}

/// Orders a user is allowed to see in listings.
pub fn order_visibility(user: &AuthUser) -> Condition {
    if user.is_admin {
        Condition::all()
    } else {
        Condition::all().add(OrderCol::UserId.eq(user.user_id))
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthenticated)?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthenticated)?;

        let token = bearer_token(auth_str).ok_or(AppError::Unauthenticated)?;

        authenticate(state, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn user(is_admin: bool) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".into(),
            is_admin,
        }
    }

    fn order_owned_by(owner: Uuid) -> OrderModel {
        OrderModel {
            id: Uuid::new_v4(),
            user_id: owner,
            contractor_id: Uuid::new_v4(),
            delivery_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            is_delivered: false,
            created_at: Utc::now().fixed_offset(),
        }
    }

    const ALL_ACTIONS: [OrderAction; 3] =
        [OrderAction::Read, OrderAction::Update, OrderAction::Delete];

    #[test]
    fn owner_may_do_everything_with_own_order() {
        let owner = user(false);
        let order = order_owned_by(owner.user_id);

        for action in ALL_ACTIONS {
            assert!(authorize_order_access(&owner, &order, action).is_ok());
        }
    }

    #[test]
    fn other_users_are_forbidden() {
        let stranger = user(false);
        let order = order_owned_by(Uuid::new_v4());

        for action in ALL_ACTIONS {
            assert!(matches!(
                authorize_order_access(&stranger, &order, action),
                Err(AppError::Forbidden)
            ));
        }
    }

    #[test]
    fn admin_may_do_everything_with_any_order() {
        let admin = user(true);
        let order = order_owned_by(Uuid::new_v4());

        for action in ALL_ACTIONS {
            assert!(authorize_order_access(&admin, &order, action).is_ok());
        }
        assert!(ensure_admin(&admin).is_ok());
        assert!(matches!(ensure_admin(&user(false)), Err(AppError::Forbidden)));
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
