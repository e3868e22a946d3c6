use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    db::classify_write_error,
    dto::contractors::{ContractorList, CreateContractorRequest},
    entity::contractors::{ActiveModel as ContractorActive, Column as ContractorCol, Entity as Contractors},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Contractor,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_contractors(state: &AppState) -> AppResult<ApiResponse<ContractorList>> {
    let items: Vec<Contractor> = Contractors::find()
        .order_by_asc(ContractorCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Contractor::from)
        .collect();

    let total = items.len() as u64;
    Ok(ApiResponse::success(
        "OK",
        ContractorList { items },
        Some(Meta::new(0, total, total)),
    ))
}

pub async fn create_contractor(
    state: &AppState,
    user: &AuthUser,
    payload: CreateContractorRequest,
) -> AppResult<ApiResponse<Contractor>> {
    ensure_admin(user)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Contractor name must not be empty".into()));
    }

    let contractor = ContractorActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.orm)
    .await
    .map_err(classify_write_error)?;

    tracing::info!(contractor_id = %contractor.id, admin_id = %user.user_id, "contractor created");
    Ok(ApiResponse::success(
        "Contractor created",
        Contractor::from(contractor),
        None,
    ))
}
