use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::{
    dto::contractors::{ContractorList, CreateContractorRequest},
    error::{AppResult, ErrorBody},
    extract::AppJson,
    middleware::auth::AuthUser,
    models::Contractor,
    response::ApiResponse,
    services::contractor_service::{create_contractor, list_contractors},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list).post(create))
}

#[utoipa::path(
    get,
    path = "/api/contractors",
    responses(
        (status = 200, description = "Contractors by name", body = ApiResponse<ContractorList>),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Contractors"
)]
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<ContractorList>>> {
    let resp = list_contractors(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/contractors",
    request_body = CreateContractorRequest,
    responses(
        (status = 201, description = "Contractor created", body = ApiResponse<Contractor>),
        (status = 403, description = "Admins only", body = ErrorBody),
        (status = 409, description = "Name already used", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Contractors"
)]
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateContractorRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Contractor>>)> {
    let resp = create_contractor(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
