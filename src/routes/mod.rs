use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod contractors;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/orders", orders::router())
        .nest("/contractors", contractors::router())
}
