use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Contractor;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContractorRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContractorList {
    pub items: Vec<Contractor>,
}
