use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Meta {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub total: Option<u64>,
}

impl Meta {
    pub fn new(skip: u64, limit: u64, total: u64) -> Self {
        Self {
            skip: Some(skip),
            limit: Some(limit),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            skip: None,
            limit: None,
            total: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}
