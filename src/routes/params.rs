use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
/// SQL offsets are signed 64-bit.
pub const MAX_SKIP: u64 = i64::MAX as u64;

/// Query string of `GET /api/orders`. Dates filter on the creation date and
/// include both ends.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub is_delivered: Option<bool>,
}

impl OrderListQuery {
    /// Returns `(skip, limit)` with defaults applied and both clamped.
    pub fn normalize(&self) -> (u64, u64) {
        let skip = self.skip.unwrap_or(0).min(MAX_SKIP);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (skip, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_applies_defaults_and_bounds() {
        assert_eq!(OrderListQuery::default().normalize(), (0, DEFAULT_LIMIT));

        let query = OrderListQuery {
            skip: Some(20),
            limit: Some(1_000),
            ..Default::default()
        };
        assert_eq!(query.normalize(), (20, MAX_LIMIT));

        let query = OrderListQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(query.normalize(), (0, 1));

        let query = OrderListQuery {
            skip: Some(u64::MAX),
            ..Default::default()
        };
        assert_eq!(query.normalize(), (MAX_SKIP, DEFAULT_LIMIT));
    }
}
