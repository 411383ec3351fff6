//! Data models shared across storage and API handlers.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for paginated endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct PaginationQuery {
    /// Maximum number of records to return (default: 5, max: 100).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of records to skip (default: 0).
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    5
}

impl PaginationQuery {
    /// Returns a clamped limit value (1..=100).
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }

    /// Returns offset, floored at 0.
    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Wrapper for paginated API responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    /// The items for the current page.
    pub items: Vec<T>,
    /// Total number of records matching the query.
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            items,
            total,
            limit,
            offset,
        }
    }
}

pub mod analysis;
pub mod envelope;
pub mod ingest;
pub mod telemetry;
pub mod user;
pub mod view;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let q = PaginationQuery {
            limit: 10_000,
            offset: -3,
        };
        assert_eq!(q.limit(), 100);
        assert_eq!(q.offset(), 0);
        assert_eq!(PaginationQuery::default().limit(), 5);
    }
}
