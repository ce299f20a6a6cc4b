//! Shared pagination types for API query parameters.
//!
//! List endpoints use page-based pagination with `page` (1-based) and `limit` parameters.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// Standard pagination parameters for list endpoints.
///
/// - `page`: 1-based page number (default: 1)
/// - `limit`: Maximum items to return (default: 10, max: 100)
///
/// Both values are clamped so that a request can never produce a negative offset or an
/// unbounded page.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Page number, starting at 1 (default: 1)
    #[param(default = 1, minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub page: Option<i64>,

    /// Maximum number of items to return (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    /// Get the page number, defaulting to 1 if not specified.
    #[inline]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the limit value, clamped between 1 and MAX_LIMIT.
    /// Defaults to DEFAULT_LIMIT if not specified.
    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Number of rows to skip to reach the requested page.
    #[inline]
    pub fn skip(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Number of pages needed to hold `total` items at the current limit.
    #[inline]
    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = self.limit();
        (total.max(0) + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), DEFAULT_LIMIT);
        assert_eq!(p.skip(), 0);
    }

    #[test]
    fn test_clamping() {
        let p = Pagination {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), MAX_LIMIT);

        let p = Pagination {
            page: Some(-3),
            limit: Some(0),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 1);
    }

    #[test]
    fn test_skip_and_total_pages() {
        let p = Pagination {
            page: Some(3),
            limit: Some(2),
        };
        assert_eq!(p.skip(), 4);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(4), 2);
        assert_eq!(p.total_pages(5), 3);
    }

    #[test]
    fn test_deserialize_from_query_string() {
        let p: Pagination = serde_json::from_value(serde_json::json!({ "page": "2", "limit": "25" })).unwrap();
        assert_eq!(p.page(), 2);
        assert_eq!(p.limit(), 25);
    }
}
