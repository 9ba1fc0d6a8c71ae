//! Offset-based pagination utilities for list endpoints.

use serde::{Deserialize, Serialize};

/// Default page size when the client does not specify one.
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Maximum page size a client may request.
pub const MAX_PER_PAGE: i64 = 100;

/// Query parameters for paginated list endpoints.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageParams {
    /// Returns the effective page number (1-based, minimum 1).
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Returns the effective page size, clamped to [1, MAX_PER_PAGE].
    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Returns the SQL offset for the effective page.
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

/// Pagination metadata returned alongside list data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// Builds pagination metadata from effective params and a total row count.
    pub fn new(params: PageParams, total: i64) -> Self {
        let per_page = params.per_page();
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page: params.page(),
            per_page,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_page_clamping() {
        let params = PageParams {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), MAX_PER_PAGE);

        let params = PageParams {
            page: Some(-5),
            per_page: Some(0),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), 1);
    }

    #[test]
    fn test_offset_calculation() {
        let params = PageParams {
            page: Some(3),
            per_page: Some(25),
        };
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn test_pagination_total_pages() {
        let params = PageParams {
            page: Some(1),
            per_page: Some(20),
        };
        assert_eq!(Pagination::new(params, 0).total_pages, 0);
        assert_eq!(Pagination::new(params, 1).total_pages, 1);
        assert_eq!(Pagination::new(params, 20).total_pages, 1);
        assert_eq!(Pagination::new(params, 21).total_pages, 2);
        assert_eq!(Pagination::new(params, 100).total_pages, 5);
    }

    #[test]
    fn test_pagination_serializes_all_fields() {
        let params = PageParams {
            page: Some(2),
            per_page: Some(10),
        };
        let pagination = Pagination::new(params, 35);
        let json = serde_json::to_value(&pagination).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["per_page"], 10);
        assert_eq!(json["total"], 35);
        assert_eq!(json["total_pages"], 4);
    }
}
