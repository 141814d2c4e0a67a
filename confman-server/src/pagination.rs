//! Pagination utilities for list endpoints

use serde::{Deserialize, Serialize};

/// Default page size
pub const PAGE_SIZE: i64 = 20;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&pageSize=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    #[serde(skip)]
    pub offset: i64,
}

/// Calculate pagination metadata from total results and requested page
///
/// Page is clamped to `[1, total_pages]`, page size to `[1, MAX_PAGE_SIZE]`.
///
/// ```
/// use confman_server::pagination::calculate_pagination;
///
/// // 45 users at 20 per page = 3 pages
/// let p = calculate_pagination(45, 2, 20);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 20);
///
/// // Out-of-bounds page is clamped to the last one
/// let p = calculate_pagination(45, 99, 20);
/// assert_eq!(p.page, 3);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let total_pages = (total_results + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        page_size,
        total: total_results,
        total_pages,
        offset,
    }
}

impl PageQuery {
    pub fn resolve(&self, total_results: i64) -> Pagination {
        calculate_pagination(
            total_results,
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(PAGE_SIZE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(45, 2, 20);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 20);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(45, 0, 20);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1, 20);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_page_size_clamped() {
        let p = calculate_pagination(500, 1, 10_000);
        assert_eq!(p.page_size, MAX_PAGE_SIZE);
        let p = calculate_pagination(5, 1, 0);
        assert_eq!(p.page_size, 1);
        assert_eq!(p.total_pages, 5);
    }

    #[test]
    fn test_query_defaults() {
        let p = PageQuery::default().resolve(45);
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, PAGE_SIZE);
    }
}
