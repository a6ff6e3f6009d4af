//! Pagination for list endpoints (100 rows per page)

use serde::Serialize;

/// Page size for all list endpoints
pub const PAGE_SIZE: i64 = 100;

/// Page position within a result set, serialized alongside list results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    /// Rows matching the query across all pages
    pub total_results: i64,
    #[serde(skip)]
    pub offset: i64,
}

/// Calculate pagination from total results and the requested page
///
/// The page is clamped to `[1, total_pages]`; an empty result set reports
/// page 1 of 0.
///
/// # Examples
/// ```
/// use docmeta_dr::pagination::calculate_pagination;
///
/// // 250 total results = 3 pages (100 + 100 + 50)
/// let p = calculate_pagination(250, 2);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 100);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(250, 99);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 200);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64) -> Pagination {
    let total_results = total_results.max(0);
    let total_pages = (total_results + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.clamp(1, total_pages.max(1));

    Pagination {
        page,
        page_size: PAGE_SIZE,
        total_pages,
        total_results,
        offset: (page - 1) * PAGE_SIZE,
    }
}
