//! Page slicing for filtered result sets.

use serde::Serialize;

/// Rows per page when the caller does not configure one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served.
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub has_more: bool,
}

/// Cut page `page` (1-based) out of `items`.
///
/// Page numbers below 1 are served as page 1, and a zero `per_page` falls back
/// to [`DEFAULT_PAGE_SIZE`]. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let page = page.max(1);
    let per_page = if per_page == 0 { DEFAULT_PAGE_SIZE } else { per_page };
    let total = items.len();
    let start = (page - 1).saturating_mul(per_page);

    let items: Vec<T> = items.into_iter().skip(start).take(per_page).collect();

    Page {
        items,
        page,
        per_page,
        total,
        has_more: page.saturating_mul(per_page) < total,
    }
}
