//! Pagination arithmetic and the canonical page envelope

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
/// Highest page whose offset still fits in an `i64` at any allowed limit.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// Canonical list envelope: `{ result, total, page, limit, totalPages }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub result: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(result: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        Self {
            result,
            total,
            page,
            limit,
            total_pages: total_pages(total, limit),
        }
    }
}

/// `ceil(total / limit)`, never below 1.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    let limit = if limit > 0 { limit } else { DEFAULT_LIMIT };
    let total = total.max(0);
    ((total + limit - 1) / limit).max(1)
}

pub fn clamp_page(page: i64, total_pages: i64) -> i64 {
    page.clamp(1, total_pages.max(1))
}

/// Sanitizes requested `page`/`limit` into `(page, limit, offset)`.
pub fn window(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    (page, limit, (page - 1) * limit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageSlot {
    Page(i64),
    Gap,
}

/// Page buttons: every page up to 7, otherwise first, last and current ±2
/// with gaps in between.
pub fn page_window(page: i64, total_pages: i64) -> Vec<PageSlot> {
    let total_pages = total_pages.max(1);
    if total_pages <= 7 {
        return (1..=total_pages).map(PageSlot::Page).collect();
    }

    let page = clamp_page(page, total_pages);
    let mut slots = vec![PageSlot::Page(1)];
    if page > 4 {
        slots.push(PageSlot::Gap);
    }
    let start = (page - 2).max(2);
    let end = (page + 2).min(total_pages - 1);
    slots.extend((start..=end).map(PageSlot::Page));
    if page < total_pages - 3 {
        slots.push(PageSlot::Gap);
    }
    slots.push(PageSlot::Page(total_pages));
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_has_floor_of_one() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(7, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 1);
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(3, 2), 2);
        assert_eq!(clamp_page(0, 2), 1);
        assert_eq!(clamp_page(2, 0), 1);
    }

    #[test]
    fn test_window_sanitizes_input() {
        assert_eq!(window(None, None), (1, 10, 0));
        assert_eq!(window(Some(3), Some(20)), (3, 20, 40));
        assert_eq!(window(Some(-1), Some(1000)), (1, 100, 0));
    }

    #[test]
    fn test_window_caps_huge_pages() {
        let (page, limit, offset) = window(Some(i64::MAX), Some(MAX_LIMIT));
        assert_eq!(page, MAX_PAGE);
        assert_eq!(offset, (MAX_PAGE - 1) * limit);
        let (page, _, offset) = window(Some(i64::MAX), Some(10));
        assert_eq!(page, MAX_PAGE);
        assert!(offset > 0);
    }

    #[test]
    fn test_page_window_small() {
        assert_eq!(
            page_window(1, 3),
            vec![PageSlot::Page(1), PageSlot::Page(2), PageSlot::Page(3)]
        );
    }

    #[test]
    fn test_page_window_with_gaps() {
        use PageSlot::*;
        assert_eq!(
            page_window(6, 12),
            vec![Page(1), Gap, Page(4), Page(5), Page(6), Page(7), Page(8), Gap, Page(12)]
        );
        assert_eq!(
            page_window(1, 12),
            vec![Page(1), Page(2), Page(3), Gap, Page(12)]
        );
        assert_eq!(
            page_window(12, 12),
            vec![Page(1), Gap, Page(10), Page(11), Page(12)]
        );
    }
}
