// Page/limit handling for list endpoints

use donation_domain::{pagination, Page};

/// A sanitized `?page=&limit=` pair plus the SQL offset it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let (page, limit, offset) = pagination::window(page, limit);
        Self {
            page,
            limit,
            offset,
        }
    }

    pub fn into_page<T>(self, rows: Vec<T>, total: i64) -> Page<T> {
        Page::new(rows, total, self.page, self.limit)
    }
}
