//! Pagination utilities for service layer
//!
//! Provides a simple `Pagination` struct and a `Page` result for slicing
//! in-memory listings.

use serde::Serialize;

/// Pagination parameters
#[derive(Clone, Copy, Debug)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Clamp to sane defaults; returns the 0-based page index and page size.
    pub fn normalize(self) -> (usize, usize) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, 100);
        ((page - 1) as usize, per_page as usize)
    }

    /// Cut one page out of `items`. Pages past the end are empty.
    pub fn apply<T>(self, items: Vec<T>) -> Paged<T> {
        let (idx, per_page) = self.normalize();
        let total = items.len();
        let pages = total.div_ceil(per_page);
        let items = items.into_iter().skip(idx.saturating_mul(per_page)).take(per_page).collect();
        Paged { items, total, page: idx + 1, per_page, pages }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

/// One page of results plus the totals needed to render a pager.
#[derive(Clone, Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
}

impl<T> Paged<T> {
    pub fn has_next(&self) -> bool { self.page < self.pages }

    pub fn has_prev(&self) -> bool { self.page > 1 }
}
