//! Offset pagination primitives shared by list endpoints.

use serde::Serialize;

pub const DEFAULT_PAGE_LIMIT: u32 = 12;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// 1-based page request. Construction clamps out-of-range values.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let limit = u64::from(request.limit());
        let total_pages = total.div_ceil(limit);
        let page = u64::from(request.page());
        Self {
            page: request.page(),
            limit: request.limit(),
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One page of results plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            pagination: Pagination::new(request, total),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let p = PageRequest::default();
        assert_eq!((p.page(), p.limit()), (1, DEFAULT_PAGE_LIMIT));

        let p = PageRequest::new(Some(0), Some(10_000));
        assert_eq!((p.page(), p.limit()), (1, MAX_PAGE_LIMIT));

        let p = PageRequest::new(Some(3), Some(0));
        assert_eq!((p.page(), p.limit()), (3, 1));
        assert_eq!(p.offset(), 2);
    }

    #[test]
    fn pagination_metadata() {
        let m = Pagination::new(PageRequest::new(Some(2), Some(10)), 25);
        assert_eq!(m.total_pages, 3);
        assert!(m.has_next);
        assert!(m.has_prev);

        let m = Pagination::new(PageRequest::new(Some(3), Some(10)), 25);
        assert!(!m.has_next);

        let m = Pagination::new(PageRequest::default(), 0);
        assert_eq!(m.total_pages, 0);
        assert!(!m.has_next);
        assert!(!m.has_prev);
    }
}
