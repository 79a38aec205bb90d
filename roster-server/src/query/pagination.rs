//! Page/limit handling for person listings

/// Page size when the request gives none
pub const DEFAULT_LIMIT: i64 = 6;

/// Sanitized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Build from already-coerced integers
    ///
    /// Missing or non-positive pages become 1, missing or non-positive limits
    /// become [`DEFAULT_LIMIT`], and limits are capped at `max_limit`.
    ///
    /// # Examples
    /// ```
    /// use roster_server::query::PageRequest;
    ///
    /// let p = PageRequest::from_raw(Some(2), Some(6), 100);
    /// assert_eq!(p.offset(), 6);
    ///
    /// let p = PageRequest::from_raw(Some(0), Some(500), 100);
    /// assert_eq!(p.page, 1);
    /// assert_eq!(p.limit, 100);
    /// ```
    pub fn from_raw(page: Option<i64>, limit: Option<i64>, max_limit: i64) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(max_limit.max(1));

        Self { page, limit }
    }

    /// Offset for SQL LIMIT/OFFSET
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}
