//! Common types used across the platform

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size when the caller does not send `limit`
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Largest page size a caller may request
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    /// Build from raw query values, clamping page to at least 1 and limit
    /// to `1..=max_limit`
    pub fn normalize(page: Option<u32>, limit: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, max_limit),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    pub fn limit_i64(&self) -> i64 {
        self.limit as i64
    }

    /// Metadata for a page given the total row count
    pub fn meta(&self, total: i64) -> PaginationMeta {
        let total = total.max(0);
        let limit = self.limit.max(1) as i64;
        PaginationMeta {
            total,
            page: self.page,
            limit: self.limit,
            pages: (total + limit - 1) / limit,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Self {
            data,
            pagination: pagination.meta(total),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub pages: i64,
}

/// Inclusive timestamp window used by movement listings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pagination_defaults_and_clamps() {
        let p = Pagination::normalize(None, None, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
        assert_eq!(p, Pagination { page: 1, limit: 10 });

        let p = Pagination::normalize(Some(0), Some(500), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
        assert_eq!(p, Pagination { page: 1, limit: 100 });

        let p = Pagination::normalize(Some(3), Some(0), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
        assert_eq!(p, Pagination { page: 3, limit: 1 });
        assert_eq!(p.offset(), 2);
    }

    #[test]
    fn test_pages_round_up() {
        let p = Pagination { page: 2, limit: 10 };
        assert_eq!(p.meta(0).pages, 0);
        assert_eq!(p.meta(10).pages, 1);
        assert_eq!(p.meta(11).pages, 2);
        assert_eq!(p.offset(), 10);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let range = DateRange {
            start: Some(start),
            end: Some(end),
        };
        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(end + chrono::Duration::seconds(1)));
        assert!(DateRange::default().contains(start));
    }
}
