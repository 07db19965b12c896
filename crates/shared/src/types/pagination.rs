//! Paging parameters for list queries.

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_LIMIT: u32 = 50;

/// Largest page a single query may return.
pub const MAX_LIMIT: u32 = 1000;

/// Limit/offset request for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of items per page. Zero means "use the default".
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Number of items to skip.
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl PageRequest {
    /// Creates a request, normalizing the limit.
    #[must_use]
    pub fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }.normalized()
    }

    /// Returns a copy with the limit defaulted and capped.
    #[must_use]
    pub fn normalized(self) -> Self {
        let limit = match self.limit {
            0 => DEFAULT_LIMIT,
            n => n.min(MAX_LIMIT),
        };
        Self {
            limit,
            offset: self.offset,
        }
    }

    /// Returns the effective limit as a `usize` for slicing.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.normalized().limit as usize
    }

    /// Returns the offset as a `usize`, saturating on narrow targets.
    #[must_use]
    pub fn offset(&self) -> usize {
        usize::try_from(self.offset).unwrap_or(usize::MAX)
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// The (normalized) request that produced this page.
    pub page: PageRequest,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(data: Vec<T>, page: PageRequest, total: u64) -> Self {
        Self {
            data,
            total,
            page: page.normalized(),
        }
    }

    /// Returns true if more items follow this page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.page.offset.saturating_add(self.data.len() as u64) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_page_request_default() {
        let request = PageRequest::default();
        assert_eq!(request.limit, 50);
        assert_eq!(request.offset, 0);
    }

    #[rstest]
    #[case(0, 50)]
    #[case(10, 10)]
    #[case(1000, 1000)]
    #[case(1001, 1000)]
    #[case(u32::MAX, 1000)]
    fn test_page_request_normalizes_limit(#[case] requested: u32, #[case] effective: u32) {
        assert_eq!(PageRequest::new(requested, 0).limit, effective);
    }

    #[test]
    fn test_page_request_deserializes_with_defaults() {
        let request: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, PageRequest::default());
    }

    #[test]
    fn test_page_response_has_more() {
        let page = PageResponse::new(vec![1, 2], PageRequest::new(2, 0), 3);
        assert!(page.has_more());

        let last = PageResponse::new(vec![3], PageRequest::new(2, 2), 3);
        assert!(!last.has_more());
    }

    #[test]
    fn test_page_response_has_more_at_maximum_offset() {
        let request: PageRequest =
            serde_json::from_str(&format!(r#"{{"limit": 5, "offset": {}}}"#, u64::MAX)).unwrap();
        let page = PageResponse::new(vec![1], request, 3);
        assert!(!page.has_more());
    }
}
