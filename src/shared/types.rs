use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::MAX_PAGE_SIZE;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub meta: Option<Meta>,
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Meta {
    pub total: i64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            data,
            message,
            meta,
            errors: None,
        }
    }

    pub fn error(message: Option<String>, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message,
            meta: None,
            errors,
        }
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Offset/limit window over a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Build a window from a 1-indexed page number, clamping both inputs
    pub fn from_page(page: i64, page_size: i64) -> Self {
        let limit = page_size.clamp(1, MAX_PAGE_SIZE);
        Self {
            offset: (page.max(1) - 1).saturating_mul(limit),
            limit,
        }
    }
}

/// One window of a listing plus the total number of matching rows
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_from_page() {
        assert_eq!(
            PageRequest::from_page(1, 10),
            PageRequest {
                offset: 0,
                limit: 10
            }
        );
        assert_eq!(
            PageRequest::from_page(3, 25),
            PageRequest {
                offset: 50,
                limit: 25
            }
        );
    }

    #[test]
    fn test_page_request_clamps_inputs() {
        let req = PageRequest::from_page(0, 0);
        assert_eq!(req.offset, 0);
        assert_eq!(req.limit, 1);

        let req = PageRequest::from_page(2, 10_000);
        assert_eq!(req.limit, MAX_PAGE_SIZE);
        assert_eq!(req.offset, MAX_PAGE_SIZE);
    }
}
