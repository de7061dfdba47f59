use serde::{Deserialize, Serialize};

/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Clamps the window to `page >= 1` and `limit <= MAX_PAGE_LIMIT`.
    ///
    /// A zero limit stays zero and selects an empty page.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.min(MAX_PAGE_LIMIT),
        }
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> u64 {
        let window = self.normalized();
        u64::from(window.page - 1) * u64::from(window.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}
