//! Pagination.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Offset/limit page request. The limit is clamped to `MAX_PAGE_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Apply this page to an already filtered and sorted list.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Paged<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamped() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(0, 10_000).limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_slice() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(Page::new(8, 5).slice(&items), vec![8, 9]);
        assert!(Page::new(20, 5).slice(&items).is_empty());
    }
}
