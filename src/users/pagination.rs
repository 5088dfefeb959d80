use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of one page within a larger result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub current_page: u64,
    pub per_page: u64,
    /// Items on the current page
    pub count: u64,
    /// Items across all pages
    pub total: u64,
    pub total_pages: u64,
}

impl PageDescriptor {
    pub fn range(&self) -> PageRange {
        let offset = self.current_page.saturating_sub(1).saturating_mul(self.per_page);
        PageRange {
            start: offset.max(self.total.min(1)),
            end: offset.saturating_add(self.count),
            total: self.total,
        }
    }

    /// Footer text, e.g. `Showing 1 to 10 of 25 results.`
    pub fn label(&self) -> String {
        self.range().to_string()
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {} to {} of {} results.",
            self.start, self.end, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(current_page: u64, per_page: u64, count: u64, total: u64) -> PageDescriptor {
        PageDescriptor {
            current_page,
            per_page,
            count,
            total,
            total_pages: total.div_ceil(per_page.max(1)),
        }
    }

    #[test]
    fn test_first_page_label() {
        assert_eq!(page(1, 10, 10, 25).label(), "Showing 1 to 10 of 25 results.");
    }

    #[test]
    fn test_empty_result_starts_at_zero() {
        assert_eq!(page(1, 10, 0, 0).label(), "Showing 0 to 0 of 0 results.");
    }

    #[test]
    fn test_empty_page_with_results_never_starts_at_zero() {
        let range = page(1, 10, 0, 5).range();
        assert_eq!(range.start, 1);
        assert_eq!(range.end, 0);
    }

    #[test]
    fn test_later_page_uses_offset() {
        assert_eq!(page(3, 10, 5, 25).label(), "Showing 20 to 25 of 25 results.");
    }

    #[test]
    fn test_page_zero_does_not_underflow() {
        let range = page(0, 10, 3, 3).range();
        assert_eq!(range.start, 1);
        assert_eq!(range.end, 3);
    }

    #[test]
    fn test_navigation_bounds() {
        let first = page(1, 10, 10, 25);
        assert!(first.has_next_page());
        assert!(!first.has_previous_page());

        let last = page(3, 10, 5, 25);
        assert!(!last.has_next_page());
        assert!(last.has_previous_page());
    }
}
