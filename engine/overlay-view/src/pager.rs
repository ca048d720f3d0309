use std::ops::Range;

/// Discrete page navigation for the sentence-level renderer, which shows a
/// fixed number of units per page instead of virtualizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    elements_per_page: usize,
    total: usize,
    page: usize,
}

impl Pager {
    pub fn new(elements_per_page: usize, total: usize) -> Self {
        Self { elements_per_page: elements_per_page.max(1), total, page: 0 }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.elements_per_page)
    }

    /// Units shown on the current page.
    pub fn range(&self) -> Range<usize> {
        let start = (self.page * self.elements_per_page).min(self.total);
        start..(start + self.elements_per_page).min(self.total)
    }

    /// Moves to `page`, clamped to the last page. Returns true when the page changed.
    pub fn go_to(&mut self, page: usize) -> bool {
        let target = page.min(self.page_count().saturating_sub(1));
        let changed = target != self.page;
        self.page = target;
        changed
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.page + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.go_to(self.page.saturating_sub(1))
    }

    /// The unit count changed (new document): keep the page if it still exists.
    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        self.go_to(self.page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging() {
        let mut pager = Pager::new(10, 25);

        assert_eq!(pager.page_count(), 3);
        assert_eq!(pager.range(), 0..10);
        assert!(pager.next());
        assert!(pager.next());
        assert_eq!(pager.range(), 20..25);
        assert!(!pager.next());
        assert!(pager.previous());
        assert_eq!(pager.page(), 1);
    }

    #[test]
    fn test_shrinking_total_clamps_page() {
        let mut pager = Pager::new(10, 25);
        pager.go_to(2);
        pager.set_total(5);

        assert_eq!(pager.page(), 0);
        assert_eq!(pager.range(), 0..5);
    }

    #[test]
    fn test_empty_pager() {
        let mut pager = Pager::new(10, 0);
        assert_eq!(pager.page_count(), 0);
        assert_eq!(pager.range(), 0..0);
        assert!(!pager.next());
    }
}
