//! Back/forward navigation history.

/// Ordered list of visited URLs with a cursor.
///
/// The cursor is `None` exactly when the list is empty and otherwise always
/// points at a valid entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationHistory {
    entries: Vec<String>,
    pos: Option<usize>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `url` after the cursor, dropping any forward entries first.
    pub fn record_visit(&mut self, url: impl Into<String>) {
        if let Some(pos) = self.pos {
            self.entries.truncate(pos + 1);
        }
        self.entries.push(url.into());
        self.pos = Some(self.entries.len() - 1);
    }

    /// Moves the cursor back one entry. `None` when already at the start.
    pub fn back(&mut self) -> Option<&str> {
        let pos = self.pos.filter(|pos| *pos > 0)? - 1;
        self.pos = Some(pos);
        self.entries.get(pos).map(String::as_str)
    }

    /// Moves the cursor forward one entry. `None` when already at the end.
    pub fn forward(&mut self) -> Option<&str> {
        let pos = self.pos.filter(|pos| pos + 1 < self.entries.len())? + 1;
        self.pos = Some(pos);
        self.entries.get(pos).map(String::as_str)
    }

    pub fn can_go_back(&self) -> bool {
        self.pos.is_some_and(|pos| pos > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.pos.is_some_and(|pos| pos + 1 < self.entries.len())
    }

    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.pos?).map(String::as_str)
    }

    pub fn position(&self) -> Option<usize> {
        self.pos
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::NavigationHistory;

    #[test]
    fn empty_history_has_no_cursor() {
        let mut history = NavigationHistory::new();
        assert_eq!(history.position(), None);
        assert_eq!(history.current(), None);
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), None);
        assert!(!history.can_go_back());
        assert!(!history.can_go_forward());
    }

    #[test]
    fn back_then_visit_truncates_forward_branch() {
        let mut history = NavigationHistory::new();
        history.record_visit("A");
        history.record_visit("B");

        assert_eq!(history.back(), Some("A"));
        assert_eq!(history.position(), Some(0));
        assert!(history.can_go_forward());

        history.record_visit("C");
        assert_eq!(history.entries(), ["A", "C"]);
        assert_eq!(history.position(), Some(1));

        assert_eq!(history.forward(), None);
        assert_eq!(history.position(), Some(1));
    }

    #[test]
    fn back_and_forward_walk_without_changing_entries() {
        let mut history = NavigationHistory::new();
        for url in ["A", "B", "C"] {
            history.record_visit(url);
        }

        assert_eq!(history.back(), Some("B"));
        assert_eq!(history.back(), Some("A"));
        assert_eq!(history.back(), None);
        assert_eq!(history.position(), Some(0));
        assert_eq!(history.forward(), Some("B"));
        assert_eq!(history.forward(), Some("C"));
        assert_eq!(history.forward(), None);
        assert_eq!(history.entries(), ["A", "B", "C"]);
    }

    #[test]
    fn repeated_visits_are_kept() {
        let mut history = NavigationHistory::new();
        history.record_visit("A");
        history.record_visit("A");
        assert_eq!(history.len(), 2);
        assert_eq!(history.current(), Some("A"));
        assert!(history.can_go_back());
    }
}
