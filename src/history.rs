//! Hash-fragment session history.
//!
//! Mirrors the part of the browser history API the router relies on:
//! `pushState` appends an entry and discards anything forward of the
//! cursor, while back/forward move the cursor and surface the new hash the
//! way a `popstate` event would.

/// Ordered hash entries with a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
    cursor: usize,
}

impl History {
    /// A history whose only entry is `initial_hash` (without the `#`).
    pub fn new(initial_hash: &str) -> Self {
        Self {
            entries: vec![strip_hash(initial_hash).to_string()],
            cursor: 0,
        }
    }

    pub fn current_hash(&self) -> &str {
        &self.entries[self.cursor]
    }

    /// Append `hash` after the current entry, dropping forward entries.
    pub fn push(&mut self, hash: &str) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(strip_hash(hash).to_string());
        self.cursor = self.entries.len() - 1;
    }

    /// Step back; returns the new current hash, or `None` at the start.
    pub fn back(&mut self) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.current_hash())
    }

    /// Step forward; returns the new current hash, or `None` at the end.
    pub fn forward(&mut self) -> Option<&str> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.current_hash())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new("")
    }
}

/// `#produtos` and `produtos` name the same entry.
pub fn strip_hash(hash: &str) -> &str {
    hash.strip_prefix('#').unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_moves_cursor() {
        let mut history = History::new("");
        history.push("#produtos");
        assert_eq!(history.current_hash(), "produtos");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn back_and_forward() {
        let mut history = History::new("home");
        history.push("produtos");
        history.push("sobre");
        assert_eq!(history.back(), Some("produtos"));
        assert_eq!(history.back(), Some("home"));
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), Some("produtos"));
    }

    #[test]
    fn push_after_back_drops_forward_entries() {
        let mut history = History::new("home");
        history.push("produtos");
        history.push("sobre");
        history.back();
        history.push("contato");
        assert_eq!(history.forward(), None);
        assert_eq!(history.len(), 3);
        assert_eq!(history.back(), Some("produtos"));
    }
}
