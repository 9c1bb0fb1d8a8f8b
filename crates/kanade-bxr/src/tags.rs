//! Tag name table with first-seen-order deduplication.

use std::collections::HashMap;

/// Deduplicating table of tag names.
///
/// Tag names map to stable sequential indices in first-seen order. Two
/// independent instances exist per document (main item tags and sub item
/// tags); an index from one namespace is meaningless in the other, even
/// when the textual names collide.
///
/// First-seen order is load-bearing: re-encoding an untouched document must
/// reproduce the original table order byte for byte.
#[derive(Debug, Default)]
pub struct TagTable {
    names: Vec<String>,
    index: HashMap<String, u32>,
}

impl TagTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `name`, interning it at the next sequential id if
    /// it has not been seen before.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.index.insert(name.to_owned(), id);
        self.names.push(name.to_owned());
        id
    }

    /// Look up a tag name by id.
    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over tag names in id order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut table = TagTable::new();
        assert_eq!(table.intern("title"), 0);
        assert_eq!(table.intern("line"), 1);
        assert_eq!(table.intern("title"), 0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_first_seen_order() {
        let mut table = TagTable::new();
        for tag in ["c", "a", "b", "a", "c"] {
            table.intern(tag);
        }
        let names: Vec<_> = table.names().collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn test_name_of() {
        let mut table = TagTable::new();
        let id = table.intern("page");
        assert_eq!(table.name_of(id), Some("page"));
        assert_eq!(table.name_of(99), None);
    }
}
