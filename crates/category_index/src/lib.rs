//! # Category Index
//!
//! One chronological list of block ids per category value (the miner
//! address byte, so 256 lists).
//!
//! Unlike the nonce index, order matters here: callers ask for "the first N
//! blocks mined by X" and expect them oldest-first. New ids are appended at the
//! tail of their list through a retained tail link, which keeps insertion O(1)
//! and every list in ascending id order.
//!
//! Lists share a single node arena; each node stores the arena index of its
//! successor.
//!
//! ## Example
//!
//! ```rust
//! use category_index::CategoryIndex;
//!
//! let mut idx = CategoryIndex::new();
//! idx.append(7, 1).unwrap();
//! idx.append(3, 2).unwrap();
//! idx.append(7, 3).unwrap();
//! assert_eq!(idx.first_n(7, 10).collect::<Vec<_>>(), vec![1, 3]);
//! assert_eq!(idx.count(3), 1);
//! ```

use std::collections::TryReserveError;

/// Number of distinct category values.
pub const CATEGORIES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    id: u32,
    next: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct List {
    head: Option<u32>,
    tail: Option<u32>,
    len: u32,
}

/// Per-category append-only lists of block ids.
#[derive(Clone, PartialEq, Eq)]
pub struct CategoryIndex {
    lists: [List; CATEGORIES],
    nodes: Vec<Node>,
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self {
            lists: [List::default(); CATEGORIES],
            nodes: Vec::new(),
        }
    }

    /// Appends `id` to the tail of `category`'s list. O(1).
    ///
    /// Ids must be appended in ascending order for lists to stay sorted; the
    /// store guarantees this by appending in log order.
    pub fn append(&mut self, category: u8, id: u32) -> Result<(), TryReserveError> {
        self.nodes.try_reserve(1)?;
        let at = self.nodes.len() as u32;
        self.nodes.push(Node { id, next: None });

        let list = &mut self.lists[category as usize];
        match list.tail {
            Some(tail) => self.nodes[tail as usize].next = Some(at),
            None => list.head = Some(at),
        }
        list.tail = Some(at);
        list.len += 1;
        Ok(())
    }

    /// Iterates over every id in `category`, oldest first.
    pub fn iter(&self, category: u8) -> Iter<'_> {
        Iter {
            nodes: &self.nodes,
            cursor: self.lists[category as usize].head,
        }
    }

    /// The first `n` ids of `category`, oldest first.
    pub fn first_n(&self, category: u8, n: usize) -> std::iter::Take<Iter<'_>> {
        self.iter(category).take(n)
    }

    /// Number of ids recorded for `category`.
    #[must_use]
    pub fn count(&self, category: u8) -> u32 {
        self.lists[category as usize].len
    }

    /// Per-category counts, indexed by category value.
    pub fn counts(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.lists
            .iter()
            .enumerate()
            .map(|(c, list)| (c as u8, list.len))
    }

    /// Total ids across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drops every node and resets all lists.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lists = [List::default(); CATEGORIES];
    }
}

impl Default for CategoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CategoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.lists.iter().filter(|l| l.len > 0).count();
        f.debug_struct("CategoryIndex")
            .field("entries", &self.nodes.len())
            .field("categories_used", &used)
            .finish()
    }
}

/// Iterator over one category list.
pub struct Iter<'a> {
    nodes: &'a [Node],
    cursor: Option<u32>,
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let node = &self.nodes[self.cursor? as usize];
        self.cursor = node.next;
        Some(node.id)
    }
}

#[cfg(test)]
mod tests;
