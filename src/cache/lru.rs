//! LRU Recency Module
//!
//! Doubly linked recency order stored in an arena, giving O(1) touch,
//! insert, remove and eviction.

// == Slot ==
/// Opaque position marker for a key in a [`RecencyList`].
///
/// Only valid for the list that issued it, and only until the key is
/// removed or evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(usize);

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency List ==
/// Tracks access order for LRU eviction.
///
/// - Head = most recently used
/// - Tail = least recently used
///
/// Nodes live in a `Vec` and link to each other by index; freed indices are
/// recycled so the arena never grows beyond the peak number of live keys.
#[derive(Debug, Default)]
pub struct RecencyList {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl RecencyList {
    // == Constructor ==
    /// Creates a new empty recency list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    // == Push Front ==
    /// Inserts a key at the most recently used position.
    ///
    /// The caller is responsible for not inserting a key twice.
    pub fn push_front(&mut self, key: String) -> Slot {
        let node = Node {
            key,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.link_front(idx);
        self.len += 1;
        Slot(idx)
    }

    // == Touch ==
    /// Marks the key at `slot` as most recently used.
    pub fn touch(&mut self, slot: Slot) {
        if self.head == Some(slot.0) {
            return;
        }
        self.unlink(slot.0);
        self.link_front(slot.0);
    }

    // == Remove ==
    /// Removes the key at `slot` and returns it.
    pub fn remove(&mut self, slot: Slot) -> Option<String> {
        if self.node(slot.0).is_none() {
            return None;
        }
        self.unlink(slot.0);
        let node = self.nodes[slot.0].take()?;
        self.free.push(slot.0);
        self.len -= 1;
        Some(node.key)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used key.
    pub fn pop_back(&mut self) -> Option<String> {
        let tail = self.tail?;
        self.remove(Slot(tail))
    }

    // == Peek Back ==
    /// Returns the least recently used key without removing it.
    pub fn peek_back(&self) -> Option<&str> {
        self.tail.and_then(|idx| self.node(idx)).map(|n| n.key.as_str())
    }

    /// Returns the most recently used key.
    pub fn peek_front(&self) -> Option<&str> {
        self.head.and_then(|idx| self.node(idx)).map(|n| n.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every key and resets the arena.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    // == Iter ==
    /// Iterates keys from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.node(cursor?)?;
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    fn node(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node> {
        self.nodes.get_mut(idx).and_then(Option::as_mut)
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head.and_then(|h| self.node_mut(h)) {
            Some(head) => head.prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.node(idx) {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }
}
