//! Binary min-heap of staged run records.

use crate::order::Comparator;

/// A record read from a run but not emitted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapEntry {
    pub run: usize,
    pub record: Vec<u8>,
}

impl HeapEntry {
    pub fn new(run: usize, record: Vec<u8>) -> Self {
        HeapEntry { run, record }
    }
}

/// Binary min-heap ordered by a record comparator.
///
/// [`std::collections::BinaryHeap`] requires [`Ord`] items, so ordering here is delegated to the comparator
/// applied to the staged records instead. Ties are resolved arbitrarily.
pub struct RecordHeap<'c, C: ?Sized> {
    entries: Vec<HeapEntry>,
    comparator: &'c C,
}

impl<'c, C: Comparator + ?Sized> RecordHeap<'c, C> {
    pub fn new(comparator: &'c C) -> Self {
        RecordHeap {
            entries: Vec::new(),
            comparator,
        }
    }

    pub fn with_capacity(capacity: usize, comparator: &'c C) -> Self {
        RecordHeap {
            entries: Vec::with_capacity(capacity),
            comparator,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the minimal entry without removing it.
    pub fn peek(&self) -> Option<&HeapEntry> {
        self.entries.first()
    }

    pub fn push(&mut self, entry: HeapEntry) {
        self.entries.push(entry);
        self.sift_up(self.entries.len() - 1);
    }

    /// Removes and returns the minimal entry.
    pub fn pop(&mut self) -> Option<HeapEntry> {
        if self.entries.is_empty() {
            return None;
        }

        let last = self.entries.len() - 1;
        self.entries.swap(0, last);
        let entry = self.entries.pop();
        self.sift_down(0);

        return entry;
    }

    fn less(&self, i: usize, j: usize) -> bool {
        self.comparator.less(&self.entries[i].record, &self.entries[j].record)
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.entries.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }

            let right = left + 1;
            let child = if right < len && self.less(right, left) { right } else { left };
            if !self.less(child, pos) {
                break;
            }
            self.entries.swap(pos, child);
            pos = child;
        }
    }
}
