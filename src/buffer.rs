//! Memory limited record buffer.

use crate::order::Comparator;

/// Buffer limited by the total byte size of the records it holds.
///
/// The byte counter always equals the sum of the lengths of the buffered records.
pub struct MemoryLimitedBuffer {
    limit: u64,
    current_size: u64,
    inner: Vec<Vec<u8>>,
}

impl MemoryLimitedBuffer {
    pub fn new(limit: u64) -> Self {
        MemoryLimitedBuffer {
            limit,
            current_size: 0,
            inner: Vec::new(),
        }
    }

    /// Adds a record to the buffer and accounts its size.
    pub fn push(&mut self, record: Vec<u8>) {
        self.current_size += record.len() as u64;
        self.inner.push(record);
    }

    /// Returns buffer length in records.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Checks if the buffered bytes reached the limit.
    pub fn is_full(&self) -> bool {
        self.current_size >= self.limit
    }

    pub fn mem_size(&self) -> u64 {
        self.current_size
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Sorts the records in place. Equal records may be reordered.
    pub fn sort_by<C: Comparator + ?Sized>(&mut self, comparator: &C) {
        self.inner.sort_unstable_by(|a, b| comparator.compare(a, b));
    }

    /// Iterates over the buffered records in their current order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.inner.iter().map(Vec::as_slice)
    }

    /// Drops all records and resets the counter. The allocated capacity is retained for the next run.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.current_size = 0;
    }

    /// Drops all records and releases the allocated memory.
    pub fn release(&mut self) {
        self.inner = Vec::new();
        self.current_size = 0;
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::MemoryLimitedBuffer;
    use crate::order::{ByteOrder, Descending};

    #[test]
    fn test_memory_limited_buffer() {
        let mut buffer = MemoryLimitedBuffer::new(10);

        buffer.push(b"hello".to_vec());
        assert_eq!(buffer.mem_size(), 5);
        assert_eq!(buffer.is_full(), false);

        buffer.push(b"world".to_vec());
        assert_eq!(buffer.mem_size(), 10);
        assert_eq!(buffer.is_full(), true);
        assert_eq!(buffer.len(), 2);
    }

    #[rstest]
    #[case(0, true)]
    #[case(1, true)]
    #[case(4, false)]
    fn test_limit_boundary(#[case] limit: u64, #[case] full_after_single_byte: bool) {
        let mut buffer = MemoryLimitedBuffer::new(limit);
        buffer.push(vec![b'x']);

        assert_eq!(buffer.is_full(), full_after_single_byte);
    }

    #[test]
    fn test_sort_and_clear() {
        let mut buffer = MemoryLimitedBuffer::new(u64::MAX);
        for record in ["b\n", "c\n", "a\n"] {
            buffer.push(record.as_bytes().to_vec());
        }

        buffer.sort_by(&ByteOrder);
        let sorted: Vec<&[u8]> = buffer.iter().collect();
        assert_eq!(sorted, vec![b"a\n".as_slice(), b"b\n".as_slice(), b"c\n".as_slice()]);

        buffer.sort_by(&Descending(ByteOrder));
        let sorted: Vec<&[u8]> = buffer.iter().collect();
        assert_eq!(sorted, vec![b"c\n".as_slice(), b"b\n".as_slice(), b"a\n".as_slice()]);

        let capacity = buffer.capacity();
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.mem_size(), 0);
        assert_eq!(buffer.capacity(), capacity);

        buffer.release();
        assert_eq!(buffer.capacity(), 0);
    }
}
