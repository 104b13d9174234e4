//! Record chunking and ordering strategies.

use std::cmp::Ordering;
use std::io::{self, BufRead};

/// Chunking strategy. Splits a byte stream into discrete records.
///
/// Implementations must advance the stream past the returned record and must be deterministic given
/// the same stream state. `Ok(None)` signals the end of the stream.
pub trait Chunker {
    /// Reads the next record from the stream.
    fn next_record(&self, reader: &mut dyn BufRead) -> io::Result<Option<Vec<u8>>>;
}

impl<F> Chunker for F
where
    F: Fn(&mut dyn BufRead) -> io::Result<Option<Vec<u8>>>,
{
    fn next_record(&self, reader: &mut dyn BufRead) -> io::Result<Option<Vec<u8>>> {
        self(reader)
    }
}

/// Delimiter-terminated records. The delimiter is kept as the last byte of every record.
/// A trailing record without a delimiter is returned as is.
#[derive(Debug, Clone, Copy)]
pub struct LineChunker {
    delimiter: u8,
}

impl LineChunker {
    pub fn new(delimiter: u8) -> Self {
        LineChunker { delimiter }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl Default for LineChunker {
    fn default() -> Self {
        LineChunker::new(b'\n')
    }
}

impl Chunker for LineChunker {
    fn next_record(&self, reader: &mut dyn BufRead) -> io::Result<Option<Vec<u8>>> {
        let mut record = Vec::new();
        match reader.read_until(self.delimiter, &mut record)? {
            0 => Ok(None),
            _ => Ok(Some(record)),
        }
    }
}

/// Record comparator. `less(a, b)` reports whether `a` orders strictly before `b`.
///
/// The predicate must be a strict weak ordering, otherwise the sort result is undefined.
pub trait Comparator {
    fn less(&self, a: &[u8], b: &[u8]) -> bool;

    /// Derives a total [`Ordering`] from the `less` predicate.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        if self.less(a, b) {
            Ordering::Less
        } else if self.less(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

impl<F> Comparator for F
where
    F: Fn(&[u8], &[u8]) -> bool,
{
    fn less(&self, a: &[u8], b: &[u8]) -> bool {
        self(a, b)
    }
}

/// Lexicographic byte order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteOrder;

impl Comparator for ByteOrder {
    fn less(&self, a: &[u8], b: &[u8]) -> bool {
        a < b
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

/// Reverses the order of the wrapped comparator.
#[derive(Debug, Default, Clone, Copy)]
pub struct Descending<C>(pub C);

impl<C: Comparator> Comparator for Descending<C> {
    fn less(&self, a: &[u8], b: &[u8]) -> bool {
        self.0.less(b, a)
    }
}
