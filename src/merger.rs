//! Batched-refill K-way merger.

use std::io::{self, prelude::*};

use log;

use crate::heap::{HeapEntry, RecordHeap};
use crate::order::{Chunker, Comparator};

/// Merge statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    /// Number of records written to the output.
    pub records: u64,
    /// Number of bytes written to the output.
    pub bytes: u64,
    /// Number of refill phases performed.
    pub refills: u64,
}

/// Computes the per-run read budget: the memory limit evenly shared between the runs plus one slot
/// for the output.
pub fn run_budget(memory_limit: u64, run_count: usize) -> u64 {
    memory_limit / (run_count as u64 + 1)
}

/// Binary heap merger with batched refill.
/// Merges multiple sorted runs into a single sorted output.
///
/// Whenever the heap runs empty every open run is read ahead until either the run is exhausted or
/// `run_budget` bytes are staged from it. Afterwards each emitted record is replaced by exactly one record
/// from the same run. Several records of a single run may be staged at once, the output is still ordered because
/// the heap always yields the minimum among all the staged records.
pub struct BatchedMerger<'a, R, K: ?Sized, C: ?Sized>
where
    R: BufRead,
{
    // exhausted runs are replaced by `None`
    readers: Vec<Option<R>>,
    open: usize,
    heap: RecordHeap<'a, C>,
    chunker: &'a K,
    run_budget: u64,
}

impl<'a, R, K, C> BatchedMerger<'a, R, K, C>
where
    R: BufRead,
    K: Chunker + ?Sized,
    C: Comparator + ?Sized,
{
    /// Creates an instance of a merger using runs as inputs.
    /// Run records should be sorted by the comparator otherwise the result is undefined.
    ///
    /// # Arguments
    /// * `readers` - Sorted runs, the position in the vector is the run index
    /// * `chunker` - Strategy used to split runs into records
    /// * `comparator` - Record comparator
    /// * `run_budget` - Number of bytes to be staged from each run during a refill
    pub fn new(readers: Vec<R>, chunker: &'a K, comparator: &'a C, run_budget: u64) -> Self {
        let open = readers.len();
        let readers = Vec::from_iter(readers.into_iter().map(Some));

        return BatchedMerger {
            heap: RecordHeap::with_capacity(open, comparator),
            readers,
            open,
            chunker,
            run_budget,
        };
    }

    /// Number of runs that are not exhausted yet.
    pub fn open_runs(&self) -> usize {
        self.open
    }

    /// Merges all the runs into `output`. The output is flushed at the end.
    pub fn merge_into<W: Write + ?Sized>(mut self, output: &mut W) -> io::Result<MergeStats> {
        let mut stats = MergeStats::default();

        loop {
            if self.heap.is_empty() {
                if self.open == 0 {
                    break;
                }
                self.refill()?;
                stats.refills += 1;
            }

            let entry = match self.heap.pop() {
                Some(entry) => entry,
                None => break,
            };

            output.write_all(&entry.record)?;
            stats.records += 1;
            stats.bytes += entry.record.len() as u64;

            if let Some(record) = self.read_next(entry.run)? {
                self.heap.push(HeapEntry::new(entry.run, record));
            }
        }

        output.flush()?;
        log::debug!(
            "merge done ({} records, {} bytes, {} refills)",
            stats.records,
            stats.bytes,
            stats.refills
        );

        return Ok(stats);
    }

    fn refill(&mut self) -> io::Result<()> {
        for run in 0..self.readers.len() {
            let mut staged_bytes = 0;
            while self.readers[run].is_some() {
                match self.read_next(run)? {
                    Some(record) => {
                        staged_bytes += record.len() as u64;
                        self.heap.push(HeapEntry::new(run, record));
                        if staged_bytes >= self.run_budget {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }

        log::debug!("heap refilled ({} records staged, {} runs open)", self.heap.len(), self.open);

        return Ok(());
    }

    /// Reads the next record of a run. The run reader is dropped once the run is exhausted.
    fn read_next(&mut self, run: usize) -> io::Result<Option<Vec<u8>>> {
        let reader = match self.readers[run].as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };

        let record = self.chunker.next_record(reader)?;
        if record.is_none() {
            self.readers[run] = None;
            self.open -= 1;
        }

        return Ok(record);
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, BufRead};

    use rstest::*;

    use super::{run_budget, BatchedMerger, MergeStats};
    use crate::order::{ByteOrder, LineChunker};

    fn runs(runs: &[&'static str]) -> Vec<io::Cursor<&'static [u8]>> {
        Vec::from_iter(runs.iter().map(|run| io::Cursor::new(run.as_bytes())))
    }

    #[rstest]
    #[case(vec![], "")]
    #[case(vec!["", ""], "")]
    #[case(vec!["4\n5\n7\n", "1\n6\n", "3\n", ""], "1\n3\n4\n5\n6\n7\n")]
    #[case(vec!["a\na\nb\n", "a\nc\n"], "a\na\na\nb\nc\n")]
    fn test_merger(
        #[case] inputs: Vec<&'static str>,
        #[case] expected: &str,
        #[values(0, 1, 4, 1024)] budget: u64,
    ) {
        let chunker = LineChunker::default();
        let merger = BatchedMerger::new(runs(&inputs), &chunker, &ByteOrder, budget);

        let mut output = Vec::new();
        let stats = merger.merge_into(&mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), expected);
        assert_eq!(stats.bytes, expected.len() as u64);
    }

    #[test]
    fn test_batched_refill() {
        let chunker = LineChunker::default();
        let inputs = runs(&["b\nd\nf\nh\n", "a\nc\ne\ng\n"]);

        // a budget of 4 bytes stages two records per run on every refill
        let merger = BatchedMerger::new(inputs, &chunker, &ByteOrder, 4);
        assert_eq!(merger.open_runs(), 2);

        let mut output = Vec::new();
        let stats = merger.merge_into(&mut output).unwrap();

        assert_eq!(output, b"a\nb\nc\nd\ne\nf\ng\nh\n");
        assert_eq!(
            stats,
            MergeStats {
                records: 8,
                bytes: 16,
                refills: 1
            }
        );
    }

    #[test]
    fn test_run_budget() {
        assert_eq!(run_budget(100, 3), 25);
        assert_eq!(run_budget(10, 0), 10);
        assert_eq!(run_budget(2, 3), 0);
    }

    #[test]
    fn test_chunker_error() {
        let chunker = |reader: &mut dyn BufRead| -> io::Result<Option<Vec<u8>>> {
            let mut record = Vec::new();
            match reader.read_until(b'\n', &mut record)? {
                0 => Ok(None),
                _ if record.starts_with(b"!") => Err(io::Error::new(io::ErrorKind::InvalidData, "test error")),
                _ => Ok(Some(record)),
            }
        };
        let merger = BatchedMerger::new(runs(&["1\n!\n", "2\n3\n"]), &chunker, &ByteOrder, 1);

        let mut output = Vec::new();
        let err = merger.merge_into(&mut output).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(output, b"1\n");
    }
}
