//! `byte-ext-sort` is an external merge sort of delimiter-defined byte records.
//!
//! External sorting is a class of sorting algorithms that can handle massive amounts of data. External sorting
//! is required when the data being sorted do not fit into the main memory (RAM) of a computer and instead must be
//! resided in slower external memory, usually a hard disk drive. Sorting is achieved in two passes. During the
//! first pass it sorts chunks of data that each fit in RAM, during the second pass it merges the sorted chunks
//! together. For more information see [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Opaque records:**
//!   records are plain byte slices, the sorter never looks inside them except through the comparator.
//!   Delimiters, if any, are part of the record bytes and the output is the plain concatenation of the sorted
//!   records.
//! * **Pluggable strategies:**
//!   a [`Chunker`] splits the spilled runs back into records and a [`Comparator`] orders them. Closures of the
//!   matching shape can be used for both.
//! * **Memory limit:**
//!   records are buffered until their total size reaches the limit, then the buffer is sorted and spilled
//!   to a numbered run file inside a temporary working directory.
//! * **Batched merge:**
//!   runs are merged with a binary heap refilled in batches to amortize run reads.
//!
//! Equal records are not guaranteed to keep their input order.
//!
//! # Example
//!
//! ```no_run
//! use std::fs;
//! use std::io;
//!
//! use byte_ext_sort::{ByteOrder, ExternalSorterBuilder, LineChunker, OutputSink};
//!
//! fn main() {
//!     let input_reader = io::BufReader::new(fs::File::open("input.txt").unwrap());
//!     let output_writer = io::BufWriter::new(fs::File::create("output.txt").unwrap());
//!
//!     let mut sorter = ExternalSorterBuilder::new(50_000_000)
//!         .with_tmp_dir(std::path::Path::new("./"))
//!         .build(OutputSink::closable(output_writer), LineChunker::default(), ByteOrder)
//!         .unwrap();
//!
//!     sorter.extend_from_reader(input_reader).unwrap();
//!     sorter.close().unwrap();
//! }
//! ```

pub mod buffer;
#[cfg(feature = "generator")]
pub mod generator;
pub mod heap;
pub mod merger;
pub mod order;
pub mod run;
pub mod sink;
pub mod sort;

pub use buffer::MemoryLimitedBuffer;
pub use heap::{HeapEntry, RecordHeap};
pub use merger::{BatchedMerger, MergeStats};
pub use order::{ByteOrder, Chunker, Comparator, Descending, LineChunker};
pub use run::{RunInfo, RunReader, RunStore};
pub use sink::{Close, OutputSink};
pub use sort::{ExternalSorter, ExternalSorterBuilder, SortError};
