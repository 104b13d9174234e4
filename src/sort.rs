//! External sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display};
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

use crate::buffer::MemoryLimitedBuffer;
use crate::merger::{self, BatchedMerger};
use crate::order::{Chunker, Comparator};
use crate::run::{RunInfo, RunStore};
use crate::sink::OutputSink;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Working directory creation error.
    TempDir(io::Error),
    /// Sorted run creation, writing or flushing error.
    Spill(io::Error),
    /// Sorted run opening error.
    OpenRun { index: usize, source: io::Error },
    /// Single run copying error.
    Copy(io::Error),
    /// Runs merging error.
    Merge(io::Error),
    /// Output closing error.
    SinkClose(io::Error),
    /// Working directory removal error.
    Cleanup { path: PathBuf, source: io::Error },
    /// Input data stream error.
    Input(io::Error),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            SortError::TempDir(err) => err,
            SortError::Spill(err) => err,
            SortError::OpenRun { source, .. } => source,
            SortError::Copy(err) => err,
            SortError::Merge(err) => err,
            SortError::SinkClose(err) => err,
            SortError::Cleanup { source, .. } => source,
            SortError::Input(err) => err,
        })
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "working directory not created: {}", err),
            SortError::Spill(err) => write!(f, "memory buffer not flushed to a run: {}", err),
            SortError::OpenRun { index, source } => write!(f, "run {} not opened: {}", index, source),
            SortError::Copy(err) => write!(f, "run content not copied to output: {}", err),
            SortError::Merge(err) => write!(f, "runs merging failed: {}", err),
            SortError::SinkClose(err) => write!(f, "output closing failed: {}", err),
            SortError::Cleanup { path, source } => {
                write!(f, "working directory {} not removed: {}", path.display(), source)
            }
            SortError::Input(err) => write!(f, "input data stream error: {}", err),
        }
    }
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder {
    /// Memory limit in bytes.
    memory_limit: u64,
    /// Directory to be used to store the working directory.
    tmp_dir: Option<Box<Path>>,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl ExternalSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new(memory_limit: u64) -> Self {
        ExternalSorterBuilder {
            memory_limit,
            tmp_dir: None,
            rw_buf_size: None,
        }
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build<W, K, C>(
        self,
        output: OutputSink<W>,
        chunker: K,
        comparator: C,
    ) -> Result<ExternalSorter<W, K, C>, SortError>
    where
        W: Write,
        K: Chunker,
        C: Comparator,
    {
        ExternalSorter::with_options(
            output,
            chunker,
            comparator,
            self.memory_limit,
            self.tmp_dir.as_deref(),
            self.rw_buf_size,
        )
    }

    /// Sets memory limit.
    pub fn with_memory_limit(mut self, memory_limit: u64) -> ExternalSorterBuilder {
        self.memory_limit = memory_limit;
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets run file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> ExternalSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

/// External sorter.
///
/// Each accepted byte slice is a single record. Records are buffered in memory until the memory limit is reached,
/// then the buffer is sorted and spilled to a new run on disk. [`ExternalSorter::close`] merges all the runs
/// into the output.
pub struct ExternalSorter<W, K, C>
where
    W: Write,
    K: Chunker,
    C: Comparator,
{
    /// Sorted data destination.
    output: OutputSink<W>,
    /// Strategy used to split runs into records.
    chunker: K,
    /// Record comparator.
    comparator: C,
    /// Pending records.
    buffer: MemoryLimitedBuffer,
    /// Sorted runs.
    runs: RunStore,
}

impl<W, K, C> ExternalSorter<W, K, C>
where
    W: Write,
    K: Chunker,
    C: Comparator,
{
    /// Creates a new external sorter instance with a working directory in the default OS temporary directory.
    ///
    /// # Arguments
    /// * `output` - Sorted data destination
    /// * `chunker` - Strategy used to split the spilled runs into records when they are read back
    /// * `comparator` - Record comparator
    /// * `memory_limit` - Number of buffered bytes that triggers a spill
    pub fn new(output: OutputSink<W>, chunker: K, comparator: C, memory_limit: u64) -> Result<Self, SortError> {
        Self::with_options(output, chunker, comparator, memory_limit, None, None)
    }

    fn with_options(
        output: OutputSink<W>,
        chunker: K,
        comparator: C,
        memory_limit: u64,
        tmp_path: Option<&Path>,
        rw_buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        let runs = RunStore::new(tmp_path, rw_buf_size).map_err(SortError::TempDir)?;
        log::info!("sorter initialized (memory limit: {} bytes)", memory_limit);

        return Ok(ExternalSorter {
            output,
            chunker,
            comparator,
            buffer: MemoryLimitedBuffer::new(memory_limit),
            runs,
        });
    }

    /// Number of runs spilled so far.
    pub fn run_count(&self) -> usize {
        self.runs.run_count()
    }

    /// Number of bytes currently buffered.
    pub fn memory_used(&self) -> u64 {
        self.buffer.mem_size()
    }

    pub fn memory_limit(&self) -> u64 {
        self.buffer.limit()
    }

    /// Working directory path.
    pub fn working_dir(&self) -> &Path {
        self.runs.path()
    }

    /// Accepts a single record. The buffer is spilled to a new run once the memory limit is reached.
    /// Returns the number of accepted bytes.
    pub fn accept(&mut self, record: impl Into<Vec<u8>>) -> Result<usize, SortError> {
        let record = record.into();
        let len = record.len();
        self.buffer.push(record);

        if self.buffer.is_full() {
            self.spill()?;
        }

        return Ok(len);
    }

    /// Splits the input into records using the sorter chunker and accepts all of them.
    /// Returns the number of accepted records.
    pub fn extend_from_reader<R: BufRead>(&mut self, mut input: R) -> Result<u64, SortError> {
        let mut records = 0;
        while let Some(record) = self.chunker.next_record(&mut input).map_err(SortError::Input)? {
            self.accept(record)?;
            records += 1;
        }

        return Ok(records);
    }

    fn spill(&mut self) -> Result<RunInfo, SortError> {
        log::debug!("sorting run data ({} records) ...", self.buffer.len());
        self.buffer.sort_by(&self.comparator);

        let info = self.runs.write_run(self.buffer.iter()).map_err(SortError::Spill)?;
        log::debug!("run {} saved ({} records, {} bytes)", info.index, info.records, info.bytes);

        self.buffer.clear();

        return Ok(info);
    }

    /// Finishes sorting: spills the remaining records, writes all the runs to the output in sorted order,
    /// closes the output if it supports closing and removes the working directory.
    ///
    /// The working directory removal is attempted even if any previous step failed; the first error
    /// is returned. Returns the output writer on success.
    pub fn close(mut self) -> Result<W, SortError> {
        let result = self.finish();
        let cleanup = self.runs.destroy().map_err(|err| SortError::Cleanup {
            path: self.runs.path().to_path_buf(),
            source: err,
        });

        match (result, cleanup) {
            (Ok(()), Ok(())) => Ok(self.output.into_inner()),
            (Ok(()), Err(err)) | (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup_err)) => {
                log::error!("{}", cleanup_err);
                Err(err)
            }
        }
    }

    fn finish(&mut self) -> Result<(), SortError> {
        if !self.buffer.is_empty() {
            self.spill()?;
        }
        self.buffer.release();

        let mut readers = Vec::with_capacity(self.runs.run_count());
        for index in 0..self.runs.run_count() {
            let reader = self
                .runs
                .open_run(index)
                .map_err(|err| SortError::OpenRun { index, source: err })?;
            readers.push(reader);
        }

        match readers.len() {
            0 => log::info!("no records to sort"),
            1 => {
                log::info!("single run, copying it to the output");
                let reader = &mut readers[0];
                io::copy(reader, self.output.get_mut()).map_err(SortError::Copy)?;
                self.output.get_mut().flush().map_err(SortError::Copy)?;
            }
            run_count => {
                let run_budget = merger::run_budget(self.buffer.limit(), run_count);
                log::info!("merging {} runs (per-run read budget: {} bytes)", run_count, run_budget);

                let merger = BatchedMerger::new(readers, &self.chunker, &self.comparator, run_budget);
                merger.merge_into(self.output.get_mut()).map_err(SortError::Merge)?;
            }
        }

        self.output.close().map_err(SortError::SinkClose)?;
        log::debug!("external sort done");

        return Ok(());
    }
}

impl<W, K, C> Debug for ExternalSorter<W, K, C>
where
    W: Write,
    K: Chunker,
    C: Comparator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalSorter")
            .field("working_dir", &self.runs.path())
            .field("run_count", &self.runs.run_count())
            .field("memory_used", &self.buffer.mem_size())
            .field("memory_limit", &self.buffer.limit())
            .finish()
    }
}
