//! On-disk sorted runs.
//!
//! Every run is stored as a flat concatenation of record bytes in a file named by the run index inside a single
//! temporary working directory. The working directory is owned by the [`RunStore`] and removed as a whole.

use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

use log;
use tempfile;

/// Default run file read/write buffer size.
pub const DEFAULT_RW_BUF_SIZE: usize = 65536;

/// Working directory name prefix.
pub const WORKING_DIR_PREFIX: &str = "extsort_tmp_files";

/// Buffered run file reader.
pub type RunReader = io::BufReader<fs::File>;

/// Summary of a persisted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunInfo {
    pub index: usize,
    pub records: usize,
    pub bytes: u64,
}

/// Run store. Allocates sequentially numbered runs inside an exclusively owned working directory.
pub struct RunStore {
    dir: Option<tempfile::TempDir>,
    path: PathBuf,
    run_count: usize,
    rw_buf_size: usize,
}

impl RunStore {
    /// Creates a new working directory inside `tmp_path` or inside the default OS temporary directory
    /// if the parameter is [`None`].
    pub fn new(tmp_path: Option<&Path>, rw_buf_size: Option<usize>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKING_DIR_PREFIX);

        let dir = if let Some(tmp_path) = tmp_path {
            builder.tempdir_in(tmp_path)
        } else {
            builder.tempdir()
        }?;

        log::info!("using {} as a working directory", dir.path().display());

        return Ok(RunStore {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
            run_count: 0,
            rw_buf_size: rw_buf_size.unwrap_or(DEFAULT_RW_BUF_SIZE),
        });
    }

    /// Working directory path. The path is kept after the directory is destroyed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of complete runs.
    pub fn run_count(&self) -> usize {
        self.run_count
    }

    /// Checks whether the working directory has not been destroyed yet.
    pub fn is_alive(&self) -> bool {
        self.dir.is_some()
    }

    fn run_path(&self, index: usize) -> io::Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.path().join(index.to_string())),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("working directory {} is destroyed", self.path.display()),
            )),
        }
    }

    /// Writes records to a new run numbered with the next sequential index.
    ///
    /// The run is counted only once all the records are written and flushed. A failed write leaves the run
    /// count untouched and the next attempt reuses the same index.
    pub fn write_run<'a, I>(&mut self, records: I) -> io::Result<RunInfo>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let index = self.run_count;
        let file = fs::File::create(self.run_path(index)?)?;
        let mut run_writer = io::BufWriter::with_capacity(self.rw_buf_size, file);

        let mut info = RunInfo {
            index,
            records: 0,
            bytes: 0,
        };
        for record in records.into_iter() {
            run_writer.write_all(record)?;
            info.records += 1;
            info.bytes += record.len() as u64;
        }

        run_writer.flush()?;

        self.run_count += 1;

        return Ok(info);
    }

    /// Opens an existing run for reading.
    pub fn open_run(&self, index: usize) -> io::Result<RunReader> {
        if index >= self.run_count {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("run {} does not exist ({} runs created)", index, self.run_count),
            ));
        }
        let file = fs::File::open(self.run_path(index)?)?;

        return Ok(io::BufReader::with_capacity(self.rw_buf_size, file));
    }

    /// Removes the working directory with all the runs.
    ///
    /// Calling it more than once, or after the directory has disappeared, is a no-op.
    pub fn destroy(&mut self) -> io::Result<()> {
        let dir = match self.dir.take() {
            Some(dir) => dir,
            None => return Ok(()),
        };

        log::info!("removing runs in {}", self.path.display());
        match dir.close() {
            Ok(()) => {
                log::info!("working directory {} removed", self.path.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("working directory {} is already removed", self.path.display());
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io::prelude::*;

    use rstest::*;

    use super::RunStore;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    fn test_run_numbering(tmp_dir: tempfile::TempDir) {
        let mut store = RunStore::new(Some(tmp_dir.path()), None).unwrap();
        assert!(store.path().starts_with(tmp_dir.path()));
        assert_eq!(store.run_count(), 0);

        let first = store.write_run(vec![b"a\n".as_slice(), b"b\n".as_slice()]).unwrap();
        let second = store.write_run(vec![b"c\n".as_slice()]).unwrap();

        assert_eq!((first.index, first.records, first.bytes), (0, 2, 4));
        assert_eq!((second.index, second.records, second.bytes), (1, 1, 2));
        assert_eq!(store.run_count(), 2);
        assert!(store.path().join("0").is_file());
        assert!(store.path().join("1").is_file());

        let mut content = String::new();
        store.open_run(0).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "a\nb\n");
    }

    #[rstest]
    fn test_open_missing_run(tmp_dir: tempfile::TempDir) {
        let store = RunStore::new(Some(tmp_dir.path()), Some(16)).unwrap();

        assert!(store.open_run(0).is_err());
    }

    #[rstest]
    fn test_failed_write_is_not_counted(tmp_dir: tempfile::TempDir) {
        let mut store = RunStore::new(Some(tmp_dir.path()), None).unwrap();
        store.write_run(vec![b"a\n".as_slice()]).unwrap();

        fs::remove_dir_all(store.path()).unwrap();

        assert!(store.write_run(vec![b"b\n".as_slice()]).is_err());
        assert_eq!(store.run_count(), 1);
    }

    #[rstest]
    fn test_destroy_is_idempotent(tmp_dir: tempfile::TempDir) {
        let mut store = RunStore::new(Some(tmp_dir.path()), None).unwrap();
        store.write_run(vec![b"a\n".as_slice()]).unwrap();
        let path = store.path().to_path_buf();

        store.destroy().unwrap();
        assert!(!path.exists());
        assert!(!store.is_alive());

        store.destroy().unwrap();
        assert!(store.write_run(vec![b"b\n".as_slice()]).is_err());
        assert!(store.open_run(0).is_err());
    }

    #[rstest]
    fn test_destroy_error(tmp_dir: tempfile::TempDir) {
        let mut store = RunStore::new(Some(tmp_dir.path()), None).unwrap();
        let path = store.path().to_path_buf();
        fs::remove_dir_all(&path).unwrap();
        fs::write(&path, b"not a directory").unwrap();

        assert!(store.destroy().is_err());
        assert!(!store.is_alive());
        store.destroy().unwrap();
    }

    #[rstest]
    fn test_destroy_removed_directory(tmp_dir: tempfile::TempDir) {
        let mut store = RunStore::new(Some(tmp_dir.path()), None).unwrap();
        fs::remove_dir_all(store.path()).unwrap();

        store.destroy().unwrap();
    }
}
