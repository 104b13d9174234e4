//! Sorted data output.

use std::fs;
use std::io::{self, prelude::*};

/// Explicit close capability of an output writer.
pub trait Close {
    /// Closes the writer. No data should be written afterwards.
    fn close(&mut self) -> io::Result<()>;
}

impl Close for fs::File {
    fn close(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl<W: Write + Close> Close for io::BufWriter<W> {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().close()
    }
}

/// Output sink. Wraps the destination writer and remembers whether it has to be closed once the sorted
/// data is written.
pub struct OutputSink<W: Write> {
    writer: W,
    closer: Option<fn(&mut W) -> io::Result<()>>,
}

impl<W: Write> OutputSink<W> {
    /// Creates a sink that is only flushed, never closed.
    pub fn new(writer: W) -> Self {
        OutputSink { writer, closer: None }
    }

    /// Creates a sink that is closed after the sorted data is written.
    pub fn closable(writer: W) -> Self
    where
        W: Close,
    {
        OutputSink {
            writer,
            closer: Some(<W as Close>::close),
        }
    }

    /// Creates a sink closed by a custom function.
    pub fn with_closer(writer: W, closer: fn(&mut W) -> io::Result<()>) -> Self {
        OutputSink {
            writer,
            closer: Some(closer),
        }
    }

    pub fn is_closable(&self) -> bool {
        self.closer.is_some()
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Closes the underlying writer if it supports closing. Subsequent calls are no-ops.
    pub fn close(&mut self) -> io::Result<()> {
        match self.closer.take() {
            Some(closer) => closer(&mut self.writer),
            None => Ok(()),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod test {
    use std::io::{self, prelude::*};

    use super::{Close, OutputSink};

    #[test]
    fn test_plain_sink() {
        let mut sink = OutputSink::new(Vec::new());
        assert_eq!(sink.is_closable(), false);

        sink.get_mut().write_all(b"data").unwrap();
        sink.close().unwrap();

        assert_eq!(sink.into_inner(), b"data");
    }

    #[test]
    fn test_closable_file_sink() {
        let file = tempfile::tempfile().unwrap();
        let mut sink = OutputSink::closable(io::BufWriter::new(file));
        assert_eq!(sink.is_closable(), true);

        sink.get_mut().write_all(b"data").unwrap();
        sink.close().unwrap();
        assert_eq!(sink.is_closable(), false);

        let mut file = sink.into_inner().into_inner().unwrap();
        file.rewind().unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"data");
    }

    struct Counted {
        closed: usize,
    }

    impl Write for Counted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Close for Counted {
        fn close(&mut self) -> io::Result<()> {
            self.closed += 1;
            Ok(())
        }
    }

    #[test]
    fn test_close_once() {
        let mut sink = OutputSink::closable(Counted { closed: 0 });

        sink.close().unwrap();
        sink.close().unwrap();

        assert_eq!(sink.into_inner().closed, 1);
    }

    #[test]
    fn test_custom_closer() {
        let mut sink = OutputSink::with_closer(Vec::new(), |_| Err(io::Error::new(io::ErrorKind::Other, "test error")));

        assert_eq!(sink.close().unwrap_err().to_string(), "test error");
    }
}
