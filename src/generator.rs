//! Random test data generator.

use std::io::{self, prelude::*};

use rand::Rng;

/// Default generator dictionary: digits, lowercase and uppercase English letters.
pub const DEFAULT_DICTIONARY: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Writes fixed-length random lines. Every line, the last one included, is terminated by the delimiter.
#[derive(Debug, Clone)]
pub struct RandomLineGenerator {
    dictionary: Vec<u8>,
    lines: u64,
    line_length: usize,
    delimiter: u8,
}

impl RandomLineGenerator {
    pub fn new(lines: u64, line_length: usize) -> Self {
        RandomLineGenerator {
            dictionary: DEFAULT_DICTIONARY.as_bytes().to_vec(),
            lines,
            line_length,
            delimiter: b'\n',
        }
    }

    /// Sets the characters lines are made of. An empty dictionary keeps the default one.
    pub fn with_dictionary(mut self, dictionary: &[u8]) -> Self {
        if !dictionary.is_empty() {
            self.dictionary = dictionary.to_vec();
        }
        return self;
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        return self;
    }

    /// Generates the lines into `output` and flushes it.
    pub fn generate<W: Write, R: Rng>(&self, output: &mut W, rng: &mut R) -> io::Result<()> {
        let mut line = Vec::with_capacity(self.line_length + 1);
        for _ in 0..self.lines {
            line.clear();
            line.extend((0..self.line_length).map(|_| self.dictionary[rng.gen_range(0..self.dictionary.len())]));
            line.push(self.delimiter);
            output.write_all(&line)?;
        }

        return output.flush();
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::{RandomLineGenerator, DEFAULT_DICTIONARY};

    #[rstest]
    #[case(0, 30)]
    #[case(1, 1)]
    #[case(100, 30)]
    fn test_generator(#[case] lines: u64, #[case] line_length: usize) {
        let mut output = Vec::new();
        RandomLineGenerator::new(lines, line_length)
            .generate(&mut output, &mut rand::thread_rng())
            .unwrap();

        assert_eq!(output.len(), lines as usize * (line_length + 1));
        for line in output.split_inclusive(|byte| *byte == b'\n') {
            assert_eq!(line.len(), line_length + 1);
            assert!(line[..line_length].iter().all(|byte| DEFAULT_DICTIONARY.as_bytes().contains(byte)));
        }
    }

    #[test]
    fn test_custom_dictionary() {
        let mut output = Vec::new();
        RandomLineGenerator::new(3, 2)
            .with_dictionary(b"x")
            .with_delimiter(b',')
            .generate(&mut output, &mut rand::thread_rng())
            .unwrap();

        assert_eq!(output, b"xx,xx,xx,");
    }
}
