//! Buffered, line-numbered reading of simulator log files.
//!
//! The loader owns the file handle; dropping it closes the file, so a
//! failed analysis releases the log as soon as the pipeline unwinds.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::error::AnalyzerError;

/// Buffer size for reading log files (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// A single line of the log with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub number: usize,
    /// Line content without the `\n` or `\r\n` terminator.
    pub text: String,
}

/// Sequential line reader over a log source.
pub struct LogLoader<R> {
    reader: R,
    source: String,
    line_number: usize,
    line_buffer: String,
    finished: bool,
}

impl LogLoader<BufReader<File>> {
    /// Open a log file for reading.
    ///
    /// # Returns
    ///
    /// `Err(AnalyzerError::FileNotFound)` if the path does not exist,
    /// `Err(AnalyzerError::Io)` for any other open failure.
    pub fn open(path: &Path) -> Result<Self, AnalyzerError> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|e| AnalyzerError::from_io(&display, &e))?;
        Ok(Self::from_reader(BufReader::with_capacity(BUFFER_SIZE, file), display))
    }
}

impl<R: BufRead> LogLoader<R> {
    /// Wrap an already-open reader. `source` names it in error messages.
    pub fn from_reader(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            source: source.into(),
            line_number: 0,
            line_buffer: String::with_capacity(256),
            finished: false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of lines read so far.
    pub fn lines_read(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for LogLoader<R> {
    type Item = Result<LogLine, AnalyzerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.line_buffer.clear();
        match self.reader.read_line(&mut self.line_buffer) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) => {
                self.line_number += 1;
                let text = self.line_buffer.strip_suffix('\n').unwrap_or(&self.line_buffer);
                let text = text.strip_suffix('\r').unwrap_or(text);
                Some(Ok(LogLine {
                    number: self.line_number,
                    text: text.to_string(),
                }))
            }
            Err(e) => {
                log::warn!("Error reading {} after line {}: {}", self.source, self.line_number, e);
                self.finished = true;
                Some(Err(AnalyzerError::from_io(&self.source, &e)))
            }
        }
    }
}
