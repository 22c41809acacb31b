//! Error type for log analysis failures.

use serde::Serialize;

/// Error raised while analyzing a single protocol's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// The log file does not exist.
    FileNotFound { path: String },
    /// The log file exists but could not be read.
    Io { path: String, message: String },
    /// A record after the start marker could not be parsed.
    MalformedRecord {
        line_number: usize,
        content: String,
        reason: String,
    },
    /// No in-window flows, so mean and percentiles are undefined.
    EmptySeries,
}

/// Coarse error category, used in failure entries of the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    Io,
    MalformedRecord,
    EmptySeries,
}

impl AnalyzerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyzerError::FileNotFound { .. } => ErrorKind::FileNotFound,
            AnalyzerError::Io { .. } => ErrorKind::Io,
            AnalyzerError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            AnalyzerError::EmptySeries => ErrorKind::EmptySeries,
        }
    }

    /// Map an I/O error on `path` to the matching variant.
    pub fn from_io(path: &str, error: &std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            AnalyzerError::FileNotFound { path: path.to_string() }
        } else {
            AnalyzerError::Io {
                path: path.to_string(),
                message: error.to_string(),
            }
        }
    }
}

impl std::fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyzerError::FileNotFound { path } => write!(f, "Log file not found: {}", path),
            AnalyzerError::Io { path, message } => write!(f, "Failed to read {}: {}", path, message),
            AnalyzerError::MalformedRecord {
                line_number,
                content,
                reason,
            } => write!(f, "Malformed record at line {} ({}): {:?}", line_number, reason, content),
            AnalyzerError::EmptySeries => write!(f, "No in-window flows to compute statistics from"),
        }
    }
}

impl std::error::Error for AnalyzerError {}
