//! Parse simulator flow-completion records into `FlowEvent` data.
//!
//! The simulator prints free-form setup output, then a line reading
//! `simulation start`, then one comma-separated record per completed flow:
//!
//! ```text
//! simulation start
//! 17,4521,150000000,150004521,50000,600000,3,9
//! ```
//!
//! Fields: flow id, fct, start time, stop time, size, deadline, and
//! optionally source and destination node ids.

use super::error::AnalyzerError;
use super::log_loader::LogLine;
use super::types::FlowEvent;

/// Line that separates the simulator's preamble from flow records.
pub const START_MARKER: &str = "simulation start";

/// Minimum number of comma-separated fields in a flow record.
pub const MIN_FIELDS: usize = 6;

/// A flow event together with the log line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub line_number: usize,
    pub event: FlowEvent,
}

/// Parse one flow record.
///
/// # Parameters
///
/// * `line` - Record text, without line terminator
/// * `line_number` - 1-based position in the log, used in errors
///
/// # Returns
///
/// The parsed event, or `AnalyzerError::MalformedRecord` describing the first problem found.
pub fn parse_record(line: &str, line_number: usize) -> Result<FlowEvent, AnalyzerError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < MIN_FIELDS {
        return Err(malformed(
            line,
            line_number,
            format!("expected at least {} fields, found {}", MIN_FIELDS, fields.len()),
        ));
    }

    let fct: i64 = parse_field(&fields, 1, "fct", line, line_number)?;
    let start_time: i64 = parse_field(&fields, 2, "start_time", line, line_number)?;
    let stop_time: i64 = parse_field(&fields, 3, "stop_time", line, line_number)?;
    let size: u64 = parse_field(&fields, 4, "size", line, line_number)?;
    let deadline: i64 = parse_field(&fields, 5, "deadline", line, line_number)?;

    if fct < 0 {
        return Err(malformed(line, line_number, format!("negative fct {}", fct)));
    }
    if size == 0 {
        return Err(malformed(line, line_number, "size must be positive".to_string()));
    }

    Ok(FlowEvent {
        flow_id: fields[0].to_string(),
        fct,
        start_time,
        stop_time,
        size,
        deadline,
        src_node: fields.get(6).and_then(|f| f.parse().ok()),
        dst_node: fields.get(7).and_then(|f| f.parse().ok()),
    })
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    name: &str,
    line: &str,
    line_number: usize,
) -> Result<T, AnalyzerError> {
    fields[index]
        .parse()
        .map_err(|_| malformed(line, line_number, format!("field {} ({}) is not an integer: {:?}", index, name, fields[index])))
}

fn malformed(line: &str, line_number: usize, reason: String) -> AnalyzerError {
    AnalyzerError::MalformedRecord {
        line_number,
        content: line.to_string(),
        reason,
    }
}

/// Lazy sequence of flow records following the start marker.
///
/// Lines up to and including the first `simulation start` line are skipped.
/// If the marker never appears the sequence is empty. Every later line is a
/// record, so a blank line yields a malformed-record error. Read errors from
/// the underlying lines are passed through unchanged.
pub struct FlowRecords<I> {
    lines: I,
    marker_seen: bool,
}

impl<I> FlowRecords<I>
where
    I: Iterator<Item = Result<LogLine, AnalyzerError>>,
{
    pub fn new(lines: I) -> Self {
        Self { lines, marker_seen: false }
    }

    /// Whether the start marker has been reached so far.
    pub fn marker_seen(&self) -> bool {
        self.marker_seen
    }
}

impl<I> Iterator for FlowRecords<I>
where
    I: Iterator<Item = Result<LogLine, AnalyzerError>>,
{
    type Item = Result<ParsedRecord, AnalyzerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };

            if !self.marker_seen {
                if line.text == START_MARKER {
                    log::debug!("Start marker found at line {}", line.number);
                    self.marker_seen = true;
                }
                continue;
            }

            return Some(parse_record(&line.text, line.number).map(|event| ParsedRecord {
                line_number: line.number,
                event,
            }));
        }
    }
}
