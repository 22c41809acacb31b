//! Type definitions specific to the analyzer module.

use serde::{Deserialize, Serialize};

/// Default upper bound (exclusive) of the small bucket, in bytes.
pub const DEFAULT_SMALL_MAX: u64 = 100_000;
/// Default upper bound (exclusive) of the medium bucket, in bytes.
pub const DEFAULT_MEDIUM_MAX: u64 = 1_000_000;

/// Default observation window start (simulator nanoseconds).
pub const DEFAULT_WINDOW_START: i64 = 100_000_000;
/// Default observation window end (simulator nanoseconds).
pub const DEFAULT_WINDOW_END: i64 = 1_300_000_000;

/// One completed flow record from the simulator log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEvent {
    /// Field 0 of the record. Only used for diagnostics.
    pub flow_id: String,
    /// Flow completion time.
    pub fct: i64,
    pub start_time: i64,
    pub stop_time: i64,
    /// Flow size in bytes.
    pub size: u64,
    /// Deadline budget, `0` when the flow has no deadline.
    pub deadline: i64,
    /// Sending node, when the record carries it.
    pub src_node: Option<u32>,
    /// Receiving node, when the record carries it.
    pub dst_node: Option<u32>,
}

impl FlowEvent {
    pub fn has_deadline(&self) -> bool {
        self.deadline != 0
    }

    /// `true` when the flow finished within its deadline.
    ///
    /// Flows without a deadline never count as meeting one.
    pub fn met_deadline(&self) -> bool {
        self.has_deadline() && self.fct <= self.deadline
    }
}

/// Flow size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Small,
    Medium,
    Big,
}

impl SizeBucket {
    pub const ALL: [SizeBucket; 3] = [SizeBucket::Small, SizeBucket::Medium, SizeBucket::Big];

    /// Bucket a flow size using the given thresholds.
    pub fn from_size(size: u64, thresholds: &SizeThresholds) -> Self {
        if size < thresholds.small_max {
            SizeBucket::Small
        } else if size < thresholds.medium_max {
            SizeBucket::Medium
        } else {
            SizeBucket::Big
        }
    }
}

impl std::fmt::Display for SizeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeBucket::Small => write!(f, "small"),
            SizeBucket::Medium => write!(f, "medium"),
            SizeBucket::Big => write!(f, "big"),
        }
    }
}

/// Size boundaries between buckets. Both are exclusive upper bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeThresholds {
    pub small_max: u64,
    pub medium_max: u64,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            small_max: DEFAULT_SMALL_MAX,
            medium_max: DEFAULT_MEDIUM_MAX,
        }
    }
}

/// Whether a window bound admits the boundary value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    Inclusive,
    Exclusive,
}

/// Time interval used to drop warm-up and cool-down flows.
///
/// `start` is checked against a flow's start time, `end` against its stop time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationWindow {
    pub start: i64,
    pub end: i64,
    pub start_bound: BoundKind,
    pub end_bound: BoundKind,
}

impl ObservationWindow {
    /// Half-open window `[start, end)`.
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            start_bound: BoundKind::Inclusive,
            end_bound: BoundKind::Exclusive,
        }
    }

    pub fn admits_start(&self, start_time: i64) -> bool {
        match self.start_bound {
            BoundKind::Inclusive => start_time >= self.start,
            BoundKind::Exclusive => start_time > self.start,
        }
    }

    pub fn admits_stop(&self, stop_time: i64) -> bool {
        match self.end_bound {
            BoundKind::Inclusive => stop_time <= self.end,
            BoundKind::Exclusive => stop_time < self.end,
        }
    }

    pub fn contains(&self, event: &FlowEvent) -> bool {
        self.admits_start(event.start_time) && self.admits_stop(event.stop_time)
    }
}

impl Default for ObservationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_START, DEFAULT_WINDOW_END)
    }
}

/// What to do with a record that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorPolicy {
    /// Count the record and keep going.
    #[default]
    Skip,
    /// Fail the protocol's analysis on the first bad record.
    Abort,
}

impl std::str::FromStr for ParseErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(ParseErrorPolicy::Skip),
            "abort" => Ok(ParseErrorPolicy::Abort),
            other => Err(format!("unknown parse error policy '{}', expected 'skip' or 'abort'", other)),
        }
    }
}

/// Diagnostic record for a deadline-bearing flow that finished late.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissedDeadline {
    pub line_number: usize,
    pub flow_id: String,
    pub fct: i64,
    pub deadline: i64,
    pub size: u64,
    pub bucket: SizeBucket,
}
