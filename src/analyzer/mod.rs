//! Analyzer module for simulator flow logs.
//!
//! Provides functionality for:
//! - Reading a flow-completion log and locating its `simulation start` marker
//! - Classifying flows by observation window and size bucket
//! - Computing FCT and deadline-miss statistics per protocol

pub mod aggregator;
pub mod classifier;
pub mod error;
pub mod log_loader;
pub mod log_parser;
pub mod report;
pub mod task;
pub mod types;

pub use aggregator::{DeadlineCounter, RunStatistics};
pub use classifier::{classify, classify_with};
pub use error::{AnalyzerError, ErrorKind};
pub use report::{ReportMetric, StatisticsReport, build_report};
pub use task::{AnalysisSettings, AnalysisSummary, ProtocolFailure, ProtocolLog, analyze_all, analyze_file, analyze_protocol};
pub use types::{BoundKind, FlowEvent, ObservationWindow, ParseErrorPolicy, SizeBucket, SizeThresholds};
