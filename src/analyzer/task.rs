//! Drives the analysis pipeline for one or more protocol logs.
//!
//! Each protocol is processed start-to-finish by `analyze_protocol`:
//! load lines, parse records, classify, aggregate, report. `analyze_all`
//! runs several protocols, one scoped thread each, and merges the outcomes
//! in input order.

use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;

use super::aggregator::{DEFAULT_MISSED_DEADLINE_LIMIT, RunStatistics};
use super::classifier::classify_with;
use super::error::{AnalyzerError, ErrorKind};
use super::log_loader::LogLoader;
use super::log_parser::FlowRecords;
use super::report::{StatisticsReport, build_report};
use super::types::{ObservationWindow, ParseErrorPolicy, SizeThresholds};

/// Knobs shared by every protocol in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub window: ObservationWindow,
    pub thresholds: SizeThresholds,
    pub on_parse_error: ParseErrorPolicy,
    /// Extra nearest-rank quantiles to report next to p99.
    pub percentiles: Vec<f64>,
    /// Maximum missed-deadline diagnostics kept per protocol.
    pub missed_deadline_limit: usize,
    /// Analyze protocols on separate threads.
    pub parallel: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            window: ObservationWindow::default(),
            thresholds: SizeThresholds::default(),
            on_parse_error: ParseErrorPolicy::Skip,
            percentiles: Vec::new(),
            missed_deadline_limit: DEFAULT_MISSED_DEADLINE_LIMIT,
            parallel: true,
        }
    }
}

/// A protocol name and the log file recorded for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolLog {
    pub name: String,
    pub path: PathBuf,
}

/// A protocol whose analysis did not produce a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolFailure {
    pub protocol_name: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Combined result of a multi-protocol run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub reports: Vec<StatisticsReport>,
    pub failures: Vec<ProtocolFailure>,
}

impl AnalysisSummary {
    pub fn from_outcomes(outcomes: Vec<(String, Result<StatisticsReport, AnalyzerError>)>) -> Self {
        let mut reports = Vec::new();
        let mut failures = Vec::new();
        for (protocol_name, outcome) in outcomes {
            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => failures.push(ProtocolFailure {
                    protocol_name,
                    kind: e.kind(),
                    message: e.to_string(),
                }),
            }
        }
        Self { reports, failures }
    }

    pub fn report(&self, protocol: &str) -> Option<&StatisticsReport> {
        self.reports.iter().find(|r| r.protocol_name == protocol)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Run parse, classify and aggregate over a line source.
///
/// # Returns
///
/// The accumulated statistics, or the first fatal error: a read failure, or a
/// malformed record when the policy is `Abort`.
pub fn collect_statistics<R: BufRead>(
    protocol: &str,
    loader: LogLoader<R>,
    settings: &AnalysisSettings,
) -> Result<RunStatistics, AnalyzerError> {
    let mut stats = RunStatistics::with_missed_deadline_limit(protocol, settings.missed_deadline_limit);
    let mut records = FlowRecords::new(loader);

    for record in records.by_ref() {
        match record {
            Ok(record) => {
                let bucket = classify_with(&record.event, &settings.window, &settings.thresholds);
                stats.record(record.line_number, &record.event, bucket);
            }
            Err(e @ AnalyzerError::MalformedRecord { .. }) => match settings.on_parse_error {
                ParseErrorPolicy::Skip => {
                    log::warn!("[{}] skipping {}", protocol, e);
                    stats.record_parse_error();
                }
                ParseErrorPolicy::Abort => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }

    if !records.marker_seen() {
        log::warn!("[{}] start marker not found, no flow records read", protocol);
    }

    Ok(stats)
}

/// Analyze one protocol's log file and compute its report.
pub fn analyze_protocol(protocol: &ProtocolLog, settings: &AnalysisSettings) -> Result<StatisticsReport, AnalyzerError> {
    log::info!("[{}] analyzing {}", protocol.name, protocol.path.display());

    let stats = {
        let loader = LogLoader::open(&protocol.path)?;
        collect_statistics(&protocol.name, loader, settings)?
    };

    log::info!(
        "[{}] {} flows in window, {} outside, {} parse errors",
        protocol.name,
        stats.events_in_window(),
        stats.events_outside_window(),
        stats.parse_error_count()
    );

    build_report(&stats, &settings.percentiles)
}

/// Analyze every protocol and gather reports and failures.
///
/// With `settings.parallel` each protocol runs on its own scoped thread.
/// Output order always follows `protocols`.
pub fn analyze_all(protocols: &[ProtocolLog], settings: &AnalysisSettings) -> AnalysisSummary {
    let outcomes = if settings.parallel && protocols.len() > 1 {
        analyze_parallel(protocols, settings)
    } else {
        protocols
            .iter()
            .map(|p| (p.name.clone(), analyze_protocol(p, settings)))
            .collect()
    };

    let summary = AnalysisSummary::from_outcomes(outcomes);
    for failure in &summary.failures {
        log::error!("[{}] analysis failed: {}", failure.protocol_name, failure.message);
    }
    summary
}

fn analyze_parallel(protocols: &[ProtocolLog], settings: &AnalysisSettings) -> Vec<(String, Result<StatisticsReport, AnalyzerError>)> {
    thread::scope(|scope| {
        let handles: Vec<_> = protocols
            .iter()
            .map(|protocol| {
                let spawned = thread::Builder::new()
                    .name(format!("analyze-{}", protocol.name))
                    .spawn_scoped(scope, move || analyze_protocol(protocol, settings));
                (protocol, spawned)
            })
            .collect();

        handles
            .into_iter()
            .map(|(protocol, spawned)| {
                let outcome = match spawned {
                    Ok(handle) => handle.join().unwrap_or_else(|_| {
                        Err(AnalyzerError::Io {
                            path: protocol.path.display().to_string(),
                            message: "analysis thread panicked".to_string(),
                        })
                    }),
                    Err(e) => {
                        log::warn!("[{}] failed to spawn analysis thread ({}), running inline", protocol.name, e);
                        analyze_protocol(protocol, settings)
                    }
                };
                (protocol.name.clone(), outcome)
            })
            .collect()
    })
}

/// Convenience wrapper to analyze a single log path.
pub fn analyze_file(name: &str, path: &Path, settings: &AnalysisSettings) -> Result<StatisticsReport, AnalyzerError> {
    analyze_protocol(
        &ProtocolLog {
            name: name.to_string(),
            path: path.to_path_buf(),
        },
        settings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::aggregator::DeadlineCounter;
    use crate::analyzer::types::SizeBucket;
    use std::io::{Cursor, Write};

    fn stats_for(input: &str, settings: &AnalysisSettings) -> Result<RunStatistics, AnalyzerError> {
        collect_statistics("test", LogLoader::from_reader(Cursor::new(input.to_string()), "mem"), settings)
    }

    fn write_log(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const SCENARIO_A: &str = "setup line\nsimulation start\n\
        id,100,150000000,150000500,50000,600\n\
        id,900,150000000,150000900,50000,600\n";

    #[test]
    fn scenario_small_bucket_half_missed() {
        let stats = stats_for(SCENARIO_A, &AnalysisSettings::default()).unwrap();
        assert_eq!(stats.bucket(SizeBucket::Small), DeadlineCounter { observed: 2, meet: 1 });

        let report = build_report(&stats, &[]).unwrap();
        assert_eq!(report.bucket_stats.small.miss_ratio, Some(0.5));
        assert_eq!(report.overall_miss_ratio, Some(0.5));
        assert_eq!(report.bucket_stats.medium.miss_ratio, None);
    }

    #[test]
    fn scenario_missing_marker_yields_empty_series() {
        let stats = stats_for("id,100,150000000,150000500,50000,600\n", &AnalysisSettings::default()).unwrap();
        assert!(stats.fct_values().is_empty());
        assert_eq!(build_report(&stats, &[]), Err(AnalyzerError::EmptySeries));
    }

    #[test]
    fn scenario_zero_deadline_feeds_only_fct_series() {
        let stats = stats_for("simulation start\nid,300,150000000,150000300,50000,0\n", &AnalysisSettings::default()).unwrap();
        assert_eq!(stats.fct_values(), &[300]);
        assert_eq!(stats.total(), DeadlineCounter::default());
    }

    #[test]
    fn scenario_event_before_window_is_excluded() {
        let input = "simulation start\nid,300,50000000,50000300,50000,600\nid,100,150000000,150000100,50000,600\n";
        let stats = stats_for(input, &AnalysisSettings::default()).unwrap();
        assert_eq!(stats.fct_values(), &[100]);
        assert_eq!(stats.total(), DeadlineCounter { observed: 1, meet: 1 });
        assert_eq!(stats.events_outside_window(), 1);
    }

    #[test]
    fn scenario_malformed_line_is_skipped_and_counted() {
        let input = "simulation start\nid,100,150000000,150000100\nid,100,150000000,150000100,50000,600\n";
        let stats = stats_for(input, &AnalysisSettings::default()).unwrap();
        assert_eq!(stats.parse_error_count(), 1);
        assert_eq!(stats.fct_values(), &[100]);
    }

    #[test]
    fn blank_line_after_marker_is_a_malformed_record() {
        let input = "simulation start\nid,100,150000000,150000100,50000,600\n\nid,200,150000000,150000200,50000,600\n";

        let stats = stats_for(input, &AnalysisSettings::default()).unwrap();
        assert_eq!(stats.parse_error_count(), 1);
        assert_eq!(stats.fct_values(), &[100, 200]);

        let settings = AnalysisSettings {
            on_parse_error: ParseErrorPolicy::Abort,
            ..AnalysisSettings::default()
        };
        match stats_for(input, &settings) {
            Err(AnalyzerError::MalformedRecord { line_number, content, .. }) => {
                assert_eq!(line_number, 3);
                assert!(content.is_empty());
            }
            other => panic!("Expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn abort_policy_fails_on_first_malformed_line() {
        let settings = AnalysisSettings {
            on_parse_error: ParseErrorPolicy::Abort,
            ..AnalysisSettings::default()
        };
        let input = "simulation start\nid,100,150000000,150000100,50000,600\nbad,line\n";
        match stats_for(input, &settings) {
            Err(AnalyzerError::MalformedRecord { line_number, content, .. }) => {
                assert_eq!(line_number, 3);
                assert_eq!(content, "bad,line");
            }
            other => panic!("Expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn custom_window_and_thresholds_apply() {
        let settings = AnalysisSettings {
            window: ObservationWindow::new(0, 1_000),
            thresholds: SizeThresholds {
                small_max: 10,
                medium_max: 20,
            },
            ..AnalysisSettings::default()
        };
        let input = "simulation start\na,5,1,6,15,10\nb,50,900,950,15,10\nc,5,900,1000,15,10\n";
        let stats = stats_for(input, &settings).unwrap();
        assert_eq!(stats.bucket(SizeBucket::Medium), DeadlineCounter { observed: 2, meet: 1 });
        assert_eq!(stats.events_outside_window(), 1);
    }

    #[test]
    fn missing_file_is_reported_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_log(dir.path(), "dcmgr.out", SCENARIO_A);
        let protocols = vec![
            ProtocolLog {
                name: "dcmgr".to_string(),
                path: good,
            },
            ProtocolLog {
                name: "d2tcp".to_string(),
                path: dir.path().join("d2tcp.out"),
            },
        ];

        let summary = analyze_all(&protocols, &AnalysisSettings::default());
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].protocol_name, "dcmgr");
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].protocol_name, "d2tcp");
        assert_eq!(summary.failures[0].kind, ErrorKind::FileNotFound);
        assert!(summary.has_failures());
    }

    #[test]
    fn empty_series_fails_only_that_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let protocols = vec![
            ProtocolLog {
                name: "empty".to_string(),
                path: write_log(dir.path(), "empty.out", "no marker here\n"),
            },
            ProtocolLog {
                name: "full".to_string(),
                path: write_log(dir.path(), "full.out", SCENARIO_A),
            },
        ];

        let summary = analyze_all(&protocols, &AnalysisSettings::default());
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].kind, ErrorKind::EmptySeries);
        assert!(summary.report("full").is_some());
        assert!(summary.report("empty").is_none());
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let dir = tempfile::tempdir().unwrap();
        let protocols: Vec<ProtocolLog> = ["a", "b", "c"]
            .iter()
            .map(|name| ProtocolLog {
                name: name.to_string(),
                path: write_log(dir.path(), &format!("{}.out", name), SCENARIO_A),
            })
            .collect();

        let parallel = analyze_all(&protocols, &AnalysisSettings::default());
        let sequential = analyze_all(
            &protocols,
            &AnalysisSettings {
                parallel: false,
                ..AnalysisSettings::default()
            },
        );
        assert_eq!(parallel, sequential);
        let names: Vec<&str> = parallel.reports.iter().map(|r| r.protocol_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn repeated_runs_produce_identical_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(dir.path(), "dcmgr.out", SCENARIO_A);
        let settings = AnalysisSettings {
            percentiles: vec![0.5],
            ..AnalysisSettings::default()
        };

        let first = serde_json::to_string(&analyze_file("dcmgr", &path, &settings).unwrap()).unwrap();
        let second = serde_json::to_string(&analyze_file("dcmgr", &path, &settings).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
