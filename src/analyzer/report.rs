//! Summary statistics computed from a finished `RunStatistics`.
//!
//! Reports are plain data. Rendering lives in `crate::output`.

use serde::Serialize;

use super::aggregator::{DeadlineCounter, RunStatistics};
use super::error::AnalyzerError;
use super::types::{MissedDeadline, SizeBucket};

/// Quantile reported as `p99_fct`.
pub const P99: f64 = 0.99;

/// Deadline statistics for one size bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketReport {
    pub observed: u64,
    pub meet: u64,
    /// `None` when no deadline-bearing flows fell into the bucket.
    pub miss_ratio: Option<f64>,
}

impl From<DeadlineCounter> for BucketReport {
    fn from(counter: DeadlineCounter) -> Self {
        Self {
            observed: counter.observed,
            meet: counter.meet,
            miss_ratio: counter.miss_ratio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStats {
    pub small: BucketReport,
    pub medium: BucketReport,
    pub big: BucketReport,
}

impl BucketStats {
    pub fn get(&self, bucket: SizeBucket) -> &BucketReport {
        match bucket {
            SizeBucket::Small => &self.small,
            SizeBucket::Medium => &self.medium,
            SizeBucket::Big => &self.big,
        }
    }
}

/// A nearest-rank percentile of the FCT series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileValue {
    pub quantile: f64,
    pub value: i64,
}

/// Statistics for one protocol's log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub protocol_name: String,
    pub mean_fct: f64,
    pub p99_fct: i64,
    pub overall_miss_ratio: Option<f64>,
    pub deadline_flows: u64,
    pub deadline_met: u64,
    pub bucket_stats: BucketStats,
    pub percentiles: Vec<PercentileValue>,
    pub events_in_window: u64,
    pub events_outside_window: u64,
    pub parse_error_count: u64,
    pub missed_deadline_count: u64,
    pub missed_deadlines: Vec<MissedDeadline>,
}

/// Selectable scalar value of a report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportMetric {
    MeanFct,
    P99Fct,
    /// One of the extra percentiles the report was built with.
    Percentile(f64),
    OverallMissRatio,
    BucketMissRatio(SizeBucket),
}

impl std::str::FromStr for ReportMetric {
    type Err = String;

    /// Accepts `mean`, `p99`, `pNN` for another percentile (e.g. `p50`),
    /// `miss_ratio` and `<bucket>_miss_ratio`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" | "mean_fct" => return Ok(ReportMetric::MeanFct),
            "p99" | "p99_fct" => return Ok(ReportMetric::P99Fct),
            "miss_ratio" | "overall_miss_ratio" => return Ok(ReportMetric::OverallMissRatio),
            "small_miss_ratio" => return Ok(ReportMetric::BucketMissRatio(SizeBucket::Small)),
            "medium_miss_ratio" => return Ok(ReportMetric::BucketMissRatio(SizeBucket::Medium)),
            "big_miss_ratio" => return Ok(ReportMetric::BucketMissRatio(SizeBucket::Big)),
            _ => {}
        }
        if let Some(digits) = s.strip_prefix('p') {
            if let Ok(pct) = digits.parse::<u8>() {
                if pct < 100 {
                    return Ok(ReportMetric::Percentile(pct as f64 / 100.0));
                }
            }
        }
        Err(format!("unknown report metric '{}'", s))
    }
}

impl StatisticsReport {
    /// Look up a scalar metric.
    ///
    /// Returns `None` for an undefined miss ratio or a percentile the report
    /// was not built with.
    pub fn metric(&self, metric: ReportMetric) -> Option<f64> {
        match metric {
            ReportMetric::MeanFct => Some(self.mean_fct),
            ReportMetric::P99Fct => Some(self.p99_fct as f64),
            ReportMetric::Percentile(q) => self.percentile(q).map(|v| v as f64),
            ReportMetric::OverallMissRatio => self.overall_miss_ratio,
            ReportMetric::BucketMissRatio(bucket) => self.bucket_stats.get(bucket).miss_ratio,
        }
    }

    /// Value of a percentile computed for this report.
    pub fn percentile(&self, quantile: f64) -> Option<i64> {
        if (quantile - P99).abs() < f64::EPSILON {
            return Some(self.p99_fct);
        }
        self.percentiles
            .iter()
            .find(|p| (p.quantile - quantile).abs() < f64::EPSILON)
            .map(|p| p.value)
    }
}

/// Arithmetic mean of a non-empty series.
pub fn mean(values: &[i64]) -> Result<f64, AnalyzerError> {
    if values.is_empty() {
        return Err(AnalyzerError::EmptySeries);
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    Ok(sum / values.len() as f64)
}

/// Nearest-rank percentile of an ascending series: `sorted[floor(q * n)]`.
///
/// `quantile` must be in `[0, 1)`; larger values are clamped to the last element.
pub fn nearest_rank(sorted: &[i64], quantile: f64) -> Result<i64, AnalyzerError> {
    if sorted.is_empty() {
        return Err(AnalyzerError::EmptySeries);
    }
    let index = ((quantile * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    Ok(sorted[index])
}

/// Compute the report for a completed run.
///
/// # Parameters
///
/// * `stats` - Accumulated statistics of one protocol
/// * `percentiles` - Extra quantiles to include besides p99
///
/// # Returns
///
/// `Err(AnalyzerError::EmptySeries)` when no flow fell inside the window.
pub fn build_report(stats: &RunStatistics, percentiles: &[f64]) -> Result<StatisticsReport, AnalyzerError> {
    let mean_fct = mean(stats.fct_values())?;

    let mut sorted = stats.fct_values().to_vec();
    sorted.sort_unstable();
    let p99_fct = nearest_rank(&sorted, P99)?;

    let percentiles = percentiles
        .iter()
        .map(|&quantile| nearest_rank(&sorted, quantile).map(|value| PercentileValue { quantile, value }))
        .collect::<Result<Vec<_>, _>>()?;

    let total = stats.total();

    Ok(StatisticsReport {
        protocol_name: stats.protocol().to_string(),
        mean_fct,
        p99_fct,
        overall_miss_ratio: total.miss_ratio(),
        deadline_flows: total.observed,
        deadline_met: total.meet,
        bucket_stats: BucketStats {
            small: stats.bucket(SizeBucket::Small).into(),
            medium: stats.bucket(SizeBucket::Medium).into(),
            big: stats.bucket(SizeBucket::Big).into(),
        },
        percentiles,
        events_in_window: stats.events_in_window(),
        events_outside_window: stats.events_outside_window(),
        parse_error_count: stats.parse_error_count(),
        missed_deadline_count: stats.missed_deadline_count(),
        missed_deadlines: stats.missed_deadlines().to_vec(),
    })
}
