//! Per-protocol accumulation of flow completion times and deadline counters.

use serde::Serialize;

use super::types::{FlowEvent, MissedDeadline, SizeBucket};

/// Default cap on retained missed-deadline diagnostics per protocol.
pub const DEFAULT_MISSED_DEADLINE_LIMIT: usize = 100;

/// Deadline-bearing flow counts for one bucket (or all of them).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeadlineCounter {
    /// Flows with a non-zero deadline.
    pub observed: u64,
    /// Of those, flows that finished within their deadline.
    pub meet: u64,
}

impl DeadlineCounter {
    /// Fraction of observed flows that missed their deadline.
    ///
    /// `None` when no deadline-bearing flows were observed.
    pub fn miss_ratio(&self) -> Option<f64> {
        if self.observed == 0 {
            return None;
        }
        Some(1.0 - self.meet as f64 / self.observed as f64)
    }

    pub fn missed(&self) -> u64 {
        self.observed - self.meet
    }

    fn count(&mut self, met: bool) {
        self.observed += 1;
        if met {
            self.meet += 1;
        }
    }
}

/// Running statistics for one protocol's log.
///
/// Created empty, fed one event at a time, then handed to the reporter.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    protocol: String,
    /// In-window FCT values, in encounter order.
    fct_values: Vec<i64>,
    small: DeadlineCounter,
    medium: DeadlineCounter,
    big: DeadlineCounter,
    total: DeadlineCounter,
    events_outside_window: u64,
    parse_error_count: u64,
    missed_deadlines: Vec<MissedDeadline>,
    missed_deadline_limit: usize,
}

impl RunStatistics {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self::with_missed_deadline_limit(protocol, DEFAULT_MISSED_DEADLINE_LIMIT)
    }

    pub fn with_missed_deadline_limit(protocol: impl Into<String>, missed_deadline_limit: usize) -> Self {
        Self {
            protocol: protocol.into(),
            fct_values: Vec::new(),
            small: DeadlineCounter::default(),
            medium: DeadlineCounter::default(),
            big: DeadlineCounter::default(),
            total: DeadlineCounter::default(),
            events_outside_window: 0,
            parse_error_count: 0,
            missed_deadlines: Vec::new(),
            missed_deadline_limit,
        }
    }

    /// Account for one parsed event and its classification.
    ///
    /// # Parameters
    ///
    /// * `line_number` - Log line the event came from, kept for diagnostics
    /// * `event` - The parsed flow
    /// * `bucket` - Result of classification, `None` if outside the window
    pub fn record(&mut self, line_number: usize, event: &FlowEvent, bucket: Option<SizeBucket>) {
        let Some(bucket) = bucket else {
            self.events_outside_window += 1;
            return;
        };

        self.fct_values.push(event.fct);

        if !event.has_deadline() {
            return;
        }

        let met = event.met_deadline();
        self.bucket_counter_mut(bucket).count(met);
        self.total.count(met);

        if !met {
            log::debug!(
                "[{}] flow {} missed deadline at line {}: fct {} > deadline {} ({} bytes, {})",
                self.protocol,
                event.flow_id,
                line_number,
                event.fct,
                event.deadline,
                event.size,
                bucket
            );
            if self.missed_deadlines.len() < self.missed_deadline_limit {
                self.missed_deadlines.push(MissedDeadline {
                    line_number,
                    flow_id: event.flow_id.clone(),
                    fct: event.fct,
                    deadline: event.deadline,
                    size: event.size,
                    bucket,
                });
            }
        }
    }

    /// Count a record that was skipped because it could not be parsed.
    pub fn record_parse_error(&mut self) {
        self.parse_error_count += 1;
    }

    fn bucket_counter_mut(&mut self, bucket: SizeBucket) -> &mut DeadlineCounter {
        match bucket {
            SizeBucket::Small => &mut self.small,
            SizeBucket::Medium => &mut self.medium,
            SizeBucket::Big => &mut self.big,
        }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn fct_values(&self) -> &[i64] {
        &self.fct_values
    }

    pub fn bucket(&self, bucket: SizeBucket) -> DeadlineCounter {
        match bucket {
            SizeBucket::Small => self.small,
            SizeBucket::Medium => self.medium,
            SizeBucket::Big => self.big,
        }
    }

    pub fn total(&self) -> DeadlineCounter {
        self.total
    }

    pub fn events_in_window(&self) -> u64 {
        self.fct_values.len() as u64
    }

    pub fn events_outside_window(&self) -> u64 {
        self.events_outside_window
    }

    pub fn parse_error_count(&self) -> u64 {
        self.parse_error_count
    }

    /// Retained diagnostics, at most the configured limit.
    pub fn missed_deadlines(&self) -> &[MissedDeadline] {
        &self.missed_deadlines
    }

    /// All deadline misses, including those beyond the diagnostics limit.
    pub fn missed_deadline_count(&self) -> u64 {
        self.total.missed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(fct: i64, size: u64, deadline: i64) -> FlowEvent {
        FlowEvent {
            flow_id: format!("f{}", fct),
            fct,
            start_time: 150_000_000,
            stop_time: 150_000_000 + fct,
            size,
            deadline,
            src_node: None,
            dst_node: None,
        }
    }

    #[test]
    fn counts_meet_and_miss_per_bucket() {
        let mut stats = RunStatistics::new("dcmgr");
        stats.record(1, &event(100, 50_000, 600), Some(SizeBucket::Small));
        stats.record(2, &event(900, 50_000, 600), Some(SizeBucket::Small));
        stats.record(3, &event(100, 500_000, 600), Some(SizeBucket::Medium));
        stats.record(4, &event(700, 5_000_000, 600), Some(SizeBucket::Big));

        assert_eq!(stats.bucket(SizeBucket::Small), DeadlineCounter { observed: 2, meet: 1 });
        assert_eq!(stats.bucket(SizeBucket::Medium), DeadlineCounter { observed: 1, meet: 1 });
        assert_eq!(stats.bucket(SizeBucket::Big), DeadlineCounter { observed: 1, meet: 0 });
        assert_eq!(stats.total(), DeadlineCounter { observed: 4, meet: 2 });
        assert_eq!(stats.fct_values(), &[100, 900, 100, 700]);
        assert_eq!(stats.missed_deadline_count(), 2);
        assert_eq!(stats.missed_deadlines()[0].line_number, 2);
        assert_eq!(stats.missed_deadlines()[1].bucket, SizeBucket::Big);
    }

    #[test]
    fn deadline_equal_to_fct_is_met() {
        let mut stats = RunStatistics::new("p");
        stats.record(1, &event(600, 10, 600), Some(SizeBucket::Small));
        assert_eq!(stats.total(), DeadlineCounter { observed: 1, meet: 1 });
    }

    #[test]
    fn flows_without_deadline_only_feed_fct_series() {
        let mut stats = RunStatistics::new("p");
        stats.record(1, &event(300, 50_000, 0), Some(SizeBucket::Small));
        assert_eq!(stats.fct_values(), &[300]);
        assert_eq!(stats.total(), DeadlineCounter::default());
        assert_eq!(stats.bucket(SizeBucket::Small), DeadlineCounter::default());
    }

    #[test]
    fn out_of_window_events_are_ignored() {
        let mut stats = RunStatistics::new("p");
        stats.record(1, &event(300, 50_000, 600), None);
        assert!(stats.fct_values().is_empty());
        assert_eq!(stats.total(), DeadlineCounter::default());
        assert_eq!(stats.events_outside_window(), 1);
    }

    #[test]
    fn totals_equal_sum_of_buckets() {
        let mut stats = RunStatistics::new("p");
        let sizes = [1, 99_999, 100_000, 2_000_000, 70, 800_000];
        for (i, size) in sizes.iter().enumerate() {
            let bucket = SizeBucket::from_size(*size, &Default::default());
            let fct = (i as i64 + 1) * 100;
            stats.record(i + 1, &event(fct, *size, 350), Some(bucket));
        }
        let sum: u64 = SizeBucket::ALL.iter().map(|b| stats.bucket(*b).observed).sum();
        assert_eq!(stats.total().observed, sum);
        for b in SizeBucket::ALL {
            assert!(stats.bucket(b).meet <= stats.bucket(b).observed);
        }
    }

    #[test]
    fn missed_deadline_diagnostics_are_capped() {
        let mut stats = RunStatistics::with_missed_deadline_limit("p", 2);
        for i in 0..5 {
            stats.record(i, &event(1_000, 10, 1), Some(SizeBucket::Small));
        }
        assert_eq!(stats.missed_deadlines().len(), 2);
        assert_eq!(stats.missed_deadline_count(), 5);
    }

    #[test]
    fn miss_ratio_sentinel_for_empty_counter() {
        assert_eq!(DeadlineCounter::default().miss_ratio(), None);
        assert_eq!(DeadlineCounter { observed: 4, meet: 3 }.miss_ratio(), Some(0.25));
        assert_eq!(DeadlineCounter { observed: 2, meet: 2 }.miss_ratio(), Some(0.0));
    }

    #[test]
    fn parse_errors_are_counted() {
        let mut stats = RunStatistics::new("p");
        stats.record_parse_error();
        stats.record_parse_error();
        assert_eq!(stats.parse_error_count(), 2);
    }
}
