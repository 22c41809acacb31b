//! Window filtering and size classification of flow events.

use super::types::{FlowEvent, ObservationWindow, SizeBucket, SizeThresholds};

/// Classify an event using the default size thresholds.
pub fn classify(event: &FlowEvent, window: &ObservationWindow) -> Option<SizeBucket> {
    classify_with(event, window, &SizeThresholds::default())
}

/// Classify an event.
///
/// # Returns
///
/// `None` when the event's start or stop time falls outside `window`,
/// otherwise the bucket for its size.
pub fn classify_with(event: &FlowEvent, window: &ObservationWindow, thresholds: &SizeThresholds) -> Option<SizeBucket> {
    if !window.contains(event) {
        return None;
    }
    Some(SizeBucket::from_size(event.size, thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::types::BoundKind;

    fn event(start_time: i64, stop_time: i64, size: u64) -> FlowEvent {
        FlowEvent {
            flow_id: "f".to_string(),
            fct: stop_time - start_time,
            start_time,
            stop_time,
            size,
            deadline: 0,
            src_node: None,
            dst_node: None,
        }
    }

    #[test]
    fn in_window_event_gets_bucket() {
        let window = ObservationWindow::default();
        assert_eq!(classify(&event(150_000_000, 150_000_500, 50_000), &window), Some(SizeBucket::Small));
        assert_eq!(classify(&event(150_000_000, 150_000_500, 100_000), &window), Some(SizeBucket::Medium));
        assert_eq!(classify(&event(150_000_000, 150_000_500, 5_000_000), &window), Some(SizeBucket::Big));
    }

    #[test]
    fn window_bounds_are_half_open_by_default() {
        let window = ObservationWindow::new(100, 200);
        assert_eq!(classify(&event(100, 150, 1), &window), Some(SizeBucket::Small));
        assert_eq!(classify(&event(99, 150, 1), &window), None);
        assert_eq!(classify(&event(100, 199, 1), &window), Some(SizeBucket::Small));
        assert_eq!(classify(&event(100, 200, 1), &window), None);
    }

    #[test]
    fn exclusive_start_matches_strict_lower_bound() {
        let window = ObservationWindow {
            start_bound: BoundKind::Exclusive,
            ..ObservationWindow::new(100, 200)
        };
        assert_eq!(classify(&event(100, 150, 1), &window), None);
        assert_eq!(classify(&event(101, 150, 1), &window), Some(SizeBucket::Small));
    }

    #[test]
    fn bucket_depends_only_on_size() {
        let window = ObservationWindow::new(0, 1_000);
        for size in [1, 99_999, 100_000, 999_999, 1_000_000] {
            let a = classify(&event(0, 10, size), &window);
            let b = classify(&event(500, 999, size), &window);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn custom_thresholds_are_used() {
        let window = ObservationWindow::new(0, 1_000);
        let thresholds = SizeThresholds {
            small_max: 10,
            medium_max: 100,
        };
        assert_eq!(classify_with(&event(0, 1, 50), &window, &thresholds), Some(SizeBucket::Medium));
    }
}
