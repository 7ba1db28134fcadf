//! Per-query metrics collection.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use rdapify_common::normalized::ObjectClass;

use crate::ErrorKind;

const DEFAULT_CAPACITY: usize = 10_000;

/// One finished orchestration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryRecord {
    pub kind: ObjectClass,
    pub duration: Duration,
    pub cache_hit: bool,
    pub error_kind: Option<ErrorKind>,
    pub timestamp: DateTime<Utc>,
}

impl QueryRecord {
    pub fn succeeded(&self) -> bool {
        self.error_kind.is_none()
    }
}

/// Aggregates over the recorded window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsSummary {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub avg_response_ms: f64,
    pub cache_hit_rate: f64,
    pub queries_by_type: HashMap<String, u64>,
    pub errors_by_type: HashMap<String, u64>,
}

/// A bounded ring buffer of query records.
pub struct MetricsCollector {
    capacity: usize,
    records: Mutex<VecDeque<QueryRecord>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MetricsCollector {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(
        &self,
        kind: ObjectClass,
        duration: Duration,
        cache_hit: bool,
        error_kind: Option<ErrorKind>,
    ) {
        let mut records = self.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(QueryRecord {
            kind,
            duration,
            cache_hit,
            error_kind,
            timestamp: Utc::now(),
        });
    }

    /// Aggregates over everything still in the buffer.
    pub fn summary(&self) -> MetricsSummary {
        self.summarize(|_record| true)
    }

    /// Aggregates over records at or after `since`.
    pub fn summary_since(&self, since: DateTime<Utc>) -> MetricsSummary {
        self.summarize(|record| record.timestamp >= since)
    }

    fn summarize(&self, keep: impl Fn(&QueryRecord) -> bool) -> MetricsSummary {
        let records = self.lock();
        let mut summary = MetricsSummary::default();
        let mut total_ms = 0f64;
        let mut hits = 0u64;
        for record in records.iter().filter(|r| keep(r)) {
            summary.total += 1;
            if record.succeeded() {
                summary.successful += 1;
            } else {
                summary.failed += 1;
            }
            if record.cache_hit {
                hits += 1;
            }
            total_ms += record.duration.as_secs_f64() * 1_000.0;
            *summary
                .queries_by_type
                .entry(record.kind.to_string())
                .or_insert(0) += 1;
            if let Some(error_kind) = record.error_kind {
                *summary
                    .errors_by_type
                    .entry(error_kind.to_string())
                    .or_insert(0) += 1;
            }
        }
        if summary.total > 0 {
            summary.success_rate = summary.successful as f64 / summary.total as f64;
            summary.avg_response_ms = total_ms / summary.total as f64;
            summary.cache_hit_rate = hits as f64 / summary.total as f64;
        }
        summary
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<QueryRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use rdapify_common::normalized::ObjectClass;

    use super::MetricsCollector;
    use crate::ErrorKind;

    #[test]
    fn GIVEN_mixed_outcomes_WHEN_summary_THEN_rates_computed() {
        // GIVEN
        let metrics = MetricsCollector::new(100);
        metrics.record(ObjectClass::Domain, Duration::from_millis(100), false, None);
        metrics.record(ObjectClass::Domain, Duration::from_millis(0), true, None);
        metrics.record(
            ObjectClass::Autnum,
            Duration::from_millis(200),
            false,
            Some(ErrorKind::NotFound),
        );
        metrics.record(
            ObjectClass::IpNetwork,
            Duration::from_millis(100),
            false,
            Some(ErrorKind::Transport),
        );

        // WHEN
        let summary = metrics.summary();

        // THEN
        assert_eq!(summary.total, 4);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 2);
        assert!((summary.success_rate - 0.5).abs() < f64::EPSILON);
        assert!((summary.cache_hit_rate - 0.25).abs() < f64::EPSILON);
        assert!((summary.avg_response_ms - 100.0).abs() < f64::EPSILON);
        assert_eq!(summary.queries_by_type.get("domain"), Some(&2));
        assert_eq!(summary.errors_by_type.get("not-found"), Some(&1));
        assert_eq!(summary.errors_by_type.get("transport"), Some(&1));
    }

    #[test]
    fn GIVEN_full_buffer_WHEN_record_THEN_oldest_dropped() {
        // GIVEN
        let metrics = MetricsCollector::new(2);
        metrics.record(
            ObjectClass::Domain,
            Duration::from_millis(1),
            false,
            Some(ErrorKind::NotFound),
        );
        metrics.record(ObjectClass::Domain, Duration::from_millis(1), false, None);

        // WHEN
        metrics.record(ObjectClass::Domain, Duration::from_millis(1), false, None);

        // THEN
        let summary = metrics.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn GIVEN_old_records_WHEN_summary_since_THEN_window_applied() {
        // GIVEN
        let metrics = MetricsCollector::new(100);
        metrics.record(ObjectClass::Domain, Duration::from_millis(1), false, None);

        // WHEN
        let summary = metrics.summary_since(Utc::now() + chrono::Duration::seconds(60));

        // THEN
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn GIVEN_no_records_WHEN_summary_THEN_zeroed() {
        // GIVEN
        let metrics = MetricsCollector::default();

        // WHEN
        let summary = metrics.summary();

        // THEN
        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate, 0.0);
    }
}
