use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::timeouts::OperationKind;

const WINDOW: Duration = Duration::from_secs(300);
const MAX_SAMPLES_PER_OP: usize = 2048;

/// The result of a single timed operation, as recorded by
/// [`with_timeout`](crate::with_timeout).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Success,
    Error,
    Timeout,
}

struct Sample {
    at: Instant,
    latency: Duration,
    outcome: Outcome,
}

#[derive(Default)]
struct Series {
    samples: VecDeque<Sample>,
}

impl Series {
    fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > MAX_SAMPLES_PER_OP {
            self.samples.pop_front();
        }
    }

    fn evict_older_than(&mut self, cutoff: Instant) {
        while let Some(front) = self.samples.front() {
            if front.at < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }
}

/// A point-in-time summary of one operation kind's rolling window.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsSnapshot {
    pub kind: OperationKind,
    pub sample_count: usize,
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub p90: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub error_rate: f64,
}

/// A problem [`detect_issues`](MetricsRegistry::detect_issues) found in one
/// operation kind's recent history.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricIssue {
    HighLatency { kind: OperationKind, p95: Duration, threshold: Duration },
    HighErrorRate { kind: OperationKind, error_rate: f64, threshold: f64 },
}

/// Rolling per-operation-kind latency and error-rate tracker over a sliding
/// time window.
pub struct MetricsRegistry {
    series: Mutex<HashMap<OperationKind, Series>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            series: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, kind: OperationKind, latency: Duration, outcome: Outcome) {
        let mut guard = self.series.lock().unwrap();
        let series = guard.entry(kind).or_default();
        series.evict_older_than(Instant::now() - WINDOW);
        series.push(Sample {
            at: Instant::now(),
            latency,
            outcome,
        });
    }

    /// Summary statistics for `kind` over the current window, or `None` if
    /// no samples have landed yet.
    pub fn snapshot(&self, kind: OperationKind) -> Option<MetricsSnapshot> {
        let mut guard = self.series.lock().unwrap();
        let series = guard.entry(kind).or_default();
        series.evict_older_than(Instant::now() - WINDOW);
        if series.samples.is_empty() {
            return None;
        }
        let mut latencies: Vec<Duration> = series.samples.iter().map(|s| s.latency).collect();
        latencies.sort();
        let errors = series
            .samples
            .iter()
            .filter(|s| matches!(s.outcome, Outcome::Error | Outcome::Timeout))
            .count();
        let sum: Duration = latencies.iter().sum();
        let count = latencies.len();
        Some(MetricsSnapshot {
            kind,
            sample_count: count,
            min: latencies[0],
            max: latencies[count - 1],
            avg: sum / count as u32,
            p90: percentile(&latencies, 0.90),
            p95: percentile(&latencies, 0.95),
            p99: percentile(&latencies, 0.99),
            error_rate: errors as f64 / count as f64,
        })
    }

    pub fn all_kinds(&self) -> Vec<OperationKind> {
        self.series.lock().unwrap().keys().copied().collect()
    }

    /// Reports operation kinds whose p95 exceeds `latency_threshold` or
    /// whose error rate exceeds `error_rate_threshold`.
    pub fn detect_issues(
        &self,
        latency_threshold: Duration,
        error_rate_threshold: f64,
    ) -> Vec<MetricIssue> {
        let mut issues = Vec::new();
        for kind in self.all_kinds() {
            if let Some(snapshot) = self.snapshot(kind) {
                if snapshot.p95 > latency_threshold {
                    issues.push(MetricIssue::HighLatency {
                        kind,
                        p95: snapshot.p95,
                        threshold: latency_threshold,
                    });
                }
                if snapshot.error_rate > error_rate_threshold {
                    issues.push(MetricIssue::HighErrorRate {
                        kind,
                        error_rate: snapshot.error_rate,
                        threshold: error_rate_threshold,
                    });
                }
            }
        }
        issues
    }
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_none_without_samples() {
        let registry = MetricsRegistry::new();
        assert!(registry.snapshot(OperationKind::Read).is_none());
    }

    #[test]
    fn records_error_rate() {
        let registry = MetricsRegistry::new();
        registry.record(OperationKind::Read, Duration::from_millis(10), Outcome::Success);
        registry.record(OperationKind::Read, Duration::from_millis(10), Outcome::Error);
        registry.record(OperationKind::Read, Duration::from_millis(10), Outcome::Timeout);
        let snapshot = registry.snapshot(OperationKind::Read).unwrap();
        assert_eq!(snapshot.sample_count, 3);
        assert!((snapshot.error_rate - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn detects_high_error_rate() {
        let registry = MetricsRegistry::new();
        for _ in 0..10 {
            registry.record(OperationKind::Write, Duration::from_millis(5), Outcome::Error);
        }
        let issues = registry.detect_issues(Duration::from_secs(1), 0.5);
        assert!(issues
            .iter()
            .any(|issue| matches!(issue, MetricIssue::HighErrorRate { kind: OperationKind::Write, .. })));
    }

    #[test]
    fn detects_high_latency() {
        let registry = MetricsRegistry::new();
        for _ in 0..20 {
            registry.record(OperationKind::Connect, Duration::from_secs(20), Outcome::Success);
        }
        let issues = registry.detect_issues(Duration::from_secs(15), 1.1);
        assert!(issues
            .iter()
            .any(|issue| matches!(issue, MetricIssue::HighLatency { kind: OperationKind::Connect, .. })));
    }
}
