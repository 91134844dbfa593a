//! Aggregate view over per-item batch results

use crate::batch::BatchItem;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Result of a batch operation with aggregate counts
///
/// `results` keeps input order. `success_count + failure_count == total`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<R> {
    /// Total items in the batch
    pub total: usize,
    /// Items that succeeded
    pub success_count: usize,
    /// Items that failed
    pub failure_count: usize,
    /// Wall-clock time of the whole batch
    #[serde(rename = "total_time_ms", serialize_with = "serialize_millis")]
    pub total_time: Duration,
    /// Individual results
    pub results: Vec<R>,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

impl<R: BatchItem> BatchReport<R> {
    /// Count successes and failures over `results`
    pub fn from_results(results: Vec<R>, total_time: Duration) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        Self {
            total: results.len(),
            success_count,
            failure_count: results.len() - success_count,
            total_time,
            results,
        }
    }

    /// True when every item succeeded (vacuously true for an empty batch)
    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0
    }

    /// Iterate over the failed items in input order
    pub fn failures(&self) -> impl Iterator<Item = &R> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Transform every result while keeping the counts
    pub fn map<T, F: FnMut(R) -> T>(self, f: F) -> BatchReport<T> {
        BatchReport {
            total: self.total,
            success_count: self.success_count,
            failure_count: self.failure_count,
            total_time: self.total_time,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Item(&'static str, bool);

    impl BatchItem for Item {
        fn is_success(&self) -> bool {
            self.1
        }
    }

    #[test]
    fn test_counts_sum_to_total() {
        let report = BatchReport::from_results(
            vec![Item("a", true), Item("b", false), Item("c", true)],
            Duration::from_millis(12),
        );
        assert_eq!(report.total, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 1);
        assert!(!report.all_succeeded());
        assert_eq!(report.failures().map(|i| i.0).collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_empty_report_succeeds() {
        let report = BatchReport::<Item>::from_results(Vec::new(), Duration::ZERO);
        assert_eq!(report.total, 0);
        assert!(report.all_succeeded());
    }

    #[test]
    fn test_serializes_with_wire_field_names() {
        let report = BatchReport::from_results(vec![Item("a", true)], Duration::from_millis(1500));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["success_count"], 1);
        assert_eq!(json["failure_count"], 0);
        assert_eq!(json["total_time_ms"], 1500);
        assert!(json["results"].is_array());
    }
}
