//! Metric aggregation.
//!
//! This module turns the per-run records into a table with a trailing
//! average row.

use crate::models::{Metric, MetricRecord, MetricTable, MetricValue, RunId};

/// Build the metrics table, or `None` when there is nothing to aggregate.
pub fn build_table(records: Vec<MetricRecord>) -> Option<MetricTable> {
    if records.is_empty() {
        return None;
    }

    let average = average_record(&records);
    Some(MetricTable {
        runs: records,
        average,
    })
}

/// Compute the average row.
///
/// Each column is the mean of its numeric values only; errors and
/// unavailable values are left out. A column without any numeric value
/// stays unavailable.
pub fn average_record(records: &[MetricRecord]) -> MetricRecord {
    let mut average = MetricRecord::empty(RunId::Average);

    for metric in Metric::ALL {
        let value = mean(records.iter().filter_map(|r| r.get(metric).as_number()))
            .map(MetricValue::Number)
            .unwrap_or(MetricValue::NotAvailable);
        average.set(metric, value);
    }

    average
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Count of numeric values per metric column, in column order.
pub fn numeric_counts(records: &[MetricRecord]) -> Vec<(Metric, usize)> {
    Metric::ALL
        .iter()
        .map(|&metric| {
            let count = records
                .iter()
                .filter(|r| r.get(metric).as_number().is_some())
                .count();
            (metric, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(run: u32, performance: MetricValue, lcp: MetricValue) -> MetricRecord {
        let mut r = MetricRecord::empty(RunId::Run(run));
        r.performance = performance;
        r.lcp = lcp;
        r
    }

    #[test]
    fn test_average_excludes_sentinels() {
        let records = vec![
            record(1, MetricValue::Number(80.0), MetricValue::Number(2000.0)),
            record(2, MetricValue::Number(90.0), MetricValue::Error("NO_LCP".into())),
            record(3, MetricValue::NotAvailable, MetricValue::Number(3000.0)),
        ];

        let average = average_record(&records);

        assert_eq!(average.run, RunId::Average);
        assert_eq!(average.performance, MetricValue::Number(85.0));
        assert_eq!(average.lcp, MetricValue::Number(2500.0));
    }

    #[test]
    fn test_all_sentinel_column_stays_unavailable() {
        let records = vec![
            record(1, MetricValue::Number(50.0), MetricValue::NotAvailable),
            record(2, MetricValue::Number(60.0), MetricValue::NotAvailable),
        ];

        let average = average_record(&records);
        assert_eq!(average.lcp, MetricValue::NotAvailable);
        assert_eq!(average.cls, MetricValue::NotAvailable);
    }

    #[test]
    fn test_build_table_appends_single_average() {
        let records: Vec<MetricRecord> = (1..=5)
            .map(|i| record(i, MetricValue::Number(i as f64 * 10.0), MetricValue::NotAvailable))
            .collect();

        let table = build_table(records).unwrap();

        assert_eq!(table.runs.len(), 5);
        assert_eq!(table.len(), 6);
        assert_eq!(table.average.performance, MetricValue::Number(30.0));
        let last = table.rows().last().unwrap();
        assert_eq!(last.run, RunId::Average);
    }

    #[test]
    fn test_build_table_empty() {
        assert!(build_table(Vec::new()).is_none());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean([1.0, 2.0, 6.0].into_iter()), Some(3.0));
        assert_eq!(mean(std::iter::empty()), None);
    }

    #[test]
    fn test_numeric_counts() {
        let records = vec![
            record(1, MetricValue::Number(80.0), MetricValue::Error("x".into())),
            record(2, MetricValue::Number(90.0), MetricValue::Number(1.0)),
        ];
        let counts = numeric_counts(&records);
        assert_eq!(counts[0], (Metric::Performance, 2));
        assert_eq!(counts[3], (Metric::Lcp, 1));
        assert_eq!(counts[7], (Metric::Cls, 0));
    }
}
