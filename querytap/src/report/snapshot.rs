//! Point-in-time report over the stats registry.
//!
//! ```text
//! for each aggregate:
//!   per_sec = count / elapsed          (drop when below cutoff)
//!   metric  = sort key value
//! stable sort ascending by metric, read display_count rows from the top end
//! ```

// Rates and averages intentionally convert counters to f64
#![allow(clippy::cast_precision_loss)]

use clap::ValueEnum;
use serde::Serialize;
use std::time::Duration;

use crate::stats::{Aggregate, LatencySummary, StatsAggregator};

/// Column the report is ordered by (descending)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Count,
    Avg,
    Max,
    #[value(name = "maxbytes")]
    MaxBytes,
    #[value(name = "avgbytes")]
    AvgBytes,
}

/// One aggregate as shown in a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub key: String,
    pub count: u64,
    pub per_sec: f64,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub bytes: u64,
    pub avg_bytes: u64,
}

impl ReportRow {
    fn from_aggregate(aggregate: &Aggregate, elapsed_secs: f64) -> Self {
        let latency = aggregate.samples.summarize();
        Self {
            key: aggregate.key.clone(),
            count: aggregate.count,
            per_sec: aggregate.count as f64 / elapsed_secs,
            min_ms: latency.min_ms(),
            avg_ms: latency.avg_ms(),
            max_ms: latency.max_ms(),
            bytes: aggregate.bytes,
            avg_bytes: aggregate.avg_bytes(),
        }
    }

    fn metric(&self, sort_key: SortKey) -> f64 {
        match sort_key {
            SortKey::Count => self.count as f64,
            SortKey::Avg => self.avg_ms,
            SortKey::Max => self.max_ms,
            SortKey::MaxBytes => self.bytes as f64,
            SortKey::AvgBytes => self.avg_bytes as f64,
        }
    }
}

/// Summary block plus the ordered rows
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub elapsed_secs: f64,
    pub total_requests: u64,
    pub requests_per_sec: f64,
    pub packets: u64,
    pub packets_synced: u64,
    /// Share of packets seen on synchronized flows (0-100)
    pub sync_percentage: f64,
    pub desyncs: u64,
    pub streams: u64,
    pub latency: LatencySummary,
    /// Distinct aggregation keys
    pub unique_keys: usize,
    pub sort_key: SortKey,
    pub rows: Vec<ReportRow>,
}

/// Report settings taken from the configuration
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    pub display_count: usize,
    pub sort_key: SortKey,
    /// Minimum requests per second for a row to be listed
    pub cutoff: f64,
}

impl Reporter {
    /// Build a snapshot of `stats` after `elapsed` of capture time.
    ///
    /// Elapsed time is floored at one second so rates stay finite.
    #[must_use]
    pub fn snapshot(&self, stats: &StatsAggregator, elapsed: Duration) -> Snapshot {
        let elapsed_secs = elapsed.as_secs_f64().max(1.0);
        let global = stats.global();

        let mut ranked: Vec<(f64, ReportRow)> = stats
            .aggregates()
            .map(|aggregate| ReportRow::from_aggregate(aggregate, elapsed_secs))
            .filter(|row| row.per_sec >= self.cutoff)
            .map(|row| (row.metric(self.sort_key), row))
            .collect();

        // Stable ascending sort, then read from the high end
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        let rows = ranked.into_iter().rev().take(self.display_count).map(|(_, row)| row).collect();

        let sync_percentage = if global.packets > 0 {
            global.packets_synced as f64 / global.packets as f64 * 100.0
        } else {
            0.0
        };

        Snapshot {
            elapsed_secs,
            total_requests: global.requests,
            requests_per_sec: global.requests as f64 / elapsed_secs,
            packets: global.packets,
            packets_synced: global.packets_synced,
            sync_percentage,
            desyncs: global.desyncs,
            streams: global.streams,
            latency: global.samples.summarize(),
            unique_keys: stats.len(),
            sort_key: self.sort_key,
            rows,
        }
    }
}
