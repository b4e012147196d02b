//! Text rendering of snapshots
//!
//! ```text
//! 1520 total queries, 152.00 per second
//! 9120 packets (99.12% on synchronized streams) / 0 desyncs / 14 streams
//! 0.18ms min / 2.40ms avg / 88.10ms max query times
//! 37 unique results in this filter
//!
//!  count     qps       min    avg   max      bytes      per qry
//!    800    80.00/s    0.18   0.90   4.20      64000b     80b 10.0.0.7:41000:SELECT ...
//! ```

use super::snapshot::{ReportRow, Snapshot};
use super::theme::{Palette, BYTES, COUNT, KEY, RATE, TOTALS};

/// Summary block lines (everything above the table)
#[must_use]
pub fn render_summary(snapshot: &Snapshot, palette: &Palette) -> Vec<String> {
    vec![
        palette.paint(
            format!(
                "{} total queries, {:.2} per second",
                snapshot.total_requests, snapshot.requests_per_sec
            ),
            TOTALS,
        ),
        format!(
            "{} packets ({:.2}% on synchronized streams) / {} desyncs / {} streams",
            snapshot.packets, snapshot.sync_percentage, snapshot.desyncs, snapshot.streams
        ),
        format!(
            "{:.2}ms min / {:.2}ms avg / {:.2}ms max query times",
            snapshot.latency.min_ms(),
            snapshot.latency.avg_ms(),
            snapshot.latency.max_ms()
        ),
        format!("{} unique results in this filter", snapshot.unique_keys),
    ]
}

/// Table header line
#[must_use]
pub fn render_header(palette: &Palette) -> String {
    format!(
        "{}{}{}{}",
        palette.paint(" count     ", COUNT),
        palette.paint("qps     ", RATE),
        palette.paint("  min    avg   max      ", COUNT),
        palette.paint("bytes      per qry", BYTES),
    )
}

/// One table row
#[must_use]
pub fn render_row(row: &ReportRow, palette: &Palette) -> String {
    format!(
        "{}  {}  {}  {} {}",
        palette.paint(format!("{:6}", row.count), COUNT),
        palette.paint(format!("{:7.2}/s", row.per_sec), RATE),
        palette.paint(format!("{:6.2} {:6.2} {:6.2}", row.min_ms, row.avg_ms, row.max_ms), COUNT),
        palette.paint(format!("{:9}b {:6}b", row.bytes, row.avg_bytes), BYTES),
        palette.paint(&row.key, KEY),
    )
}

/// Full report: summary, blank spacer, header and rows
#[must_use]
pub fn render_snapshot(snapshot: &Snapshot, palette: &Palette) -> Vec<String> {
    let mut lines = render_summary(snapshot, palette);
    lines.push(" ".to_string());
    lines.push(render_header(palette));
    lines.extend(snapshot.rows.iter().map(|row| render_row(row, palette)));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SortKey;
    use crate::stats::LatencySummary;

    fn snapshot() -> Snapshot {
        Snapshot {
            elapsed_secs: 10.0,
            total_requests: 20,
            requests_per_sec: 2.0,
            packets: 40,
            packets_synced: 30,
            sync_percentage: 75.0,
            desyncs: 1,
            streams: 2,
            latency: LatencySummary { samples: 1, min_ns: 5_000_000, avg_ns: 5_000_000, max_ns: 5_000_000 },
            unique_keys: 1,
            sort_key: SortKey::Count,
            rows: vec![ReportRow {
                key: "SELECT ?".to_string(),
                count: 20,
                per_sec: 2.0,
                min_ms: 5.0,
                avg_ms: 5.0,
                max_ms: 5.0,
                bytes: 1234,
                avg_bytes: 61,
            }],
        }
    }

    #[test]
    fn test_summary_lines() {
        let lines = render_summary(&snapshot(), &Palette::plain());
        assert_eq!(lines[0], "20 total queries, 2.00 per second");
        assert_eq!(lines[1], "40 packets (75.00% on synchronized streams) / 1 desyncs / 2 streams");
        assert_eq!(lines[2], "5.00ms min / 5.00ms avg / 5.00ms max query times");
        assert_eq!(lines[3], "1 unique results in this filter");
    }

    #[test]
    fn test_row_layout() {
        let snap = snapshot();
        let line = render_row(&snap.rows[0], &Palette::plain());
        assert_eq!(line, "    20     2.00/s    5.00   5.00   5.00       1234b     61b SELECT ?");
    }

    #[test]
    fn test_full_report_has_rows_after_header() {
        let lines = render_snapshot(&snapshot(), &Palette::plain());
        assert_eq!(lines.len(), 7);
        assert!(lines[5].contains("per qry"));
        assert!(lines[6].ends_with("SELECT ?"));
    }
}
