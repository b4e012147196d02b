//! Segment ingestion
//!
//! [`Sniffer`] owns every piece of mutable state: the flow registry, the
//! stats registry and the compiled format program. Each captured segment
//! goes through [`Sniffer::ingest`], which routes it to its flow's state
//! machine and applies the outcome to the stats.
//!
//! ```text
//! Segment ──► flow lookup (new flow: streams += 1)
//!         ──► packets += 1 (synced += 1 if the flow was synced before)
//!         ──► Flow::observe
//!               desync   ──► desyncs += 1
//!               Request  ──► render key ──► record_request
//!               Response ──► record_latency (if timed) + response bytes
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use super::cadence::Cadence;
use crate::capture::Segment;
use crate::cli::Config;
use crate::domain::{Direction, FlowKey, Timestamp};
use crate::protocol::{Flow, Outcome};
use crate::query::{Canonicalizer, FormatProgram, RequestContext};
use crate::stats::StatsAggregator;

/// A request whose response has just been timed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRequest {
    /// Aggregation key the request was counted under
    pub key: String,
    /// Payload length of the request frame
    pub request_bytes: usize,
    pub latency_ns: u64,
}

impl CompletedRequest {
    /// Verbose-mode line for this request
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn verbose_line(&self) -> String {
        format!(
            "    {} ## bytes: {} time: {:.2}",
            self.key,
            self.request_bytes,
            self.latency_ns as f64 / 1_000_000.0
        )
    }
}

/// What the main loop should print after one segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    pub verbose_line: Option<String>,
    pub report_due: bool,
}

pub struct Sniffer {
    flows: HashMap<FlowKey, Flow>,
    stats: StatsAggregator,
    canonicalizer: Canonicalizer,
    format: FormatProgram,
    canonicalize: bool,
    first_seen: Option<Timestamp>,
    last_seen: Timestamp,
}

impl Sniffer {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_stats(config, StatsAggregator::new())
    }

    /// Build with a caller-supplied stats registry (seeded in tests)
    #[must_use]
    pub fn with_stats(config: &Config, stats: StatsAggregator) -> Self {
        Self {
            flows: HashMap::new(),
            stats,
            canonicalizer: Canonicalizer::new(config.tokenizer()),
            format: config.format.clone(),
            canonicalize: config.canonicalize,
            first_seen: None,
            last_seen: Timestamp::default(),
        }
    }

    pub fn ingest_segment(&mut self, segment: &Segment) -> Option<CompletedRequest> {
        self.ingest(segment.flow, segment.direction, &segment.payload, segment.timestamp)
    }

    /// Ingest a segment and decide the output it triggers.
    ///
    /// Verbose mode prints every timed request with a non-empty key and
    /// never schedules periodic reports.
    pub fn step(&mut self, segment: &Segment, cadence: &mut Cadence, verbose: bool) -> Step {
        let completed = self.ingest_segment(segment);
        if verbose {
            return Step {
                verbose_line: completed.filter(|done| !done.key.is_empty()).map(|done| done.verbose_line()),
                report_due: false,
            };
        }
        Step { verbose_line: None, report_due: cadence.due(self.stats.global().requests, segment.timestamp) }
    }

    /// Feed one payload chunk.
    ///
    /// Returns the completed request when this chunk timed a response.
    pub fn ingest(
        &mut self,
        key: FlowKey,
        direction: Direction,
        payload: &[u8],
        at: Timestamp,
    ) -> Option<CompletedRequest> {
        if payload.is_empty() {
            return None;
        }

        self.first_seen.get_or_insert(at);
        self.last_seen = self.last_seen.max(at);

        let flow = match self.flows.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.stats.record_stream();
                entry.insert(Flow::new(key))
            }
        };

        self.stats.record_packet(flow.is_synced());
        let observation = flow.observe(direction, payload, at);
        if observation.desync {
            self.stats.record_desync();
        }

        match observation.outcome {
            Outcome::Skipped | Outcome::Incomplete => None,
            Outcome::Request { frame, .. } => {
                let text = self.format.render(&RequestContext {
                    flow: &flow.key,
                    payload: &frame.payload,
                    canonicalizer: &self.canonicalizer,
                    canonicalize: self.canonicalize,
                });
                self.stats.record_request(flow, text, frame.payload.len());
                None
            }
            Outcome::Response { bytes, latency_ns } => {
                let timed = latency_ns.map(|nanos| {
                    self.stats.record_latency(flow, nanos);
                    CompletedRequest {
                        key: flow.last_text.clone(),
                        request_bytes: flow.last_request_len,
                        latency_ns: nanos,
                    }
                });
                self.stats.add_response_bytes(flow, bytes);
                timed
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    #[must_use]
    pub fn flow(&self, key: &FlowKey) -> Option<&Flow> {
        self.flows.get(key)
    }

    #[must_use]
    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    /// Capture time covered so far (first to latest segment)
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match self.first_seen {
            Some(first) => Duration::from_nanos(self.last_seen.nanos_since(first)),
            None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    const MS: u64 = 1_000_000;

    fn sniffer(extra: &[&str]) -> Sniffer {
        let mut argv = vec!["querytap"];
        argv.extend_from_slice(extra);
        let config = Config::from_args(&Args::parse_from(argv)).unwrap();
        Sniffer::with_stats(&config, StatsAggregator::with_seed(9))
    }

    fn client(port: u16) -> FlowKey {
        FlowKey(format!("10.1.1.1:{port}").parse().unwrap())
    }

    fn frame(command: u8, text: &str) -> Vec<u8> {
        let len = text.len() + 1;
        let mut buf = vec![(len & 0xff) as u8, (len >> 8 & 0xff) as u8, (len >> 16) as u8, 0, command];
        buf.extend_from_slice(text.as_bytes());
        buf
    }

    #[test]
    fn test_query_then_response_is_timed() {
        let mut s = sniffer(&[]);
        let c = client(40000);

        assert!(s.ingest(c, Direction::ToServer, &frame(3, "SELECT 1"), Timestamp(10 * MS)).is_none());
        let done = s.ingest(c, Direction::ToClient, b"resultset", Timestamp(13 * MS)).unwrap();

        assert_eq!(done.key, "10.1.1.1:40000:SELECT ?");
        assert_eq!(done.latency_ns, 3 * MS);
        assert_eq!(done.request_bytes, 8);

        let agg = s.stats().get("10.1.1.1:40000:SELECT ?").unwrap();
        assert_eq!(agg.count, 1);
        assert_eq!(agg.bytes, 8 + 9);
        assert_eq!(s.stats().global().streams, 1);
        assert_eq!(s.elapsed(), Duration::from_millis(3));
    }

    #[test]
    fn test_unsynced_traffic_counts_packets_only() {
        let mut s = sniffer(&[]);
        let c = client(40001);

        s.ingest(c, Direction::ToClient, b"greeting", Timestamp(1));
        s.ingest(c, Direction::ToServer, &frame(1, ""), Timestamp(2));

        let g = s.stats().global();
        assert_eq!((g.packets, g.packets_synced, g.requests), (2, 0, 0));
        assert!(!s.flow(&c).unwrap().is_synced());
    }

    #[test]
    fn test_synced_packets_counted_before_observe() {
        let mut s = sniffer(&[]);
        let c = client(40002);

        s.ingest(c, Direction::ToServer, &frame(3, "SELECT 1"), Timestamp(1));
        s.ingest(c, Direction::ToClient, b"ok", Timestamp(2));

        let g = s.stats().global();
        assert_eq!(g.packets, 2);
        assert_eq!(g.packets_synced, 1);
    }

    #[test]
    fn test_format_program_controls_key() {
        let mut s = sniffer(&["-f", "#i|#q"]);
        let c = client(40003);
        s.ingest(c, Direction::ToServer, &frame(3, "select * from t where id = 'x'"), Timestamp(1));
        assert!(s.stats().get("10.1.1.1|select * from t where id = ?").is_some());
    }

    #[test]
    fn test_unsanitized_keeps_literals() {
        let mut s = sniffer(&["-u", "-f", "#q"]);
        let c = client(40004);
        s.ingest(c, Direction::ToServer, &frame(3, "SELECT 42"), Timestamp(1));
        assert!(s.stats().get("SELECT 42").is_some());
    }

    #[test]
    fn test_desync_is_counted() {
        let mut s = sniffer(&["-f", "#q"]);
        let c = client(40005);

        s.ingest(c, Direction::ToServer, &frame(3, "SELECT 1"), Timestamp(1));
        s.ingest(c, Direction::ToClient, b"ok", Timestamp(2));
        // Request half-sent, then the server answers something unmatched
        s.ingest(c, Direction::ToServer, &[0x20, 0, 0, 0, 3, b'S'], Timestamp(3));
        s.ingest(c, Direction::ToClient, b"stray", Timestamp(4));
        s.ingest(c, Direction::ToClient, b"more", Timestamp(5));

        assert_eq!(s.stats().global().desyncs, 1);
        assert!(!s.flow(&c).unwrap().is_synced());
    }

    #[test]
    fn test_flows_are_independent() {
        let mut s = sniffer(&["-f", "#q"]);
        let a = client(1);
        let b = client(2);

        s.ingest(a, Direction::ToServer, &frame(3, "SELECT 1"), Timestamp(0));
        s.ingest(b, Direction::ToServer, &frame(3, "SELECT 2"), Timestamp(MS));
        let done_b = s.ingest(b, Direction::ToClient, b"r", Timestamp(2 * MS)).unwrap();
        let done_a = s.ingest(a, Direction::ToClient, b"r", Timestamp(5 * MS)).unwrap();

        assert_eq!(done_b.latency_ns, MS);
        assert_eq!(done_a.latency_ns, 5 * MS);
        assert_eq!(s.flow_count(), 2);
        assert_eq!(s.stats().get("SELECT ?").unwrap().count, 2);
    }

    #[test]
    fn test_empty_payload_ignored() {
        let mut s = sniffer(&[]);
        assert!(s.ingest(client(3), Direction::ToServer, b"", Timestamp(1)).is_none());
        assert_eq!(s.stats().global().packets, 0);
        assert_eq!(s.flow_count(), 0);
    }

    fn segment(flow: FlowKey, direction: Direction, payload: Vec<u8>, at: u64) -> Segment {
        Segment { flow, direction, payload, timestamp: Timestamp(at) }
    }

    #[test]
    fn test_step_reports_on_cadence() {
        let mut s = sniffer(&["-f", "#q"]);
        let mut cadence = Cadence::with_granularity(2, Duration::from_millis(1500));
        let c = client(40010);

        // Arms the clock
        let armed = s.step(&segment(c, Direction::ToServer, frame(3, "SELECT 1"), 0), &mut cadence, false);
        assert_eq!(armed, Step::default());
        let odd = s.step(&segment(c, Direction::ToClient, b"r".to_vec(), 1000 * MS), &mut cadence, false);
        assert_eq!(odd, Step::default());

        // Second request lands on the granularity after the period
        let due = s.step(&segment(c, Direction::ToServer, frame(3, "SELECT 2"), 2000 * MS), &mut cadence, false);
        assert!(due.report_due);
        assert!(due.verbose_line.is_none());

        // Timed responses print nothing outside verbose mode
        let resp = s.step(&segment(c, Direction::ToClient, b"r".to_vec(), 3000 * MS), &mut cadence, false);
        assert_eq!(resp, Step::default());
    }

    #[test]
    fn test_step_verbose_prints_and_never_reports() {
        let mut s = sniffer(&["-v", "-f", "#q"]);
        let mut cadence = Cadence::with_granularity(1, Duration::ZERO);
        let c = client(40011);

        for i in 0..3u64 {
            let req = s.step(&segment(c, Direction::ToServer, frame(3, "SELECT 1"), i * 10 * MS), &mut cadence, true);
            assert_eq!(req, Step::default());
            let resp = s.step(&segment(c, Direction::ToClient, b"r".to_vec(), (i * 10 + 2) * MS), &mut cadence, true);
            assert!(!resp.report_due);
            assert_eq!(resp.verbose_line.as_deref(), Some("    SELECT ? ## bytes: 8 time: 2.00"));
        }
        assert_eq!(s.stats().global().requests, 3);
    }

    #[test]
    fn test_verbose_line() {
        let done = CompletedRequest { key: "SELECT ?".into(), request_bytes: 8, latency_ns: 1_500_000 };
        assert_eq!(done.verbose_line(), "    SELECT ? ## bytes: 8 time: 1.50");
    }
}
