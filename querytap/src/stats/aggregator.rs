//! Per-key and global request statistics.
//!
//! # Architecture
//!
//! - **`Aggregate`** - one per distinct aggregation key, never evicted
//! - **`GlobalStats`** - process-wide packet/flow counters and latencies
//! - **`StatsAggregator`** - owns both and applies updates as requests and
//!   responses stream in
//!
//! ## Data Flow
//!
//! ```text
//! Flow request ──► record_request(key) ──► Aggregate.count/bytes
//!                                          flow.aggregate = id
//! Flow response ─► record_latency(ns) ──► one random slot, written into
//!                                          flow + global + aggregate
//! ```
//!
//! # Memory
//!
//! Each aggregate carries a 10,000-slot sample buffer (~80 KB). Aggregates
//! and flows live for the whole process; a workload with unbounded distinct
//! keys grows without limit.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

use super::samples::{pick_slot, LatencySamples};
use crate::domain::AggregateId;
use crate::protocol::Flow;

/// Statistics for one aggregation key
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub key: String,
    /// Completed requests that mapped to this key
    pub count: u64,
    /// Request payload bytes plus response bytes
    pub bytes: u64,
    pub samples: LatencySamples,
}

impl Aggregate {
    fn new(key: String) -> Self {
        Self { key, count: 0, bytes: 0, samples: LatencySamples::new() }
    }

    /// Mean bytes per request, truncated
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn avg_bytes(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        (self.bytes as f64 / self.count as f64) as u64
    }
}

/// Process-wide counters
#[derive(Debug, Clone, Default)]
pub struct GlobalStats {
    /// Every payload chunk handed to a flow
    pub packets: u64,
    /// Chunks that arrived on a flow already synced
    pub packets_synced: u64,
    pub desyncs: u64,
    /// Distinct flows seen
    pub streams: u64,
    /// Completed (carved) requests
    pub requests: u64,
    /// Every measured latency regardless of key
    pub samples: LatencySamples,
}

/// Registry of aggregates plus global counters
#[derive(Debug)]
pub struct StatsAggregator {
    aggregates: Vec<Aggregate>,
    index: HashMap<String, AggregateId>,
    global: GlobalStats,
    rng: StdRng,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic slot selection for tests and replays
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            aggregates: Vec::new(),
            index: HashMap::new(),
            global: GlobalStats::default(),
            rng,
        }
    }

    pub fn record_packet(&mut self, synced: bool) {
        self.global.packets += 1;
        if synced {
            self.global.packets_synced += 1;
        }
    }

    pub fn record_desync(&mut self) {
        self.global.desyncs += 1;
    }

    pub fn record_stream(&mut self) {
        self.global.streams += 1;
    }

    /// Count a completed request under `key` and associate it with `flow`.
    pub fn record_request(&mut self, flow: &mut Flow, key: String, request_len: usize) -> AggregateId {
        self.global.requests += 1;

        let id = match self.index.get(&key) {
            Some(&id) => id,
            None => {
                let id = AggregateId(self.aggregates.len());
                self.aggregates.push(Aggregate::new(key.clone()));
                self.index.insert(key.clone(), id);
                id
            }
        };

        let aggregate = &mut self.aggregates[id.0];
        aggregate.count += 1;
        aggregate.bytes += request_len as u64;

        flow.aggregate = Some(id);
        flow.last_text = key;
        id
    }

    /// Store one latency measurement in the flow, global and aggregate
    /// buffers, all at the same random slot.
    pub fn record_latency(&mut self, flow: &mut Flow, nanos: u64) {
        let slot = pick_slot(&mut self.rng);
        flow.samples.get_or_insert_with(LatencySamples::new).record(slot, nanos);
        self.global.samples.record(slot, nanos);
        if let Some(id) = flow.aggregate {
            self.aggregates[id.0].samples.record(slot, nanos);
        }
    }

    /// Add response bytes to the flow's current aggregate, if any.
    pub fn add_response_bytes(&mut self, flow: &Flow, bytes: usize) {
        if let Some(id) = flow.aggregate {
            self.aggregates[id.0].bytes += bytes as u64;
        }
    }

    #[must_use]
    pub fn global(&self) -> &GlobalStats {
        &self.global
    }

    #[must_use]
    pub fn aggregate(&self, id: AggregateId) -> &Aggregate {
        &self.aggregates[id.0]
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Aggregate> {
        self.index.get(key).map(|id| &self.aggregates[id.0])
    }

    pub fn aggregates(&self) -> impl Iterator<Item = &Aggregate> {
        self.aggregates.iter()
    }

    /// Number of distinct keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FlowKey;

    fn flow(port: u16) -> Flow {
        Flow::new(FlowKey(format!("10.0.0.1:{port}").parse().unwrap()))
    }

    #[test]
    fn test_requests_aggregate_by_key() {
        let mut stats = StatsAggregator::with_seed(1);
        let mut a = flow(1000);
        let mut b = flow(1001);

        let id1 = stats.record_request(&mut a, "SELECT ?".to_string(), 8);
        let id2 = stats.record_request(&mut b, "SELECT ?".to_string(), 8);
        stats.record_request(&mut b, "UPDATE t".to_string(), 8);

        assert_eq!(id1, id2);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats.global().requests, 3);
        assert_eq!(stats.get("SELECT ?").unwrap().count, 2);
        assert_eq!(stats.get("SELECT ?").unwrap().bytes, 16);
        assert_eq!(b.last_text, "UPDATE t");
        assert_eq!(a.aggregate, Some(id1));
    }

    #[test]
    fn test_latency_lands_in_all_buffers() {
        let mut stats = StatsAggregator::with_seed(2);
        let mut f = flow(2000);
        let id = stats.record_request(&mut f, "q".to_string(), 1);

        stats.record_latency(&mut f, 5_000_000);

        assert_eq!(stats.aggregate(id).samples.summarize().samples, 1);
        assert_eq!(stats.global().samples.summarize().samples, 1);
        assert_eq!(f.samples.as_ref().unwrap().summarize().max_ns, 5_000_000);
    }

    #[test]
    fn test_latency_without_aggregate_still_global() {
        let mut stats = StatsAggregator::with_seed(3);
        let mut f = flow(3000);
        stats.record_latency(&mut f, 10);
        assert_eq!(stats.global().samples.summarize().samples, 1);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_response_bytes_follow_association() {
        let mut stats = StatsAggregator::with_seed(4);
        let mut f = flow(4000);
        stats.add_response_bytes(&f, 100);
        let id = stats.record_request(&mut f, "q".to_string(), 10);
        stats.add_response_bytes(&f, 90);

        assert_eq!(stats.aggregate(id).bytes, 100);
        assert_eq!(stats.aggregate(id).avg_bytes(), 100);
    }

    #[test]
    fn test_packet_counters() {
        let mut stats = StatsAggregator::with_seed(5);
        stats.record_packet(false);
        stats.record_packet(true);
        stats.record_desync();
        stats.record_stream();

        let g = stats.global();
        assert_eq!((g.packets, g.packets_synced, g.desyncs, g.streams), (2, 1, 1, 1));
    }
}
