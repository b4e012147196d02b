//! Request statistics
//!
//! - `samples`: fixed-capacity random-overwrite latency buffers
//! - `aggregator`: per-key aggregates and global counters

pub mod aggregator;
pub mod samples;

pub use aggregator::{Aggregate, GlobalStats, StatsAggregator};
pub use samples::{LatencySamples, LatencySummary, SAMPLE_SLOTS};
