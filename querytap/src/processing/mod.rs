//! Ingestion pipeline
//!
//! - `sniffer`: flow registry and stats updates per segment
//! - `cadence`: when periodic reports are due

pub mod cadence;
pub mod sniffer;

pub use cadence::{Cadence, REPORT_EVERY};
pub use sniffer::{CompletedRequest, Sniffer, Step};
