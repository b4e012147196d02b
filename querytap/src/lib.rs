//! # querytap - Passive MySQL Query Sniffer
//!
//! querytap watches MySQL client/server traffic on the wire, reconstructs
//! text queries from the packet stream, reduces them to a canonical form
//! and reports per-query counts, throughput, bytes and response latency.
//! It never talks to the server and never reassembles TCP; it works from
//! what a single capture point sees.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            tcpdump child  /  pcap file  /  stdin                │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ legacy pcap stream
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  capture (reader thread)                                        │
//! │  pcap records ──► link/IP/TCP decode ──► Segment                │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ bounded channel
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  processing::Sniffer (main loop)                                │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   protocol   │──▶│    query     │──▶│    stats     │         │
//! │  │ (flow sync)  │   │ (canonical)  │   │ (aggregates) │         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │                                               ▼                 │
//! │                                        ┌──────────────┐         │
//! │                                        │    report    │         │
//! │                                        │ (text/JSON)  │         │
//! │                                        └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`capture`]: pcap sources, `tcpdump` child, frame decoding
//! - [`protocol`]: frame carving and the per-flow sync state machine
//! - [`query`]: tokenizer, canonicalizer and output-format programs
//! - [`stats`]: per-key aggregates, global counters, latency samples
//! - [`report`]: snapshots, sorting, text rendering and JSON export
//! - [`processing`]: segment ingestion and report cadence
//! - [`cli`]: command-line parsing and validated configuration
//! - [`domain`]: newtypes and error enums
//!
//! ## Key Concepts
//!
//! - **Flow**: one client endpoint talking to the server port
//! - **Synced**: a flow whose request boundaries are known, because a
//!   client chunk started with a complete query frame
//! - **Desync**: a response that could not be matched to any request;
//!   the flow drops back to unsynced until the next clean query
//! - **Aggregation key**: the format program's rendering of a request,
//!   `client:canonical query` by default
//!
//! ## Typical Usage
//!
//! ```bash
//! # Live capture
//! sudo querytap -i eth0 -P 3306
//!
//! # Replay a saved capture, sorted by average latency
//! querytap -r mysql.pcap -s avg --export report.json
//! ```

pub mod capture;
pub mod cli;
pub mod domain;
pub mod processing;
pub mod protocol;
pub mod query;
pub mod report;
pub mod stats;
