//! Packet capture and decoding
//!
//! Turns a pcap byte stream (file, stdin or a live `tcpdump`) into
//! [`Segment`]s: client-keyed TCP payload chunks tagged with a direction
//! and capture timestamp.
//!
//! - `decode`: link/IP/TCP decoding via `etherparse`
//! - `pcap`: legacy pcap record loop via `pcap-parser`
//! - `source`: source selection, `tcpdump` child and reader thread

pub mod decode;
pub mod pcap;
pub mod source;

pub use decode::{classify, decode_frame, Segment};
pub use pcap::{read_pcap, CaptureSummary};
pub use source::{start_capture, CaptureHandle, CaptureSource};
