//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep flow endpoints, capture timestamps and
//! aggregate handles from being mixed up with plain strings and integers.

use std::fmt;
use std::net::SocketAddr;

/// Remote endpoint of an observed connection (the non-server side).
///
/// Flows are keyed by this value. Displays as `ip:port`, which is also the
/// text substituted for the `#s` format placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey(pub SocketAddr);

impl FlowKey {
    /// Address-only component (`#i` placeholder)
    #[must_use]
    pub fn addr(&self) -> String {
        self.0.ip().to_string()
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SocketAddr> for FlowKey {
    fn from(addr: SocketAddr) -> Self {
        FlowKey(addr)
    }
}

/// Which way a payload chunk travelled relative to the server port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to server: carries request frames
    ToServer,
    /// Server to client: carries responses
    ToClient,
}

impl Direction {
    #[must_use]
    pub fn is_request(self) -> bool {
        matches!(self, Direction::ToServer)
    }
}

/// Capture timestamp in nanoseconds since the Unix epoch
///
/// Taken from the pcap record header, so replayed captures measure the
/// latencies that were on the wire rather than processing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Build from a pcap `(seconds, sub-second)` pair.
    ///
    /// `nanosecond_precision` selects whether the fraction is in ns or µs.
    #[must_use]
    pub fn from_pcap(secs: u32, frac: u32, nanosecond_precision: bool) -> Self {
        let frac_ns = if nanosecond_precision { u64::from(frac) } else { u64::from(frac) * 1_000 };
        Timestamp(u64::from(secs) * 1_000_000_000 + frac_ns)
    }

    /// Nanoseconds elapsed since `earlier` (saturating at zero)
    #[must_use]
    pub fn nanos_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Handle to an aggregate owned by the stats registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_key_display() {
        let key = FlowKey("10.0.0.7:51234".parse().unwrap());
        assert_eq!(key.to_string(), "10.0.0.7:51234");
        assert_eq!(key.addr(), "10.0.0.7");
    }

    #[test]
    fn test_flow_key_ipv6_addr() {
        let key = FlowKey("[fe80::1]:40000".parse().unwrap());
        assert_eq!(key.to_string(), "[fe80::1]:40000");
        assert_eq!(key.addr(), "fe80::1");
    }

    #[test]
    fn test_timestamp_from_pcap() {
        assert_eq!(Timestamp::from_pcap(2, 500, false).0, 2_000_500_000);
        assert_eq!(Timestamp::from_pcap(2, 500, true).0, 2_000_000_500);
    }

    #[test]
    fn test_nanos_since_saturates() {
        let a = Timestamp(100);
        let b = Timestamp(250);
        assert_eq!(b.nanos_since(a), 150);
        assert_eq!(a.nanos_since(b), 0);
    }
}
