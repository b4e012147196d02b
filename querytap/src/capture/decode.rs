//! Link/IP/TCP decoding of captured frames into payload segments.
//!
//! Only the TCP payload and the endpoints survive decoding. Frames that are
//! not TCP, carry no payload, or do not touch the server port are dropped
//! here and never reach a flow.

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use std::net::{IpAddr, SocketAddr};

use crate::domain::{Direction, FlowKey, Timestamp};

// pcap link types
pub const LINKTYPE_NULL: i32 = 0;
pub const LINKTYPE_ETHERNET: i32 = 1;
pub const LINKTYPE_RAW: i32 = 101;
pub const LINKTYPE_LOOP: i32 = 108;
pub const LINKTYPE_LINUX_SLL: i32 = 113;
pub const LINKTYPE_IPV4: i32 = 228;
pub const LINKTYPE_IPV6: i32 = 229;

/// BSD loopback address-family header
const LOOPBACK_HEADER_LEN: usize = 4;

/// TCP payload travelling on one flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub flow: FlowKey,
    pub direction: Direction,
    pub payload: Vec<u8>,
    pub timestamp: Timestamp,
}

#[must_use]
pub fn is_supported_linktype(linktype: i32) -> bool {
    matches!(
        linktype,
        LINKTYPE_NULL
            | LINKTYPE_ETHERNET
            | LINKTYPE_RAW
            | LINKTYPE_LOOP
            | LINKTYPE_LINUX_SLL
            | LINKTYPE_IPV4
            | LINKTYPE_IPV6
    )
}

/// Decide direction and flow key from the two endpoints.
///
/// The flow is always keyed by the client side. Traffic where neither
/// port is the server port is not ours.
#[must_use]
pub fn classify(src: SocketAddr, dst: SocketAddr, server_port: u16) -> Option<(FlowKey, Direction)> {
    if src.port() == server_port {
        Some((FlowKey(dst), Direction::ToClient))
    } else if dst.port() == server_port {
        Some((FlowKey(src), Direction::ToServer))
    } else {
        None
    }
}

/// Decode one captured frame.
#[must_use]
pub fn decode_frame(linktype: i32, data: &[u8], server_port: u16, timestamp: Timestamp) -> Option<Segment> {
    let packet = match linktype {
        LINKTYPE_ETHERNET => SlicedPacket::from_ethernet(data).ok()?,
        LINKTYPE_LINUX_SLL => SlicedPacket::from_linux_sll(data).ok()?,
        LINKTYPE_RAW | LINKTYPE_IPV4 | LINKTYPE_IPV6 => SlicedPacket::from_ip(data).ok()?,
        LINKTYPE_NULL | LINKTYPE_LOOP => SlicedPacket::from_ip(data.get(LOOPBACK_HEADER_LEN..)?).ok()?,
        _ => return None,
    };

    #[allow(unreachable_patterns)]
    let (src_ip, dst_ip): (IpAddr, IpAddr) = match packet.net? {
        NetSlice::Ipv4(ipv4) => {
            (ipv4.header().source_addr().into(), ipv4.header().destination_addr().into())
        }
        NetSlice::Ipv6(ipv6) => {
            (ipv6.header().source_addr().into(), ipv6.header().destination_addr().into())
        }
        _ => return None,
    };

    let Some(TransportSlice::Tcp(tcp)) = packet.transport else {
        return None;
    };
    let payload = tcp.payload();
    if payload.is_empty() {
        return None;
    }

    let src = SocketAddr::new(src_ip, tcp.source_port());
    let dst = SocketAddr::new(dst_ip, tcp.destination_port());
    let (flow, direction) = classify(src, dst, server_port)?;

    Some(Segment { flow, direction, payload: payload.to_vec(), timestamp })
}
