//! Legacy pcap stream reader
//!
//! Reads a classic (non-ng) pcap stream from any byte source, decodes each
//! record and hands the resulting segments to a sink. The same loop serves
//! saved files, stdin and the live `tcpdump` pipe.

use log::{debug, warn};
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError};
use std::io::Read;

use super::decode::{decode_frame, is_supported_linktype, Segment, LINKTYPE_ETHERNET};
use crate::domain::{CaptureError, Timestamp};

const READ_BUFFER_SIZE: usize = 65536;

/// Upper bound for buffer growth when a single record does not fit
const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Nanosecond-resolution pcap magic, in either byte order
const MAGIC_NANOS: [u32; 2] = [0xa1b2_3c4d, 0x4d3c_b2a1];

/// Record counts for one capture run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Records read from the stream
    pub frames: u64,
    /// Records that decoded into a segment on the server port
    pub segments: u64,
    /// Records dropped during decoding
    pub skipped: u64,
    /// The sink asked to stop before the stream ended
    pub interrupted: bool,
}

/// Read a pcap stream to the end, handing every segment to `sink`.
///
/// `sink` returns `false` to stop reading early.
///
/// # Errors
/// `CaptureError::NotPcap` when the stream does not start with a legacy
/// pcap header, `CaptureError::ParseFailed` on a corrupt record.
pub fn read_pcap<R, F>(source: R, server_port: u16, mut sink: F) -> Result<CaptureSummary, CaptureError>
where
    R: Read,
    F: FnMut(Segment) -> bool,
{
    let mut reader = LegacyPcapReader::new(READ_BUFFER_SIZE, source)
        .map_err(|e| CaptureError::NotPcap(format!("{e:?}")))?;

    let mut capacity = READ_BUFFER_SIZE;
    let mut summary = CaptureSummary::default();
    let mut linktype = LINKTYPE_ETHERNET;
    let mut nanosecond_precision = false;

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let segment = match block {
                    PcapBlockOwned::LegacyHeader(ref hdr) => {
                        linktype = hdr.network.0;
                        nanosecond_precision = MAGIC_NANOS.contains(&hdr.magic_number);
                        if !is_supported_linktype(linktype) {
                            warn!("Unsupported link type {linktype}, every frame will be skipped");
                        }
                        debug!("pcap header: linktype={linktype} nanos={nanosecond_precision}");
                        None
                    }
                    PcapBlockOwned::Legacy(ref packet) => {
                        summary.frames += 1;
                        let ts = Timestamp::from_pcap(packet.ts_sec, packet.ts_usec, nanosecond_precision);
                        let decoded = decode_frame(linktype, packet.data, server_port, ts);
                        if decoded.is_none() {
                            summary.skipped += 1;
                        }
                        decoded
                    }
                    PcapBlockOwned::NG(_) => {
                        warn!("pcapng block encountered, only legacy pcap is supported");
                        None
                    }
                };
                drop(block);
                reader.consume(offset);

                if let Some(segment) = segment {
                    summary.segments += 1;
                    if !sink(segment) {
                        summary.interrupted = true;
                        break;
                    }
                }
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                if let Err(e) = reader.refill() {
                    return Err(CaptureError::ParseFailed(format!("refill error: {e:?}")));
                }
            }
            Err(PcapError::BufferTooSmall) => grow_and_refill(&mut reader, &mut capacity)?,
            Err(PcapError::UnexpectedEof) => {
                warn!("Capture stream ended in the middle of a record");
                break;
            }
            Err(e) => return Err(CaptureError::ParseFailed(format!("{e:?}"))),
        }
    }

    Ok(summary)
}

/// Double the read buffer so a record larger than it can be parsed.
fn grow_and_refill<P: PcapReaderIterator>(reader: &mut P, capacity: &mut usize) -> Result<(), CaptureError> {
    // Jumbo or offloaded segments can exceed the initial buffer
    if *capacity >= MAX_BUFFER_SIZE {
        return Err(CaptureError::ParseFailed(format!("record larger than {MAX_BUFFER_SIZE} bytes")));
    }
    *capacity = (*capacity * 2).min(MAX_BUFFER_SIZE);
    if !reader.grow(*capacity) {
        return Err(CaptureError::ParseFailed(format!("cannot grow read buffer to {}", *capacity)));
    }
    debug!("Read buffer grown to {} bytes", *capacity);
    // A record still too large shows up again on the next parse
    reader.refill().map_err(|e| CaptureError::ParseFailed(format!("refill error: {e:?}")))
}
