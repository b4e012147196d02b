//! Per-flow synchronization state machine
//!
//! A flow starts `Unsynced` and only starts producing request/response
//! events after a client chunk carves a `COM_QUERY` frame. From then on:
//!
//! ```text
//!   client chunk ──► replace request buffer ──► carve ──► Request (start timer)
//!   server chunk ──► timer set?   yes ──► Response { latency }
//!                                 no  ──► Response { trailing bytes }
//!                                          └─ request bytes still uncarved?
//!                                             mark unresolved response
//!   next chunk while marked ──► desync: buffers cleared, back to Unsynced
//! ```
//!
//! The request buffer is replaced, not appended to, on every client chunk.
//! A request frame split across two chunks is never reassembled; its first
//! half is dropped when the second chunk arrives.

use log::debug;

use super::frame::{carve, Frame};
use crate::domain::{AggregateId, Direction, FlowKey, Timestamp};
use crate::stats::LatencySamples;

/// Synchronization state of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Unsynced,
    Synced,
}

/// What a single chunk did to the flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Unsynced flow, chunk dropped
    Skipped,
    /// Client chunk without a complete frame yet
    Incomplete,
    /// A request frame was carved and its timer started
    Request {
        frame: Frame,
        /// A previous request was still waiting for its response
        overlapped: bool,
    },
    /// Server chunk on a synced flow
    Response {
        bytes: usize,
        /// Elapsed time since the request, when one was outstanding
        latency_ns: Option<u64>,
    },
}

/// Result of [`Flow::observe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The chunk found an unresolved response and reset the flow
    pub desync: bool,
    pub outcome: Outcome,
}

/// Tracking state for one remote endpoint
#[derive(Debug)]
pub struct Flow {
    pub key: FlowKey,
    state: SyncState,
    request_buffer: Vec<u8>,
    unresolved_response: bool,
    request_sent: Option<Timestamp>,
    /// Aggregate of the most recent request
    pub aggregate: Option<AggregateId>,
    /// Aggregation key of the most recent request
    pub last_text: String,
    /// Payload length of the most recent request frame
    pub last_request_len: usize,
    /// Latencies measured on this flow, allocated on first measurement
    pub samples: Option<LatencySamples>,
}

impl Flow {
    #[must_use]
    pub fn new(key: FlowKey) -> Self {
        Self {
            key,
            state: SyncState::Unsynced,
            request_buffer: Vec::new(),
            unresolved_response: false,
            request_sent: None,
            aggregate: None,
            last_text: String::new(),
            last_request_len: 0,
            samples: None,
        }
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.state == SyncState::Synced
    }

    #[must_use]
    pub fn request_pending(&self) -> bool {
        self.request_sent.is_some()
    }

    #[must_use]
    pub fn has_unresolved_response(&self) -> bool {
        self.unresolved_response
    }

    /// Feed one payload chunk through the state machine.
    pub fn observe(&mut self, direction: Direction, payload: &[u8], at: Timestamp) -> Observation {
        let desync = self.unresolved_response;
        if desync {
            debug!("[{}] unresolved response followed by more traffic, desynced", self.key);
            self.reset();
        }

        let frame = if direction.is_request() {
            self.request_buffer = payload.to_vec();
            carve(&mut self.request_buffer)
        } else {
            None
        };

        if !self.is_synced() {
            match frame {
                Some(ref f) if f.is_query() => self.state = SyncState::Synced,
                _ => {
                    self.request_buffer.clear();
                    self.unresolved_response = false;
                    return Observation { desync, outcome: Outcome::Skipped };
                }
            }
        }

        let outcome = match direction {
            Direction::ToServer => match frame {
                Some(frame) => self.start_request(frame, at),
                None => Outcome::Incomplete,
            },
            Direction::ToClient => self.finish_response(payload.len(), at),
        };

        Observation { desync, outcome }
    }

    fn start_request(&mut self, frame: Frame, at: Timestamp) -> Outcome {
        let overlapped = self.request_sent.is_some();
        if overlapped {
            debug!("[{}] request sent while previous request still awaits a response", self.key);
        }
        self.request_sent = Some(at);
        self.last_request_len = frame.payload.len();
        Outcome::Request { frame, overlapped }
    }

    fn finish_response(&mut self, bytes: usize, at: Timestamp) -> Outcome {
        let Some(sent) = self.request_sent.take() else {
            // Trailing bytes of an earlier response, unless a request is
            // still sitting uncarved in the buffer.
            if !self.request_buffer.is_empty() {
                self.unresolved_response = true;
            }
            return Outcome::Response { bytes, latency_ns: None };
        };

        // Zero is the empty-slot sentinel, so same-timestamp pairs count as 1ns
        let latency = at.nanos_since(sent).max(1);
        Outcome::Response { bytes, latency_ns: Some(latency) }
    }

    fn reset(&mut self) {
        self.state = SyncState::Unsynced;
        self.request_buffer.clear();
        self.unresolved_response = false;
        self.request_sent = None;
    }
}
