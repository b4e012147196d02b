//! Wire protocol handling
//!
//! - `frame`: carve length-prefixed frames out of a byte buffer
//! - `flow`: per-client synchronization and request/response pairing

pub mod flow;
pub mod frame;

pub use flow::{Flow, Observation, Outcome, SyncState};
pub use frame::{carve, Frame, COM_QUERY};
