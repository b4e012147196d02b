//! Periodic report scheduling
//!
//! A report is due when the completed-request count sits on a multiple of
//! [`REPORT_EVERY`] and more than one period has passed on the capture
//! clock since the previous report. The first observation only arms the
//! clock.

use std::time::Duration;

use crate::domain::Timestamp;

/// Request-count granularity at which reports are considered
pub const REPORT_EVERY: u64 = 1000;

#[derive(Debug, Clone)]
pub struct Cadence {
    every: u64,
    period: Duration,
    last: Option<Timestamp>,
}

impl Cadence {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self::with_granularity(REPORT_EVERY, period)
    }

    #[must_use]
    pub fn with_granularity(every: u64, period: Duration) -> Self {
        Self { every: every.max(1), period, last: None }
    }

    /// Check after each segment; returns `true` when a report should print.
    pub fn due(&mut self, requests: u64, now: Timestamp) -> bool {
        let Some(last) = self.last else {
            self.last = Some(now);
            return false;
        };

        if requests % self.every != 0 {
            return false;
        }
        if u128::from(now.nanos_since(last)) <= self.period.as_nanos() {
            return false;
        }

        self.last = Some(now);
        true
    }
}
