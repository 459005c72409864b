//! Access to the current date and time behind a trait so that status
//! derivations stay deterministic in tests.

use time::{Date, OffsetDateTime};

/// Supplies "now" and "today" to everything that derives state from the
/// calendar (bill statuses, card invoices, verification code expiry).
pub trait Clock {
    /// The current UTC timestamp.
    fn now(&self) -> OffsetDateTime;

    /// The current UTC date. Defaults to the date component of [Clock::now].
    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Real-time clock backed by the system UTC time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
