//! Time sources.
//!
//! Everything that needs "now" takes an `Arc<dyn Clock>` so tests and the
//! `trip.fixed_now` setting can pin the instant without global state.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

pub trait Clock: Send + Sync {
    /// Current instant in the trip's local offset.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Local wall-clock time, the reference used for schedule resolution.
    fn local_now(&self) -> NaiveDateTime {
        self.now().naive_local()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock reported in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self { instant }
    }

    /// Pins a local wall time in the given offset. Returns `None` only for
    /// wall times the offset cannot represent.
    pub fn at_local(local: NaiveDateTime, offset: FixedOffset) -> Option<Self> {
        local
            .and_local_timezone(offset)
            .single()
            .map(|instant| Self { instant })
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}
