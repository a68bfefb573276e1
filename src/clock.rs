//! Wall-clock access pinned to the fixed GMT+8 offset.
//!
//! Every "what day is it" decision in the service (rollup boundaries, the
//! simulator's day/night ranges, the 24-hour chart) goes through this
//! module so that writers and the rollup agree on where a day starts.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

const GMT_PLUS_8_SECS: i32 = 8 * 3600;

/// The process-wide fixed offset. Not configurable per call.
pub fn gmt_plus_8() -> FixedOffset {
    FixedOffset::east_opt(GMT_PLUS_8_SECS).unwrap_or_else(|| Utc.fix())
}

/// `[start, end)` in UTC covering the whole GMT+8 calendar day `day`.
///
/// The rollup averages and deletes with the same window, so both sides
/// must come from here.
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let offset = Duration::seconds(i64::from(gmt_plus_8().local_minus_utc()));
    let start = day.and_time(NaiveTime::MIN).and_utc() - offset;
    (start, start + Duration::days(1))
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn local_now(&self) -> DateTime<FixedOffset> {
        self.now().with_timezone(&gmt_plus_8())
    }

    /// Current calendar day in GMT+8.
    fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub(crate) use manual::{local, ManualClock};
