//! Seconds bookkeeping across counter overflows
//!
//! One counter wrap is `2^32 / frequency` seconds plus a sub-second rest of
//! `2^32 mod frequency` ticks. Both are computed once at init; the overflow
//! interrupt adds them in, carrying the accumulated rest into a full second
//! whenever it reaches one tick-rate's worth.

use crate::error::{Error, Result};
use crate::wallclock::{TimeZoneOffset, Timestamp};

const COUNTER_PERIOD: u64 = 1 << 32;

#[derive(Debug)]
pub(crate) struct WallClock {
    /// UNIX seconds accumulated from overflows and `set`
    second_count: u32,
    /// Sub-second tick rest carried across overflows
    overflow_tick_rest: u32,
    tz_offset: TimeZoneOffset,
    /// `2^32 mod frequency`, precomputed at init
    calc_rest: u32,
    /// `2^32 / frequency`, precomputed at init
    calc_sec: u32,
}

impl WallClock {
    pub const fn new() -> Self {
        Self {
            second_count: 0,
            overflow_tick_rest: 0,
            tz_offset: 0,
            calc_rest: 0,
            calc_sec: 0,
        }
    }

    pub fn configure(&mut self, frequency: u32) {
        self.calc_rest = (COUNTER_PERIOD % frequency as u64) as u32;
        self.calc_sec = (COUNTER_PERIOD / frequency as u64) as u32;
    }

    /// Advance the clock by one full counter period
    pub fn on_overflow(&mut self, frequency: u32) {
        self.overflow_tick_rest += self.calc_rest;
        if self.overflow_tick_rest >= frequency {
            self.second_count = self.second_count.wrapping_add(1);
            self.overflow_tick_rest -= frequency;
        }
        self.second_count = self.second_count.wrapping_add(self.calc_sec);
    }

    /// Current timestamp, `counter` ticks into the running period
    pub fn now(&self, counter: u32, frequency: u32) -> Timestamp {
        let mut time = self.second_count.wrapping_add(counter / frequency);
        if counter % frequency + self.overflow_tick_rest >= frequency {
            time = time.wrapping_add(1);
        }
        time
    }

    /// Rebase the clock so `now(counter)` reads `time`
    ///
    /// The seconds the counter has already accumulated this period are
    /// subtracted out and the sub-second rest is cleared.
    pub fn set(&mut self, time: Timestamp, counter: u32, frequency: u32) -> Result<()> {
        let counter_sec = counter / frequency;
        let rebased = time.checked_sub(counter_sec).ok_or(Error::InvalidParameter)?;
        self.second_count = rebased;
        self.overflow_tick_rest = 0;
        Ok(())
    }

    pub fn tz(&self) -> TimeZoneOffset {
        self.tz_offset
    }

    pub fn set_tz(&mut self, offset: TimeZoneOffset) {
        self.tz_offset = offset;
    }
}
