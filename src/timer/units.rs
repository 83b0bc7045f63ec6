//! Tick and millisecond conversion helpers
//!
//! Pure, frequency-parameterized versions of the service conversion API.
//! Millisecond-to-tick conversions round up by one tick so a nonzero delay
//! never collapses to zero; tick-to-millisecond takes a shift fast path when
//! the frequency is a power of two.

use crate::error::{Error, Result};

pub(crate) fn ms_to_tick(time_ms: u16, frequency: u32) -> u32 {
    ((time_ms as u64 * frequency as u64) / 1000 + 1) as u32
}

pub(crate) fn ms32_to_tick(time_ms: u32, frequency: u32, max_ms: u32) -> Result<u32> {
    if time_ms > max_ms {
        return Err(Error::InvalidParameter);
    }
    Ok(((time_ms as u64 * frequency as u64) / 1000 + 1) as u32)
}

pub(crate) fn tick_to_ms(tick: u32, frequency: u32) -> u32 {
    let scaled = tick as u64 * 1000;
    if frequency.is_power_of_two() {
        (scaled >> frequency.trailing_zeros()) as u32
    } else {
        (scaled / frequency as u64) as u32
    }
}

pub(crate) fn tick64_to_ms(tick: u64, frequency: u32) -> Result<u64> {
    if tick > u64::MAX / 1000 {
        return Err(Error::InvalidParameter);
    }
    let scaled = tick * 1000;
    if frequency.is_power_of_two() {
        Ok(scaled >> frequency.trailing_zeros())
    } else {
        Ok(scaled / frequency as u64)
    }
}

/// Largest millisecond value `ms32_to_tick` accepts without overflowing u32
pub(crate) fn max_millisecond_conversion(frequency: u32) -> u32 {
    ((u32::MAX as u64 * 1000) / frequency as u64) as u32
}
