//! Wall clock: timestamp keeping, calendar dates and epoch conversions
//!
//! The service keeps a UNIX seconds count that the overflow interrupt
//! advances by a precomputed (seconds, remainder) pair, so the clock stays
//! exact across counter wraps even when the frequency does not divide 2^32.
//! This module holds the epoch constants, the validity rules and the pure
//! date arithmetic; the service methods live on
//! [`SleepTimer`](crate::timer::SleepTimer).
//!
//! Three timestamp epochs are supported: UNIX (1970), NTP (1900) and the
//! Zigbee cluster format (2000). Calendar math uses proleptic Gregorian
//! rules over the representable UNIX range, 1970-01-01 through
//! 2038-01-19 03:14:07 UTC.

pub(crate) mod clock;
mod date;

pub use date::{
    build_datetime, convert_date_to_time, convert_time_to_date, is_valid_time, CalendarDate,
    Month, TimeFormat, Weekday,
};

use crate::error::{Error, Result};

/// Seconds since 1970-01-01 00:00:00 UTC
pub type Timestamp = u32;

/// Time zone offset in seconds, positive east of UTC
pub type TimeZoneOffset = i32;

pub(crate) const UNIX_EPOCH_YEAR: u32 = 1970;
pub(crate) const NTP_EPOCH_YEAR: u32 = 1900;
const ZIGBEE_EPOCH_YEAR: u32 = 2000;

/// Years between the NTP and UNIX epochs; also the date-struct year offset
pub(crate) const NTP_UNIX_YEAR_DIFF: u32 = UNIX_EPOCH_YEAR - NTP_EPOCH_YEAR;

pub(crate) const SEC_PER_DAY: u32 = 60 * 60 * 24;
pub(crate) const DAYS_PER_YEAR: u32 = 365;
pub(crate) const SEC_PER_YEAR: u32 = SEC_PER_DAY * DAYS_PER_YEAR;

/// 70 years and 17 leap days
pub const NTP_EPOCH_OFFSET_SEC: u32 = (NTP_UNIX_YEAR_DIFF * DAYS_PER_YEAR + 17) * SEC_PER_DAY;
/// 30 years and 7 leap days
pub const ZIGBEE_EPOCH_OFFSET_SEC: u32 =
    ((ZIGBEE_EPOCH_YEAR - UNIX_EPOCH_YEAR) * DAYS_PER_YEAR + 7) * SEC_PER_DAY;

/// Largest representable UNIX timestamp (signed 31-bit seconds)
pub const UNIX_TIMESTAMP_MAX: u32 = 0x7FFF_FFFF;
/// Year of `UNIX_TIMESTAMP_MAX` as a 1900-based date-struct year; the date
/// validity clamp and the timestamp range check derive from the same limit
pub(crate) const UNIX_YEAR_MAX: u16 = (2038 - NTP_EPOCH_YEAR) as u16;

/// Convert a UNIX timestamp to NTP
///
/// # Errors
///
/// `InvalidParameter` if the result cannot be represented as an NTP
/// timestamp (input later than 2036-02-07).
pub fn unix_to_ntp(time: Timestamp) -> Result<u32> {
    let ntp_time = time.wrapping_add(NTP_EPOCH_OFFSET_SEC);
    if is_valid_time(ntp_time, TimeFormat::Ntp, 0) {
        Ok(ntp_time)
    } else {
        Err(Error::InvalidParameter)
    }
}

/// Convert an NTP timestamp to UNIX
///
/// # Errors
///
/// `InvalidParameter` if the input predates the UNIX epoch or exceeds the
/// UNIX range.
pub fn ntp_to_unix(ntp_time: u32) -> Result<Timestamp> {
    let time = ntp_time.wrapping_sub(NTP_EPOCH_OFFSET_SEC);
    if is_valid_time(time, TimeFormat::Unix, 0) {
        Ok(time)
    } else {
        Err(Error::InvalidParameter)
    }
}

/// Convert a UNIX timestamp to the Zigbee cluster format
///
/// # Errors
///
/// `InvalidParameter` if the input predates the Zigbee epoch (2000-01-01).
pub fn unix_to_zigbee(time: Timestamp) -> Result<u32> {
    let zigbee_time = time.wrapping_sub(ZIGBEE_EPOCH_OFFSET_SEC);
    if is_valid_time(zigbee_time, TimeFormat::ZigbeeCluster, 0) {
        Ok(zigbee_time)
    } else {
        Err(Error::InvalidParameter)
    }
}

/// Convert a Zigbee cluster timestamp to UNIX
///
/// # Errors
///
/// `InvalidParameter` if the result exceeds the UNIX range.
pub fn zigbee_to_unix(zigbee_time: u32) -> Result<Timestamp> {
    let time = zigbee_time.wrapping_add(ZIGBEE_EPOCH_OFFSET_SEC);
    if is_valid_time(time, TimeFormat::Unix, 0) {
        Ok(time)
    } else {
        Err(Error::InvalidParameter)
    }
}
