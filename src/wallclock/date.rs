//! Calendar dates and timestamp validity
//!
//! Conversions between UNIX timestamps and broken-down dates over the
//! proleptic Gregorian calendar, confined to the representable UNIX range.
//! Year counting works off the 1970 epoch; since every fourth year from
//! 1972 through 2036 is a leap year, leap days reduce to the closed form
//! `(y - 3) / 4 + 1` for the years since 1970.

use core::fmt;

use crate::error::{Error, Result};
use crate::wallclock::{
    TimeZoneOffset, Timestamp, DAYS_PER_YEAR, NTP_EPOCH_YEAR, NTP_UNIX_YEAR_DIFF, SEC_PER_DAY,
    SEC_PER_YEAR, NTP_EPOCH_OFFSET_SEC, UNIX_TIMESTAMP_MAX, UNIX_YEAR_MAX, ZIGBEE_EPOCH_OFFSET_SEC,
};

/// Timestamp epoch formats accepted by [`is_valid_time`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// Seconds since 1970-01-01; signed, so representable on 31 bits
    Unix,
    /// Seconds since 1900-01-01; unsigned 32 bits
    Ntp,
    /// Seconds since 2000-01-01; unsigned 32 bits
    ZigbeeCluster,
}

/// Month of the year, zero-based like the underlying date arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Month {
    January = 0,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

/// Day of the week, Sunday-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Weekday {
    Sunday = 0,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sunday,
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
];

const MONTH_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const WEEKDAY_ABBREV: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Days per month, by leap flag
const DAYS_IN_MONTH: [[u8; 12]; 2] = [
    // Jan  Feb  Mar  Apr  May  Jun  Jul  Aug  Sep  Oct  Nov  Dec
    [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
    [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
];

impl Month {
    /// Three-letter English abbreviation
    pub fn abbrev(&self) -> &'static str {
        MONTH_ABBREV[*self as usize]
    }
}

impl Weekday {
    /// Three-letter English abbreviation
    pub fn abbrev(&self) -> &'static str {
        WEEKDAY_ABBREV[*self as usize]
    }
}

/// Broken-down date and time
///
/// The `year` field is stored as an offset from 1900; valid dates span
/// 1970-01-01 through 2038-01-19 03:14:07.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    /// Years since 1900
    pub year: u16,
    pub month: Month,
    /// Day of the month, 1-based
    pub month_day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
    pub day_of_week: Weekday,
    /// Day of the year, 1-based
    pub day_of_year: u16,
    pub time_zone: TimeZoneOffset,
}

impl CalendarDate {
    /// Check every field against its domain
    ///
    /// Day-of-month is validated against the leap-aware month length, and
    /// dates in the final UNIX year are clamped field by field to the
    /// 2038-01-19 03:14:07 terminal instant.
    pub fn is_valid(&self) -> bool {
        if self.year < NTP_UNIX_YEAR_DIFF as u16 || self.year > UNIX_YEAR_MAX {
            return false;
        }
        let table = &DAYS_IN_MONTH[is_leap_year(self.year) as usize];
        if self.month_day == 0 || self.month_day > table[self.month as usize] {
            return false;
        }
        if self.hour > 23 || self.min > 59 || self.sec > 59 {
            return false;
        }
        if self.year == UNIX_YEAR_MAX {
            if self.month > Month::January {
                return false;
            } else if self.month_day > 19 {
                return false;
            } else if self.hour > 3 {
                return false;
            } else if self.min > 14 {
                return false;
            } else if self.sec > 7 {
                return false;
            }
        }
        true
    }

    /// Render with a strftime-style format string
    ///
    /// Supported specifiers: `%Y` `%m` `%d` `%H` `%M` `%S` `%a` `%b` `%j`
    /// and `%%`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` on an invalid date, an unknown specifier or a
    /// write error (e.g. a full heapless string).
    pub fn format_into<W: fmt::Write>(&self, format: &str, out: &mut W) -> Result<()> {
        if !self.is_valid() {
            return Err(Error::InvalidParameter);
        }
        let mut chars = format.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.write_char(c).map_err(|_| Error::InvalidParameter)?;
                continue;
            }
            let result = match chars.next() {
                Some('Y') => write!(out, "{}", self.year as u32 + NTP_EPOCH_YEAR),
                Some('m') => write!(out, "{:02}", self.month as u8 + 1),
                Some('d') => write!(out, "{:02}", self.month_day),
                Some('H') => write!(out, "{:02}", self.hour),
                Some('M') => write!(out, "{:02}", self.min),
                Some('S') => write!(out, "{:02}", self.sec),
                Some('a') => out.write_str(self.day_of_week.abbrev()),
                Some('b') => out.write_str(self.month.abbrev()),
                Some('j') => write!(out, "{:03}", self.day_of_year),
                Some('%') => out.write_char('%'),
                _ => return Err(Error::InvalidParameter),
            };
            result.map_err(|_| Error::InvalidParameter)?;
        }
        Ok(())
    }

    /// Render into a fixed-capacity string with the given format
    pub fn format<const N: usize>(&self, format: &str) -> Result<heapless::String<N>> {
        let mut out = heapless::String::new();
        self.format_into(format, &mut out)?;
        Ok(out)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year as u32 + NTP_EPOCH_YEAR,
            self.month as u8 + 1,
            self.month_day,
            self.hour,
            self.min,
            self.sec
        )
    }
}

/// Check a timestamp against its format range and the time zone shift
///
/// Rejects values whose zone-shifted image would wrap, UNIX values past the
/// 31-bit range, NTP values that would underflow the UNIX conversion and
/// Zigbee values whose UNIX image would overflow.
pub fn is_valid_time(time: Timestamp, format: TimeFormat, time_zone: TimeZoneOffset) -> bool {
    let zone_ok = if time_zone < 0 {
        time > time_zone.unsigned_abs()
    } else {
        time <= u32::MAX - time_zone as u32
    };
    let format_ok = match format {
        TimeFormat::Unix => time <= UNIX_TIMESTAMP_MAX,
        TimeFormat::Ntp => time >= NTP_EPOCH_OFFSET_SEC,
        TimeFormat::ZigbeeCluster => time <= UNIX_TIMESTAMP_MAX - ZIGBEE_EPOCH_OFFSET_SEC,
    };
    zone_ok && format_ok
}

/// Build a date from its components, filling in day-of-week and day-of-year
///
/// Years below 1900 are taken as already offset from the NTP epoch, so both
/// `2020` and `120` denote the same year.
///
/// # Errors
///
/// `InvalidParameter` if the components do not form a date in the UNIX range.
pub fn build_datetime(
    year: u16,
    month: Month,
    month_day: u8,
    hour: u8,
    min: u8,
    sec: u8,
    tz_offset: TimeZoneOffset,
) -> Result<CalendarDate> {
    let year = if year < NTP_EPOCH_YEAR as u16 {
        year
    } else {
        year - NTP_EPOCH_YEAR as u16
    };
    let mut date = CalendarDate {
        year,
        month,
        month_day,
        hour,
        min,
        sec,
        day_of_week: Weekday::Sunday,
        day_of_year: 0,
        time_zone: tz_offset,
    };
    if !date.is_valid() {
        return Err(Error::InvalidParameter);
    }

    date.day_of_year = day_of_year(month, month_day, is_leap_year(year));
    let years_since_epoch = year as u32 - NTP_UNIX_YEAR_DIFF;
    let days_since_epoch = years_since_epoch * DAYS_PER_YEAR
        + leap_days_before(years_since_epoch)
        + date.day_of_year as u32
        - 1;
    date.day_of_week = day_of_week(days_since_epoch);
    Ok(date)
}

/// Decompose a timestamp into a calendar date
///
/// The time zone is recorded in the produced date; it is not applied to the
/// timestamp, so recomposition with [`convert_date_to_time`] (which adds the
/// offset back) round-trips at offset zero.
///
/// # Errors
///
/// `InvalidParameter` if `time` fails [`is_valid_time`] for the UNIX format.
pub fn convert_time_to_date(time: Timestamp, time_zone: TimeZoneOffset) -> Result<CalendarDate> {
    if !is_valid_time(time, TimeFormat::Unix, time_zone) {
        return Err(Error::InvalidParameter);
    }

    let mut t = time;
    let sec = (t % 60) as u8;
    t /= 60;
    let min = (t % 60) as u8;
    t /= 60;
    let hour = (t % 24) as u8;
    t /= 24; // t is now whole days since 1970-01-01

    let day_of_week = day_of_week(t);

    // First approximation ignores leap days, then one correction pass
    // converges within the supported range.
    let mut full_year = t / DAYS_PER_YEAR;
    let mut leap_days = 0;
    if full_year > 2 {
        leap_days = leap_days_before(full_year);
        full_year = (t - leap_days) / DAYS_PER_YEAR;
        leap_days = leap_days_before(full_year);
    }
    let year = (NTP_UNIX_YEAR_DIFF + full_year) as u16;
    let leap = is_leap_year(year);

    let mut days = t - leap_days - DAYS_PER_YEAR * full_year;
    let day_of_year = (days + 1) as u16;

    let table = &DAYS_IN_MONTH[leap as usize];
    let mut month = 0usize;
    while days >= table[month] as u32 {
        days -= table[month] as u32;
        month += 1;
    }

    Ok(CalendarDate {
        year,
        month: MONTHS[month],
        month_day: (days + 1) as u8,
        hour,
        min,
        sec,
        day_of_week,
        day_of_year,
        time_zone,
    })
}

/// Recompose a calendar date into a UNIX timestamp
///
/// The date's time zone offset is added to the result.
///
/// # Errors
///
/// `InvalidParameter` if the date fails [`CalendarDate::is_valid`].
pub fn convert_date_to_time(date: &CalendarDate) -> Result<Timestamp> {
    if !date.is_valid() {
        return Err(Error::InvalidParameter);
    }

    let full_year = date.year as u32 - NTP_UNIX_YEAR_DIFF;
    let mut time = full_year * SEC_PER_YEAR;

    let mut month_days = leap_days_before(full_year);
    let table = &DAYS_IN_MONTH[is_leap_year(date.year) as usize];
    for m in 0..date.month as usize {
        month_days += table[m] as u32;
    }
    month_days += date.month_day as u32 - 1;
    time += month_days * SEC_PER_DAY;
    time += 3600 * date.hour as u32 + 60 * date.min as u32 + date.sec as u32;
    Ok(time.wrapping_add(date.time_zone as u32))
}

/// Leap year test for a 1900-based year
fn is_leap_year(year: u16) -> bool {
    let year = year as u32 + NTP_EPOCH_YEAR;
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Leap days among the `years` whole years following 1970
///
/// 1972 is the first; the simple /4 rule holds through 2038 because 2000
/// keeps its leap day.
fn leap_days_before(years: u32) -> u32 {
    if years > 2 {
        (years - 3) / 4 + 1
    } else {
        0
    }
}

/// Day of the week from whole days since 1970-01-01, a Thursday
fn day_of_week(days: u32) -> Weekday {
    WEEKDAYS[((days + 4) % 7) as usize]
}

/// Day of the year, 1-based, from sanitized inputs
fn day_of_year(month: Month, month_day: u8, leap: bool) -> u16 {
    let table = &DAYS_IN_MONTH[leap as usize];
    let mut days = 0u16;
    for m in 0..month as usize {
        days += table[m] as u16;
    }
    days + month_day as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_decomposes_to_known_date() {
        let date = convert_time_to_date(0, 0).unwrap();
        assert_eq!(date.year, 70);
        assert_eq!(date.month, Month::January);
        assert_eq!(date.month_day, 1);
        assert_eq!(date.hour, 0);
        assert_eq!(date.min, 0);
        assert_eq!(date.sec, 0);
        assert_eq!(date.day_of_week, Weekday::Thursday);
        assert_eq!(date.day_of_year, 1);
    }

    #[test]
    fn test_known_timestamp_decomposition() {
        // 2020-02-29 12:34:56 UTC, a Saturday.
        let date = convert_time_to_date(1_582_979_696, 0).unwrap();
        assert_eq!(date.year, 120);
        assert_eq!(date.month, Month::February);
        assert_eq!(date.month_day, 29);
        assert_eq!(date.hour, 12);
        assert_eq!(date.min, 34);
        assert_eq!(date.sec, 56);
        assert_eq!(date.day_of_week, Weekday::Saturday);
        assert_eq!(date.day_of_year, 60);
    }

    #[test]
    fn test_round_trip_across_boundaries() {
        // Year boundaries, leap days, the 2000 century leap year and both
        // ends of the range.
        let samples = [
            0u32,
            86_399,
            86_400,
            94_694_399,  // 1972-12-31 23:59:59
            94_694_400,  // 1973-01-01 00:00:00
            951_782_400, // 2000-02-29 00:00:00
            951_868_799, // 2000-02-29 23:59:59
            946_684_800, // 2000-01-01
            1_582_979_696,
            UNIX_TIMESTAMP_MAX,
        ];
        for &time in &samples {
            let date = convert_time_to_date(time, 0).unwrap();
            assert_eq!(convert_date_to_time(&date).unwrap(), time, "t={}", time);
        }
    }

    #[test]
    fn test_round_trip_swept_range() {
        // Sweep with a step that slides through days and seconds alike.
        let mut time = 0u64;
        while time <= UNIX_TIMESTAMP_MAX as u64 {
            let t = time as u32;
            let date = convert_time_to_date(t, 0).unwrap();
            assert_eq!(convert_date_to_time(&date).unwrap(), t, "t={}", t);
            time += 2_000_003; // prime step, ~23 days
        }
    }

    #[test]
    fn test_century_leap_year_2000() {
        let date = convert_time_to_date(951_782_400, 0).unwrap();
        assert_eq!(date.year, 100);
        assert_eq!(date.month, Month::February);
        assert_eq!(date.month_day, 29);
    }

    #[test]
    fn test_build_datetime_leap_day() {
        let date = build_datetime(2020, Month::February, 29, 0, 0, 0, 0).unwrap();
        assert_eq!(date.year, 120);
        assert_eq!(date.day_of_year, 60);
        assert_eq!(date.day_of_week, Weekday::Saturday);

        assert_eq!(
            build_datetime(2021, Month::February, 29, 0, 0, 0, 0),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn test_build_datetime_accepts_offset_years() {
        let absolute = build_datetime(1970, Month::January, 1, 0, 0, 0, 0).unwrap();
        let offset = build_datetime(70, Month::January, 1, 0, 0, 0, 0).unwrap();
        assert_eq!(absolute, offset);
        assert_eq!(absolute.day_of_week, Weekday::Thursday);
    }

    #[test]
    fn test_build_datetime_rejects_pre_epoch_years() {
        assert_eq!(
            build_datetime(1969, Month::December, 31, 23, 59, 59, 0),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn test_terminal_unix_date_clamp() {
        assert!(build_datetime(2038, Month::January, 19, 3, 14, 7, 0).is_ok());
        assert_eq!(
            build_datetime(2038, Month::January, 19, 3, 14, 8, 0),
            Err(Error::InvalidParameter)
        );
        assert_eq!(
            build_datetime(2038, Month::January, 20, 0, 0, 0, 0),
            Err(Error::InvalidParameter)
        );
        assert_eq!(
            build_datetime(2038, Month::February, 1, 0, 0, 0, 0),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn test_terminal_timestamp_matches_terminal_date() {
        let date = convert_time_to_date(UNIX_TIMESTAMP_MAX, 0).unwrap();
        assert_eq!(date.year, UNIX_YEAR_MAX);
        assert_eq!(date.month, Month::January);
        assert_eq!(date.month_day, 19);
        assert_eq!(date.hour, 3);
        assert_eq!(date.min, 14);
        assert_eq!(date.sec, 7);
        assert!(date.is_valid());
    }

    #[test]
    fn test_is_valid_time_zone_shifts() {
        assert!(!is_valid_time(100, TimeFormat::Unix, -100));
        assert!(is_valid_time(101, TimeFormat::Unix, -100));
        assert!(!is_valid_time(u32::MAX - 10, TimeFormat::Ntp, 11));
        assert!(is_valid_time(u32::MAX - 10, TimeFormat::Ntp, 10));
    }

    #[test]
    fn test_is_valid_time_unix_range() {
        assert!(is_valid_time(UNIX_TIMESTAMP_MAX, TimeFormat::Unix, 0));
        assert!(!is_valid_time(UNIX_TIMESTAMP_MAX + 1, TimeFormat::Unix, 0));
    }

    #[test]
    fn test_time_zone_recorded_not_applied() {
        let date = convert_time_to_date(3600, -3600).unwrap();
        assert_eq!(date.hour, 1);
        assert_eq!(date.time_zone, -3600);
        // Recomposition adds the offset back in.
        assert_eq!(convert_date_to_time(&date).unwrap(), 0);
    }

    #[test]
    fn test_format_default_and_specifiers() {
        let date = convert_time_to_date(1_582_979_696, 0).unwrap();
        assert_eq!(format!("{}", date), "2020-02-29 12:34:56");

        let formatted: heapless::String<40> =
            date.format("%a %b %d %j of %Y at %H:%M:%S").unwrap();
        assert_eq!(formatted.as_str(), "Sat Feb 29 060 of 2020 at 12:34:56");

        let escaped: heapless::String<8> = date.format("%%%d").unwrap();
        assert_eq!(escaped.as_str(), "%29");
    }

    #[test]
    fn test_format_rejects_unknown_specifier() {
        let date = convert_time_to_date(0, 0).unwrap();
        let result: Result<heapless::String<16>> = date.format("%q");
        assert_eq!(result, Err(Error::InvalidParameter));
    }

    #[test]
    fn test_format_rejects_overflowing_buffer() {
        let date = convert_time_to_date(0, 0).unwrap();
        let result: Result<heapless::String<4>> = date.format("%Y-%m-%d");
        assert_eq!(result, Err(Error::InvalidParameter));
    }
}
