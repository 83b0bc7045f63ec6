#![cfg_attr(not(test), no_std)]

//! sleeptick - sleep timer service for a single compare/overflow counter
//!
//! This library multiplexes one free-running hardware counter into an
//! arbitrary set of software timers (one-shot and periodic), a 64-bit
//! monotonic tick count and, behind the `wallclock` feature, a seconds-based
//! wall clock with calendar date support.
//!
//! The hardware side is abstracted by the [`platform::TimerHal`] trait:
//! counter read, frequency read, compare programming and the two interrupt
//! enable knobs. The platform ISR forwards pending events to
//! [`timer::SleepTimer::process_timer_irq`]; everything else is handled here.
//!
//! # Modules
//!
//! - [`platform`]: hardware abstraction (trait + mock counter for host tests)
//! - [`timer`]: the timer service, delta list and tick conversions
//! - [`wallclock`]: timestamp keeping, calendar dates, epoch conversions

pub mod error;
pub(crate) mod logging;
pub mod platform;
pub mod timer;
#[cfg(feature = "wallclock")]
pub mod wallclock;

pub use error::{Error, Result};
pub use platform::{IrqFlags, TimerEvent, TimerHal};
pub use timer::{SleepTimer, TimerCallback, TimerHandle, MAX_TIMERS};
#[cfg(feature = "wallclock")]
pub use wallclock::{CalendarDate, Month, TimeFormat, TimeZoneOffset, Timestamp, Weekday};
