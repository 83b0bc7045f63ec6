//! Hardware timer interface
//!
//! This module defines the counter interface that platform implementations
//! must provide: one free-running 32-bit counter, one compare register and
//! two interrupt sources.

use bitflags::bitflags;

/// Interrupt source of the hardware counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Counter wrapped from `u32::MAX` to 0
    Overflow,
    /// Counter reached the compare register value
    Compare,
}

bitflags! {
    /// Pending interrupt events, as reported by the platform ISR
    ///
    /// The platform interrupt handler collects the pending event bits and
    /// forwards them to [`SleepTimer::process_timer_irq`].
    ///
    /// [`SleepTimer::process_timer_irq`]: crate::timer::SleepTimer::process_timer_irq
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags: u8 {
        /// Counter overflow is pending
        const OVERFLOW = 1 << 0;
        /// Compare match is pending
        const COMPARE = 1 << 1;
    }
}

/// Hardware timer interface
///
/// Platform implementations provide access to the free-running counter that
/// backs the sleep timer service.
///
/// # Contract
///
/// - The counter is 32 bits wide, monotonic modulo 2^32 and never stops.
/// - `init` is idempotent and leaves the counter free-running from 0.
/// - The compare interrupt fires when the counter reaches the programmed
///   compare value; the overflow interrupt fires on every wrap to 0.
/// - The platform ISR calls back into the service with the pending
///   [`IrqFlags`]; it never touches service state directly.
pub trait TimerHal {
    /// Initialize the counter peripheral
    fn init(&self);

    /// Current value of the counter
    fn counter(&self) -> u32;

    /// Effective tick rate in Hz
    fn frequency(&self) -> u32;

    /// Program the next compare-match target (mod 2^32)
    fn set_compare(&self, value: u32);

    /// Enable one interrupt source
    fn enable_interrupt(&self, event: TimerEvent);

    /// Disable one interrupt source
    fn disable_interrupt(&self, event: TimerEvent);
}

impl<T: TimerHal> TimerHal for &T {
    fn init(&self) {
        (*self).init()
    }

    fn counter(&self) -> u32 {
        (*self).counter()
    }

    fn frequency(&self) -> u32 {
        (*self).frequency()
    }

    fn set_compare(&self, value: u32) {
        (*self).set_compare(value)
    }

    fn enable_interrupt(&self, event: TimerEvent) {
        (*self).enable_interrupt(event)
    }

    fn disable_interrupt(&self, event: TimerEvent) {
        (*self).disable_interrupt(event)
    }
}
