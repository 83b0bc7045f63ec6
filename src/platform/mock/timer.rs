//! Mock counter implementation for testing
//!
//! `MockTimer` emulates the free-running 32-bit counter with its compare and
//! overflow interrupt sources. Tests move simulated time forward with
//! [`MockTimer::advance`] and feed the returned events into
//! `SleepTimer::process_timer_irq`, mirroring what a hardware ISR would do.

use core::cell::Cell;

use crate::platform::traits::{IrqFlags, TimerEvent, TimerHal};

/// Default simulated tick rate, the usual 32.768 kHz low-frequency crystal
pub const DEFAULT_FREQUENCY: u32 = 32_768;

const COUNTER_PERIOD: u64 = 1 << 32;

/// Simulated free-running counter
///
/// The counter only moves when a test calls [`MockTimer::advance`], so tests
/// fully control the interleaving of counter movement and IRQ processing.
#[derive(Debug)]
pub struct MockTimer {
    counter: Cell<u32>,
    compare: Cell<u32>,
    frequency: u32,
    overflow_enabled: Cell<bool>,
    compare_enabled: Cell<bool>,
    initialized: Cell<bool>,
}

impl MockTimer {
    /// Create a mock counter running at [`DEFAULT_FREQUENCY`]
    pub fn new() -> Self {
        Self::with_frequency(DEFAULT_FREQUENCY)
    }

    /// Create a mock counter with a specific tick rate
    pub fn with_frequency(frequency: u32) -> Self {
        Self {
            counter: Cell::new(0),
            compare: Cell::new(0),
            frequency,
            overflow_enabled: Cell::new(false),
            compare_enabled: Cell::new(false),
            initialized: Cell::new(false),
        }
    }

    /// Advance simulated time by up to `ticks` ticks
    ///
    /// The counter stops at the first enabled interrupt edge (compare match
    /// or wrap to zero) so the caller can process the event before time moves
    /// on, exactly like hardware would interrupt a running CPU.
    ///
    /// # Returns
    ///
    /// The number of ticks actually stepped and the events that fired at the
    /// new counter value.
    pub fn advance(&self, ticks: u64) -> (u64, IrqFlags) {
        if ticks == 0 {
            return (0, IrqFlags::empty());
        }

        let counter = self.counter.get();
        let to_overflow = COUNTER_PERIOD - counter as u64;
        // A compare value equal to the current count matches only after a
        // full counter period, the hardware triggers on the increment.
        let to_compare = match self.compare.get().wrapping_sub(counter) {
            0 => COUNTER_PERIOD,
            d => d as u64,
        };

        let mut step = ticks;
        if self.overflow_enabled.get() {
            step = step.min(to_overflow);
        }
        if self.compare_enabled.get() {
            step = step.min(to_compare);
        }

        self.counter.set(counter.wrapping_add(step as u32));

        let mut fired = IrqFlags::empty();
        if self.overflow_enabled.get() && step == to_overflow {
            fired |= IrqFlags::OVERFLOW;
        }
        if self.compare_enabled.get() && step == to_compare {
            fired |= IrqFlags::COMPARE;
        }
        (step, fired)
    }

    /// Programmed compare value, for test assertions
    pub fn compare(&self) -> u32 {
        self.compare.get()
    }

    /// Whether an interrupt source is currently enabled, for test assertions
    pub fn interrupt_enabled(&self, event: TimerEvent) -> bool {
        match event {
            TimerEvent::Overflow => self.overflow_enabled.get(),
            TimerEvent::Compare => self.compare_enabled.get(),
        }
    }
}

impl Default for MockTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerHal for MockTimer {
    fn init(&self) {
        if !self.initialized.get() {
            self.counter.set(0);
            self.initialized.set(true);
        }
    }

    fn counter(&self) -> u32 {
        self.counter.get()
    }

    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn set_compare(&self, value: u32) {
        self.compare.set(value);
    }

    fn enable_interrupt(&self, event: TimerEvent) {
        match event {
            TimerEvent::Overflow => self.overflow_enabled.set(true),
            TimerEvent::Compare => self.compare_enabled.set(true),
        }
    }

    fn disable_interrupt(&self, event: TimerEvent) {
        match event {
            TimerEvent::Overflow => self.overflow_enabled.set(false),
            TimerEvent::Compare => self.compare_enabled.set(false),
        }
    }
}
