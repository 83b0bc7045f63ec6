//! Timer service
//!
//! [`SleepTimer`] multiplexes one hardware counter into any number of
//! software timers plus a 64-bit tick count. All process-wide state sits in
//! a single context guarded by critical sections; the platform ISR drives it
//! through [`SleepTimer::process_timer_irq`].
//!
//! # Components
//!
//! - [`handle`]: caller-facing timer handles and callback types
//! - [`list`]: the delta list that keeps pending timers sorted by expiry
//! - [`units`]: tick/millisecond conversion arithmetic
//!
//! # Example
//!
//! ```
//! use sleeptick::platform::mock::MockTimer;
//! use sleeptick::{SleepTimer, TimerHandle};
//!
//! fn on_expiry(_handle: TimerHandle, _context: usize) {}
//!
//! let hal = MockTimer::new();
//! let service = SleepTimer::new(&hal);
//! service.init().unwrap();
//!
//! let mut timer = TimerHandle::new();
//! service
//!     .start_timer(&mut timer, 32_768, on_expiry, 0, 0, 0)
//!     .unwrap();
//! assert!(service.is_timer_running(&timer));
//! ```

pub mod handle;
mod list;
mod units;

pub use handle::{TimerCallback, TimerHandle, MAX_TIMERS};

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use crate::error::{Error, Result};
use crate::platform::{IrqFlags, TimerEvent, TimerHal};
use crate::timer::handle::TimerNode;
use crate::timer::list::TimerList;
#[cfg(feature = "wallclock")]
use crate::wallclock::clock::WallClock;
#[cfg(feature = "wallclock")]
use crate::wallclock::{self, CalendarDate, TimeFormat, TimeZoneOffset, Timestamp};

struct Inner {
    list: TimerList,
    /// Wrap count of the hardware counter, extends ticks to 64 bits
    overflow_counter: u8,
    /// Cached bound for `ms32_to_tick`, computed at init
    max_millisecond_conversion: u32,
    initialized: bool,
    #[cfg(feature = "wallclock")]
    clock: WallClock,
}

/// The sleep timer service
///
/// One instance owns one hardware counter. Typical embedded use places the
/// service in a static and routes the counter ISR to
/// [`process_timer_irq`](Self::process_timer_irq):
///
/// ```ignore
/// static SLEEPTIMER: SleepTimer<Rtc> = SleepTimer::new(Rtc);
///
/// #[interrupt]
/// fn RTC() {
///     SLEEPTIMER.process_timer_irq(Rtc::pending_events());
/// }
/// ```
pub struct SleepTimer<H: TimerHal> {
    hal: H,
    inner: Mutex<RefCell<Inner>>,
}

impl<H: TimerHal> SleepTimer<H> {
    /// Create an uninitialized service around `hal`
    pub const fn new(hal: H) -> Self {
        Self {
            hal,
            inner: Mutex::new(RefCell::new(Inner {
                list: TimerList::new(),
                overflow_counter: 0,
                max_millisecond_conversion: 0,
                initialized: false,
                #[cfg(feature = "wallclock")]
                clock: WallClock::new(),
            })),
        }
    }

    /// Initialize the service; idempotent
    ///
    /// Brings up the counter, enables the overflow interrupt and
    /// precomputes the conversion constants.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the HAL reports a zero frequency.
    pub fn init(&self) -> Result<()> {
        critical_section::with(|cs| {
            let inner = self.inner.borrow(cs);
            let mut inner = inner.borrow_mut();
            if inner.initialized {
                return Ok(());
            }

            self.hal.init();
            let frequency = self.hal.frequency();
            if frequency == 0 {
                return Err(Error::InvalidParameter);
            }
            self.hal.enable_interrupt(TimerEvent::Overflow);

            inner.max_millisecond_conversion = units::max_millisecond_conversion(frequency);
            #[cfg(feature = "wallclock")]
            inner.clock.configure(frequency);
            inner.initialized = true;
            crate::logging::initialized(frequency);
            Ok(())
        })
    }

    /// Start a one-shot timer
    ///
    /// Binds `handle` to the new timer. `timeout` of 0 invokes the callback
    /// synchronously without registering anything.
    ///
    /// # Arguments
    ///
    /// * `timeout` - ticks until expiry
    /// * `callback` - invoked from the dispatch loop on expiry
    /// * `callback_data` - context word passed through to the callback
    /// * `priority` - deadline tie-breaker, 0 fires first
    /// * `option_flags` - opaque tag for [`get_remaining_time_of_first_timer`](Self::get_remaining_time_of_first_timer)
    ///
    /// # Errors
    ///
    /// `NotReady` if the handle's timer is still running, `Full` if all
    /// timer slots are in use.
    pub fn start_timer(
        &self,
        handle: &mut TimerHandle,
        timeout: u32,
        callback: TimerCallback,
        callback_data: usize,
        priority: u8,
        option_flags: u16,
    ) -> Result<()> {
        if self.is_timer_running(handle) {
            return Err(Error::NotReady);
        }
        self.create_timer(handle, timeout, 0, callback, callback_data, priority, option_flags)
    }

    /// Restart a one-shot timer, stopping it first if it is running
    pub fn restart_timer(
        &self,
        handle: &mut TimerHandle,
        timeout: u32,
        callback: TimerCallback,
        callback_data: usize,
        priority: u8,
        option_flags: u16,
    ) -> Result<()> {
        // A failure here only means the timer was not running.
        self.stop_timer(handle).ok();
        self.create_timer(handle, timeout, 0, callback, callback_data, priority, option_flags)
    }

    /// Start a periodic timer with period `timeout`
    ///
    /// The timer is re-armed with its period before each callback, so a
    /// callback stopping its own timer ends the cycle.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the handle's timer is still running, `Full` if all
    /// timer slots are in use.
    pub fn start_periodic_timer(
        &self,
        handle: &mut TimerHandle,
        timeout: u32,
        callback: TimerCallback,
        callback_data: usize,
        priority: u8,
        option_flags: u16,
    ) -> Result<()> {
        if self.is_timer_running(handle) {
            return Err(Error::InvalidState);
        }
        self.create_timer(handle, timeout, timeout, callback, callback_data, priority, option_flags)
    }

    /// Restart a periodic timer, stopping it first if it is running
    pub fn restart_periodic_timer(
        &self,
        handle: &mut TimerHandle,
        timeout: u32,
        callback: TimerCallback,
        callback_data: usize,
        priority: u8,
        option_flags: u16,
    ) -> Result<()> {
        self.stop_timer(handle).ok();
        self.create_timer(handle, timeout, timeout, callback, callback_data, priority, option_flags)
    }

    /// Stop a running timer
    ///
    /// Safe to call from another timer's callback or from the foreground.
    /// Stopping the head timer disarms the comparator and re-arms it for the
    /// next pending timer, if any.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the timer is not in the pending list.
    pub fn stop_timer(&self, handle: &TimerHandle) -> Result<()> {
        let Some(binding) = handle.binding else {
            return Err(Error::InvalidState);
        };
        critical_section::with(|cs| {
            let inner = self.inner.borrow(cs);
            let mut inner = inner.borrow_mut();
            if !inner.list.is_bound(binding) {
                return Err(Error::InvalidState);
            }

            inner.list.refresh_head_delta(self.hal.counter());

            let was_head = inner.list.head_slot() == Some(binding.slot);
            if was_head {
                self.hal.disable_interrupt(TimerEvent::Compare);
            }
            inner.list.unlink(binding.slot)?;
            inner.list.release(binding);

            if was_head && inner.list.head_slot().is_some() {
                self.program_comparator(&inner.list);
            }
            Ok(())
        })
    }

    /// Whether the handle's timer is in the pending list
    pub fn is_timer_running(&self, handle: &TimerHandle) -> bool {
        let Some(binding) = handle.binding else {
            return false;
        };
        critical_section::with(|cs| self.inner.borrow(cs).borrow().list.is_linked(binding))
    }

    /// Ticks left until the handle's timer expires
    ///
    /// # Errors
    ///
    /// `NotReady` if the timer is not registered.
    pub fn get_timer_time_remaining(&self, handle: &TimerHandle) -> Result<u32> {
        let Some(binding) = handle.binding else {
            return Err(Error::NotReady);
        };
        critical_section::with(|cs| {
            let inner = self.inner.borrow(cs);
            let mut inner = inner.borrow_mut();
            let now = self.hal.counter();
            inner.list.refresh_head_delta(now);
            inner.list.time_remaining(binding, now)
        })
    }

    /// Ticks left until the first timer tagged with exactly `option_flags`
    ///
    /// # Errors
    ///
    /// `Empty` if no pending timer carries the tag.
    pub fn get_remaining_time_of_first_timer(&self, option_flags: u16) -> Result<u32> {
        critical_section::with(|cs| self.inner.borrow(cs).borrow().list.first_matching(option_flags))
    }

    /// Current 32-bit tick count
    pub fn get_tick_count(&self) -> u32 {
        self.hal.counter()
    }

    /// Current 64-bit tick count
    ///
    /// Combines the overflow counter with the hardware count under a
    /// critical section so the two halves cannot tear.
    pub fn get_tick_count64(&self) -> u64 {
        critical_section::with(|cs| {
            let inner = self.inner.borrow(cs).borrow();
            ((inner.overflow_counter as u64) << 32) | self.hal.counter() as u64
        })
    }

    /// Effective tick rate in Hz
    pub fn get_timer_frequency(&self) -> u32 {
        self.hal.frequency()
    }

    /// Convert milliseconds to ticks, rounding up by one tick
    pub fn ms_to_tick(&self, time_ms: u16) -> u32 {
        units::ms_to_tick(time_ms, self.hal.frequency())
    }

    /// Convert a 32-bit millisecond value to ticks
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the result would not fit in 32 bits.
    pub fn ms32_to_tick(&self, time_ms: u32) -> Result<u32> {
        let max_ms =
            critical_section::with(|cs| self.inner.borrow(cs).borrow().max_millisecond_conversion);
        units::ms32_to_tick(time_ms, self.hal.frequency(), max_ms)
    }

    /// Convert ticks to milliseconds
    pub fn tick_to_ms(&self, tick: u32) -> u32 {
        units::tick_to_ms(tick, self.hal.frequency())
    }

    /// Convert a 64-bit tick count to milliseconds
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the intermediate product would overflow.
    pub fn tick64_to_ms(&self, tick: u64) -> Result<u64> {
        units::tick64_to_ms(tick, self.hal.frequency())
    }

    /// Busy-wait for `time_ms` milliseconds
    ///
    /// Registers a one-shot timer that clears a flag the loop polls. Must
    /// only be called from contexts where the timer interrupt can fire.
    pub fn delay_millisecond(&self, time_ms: u16) {
        let wait = AtomicBool::new(true);
        let mut delay_timer = TimerHandle::new();
        let delay = self.ms_to_tick(time_ms);
        let started = self.start_timer(
            &mut delay_timer,
            delay,
            delay_callback,
            &wait as *const AtomicBool as usize,
            0,
            0,
        );
        match started {
            Ok(()) => while wait.load(Ordering::Acquire) {},
            Err(error) => crate::logging::delay_skipped(error),
        }
    }

    /// Process pending timer interrupts
    ///
    /// The platform ISR calls this with the events it found latched. On
    /// overflow the wrap bookkeeping (and wall clock, when enabled) advances
    /// and the comparator is refreshed; on compare match expired timers are
    /// dispatched in deadline order, priority breaking ties.
    pub fn process_timer_irq(&self, flags: IrqFlags) {
        if flags.contains(IrqFlags::OVERFLOW) {
            self.process_overflow();
        }
        if flags.contains(IrqFlags::COMPARE) {
            self.process_compare();
        }
    }

    fn process_overflow(&self) {
        critical_section::with(|cs| {
            let inner = self.inner.borrow(cs);
            let mut inner = inner.borrow_mut();
            #[cfg(feature = "wallclock")]
            {
                let frequency = self.hal.frequency();
                inner.clock.on_overflow(frequency);
            }
            inner.overflow_counter = inner.overflow_counter.wrapping_add(1);

            inner.list.refresh_head_delta(self.hal.counter());
            if inner.list.head_slot().is_some() {
                self.program_comparator(&inner.list);
            }
        });
    }

    fn process_compare(&self) {
        let mut current_cnt = self.hal.counter();
        let mut delta_tot = critical_section::with(|cs| {
            current_cnt.wrapping_sub(self.inner.borrow(cs).borrow().list.last_delta_update())
        });

        // Dispatch every timer that has come due. The critical section is
        // released around the user callback; the elapsed ticks are re-read
        // afterwards because callbacks may run arbitrarily long.
        loop {
            let expired = critical_section::with(|cs| {
                let inner = self.inner.borrow(cs);
                let mut inner = inner.borrow_mut();
                inner.list.select_expired(&mut delta_tot, current_cnt)
            });
            let Some(timer) = expired else {
                break;
            };

            (timer.callback)(TimerHandle::bound(timer.binding), timer.callback_data);

            if !timer.periodic {
                critical_section::with(|cs| {
                    self.inner.borrow(cs).borrow_mut().list.release(timer.binding);
                });
            }

            let new_cnt = self.hal.counter();
            delta_tot = delta_tot.wrapping_add(new_cnt.wrapping_sub(current_cnt));
            current_cnt = new_cnt;
        }

        critical_section::with(|cs| {
            let inner = self.inner.borrow(cs);
            let mut inner = inner.borrow_mut();
            if inner.list.settle_after_dispatch(delta_tot, current_cnt) {
                self.program_comparator(&inner.list);
            } else {
                self.hal.disable_interrupt(TimerEvent::Compare);
            }
        });
    }

    fn create_timer(
        &self,
        handle: &mut TimerHandle,
        mut timeout_initial: u32,
        timeout_periodic: u32,
        callback: TimerCallback,
        callback_data: usize,
        priority: u8,
        option_flags: u16,
    ) -> Result<()> {
        if timeout_initial == 0 {
            // Immediate expiry: fire synchronously. A one-shot never enters
            // the list; a periodic timer continues with its period.
            handle.binding = None;
            callback(*handle, callback_data);
            if timeout_periodic == 0 {
                return Ok(());
            }
            timeout_initial = timeout_periodic;
        }

        critical_section::with(|cs| {
            let inner = self.inner.borrow(cs);
            let mut inner = inner.borrow_mut();
            inner.list.refresh_head_delta(self.hal.counter());

            let node = TimerNode {
                delta: 0,
                next: None,
                timeout_periodic,
                callback,
                callback_data,
                priority,
                option_flags,
            };
            let Some(binding) = inner.list.allocate(node) else {
                crate::logging::arena_exhausted(MAX_TIMERS);
                return Err(Error::Full);
            };
            inner.list.insert(binding.slot, timeout_initial);
            handle.binding = Some(binding);

            if inner.list.head_slot() == Some(binding.slot) {
                self.program_comparator(&inner.list);
            }
            Ok(())
        })
    }

    /// Arm the comparator for the head timer; must run inside a critical section
    fn program_comparator(&self, list: &TimerList) {
        if let Some(value) = list.compare_value() {
            self.hal.enable_interrupt(TimerEvent::Compare);
            self.hal.set_compare(value);
        }
    }
}

#[cfg(feature = "wallclock")]
impl<H: TimerHal> SleepTimer<H> {
    /// Current UNIX timestamp
    pub fn get_time(&self) -> Timestamp {
        let counter = self.hal.counter();
        let frequency = self.hal.frequency();
        critical_section::with(|cs| self.inner.borrow(cs).borrow().clock.now(counter, frequency))
    }

    /// Set the current UNIX timestamp
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if `time` is not a valid UNIX timestamp or the
    /// counter-elapsed seconds cannot be rebased out of it.
    pub fn set_time(&self, time: Timestamp) -> Result<()> {
        if !wallclock::is_valid_time(time, TimeFormat::Unix, 0) {
            return Err(Error::InvalidParameter);
        }
        let counter = self.hal.counter();
        let frequency = self.hal.frequency();
        critical_section::with(|cs| {
            self.inner.borrow(cs).borrow_mut().clock.set(time, counter, frequency)
        })
    }

    /// Current time zone offset in seconds
    pub fn get_tz(&self) -> TimeZoneOffset {
        critical_section::with(|cs| self.inner.borrow(cs).borrow().clock.tz())
    }

    /// Set the time zone offset in seconds
    pub fn set_tz(&self, offset: TimeZoneOffset) {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().clock.set_tz(offset));
    }

    /// Current time as a calendar date in the configured time zone
    pub fn get_datetime(&self) -> Result<CalendarDate> {
        wallclock::convert_time_to_date(self.get_time(), self.get_tz())
    }

    /// Set the current time from a calendar date
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the date is invalid or out of the UNIX range.
    pub fn set_datetime(&self, date: &CalendarDate) -> Result<()> {
        if !date.is_valid() {
            return Err(Error::InvalidParameter);
        }
        self.set_time(wallclock::convert_date_to_time(date)?)
    }
}

/// Clears the wait flag the delaying caller spins on
fn delay_callback(_handle: TimerHandle, context: usize) {
    // The flag lives on the caller's stack for the whole busy-wait.
    let wait = unsafe { &*(context as *const AtomicBool) };
    wait.store(false, Ordering::Release);
}
