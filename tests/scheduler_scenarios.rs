//! End-to-end scheduler scenarios driven through the simulated counter
//!
//! Each test owns a fresh service and moves time forward with the mock,
//! feeding fired events back into `process_timer_irq` like a hardware ISR.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use sleeptick::platform::mock::MockTimer;
use sleeptick::{Error, SleepTimer, TimerHandle};

type Service<'a> = SleepTimer<&'a MockTimer>;

fn service(hal: &MockTimer) -> Service<'_> {
    let service = SleepTimer::new(hal);
    service.init().unwrap();
    service
}

/// Step simulated time, dispatching events as they fire
fn run(service: &Service<'_>, hal: &MockTimer, mut ticks: u64) {
    while ticks > 0 {
        let (stepped, fired) = hal.advance(ticks);
        if !fired.is_empty() {
            service.process_timer_irq(fired);
        }
        ticks -= stepped;
    }
}

fn count_up(_handle: TimerHandle, context: usize) {
    let counter = unsafe { &*(context as *const AtomicU32) };
    counter.fetch_add(1, Ordering::SeqCst);
}

fn noop(_handle: TimerHandle, _context: usize) {}

type FireLog = RefCell<Vec<u8>>;

fn log_of<'a>(context: usize) -> &'a FireLog {
    unsafe { &*(context as *const FireLog) }
}

fn fire_a(_handle: TimerHandle, context: usize) {
    log_of(context).borrow_mut().push(b'a');
}

fn fire_b(_handle: TimerHandle, context: usize) {
    log_of(context).borrow_mut().push(b'b');
}

fn fire_c(_handle: TimerHandle, context: usize) {
    log_of(context).borrow_mut().push(b'c');
}

/// One-shot at exactly one second of 32.768 kHz ticks: nothing at tick
/// 32767, exactly one callback at tick 32768.
#[test]
fn one_shot_fires_on_the_exact_tick() {
    let hal = MockTimer::new();
    let service = service(&hal);

    let fired = AtomicU32::new(0);
    let mut timer = TimerHandle::new();
    service
        .start_timer(&mut timer, 32_768, count_up, &fired as *const _ as usize, 0, 0)
        .unwrap();

    run(&service, &hal, 32_767);
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    run(&service, &hal, 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // No further fires, ever.
    run(&service, &hal, 1 << 20);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// Three timers sharing one deadline fire in priority order, not insertion
/// order: A(prio 5), B(prio 2), C(prio 3) inserted in that order fire B, C, A.
#[test]
fn equal_deadline_fires_in_priority_order() {
    let hal = MockTimer::new();
    let service = service(&hal);

    let log: FireLog = RefCell::new(Vec::new());
    let context = &log as *const _ as usize;

    let mut a = TimerHandle::new();
    let mut b = TimerHandle::new();
    let mut c = TimerHandle::new();
    service.start_timer(&mut a, 10, fire_a, context, 5, 0).unwrap();
    service.start_timer(&mut b, 10, fire_b, context, 2, 0).unwrap();
    service.start_timer(&mut c, 10, fire_c, context, 3, 0).unwrap();

    run(&service, &hal, 10);
    assert_eq!(log.borrow().as_slice(), b"bca");
}

/// Equal deadline and equal priority falls back to insertion order.
#[test]
fn equal_priority_fires_in_insertion_order() {
    let hal = MockTimer::new();
    let service = service(&hal);

    let log: FireLog = RefCell::new(Vec::new());
    let context = &log as *const _ as usize;

    let mut a = TimerHandle::new();
    let mut b = TimerHandle::new();
    service.start_timer(&mut a, 10, fire_a, context, 4, 0).unwrap();
    service.start_timer(&mut b, 10, fire_b, context, 4, 0).unwrap();

    run(&service, &hal, 10);
    assert_eq!(log.borrow().as_slice(), b"ab");
}

/// Periodic timer with period 100: exactly 3 fires by tick 350, the fourth
/// lands on tick 400.
#[test]
fn periodic_timer_fires_at_every_multiple() {
    let hal = MockTimer::new();
    let service = service(&hal);

    let fired = AtomicU32::new(0);
    let mut timer = TimerHandle::new();
    service
        .start_periodic_timer(&mut timer, 100, count_up, &fired as *const _ as usize, 0, 0)
        .unwrap();

    run(&service, &hal, 350);
    assert_eq!(fired.load(Ordering::SeqCst), 3);

    run(&service, &hal, 49);
    assert_eq!(fired.load(Ordering::SeqCst), 3);
    run(&service, &hal, 1);
    assert_eq!(fired.load(Ordering::SeqCst), 4);
    assert!(service.is_timer_running(&timer));
}

/// A periodic timer keeps its cadence across a counter wrap.
#[test]
fn periodic_timer_survives_counter_overflow() {
    let hal = MockTimer::new();
    let service = service(&hal);

    run(&service, &hal, (1u64 << 32) - 150);

    let fired = AtomicU32::new(0);
    let mut timer = TimerHandle::new();
    service
        .start_periodic_timer(&mut timer, 100, count_up, &fired as *const _ as usize, 0, 0)
        .unwrap();

    // Fires 50 ticks before the wrap, 50 past it and once more after.
    run(&service, &hal, 300);
    assert_eq!(fired.load(Ordering::SeqCst), 3);
}

/// Stopping a periodic timer from its own callback ends the cycle even
/// though the reload happens before the callback runs.
#[test]
fn periodic_timer_can_stop_itself() {
    static SERVICE_FIRES: AtomicU32 = AtomicU32::new(0);

    fn stop_self(handle: TimerHandle, context: usize) {
        SERVICE_FIRES.fetch_add(1, Ordering::SeqCst);
        let service = unsafe { &*(context as *const Service<'static>) };
        service.stop_timer(&handle).unwrap();
    }

    SERVICE_FIRES.store(0, Ordering::SeqCst);
    let hal: &'static MockTimer = Box::leak(Box::new(MockTimer::new()));
    let service: &'static Service<'static> = Box::leak(Box::new(service(hal)));

    let mut timer = TimerHandle::new();
    service
        .start_periodic_timer(
            &mut timer,
            100,
            stop_self,
            service as *const Service<'static> as usize,
            0,
            0,
        )
        .unwrap();

    run(service, hal, 1000);
    assert_eq!(SERVICE_FIRES.load(Ordering::SeqCst), 1);
    assert!(!service.is_timer_running(&timer));
}

/// A callback may start a new timer; it fires relative to the dispatch.
#[test]
fn callback_can_start_another_timer() {
    static CHAIN_FIRES: AtomicU32 = AtomicU32::new(0);

    fn chain(_handle: TimerHandle, context: usize) {
        CHAIN_FIRES.fetch_add(1, Ordering::SeqCst);
        if CHAIN_FIRES.load(Ordering::SeqCst) < 3 {
            let service = unsafe { &*(context as *const Service<'static>) };
            let mut next = TimerHandle::new();
            service
                .start_timer(&mut next, 50, chain, context, 0, 0)
                .unwrap();
        }
    }

    CHAIN_FIRES.store(0, Ordering::SeqCst);
    let hal: &'static MockTimer = Box::leak(Box::new(MockTimer::new()));
    let service: &'static Service<'static> = Box::leak(Box::new(service(hal)));

    let mut first = TimerHandle::new();
    service
        .start_timer(
            &mut first,
            50,
            chain,
            service as *const Service<'static> as usize,
            0,
            0,
        )
        .unwrap();

    run(service, hal, 150);
    assert_eq!(CHAIN_FIRES.load(Ordering::SeqCst), 3);
}

/// Stopping one pending timer leaves the others on their deadlines.
#[test]
fn stop_leaves_other_deadlines_intact() {
    let hal = MockTimer::new();
    let service = service(&hal);

    let fired = AtomicU32::new(0);
    let mut keep = TimerHandle::new();
    let mut doomed = TimerHandle::new();
    service
        .start_timer(&mut keep, 300, count_up, &fired as *const _ as usize, 0, 0)
        .unwrap();
    service.start_timer(&mut doomed, 100, noop, 0, 0, 0).unwrap();

    run(&service, &hal, 50);
    service.stop_timer(&doomed).unwrap();
    assert_eq!(service.get_timer_time_remaining(&keep).unwrap(), 250);

    run(&service, &hal, 250);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// The 64-bit tick count never decreases while overflows are processed.
#[test]
fn tick_count64_is_monotone_across_overflows() {
    let hal = MockTimer::new();
    let service = service(&hal);

    let mut last = service.get_tick_count64();
    for _ in 0..64 {
        run(&service, &hal, (1u64 << 26) + 12_345);
        let now = service.get_tick_count64();
        assert!(now > last);
        last = now;
    }
    assert!(last > 1u64 << 32);
}

/// Wall clock at 32.768 kHz: one full counter period is exactly 131072
/// seconds.
#[test]
#[cfg(feature = "wallclock")]
fn wall_clock_advances_exactly_one_period_per_wrap() {
    let hal = MockTimer::new();
    let service = service(&hal);

    service.set_time(1_600_000_000).unwrap();
    run(&service, &hal, 1u64 << 32);
    assert_eq!(service.get_time(), 1_600_131_072);
}

/// Wall clock time zone feeds the date conversion.
#[test]
#[cfg(feature = "wallclock")]
fn wall_clock_datetime_round_trip() {
    use sleeptick::{Month, Weekday};

    let hal = MockTimer::new();
    let service = service(&hal);

    let date = sleeptick::wallclock::build_datetime(2021, Month::June, 15, 12, 0, 0, 0).unwrap();
    service.set_datetime(&date).unwrap();

    let read_back = service.get_datetime().unwrap();
    assert_eq!(read_back.year, 121);
    assert_eq!(read_back.month, Month::June);
    assert_eq!(read_back.month_day, 15);
    assert_eq!(read_back.hour, 12);
    assert_eq!(read_back.day_of_week, Weekday::Tuesday);

    // A second of ticks moves the clock by one second.
    run(&service, &hal, 32_768);
    assert_eq!(service.get_datetime().unwrap().sec, 1);
}

/// Start, stop and query errors surface per the API contract.
#[test]
fn error_paths_match_contract() {
    let hal = MockTimer::new();
    let service = service(&hal);

    let mut timer = TimerHandle::new();
    assert_eq!(service.stop_timer(&timer), Err(Error::InvalidState));
    assert_eq!(service.get_timer_time_remaining(&timer), Err(Error::NotReady));
    assert_eq!(
        service.get_remaining_time_of_first_timer(0),
        Err(Error::Empty)
    );

    service.start_timer(&mut timer, 100, noop, 0, 0, 0).unwrap();
    assert_eq!(
        service.start_timer(&mut timer, 100, noop, 0, 0, 0),
        Err(Error::NotReady)
    );

    run(&service, &hal, 100);
    assert_eq!(service.stop_timer(&timer), Err(Error::InvalidState));
    assert_eq!(service.get_timer_time_remaining(&timer), Err(Error::NotReady));
}
