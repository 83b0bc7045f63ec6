//! Timer handles and node storage types
//!
//! Timer nodes live in a fixed arena inside the service; the delta list
//! links them by slot index. A [`TimerHandle`] is the caller-side token for
//! one arena entry: created unbound, bound by a successful `start_*` call
//! and stamped with the slot generation so a recycled slot never aliases an
//! old handle.

/// Maximum number of concurrently registered timers
///
/// Nodes are arena-allocated so the service works without a heap. 32 slots
/// cost about 1 KiB of state.
pub const MAX_TIMERS: usize = 32;

/// Timer expiry callback
///
/// Called from the dispatch loop with interrupts enabled but outside the
/// critical section, with the handle of the expired timer and the context
/// word registered at start. The callback may call any service API,
/// including stopping its own timer or starting new ones.
pub type TimerCallback = fn(handle: TimerHandle, context: usize);

/// Identity of one arena entry: slot index plus its generation stamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Binding {
    pub slot: u8,
    pub generation: u16,
}

/// Caller-owned timer token
///
/// Create one with [`TimerHandle::new`], then hand it to `start_timer` or
/// one of its variants. The handle is `Copy`; the copy passed to the expiry
/// callback refers to the same timer, so a callback can stop or query
/// itself. A handle whose timer has expired or been stopped degrades to the
/// unbound state: queries report not-running and stop returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerHandle {
    pub(crate) binding: Option<Binding>,
}

impl TimerHandle {
    /// Create an unbound handle
    pub const fn new() -> Self {
        Self { binding: None }
    }

    pub(crate) const fn bound(binding: Binding) -> Self {
        Self {
            binding: Some(binding),
        }
    }
}

/// One software timer as stored in the arena
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimerNode {
    /// Ticks until expiry, relative to the previous list entry
    pub delta: u32,
    /// Next slot in the delta list, `None` at the tail
    pub next: Option<u8>,
    /// Reload value in ticks, 0 for a one-shot timer
    pub timeout_periodic: u32,
    pub callback: TimerCallback,
    pub callback_data: usize,
    /// Deadline tie-breaker, 0 is highest
    pub priority: u8,
    /// Opaque user tag matched by the first-timer query
    pub option_flags: u16,
}

impl TimerNode {
    pub(crate) const IDLE: Self = Self {
        delta: 0,
        next: None,
        timeout_periodic: 0,
        callback: idle_callback,
        callback_data: 0,
        priority: 0,
        option_flags: 0,
    };
}

fn idle_callback(_handle: TimerHandle, _context: usize) {}
