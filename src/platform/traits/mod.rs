//! Platform trait definitions

mod timer;

pub use timer::{IrqFlags, TimerEvent, TimerHal};
