//! Service event diagnostics
//!
//! The timer service reports a small set of noteworthy events: bring-up,
//! arena exhaustion and a delay that could not register its timer. The
//! `defmt` feature routes them to the defmt transport on embedded targets,
//! host test builds print them, and every other build compiles them out.

use crate::error::Error;

/// Service brought up, with the tick rate it will run at
pub(crate) fn initialized(frequency: u32) {
    #[cfg(feature = "defmt")]
    defmt::info!("sleep timer initialized at {} Hz", frequency);

    #[cfg(all(not(feature = "defmt"), test))]
    println!("[sleeptick] initialized at {} Hz", frequency);

    #[cfg(all(not(feature = "defmt"), not(test)))]
    let _ = frequency;
}

/// Timer start failed because every arena slot is already claimed
pub(crate) fn arena_exhausted(capacity: usize) {
    #[cfg(feature = "defmt")]
    defmt::warn!("timer arena exhausted, all {} slots in use", capacity);

    #[cfg(all(not(feature = "defmt"), test))]
    println!("[sleeptick] timer arena exhausted, all {} slots in use", capacity);

    #[cfg(all(not(feature = "defmt"), not(test)))]
    let _ = capacity;
}

/// A blocking delay could not start its one-shot timer; the wait was skipped
pub(crate) fn delay_skipped(error: Error) {
    #[cfg(feature = "defmt")]
    defmt::warn!("delay skipped: {}", error);

    #[cfg(all(not(feature = "defmt"), test))]
    eprintln!("[sleeptick] delay skipped: {}", error);

    #[cfg(all(not(feature = "defmt"), not(test)))]
    let _ = error;
}
