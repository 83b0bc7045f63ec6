//! Service error types
//!
//! All fallible operations on the timer service and the wall clock return
//! these variants.

/// Result type for sleep timer operations
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced at the service API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Domain violation: invalid date, timestamp out of range for the target
    /// format, or a millisecond value that would overflow the tick conversion
    InvalidParameter,
    /// Operation conflicts with the timer state: starting a periodic timer
    /// that is already running, or stopping a timer that is not in the list
    InvalidState,
    /// Starting a one-shot timer that is already running, or querying the
    /// time remaining of a timer that is not registered
    NotReady,
    /// No timer matched the requested option flags
    Empty,
    /// Timer arena exhausted
    Full,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidParameter => write!(f, "invalid parameter"),
            Error::InvalidState => write!(f, "operation conflicts with timer state"),
            Error::NotReady => write!(f, "timer not ready"),
            Error::Empty => write!(f, "no matching timer"),
            Error::Full => write!(f, "timer arena exhausted"),
        }
    }
}
