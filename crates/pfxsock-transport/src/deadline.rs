use std::time::{Duration, Instant};

use crate::error::{Result, SockError};

/// Absolute point in time by which a blocking operation must finish.
///
/// A single deadline covers every sub-step of one logical operation; it is
/// never reset between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Deadline {
    /// Expires at the given instant.
    At(Instant),
    /// Block indefinitely.
    Never,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(at) => Deadline::At(at),
            None => Deadline::Never,
        }
    }

    /// `None` means no deadline.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or(Deadline::Never, Deadline::after)
    }

    /// Time left before expiry.
    ///
    /// Returns `Ok(None)` for [`Deadline::Never`], a non-zero duration while
    /// time remains, and [`SockError::TimedOut`] once expired.
    pub fn remaining(&self) -> Result<Option<Duration>> {
        match self {
            Deadline::Never => Ok(None),
            Deadline::At(at) => {
                let left = at.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    Err(SockError::TimedOut)
                } else {
                    Ok(Some(left))
                }
            }
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_err()
    }
}

impl From<Instant> for Deadline {
    fn from(at: Instant) -> Self {
        Deadline::At(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_has_no_remaining_time() {
        assert!(matches!(Deadline::Never.remaining(), Ok(None)));
        assert!(!Deadline::Never.is_expired());
    }

    #[test]
    fn future_deadline_reports_remaining() {
        let deadline = Deadline::after(Duration::from_secs(60));
        let left = deadline.remaining().unwrap().unwrap();
        assert!(left > Duration::from_secs(50));
        assert!(left <= Duration::from_secs(60));
    }

    #[test]
    fn past_deadline_times_out() {
        let deadline = Deadline::At(Instant::now() - Duration::from_millis(1));
        assert!(matches!(deadline.remaining(), Err(SockError::TimedOut)));
        assert!(deadline.is_expired());
    }

    #[test]
    fn from_timeout_maps_none_to_never() {
        assert_eq!(Deadline::from_timeout(None), Deadline::Never);
        assert!(matches!(
            Deadline::from_timeout(Some(Duration::from_secs(1))),
            Deadline::At(_)
        ));
    }

    #[test]
    fn overflowing_timeout_saturates_to_never() {
        assert_eq!(Deadline::after(Duration::MAX), Deadline::Never);
    }
}
