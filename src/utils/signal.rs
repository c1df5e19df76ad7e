//! Signal handling utilities for graceful shutdown.

use crate::core::clock::Clock;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Longest uninterrupted sleep inside [`sleep_unless_shutdown`]
pub const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Cloneable shutdown request flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signal and register a Ctrl-C handler that trips it.
    ///
    /// # Example
    /// ```ignore
    /// let shutdown = ShutdownSignal::install()?;
    /// while !shutdown.is_requested() {
    ///     // ... do work ...
    /// }
    /// ```
    pub fn install() -> Result<Self> {
        let signal = Self::new();
        let handler_signal = signal.clone();
        ctrlc::set_handler(move || {
            log::info!("Received shutdown signal");
            handler_signal.request();
        })
        .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;
        Ok(signal)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Sleep for `duration` in slices, returning early if shutdown is requested.
///
/// Returns `true` if the full duration elapsed.
pub fn sleep_unless_shutdown<C: Clock>(
    clock: &C,
    duration: Duration,
    shutdown: &ShutdownSignal,
) -> bool {
    let mut remaining = duration;
    while !remaining.is_zero() {
        if shutdown.is_requested() {
            return false;
        }
        let slice = remaining.min(SLEEP_SLICE);
        clock.sleep(slice);
        remaining -= slice;
    }
    !shutdown.is_requested()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::mock::SimClock;

    #[test]
    fn test_clones_share_flag() {
        let signal = ShutdownSignal::new();
        let other = signal.clone();
        assert!(!other.is_requested());
        signal.request();
        assert!(other.is_requested());
    }

    #[test]
    fn test_full_sleep_without_request() {
        let clock = SimClock::new();
        let signal = ShutdownSignal::new();
        assert!(sleep_unless_shutdown(&clock, Duration::from_millis(1500), &signal));
        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn test_sleep_stops_when_requested() {
        let clock = SimClock::new();
        let signal = ShutdownSignal::new();
        signal.request();
        assert!(!sleep_unless_shutdown(&clock, Duration::from_secs(1), &signal));
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_zero_duration() {
        let clock = SimClock::new();
        let signal = ShutdownSignal::new();
        assert!(sleep_unless_shutdown(&clock, Duration::ZERO, &signal));
    }
}
