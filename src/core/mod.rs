//! Core abstractions for hardware backends.
//!
//! - [`gpio::Gpio`]: Pin and PWM capability to implement for new hardware
//! - [`clock::Clock`]: Monotonic time source used for edge timestamps and delays

pub mod clock;
pub mod gpio;

pub use clock::{Clock, SystemClock};
pub use gpio::{Gpio, PinLevel, PwmMode};
