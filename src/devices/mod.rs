//! GPIO backend implementations
//!
//! - [`sysfs`]: Linux `/sys/class/gpio` and `/sys/class/pwm` (the robot)
//! - [`mock`]: in-memory pins with simulated echoes and time (tests, dry runs)

pub mod mock;
pub mod sysfs;

pub use sysfs::SysfsGpio;
