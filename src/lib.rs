//! Disha - reactive obstacle avoidance for a two-motor ultrasonic rover
//!
//! The rover cruises forward, pings an HC-SR04 once per second and turns
//! left in place whenever something is closer than the threshold. Every
//! reading is appended to a CSV log; after four turns the log is rewound and
//! stamped with the new compass heading.
//!
//! ## Layout
//!
//! - [`core`]: `Gpio` and `Clock` capabilities
//! - [`devices`]: sysfs and mock backends
//! - [`drivers`]: H-bridge motors and ultrasonic ranging
//! - [`navigation`]: obstacle latch, heading, sensor log and the main loop
//! - [`app`]: startup ordering used by the binary

pub mod app;
pub mod config;
pub mod core;
pub mod devices;
pub mod drivers;
pub mod error;
pub mod navigation;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
