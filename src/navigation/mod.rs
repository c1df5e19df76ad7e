//! Reactive obstacle avoidance
//!
//! - [`state`]: pure decision logic (obstacle latch, turn counter, heading)
//! - [`controller`]: the loop that applies decisions to motors and the log
//! - [`sensor_log`]: the persisted distance/turn/heading log and its reader
//! - [`heading`]: cyclic compass label

pub mod controller;
pub mod heading;
pub mod sensor_log;
pub mod state;

pub use controller::{NavigationLoop, NavigationStats, StepOutcome, StepReport};
pub use heading::Heading;
pub use sensor_log::{SensorLog, Sweep, parse_sweeps, read_sweeps};
pub use state::{Action, NavigationState};
