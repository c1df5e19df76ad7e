//! Drivers built on the GPIO capability
//!
//! - [`motor::MotorActuator`]: L298N-style H-bridge for the two drive motors
//! - [`ultrasonic::RangingUnit`]: HC-SR04 trigger/echo distance measurement

pub mod motor;
pub mod ultrasonic;

pub use motor::{DirectionPattern, MotorActuator, MotorCommand, MotorPins};
pub use ultrasonic::{PollCounts, RangingUnit, distance_from_echo};
