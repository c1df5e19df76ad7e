//! GPIO capability trait
//!
//! The control loop only ever talks to hardware through this trait. A backend
//! is a single owned handle created at startup and dropped on shutdown; the
//! loop borrows it mutably for each operation.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digital pin level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinLevel {
    Low,
    High,
}

impl From<bool> for PinLevel {
    fn from(high: bool) -> Self {
        if high { PinLevel::High } else { PinLevel::Low }
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinLevel::Low => write!(f, "LOW"),
            PinLevel::High => write!(f, "HIGH"),
        }
    }
}

/// PWM output algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PwmMode {
    /// Single high pulse per period (duty = high time / period)
    MarkSpace,
    /// High time spread evenly over the period
    Balanced,
}

/// Pin and PWM capability consumed by the ranging unit and motor actuator.
///
/// Pins are BCM numbers. Every operation is fallible; callers decide whether
/// a failure is fatal (initialization) or recoverable (steady state).
pub trait Gpio {
    /// Configure a pin as a digital output
    fn configure_output(&mut self, pin: u8) -> Result<()>;

    /// Configure a pin as a digital input with no pull resistor
    fn configure_input(&mut self, pin: u8) -> Result<()>;

    /// Drive an output pin high
    fn set(&mut self, pin: u8) -> Result<()>;

    /// Drive an output pin low
    fn clear(&mut self, pin: u8) -> Result<()>;

    /// Sample the current level of an input pin
    fn read(&mut self, pin: u8) -> Result<PinLevel>;

    /// Configure a pin for hardware PWM at `frequency_hz`
    fn configure_pwm(&mut self, pin: u8, frequency_hz: u32, mode: PwmMode) -> Result<()>;

    /// Set the PWM duty cycle in percent (0.0 - 100.0)
    fn set_pwm_duty_cycle(&mut self, pin: u8, percent: f32) -> Result<()>;

    /// Drive an output pin to `level`
    fn write(&mut self, pin: u8, level: PinLevel) -> Result<()> {
        match level {
            PinLevel::High => self.set(pin),
            PinLevel::Low => self.clear(pin),
        }
    }
}
