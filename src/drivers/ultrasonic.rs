//! HC-SR04 ultrasonic ranging
//!
//! One measurement:
//! 1. Drive trigger high for the pulse width (10 us), then low
//! 2. Poll echo until it goes high, timestamp the rising edge
//! 3. Poll echo until it goes low, timestamp the falling edge
//! 4. `distance = elapsed_us * speed_of_sound / 2` (round trip)
//!
//! Each wait is bounded by the edge timeout so a dead sensor cannot stall the
//! control loop. If the rising edge never arrives the falling wait is skipped.

use crate::config::{Config, RangingConfig};
use crate::core::clock::Clock;
use crate::core::gpio::{Gpio, PinLevel};
use crate::error::{Error, Result};
use std::time::{Duration, Instant};

/// Convert an echo pulse width to a one-way distance in centimeters
#[inline]
pub fn distance_from_echo(elapsed_us: f64, speed_of_sound_cm_per_us: f64) -> f64 {
    elapsed_us * speed_of_sound_cm_per_us / 2.0
}

/// Echo reads performed while waiting for each edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollCounts {
    pub rising: u32,
    pub falling: u32,
}

/// Trigger/echo pin pair with timing parameters
#[derive(Debug, Clone)]
pub struct RangingUnit {
    trigger_pin: u8,
    echo_pin: u8,
    trigger_pulse: Duration,
    edge_timeout: Duration,
    speed_of_sound_cm_per_us: f64,
    last_polls: PollCounts,
}

impl RangingUnit {
    pub fn new(trigger_pin: u8, echo_pin: u8, config: &RangingConfig) -> Self {
        Self {
            trigger_pin,
            echo_pin,
            trigger_pulse: config.trigger_pulse(),
            edge_timeout: config.edge_timeout(),
            speed_of_sound_cm_per_us: config.speed_of_sound_cm_per_us,
            last_polls: PollCounts::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.pins.trigger, config.pins.echo, &config.ranging)
    }

    /// Poll counts of the most recent measurement
    pub fn last_poll_counts(&self) -> PollCounts {
        self.last_polls
    }

    /// Configure trigger as a low output and echo as an input
    pub fn initialize<G: Gpio>(&mut self, gpio: &mut G) -> Result<()> {
        gpio.configure_output(self.trigger_pin)
            .and_then(|_| gpio.clear(self.trigger_pin))
            .map_err(|e| {
                Error::HardwareInit(format!("trigger pin {} setup failed: {}", self.trigger_pin, e))
            })?;
        gpio.configure_input(self.echo_pin).map_err(|e| {
            Error::HardwareInit(format!("echo pin {} setup failed: {}", self.echo_pin, e))
        })?;

        log::info!(
            "Ultrasonic sensor ready (trigger {}, echo {})",
            self.trigger_pin,
            self.echo_pin
        );
        Ok(())
    }

    /// Fire one ping and return the distance in centimeters.
    ///
    /// Fails with [`Error::RisingEdgeTimeout`] or [`Error::FallingEdgeTimeout`]
    /// when the echo line does not change within the edge timeout.
    pub fn measure_distance<G: Gpio, C: Clock>(&mut self, gpio: &mut G, clock: &C) -> Result<f64> {
        self.last_polls = PollCounts::default();
        self.send_pulse(gpio, clock)?;

        let mut polls = 0;
        let rising = self.wait_for_level(gpio, clock, PinLevel::High, &mut polls);
        self.last_polls.rising = polls;
        let Some(rising) = rising? else {
            return Err(Error::RisingEdgeTimeout {
                timeout_ms: self.timeout_ms(),
            });
        };

        let mut polls = 0;
        let falling = self.wait_for_level(gpio, clock, PinLevel::Low, &mut polls);
        self.last_polls.falling = polls;
        let Some(falling) = falling? else {
            return Err(Error::FallingEdgeTimeout {
                timeout_ms: self.timeout_ms(),
            });
        };

        let elapsed_us = falling.duration_since(rising).as_secs_f64() * 1_000_000.0;
        log::trace!(
            "Echo pulse {:.1} us ({} + {} polls)",
            elapsed_us,
            self.last_polls.rising,
            self.last_polls.falling
        );
        Ok(distance_from_echo(elapsed_us, self.speed_of_sound_cm_per_us))
    }

    fn send_pulse<G: Gpio, C: Clock>(&self, gpio: &mut G, clock: &C) -> Result<()> {
        log::trace!("Sending trigger pulse");
        gpio.set(self.trigger_pin)?;
        clock.sleep(self.trigger_pulse);
        gpio.clear(self.trigger_pin)
    }

    /// Busy-poll the echo pin until it reads `desired`.
    ///
    /// Returns the instant the level was observed, or `None` once more than
    /// the edge timeout has passed since polling began.
    fn wait_for_level<G: Gpio, C: Clock>(
        &self,
        gpio: &mut G,
        clock: &C,
        desired: PinLevel,
        polls: &mut u32,
    ) -> Result<Option<Instant>> {
        let start = clock.now();
        loop {
            let level = gpio.read(self.echo_pin)?;
            *polls += 1;
            if level == desired {
                return Ok(Some(clock.now()));
            }
            if clock.now().duration_since(start) > self.edge_timeout {
                return Ok(None);
            }
        }
    }

    fn timeout_ms(&self) -> u64 {
        self.edge_timeout.as_millis() as u64
    }
}
