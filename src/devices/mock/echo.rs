//! HC-SR04 echo simulation
//!
//! Each falling edge on the trigger pin consumes one scripted response and
//! schedules the echo pulse the sensor would produce for it.

use crate::utils::signal::ShutdownSignal;
use std::time::{Duration, Instant};

/// What the simulated sensor does after one trigger pulse
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EchoResponse {
    /// Echo pulse matching an object at this distance (cm)
    Distance(f64),
    /// Echo line never rises
    NoEcho,
    /// Echo line rises and never falls
    StuckHigh,
}

/// Echo pulse width for a target at `distance_cm`
///
/// Truncated to whole nanoseconds, so the measured distance never exceeds
/// the scripted one.
pub fn pulse_width(distance_cm: f64, speed_of_sound_cm_per_us: f64) -> Duration {
    let round_trip_us = distance_cm * 2.0 / speed_of_sound_cm_per_us;
    Duration::from_nanos((round_trip_us.max(0.0) * 1000.0).floor() as u64)
}

/// Scripted sensor attached to a trigger/echo pin pair
#[derive(Debug, Clone)]
pub struct EchoSimulator {
    pub(super) trigger_pin: u8,
    pub(super) echo_pin: u8,
    responses: Vec<EchoResponse>,
    next: usize,
    repeat: bool,
    echo_delay: Duration,
    speed_of_sound_cm_per_us: f64,
    /// (rise, fall) of the pulse in flight; `None` fall means stuck high
    pulse: Option<(Instant, Option<Instant>)>,
    on_exhausted: Option<ShutdownSignal>,
}

impl EchoSimulator {
    pub fn new(
        trigger_pin: u8,
        echo_pin: u8,
        responses: impl IntoIterator<Item = EchoResponse>,
    ) -> Self {
        Self {
            trigger_pin,
            echo_pin,
            responses: responses.into_iter().collect(),
            next: 0,
            repeat: false,
            echo_delay: Duration::from_micros(450),
            speed_of_sound_cm_per_us: crate::config::SPEED_OF_SOUND_CM_PER_US,
            pulse: None,
            on_exhausted: None,
        }
    }

    /// Convenience constructor from plain distances
    pub fn from_distances(trigger_pin: u8, echo_pin: u8, distances_cm: &[f64]) -> Self {
        Self::new(
            trigger_pin,
            echo_pin,
            distances_cm.iter().map(|&d| EchoResponse::Distance(d)),
        )
    }

    /// Start over from the first response once the script runs out
    pub fn repeating(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_echo_delay(mut self, delay: Duration) -> Self {
        self.echo_delay = delay;
        self
    }

    pub fn with_speed_of_sound(mut self, speed_of_sound_cm_per_us: f64) -> Self {
        self.speed_of_sound_cm_per_us = speed_of_sound_cm_per_us;
        self
    }

    /// Request shutdown on the first trigger after the script is exhausted
    pub fn shutdown_when_exhausted(mut self, signal: ShutdownSignal) -> Self {
        self.on_exhausted = Some(signal);
        self
    }

    /// Responses not yet played (ignores repetition)
    pub fn remaining(&self) -> usize {
        self.responses.len().saturating_sub(self.next)
    }

    pub(super) fn on_trigger(&mut self, now: Instant) {
        if self.next >= self.responses.len() {
            if self.repeat && !self.responses.is_empty() {
                self.next = 0;
            } else {
                self.pulse = None;
                if let Some(signal) = &self.on_exhausted {
                    log::info!("Mock echo script exhausted, requesting shutdown");
                    signal.request();
                }
                return;
            }
        }

        let response = self.responses[self.next];
        self.next += 1;

        let rise = now + self.echo_delay;
        self.pulse = match response {
            EchoResponse::Distance(cm) => Some((
                rise,
                Some(rise + pulse_width(cm, self.speed_of_sound_cm_per_us)),
            )),
            EchoResponse::NoEcho => None,
            EchoResponse::StuckHigh => Some((rise, None)),
        };
    }

    /// Next rise or fall of the pulse in flight strictly after `now`
    pub(super) fn next_edge_after(&self, now: Instant) -> Option<Instant> {
        let (rise, fall) = self.pulse?;
        if rise > now {
            Some(rise)
        } else {
            fall.filter(|fall| *fall > now)
        }
    }

    pub(super) fn is_high_at(&self, now: Instant) -> bool {
        match self.pulse {
            Some((rise, fall)) => now >= rise && fall.is_none_or(|fall| now < fall),
            None => false,
        }
    }
}
