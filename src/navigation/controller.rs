//! Navigation control loop
//!
//! One iteration:
//! 1. Measure distance (bounded by the ranging edge timeout)
//! 2. Feed a valid sample to [`NavigationState`], apply the action
//! 3. Sleep the pacing delay
//!
//! A failed measurement skips step 2 entirely: no log line, no motor command.

use super::heading::Heading;
use super::sensor_log::SensorLog;
use super::state::{Action, NavigationState};
use crate::config::NavigationConfig;
use crate::core::clock::Clock;
use crate::core::gpio::Gpio;
use crate::drivers::motor::{MotorActuator, MotorCommand};
use crate::drivers::ultrasonic::RangingUnit;
use crate::error::{Error, Result};
use crate::utils::signal::{ShutdownSignal, sleep_unless_shutdown};
use std::io::{Seek, Write};
use std::time::Duration;

/// Counters accumulated over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationStats {
    pub iterations: u64,
    pub samples: u64,
    pub recorded: u64,
    pub turns: u64,
    pub rollovers: u64,
    pub ranging_failures: u64,
}

/// Result of one measurement
#[derive(Debug)]
pub enum StepOutcome {
    /// Valid sample and the action taken on it
    Acted { distance_cm: f64, action: Action },
    /// Measurement failed; iteration dropped
    Skipped(Error),
}

/// What one iteration did
#[derive(Debug)]
pub struct StepReport {
    pub outcome: StepOutcome,
    /// Motor commands issued during this iteration, in order
    pub commands: Vec<MotorCommand>,
}

/// Single-threaded ranging and avoidance loop owning the GPIO handle
pub struct NavigationLoop<G: Gpio, C: Clock, W: Write + Seek> {
    gpio: G,
    clock: C,
    ranging: RangingUnit,
    motors: MotorActuator,
    log: SensorLog<W>,
    state: NavigationState,
    cruise_speed: u8,
    turn_settle: Duration,
    loop_period: Duration,
    stats: NavigationStats,
}

impl<G: Gpio, C: Clock, W: Write + Seek> NavigationLoop<G, C, W> {
    /// Assemble a loop from initialized drivers and an open sensor log
    pub fn new(
        gpio: G,
        clock: C,
        ranging: RangingUnit,
        motors: MotorActuator,
        log: SensorLog<W>,
        config: &NavigationConfig,
    ) -> Self {
        Self {
            gpio,
            clock,
            ranging,
            motors,
            log,
            state: NavigationState::new(config.threshold_cm, config.initial_turn_count),
            cruise_speed: config.cruise_speed_percent,
            turn_settle: config.turn_settle(),
            loop_period: config.loop_period(),
            stats: NavigationStats::default(),
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn heading(&self) -> Heading {
        self.state.heading()
    }

    pub fn stats(&self) -> NavigationStats {
        self.stats
    }

    pub fn motors(&self) -> &MotorActuator {
        &self.motors
    }

    pub fn sensor_log(&self) -> &SensorLog<W> {
        &self.log
    }

    /// Drive both motors forward at cruise speed
    pub fn start(&mut self) -> Result<()> {
        log::info!("Cruising forward at {}%", self.cruise_speed);
        self.motors
            .set_command(&mut self.gpio, MotorCommand::Forward, self.cruise_speed)
    }

    /// Stop both motors
    pub fn stop_motors(&mut self) -> Result<()> {
        self.motors.stop(&mut self.gpio)
    }

    /// Run until shutdown is requested, then stop the motors.
    ///
    /// Non-recoverable errors end the loop early; the motors are stopped on
    /// every exit path before the error is returned.
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<NavigationStats> {
        let result = self.start().and_then(|_| {
            while !shutdown.is_requested() {
                self.step(shutdown)?;
            }
            Ok(())
        });

        log::info!("Stopping motors");
        let stopped = self.stop_motors();
        result?;
        stopped?;

        let stats = self.stats;
        log::info!(
            "Run summary: {} iterations, {} samples ({} recorded), {} turns, {} rollovers, {} ranging failures, heading {}",
            stats.iterations,
            stats.samples,
            stats.recorded,
            stats.turns,
            stats.rollovers,
            stats.ranging_failures,
            self.state.heading()
        );
        Ok(stats)
    }

    /// Perform one measurement, one decision and the pacing delay
    pub fn step(&mut self, shutdown: &ShutdownSignal) -> Result<StepReport> {
        self.stats.iterations += 1;
        let mut commands = Vec::new();

        let outcome = match self.ranging.measure_distance(&mut self.gpio, &self.clock) {
            Ok(distance_cm) => {
                self.stats.samples += 1;
                log::debug!("Distance: {:.2} cm", distance_cm);
                let action = self.state.on_sample(distance_cm);
                self.apply(action, shutdown, &mut commands)?;
                StepOutcome::Acted {
                    distance_cm,
                    action,
                }
            }
            Err(e) if e.is_recoverable() && shutdown.is_requested() => {
                log::debug!("Ping abandoned during shutdown: {}", e);
                StepOutcome::Skipped(e)
            }
            Err(e) if e.is_recoverable() => {
                self.stats.ranging_failures += 1;
                log::warn!("Error reading distance: {}", e);
                StepOutcome::Skipped(e)
            }
            Err(e) => return Err(e),
        };

        sleep_unless_shutdown(&self.clock, self.loop_period, shutdown);
        Ok(StepReport { outcome, commands })
    }

    fn apply(
        &mut self,
        action: Action,
        shutdown: &ShutdownSignal,
        commands: &mut Vec<MotorCommand>,
    ) -> Result<()> {
        match action {
            Action::Record(distance_cm) => {
                self.stats.recorded += 1;
                self.log.record_distance(distance_cm)
            }
            Action::Hold => self.log.flush(),
            Action::Turn { rollover } => {
                self.stats.turns += 1;
                match rollover {
                    Some(heading) => {
                        self.stats.rollovers += 1;
                        log::info!("Four turns completed, heading now {}", heading);
                        self.log.rewrite_heading(heading)?;
                    }
                    None => {
                        log::info!(
                            "Obstacle beyond threshold, turning left ({} of 4)",
                            self.state.turn_count()
                        );
                        self.log.record_turn()?;
                    }
                }

                self.motors
                    .set_command(&mut self.gpio, MotorCommand::TurnLeft, self.cruise_speed)?;
                commands.push(MotorCommand::TurnLeft);

                if !sleep_unless_shutdown(&self.clock, self.turn_settle, shutdown) {
                    // Motors get stopped by the caller
                    return Ok(());
                }

                self.motors
                    .set_command(&mut self.gpio, MotorCommand::Forward, self.cruise_speed)?;
                commands.push(MotorCommand::Forward);
                Ok(())
            }
        }
    }
}
