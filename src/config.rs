//! Configuration for DishaRover
//!
//! The robot's wiring, thresholds and timings are fixed compile-time
//! constants, and [`Config::default`] is built from them. Running without a
//! config file is the normal deployment.
//!
//! The optional TOML file exists only for bench testing and mock dry runs
//! (a different pin map, a faster loop, a scripted sensor). It is not a
//! tuning surface for the robot in the field.

use crate::core::gpio::PwmMode;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// HC-SR04 trigger output (BCM)
pub const TRIGGER_PIN: u8 = 18;
/// HC-SR04 echo input (BCM)
pub const ECHO_PIN: u8 = 25;
/// Right motor enable (ENA, hardware PWM)
pub const RIGHT_ENABLE_PIN: u8 = 12;
/// Left motor enable (ENB, hardware PWM)
pub const LEFT_ENABLE_PIN: u8 = 13;
/// Right motor forward input (IN1)
pub const RIGHT_FORWARD_PIN: u8 = 24;
/// Right motor reverse input (IN2)
pub const RIGHT_REVERSE_PIN: u8 = 23;
/// Left motor forward input (IN3)
pub const LEFT_FORWARD_PIN: u8 = 17;
/// Left motor reverse input (IN4)
pub const LEFT_REVERSE_PIN: u8 = 22;

pub const PWM_FREQUENCY_HZ: u32 = 1000;
pub const TRIGGER_PULSE_US: u64 = 10;
pub const EDGE_TIMEOUT_MS: u64 = 100;
pub const SPEED_OF_SOUND_CM_PER_US: f64 = 0.0343;
pub const OBSTACLE_THRESHOLD_CM: f64 = 100.0;
pub const CRUISE_SPEED_PERCENT: u8 = 40;
pub const TURN_SETTLE_MS: u64 = 1500;
pub const LOOP_PERIOD_MS: u64 = 1000;
pub const SENSOR_LOG_PATH: &str = "sensor_data.csv";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub pins: PinConfig,
    pub pwm: PwmConfig,
    pub ranging: RangingConfig,
    pub navigation: NavigationConfig,
    pub log: LogConfig,
    pub mock: MockConfig,
}

/// Which GPIO backend to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Linux `/sys/class/gpio` + `/sys/class/pwm`
    Sysfs,
    /// In-memory GPIO with simulated echoes
    Mock,
}

/// Backend selection and sysfs locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub gpio_root: String,
    pub pwm_chip: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: DeviceType::Sysfs,
            gpio_root: "/sys/class/gpio".to_string(),
            pwm_chip: "/sys/class/pwm/pwmchip0".to_string(),
        }
    }
}

/// BCM pin assignment
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PinConfig {
    pub trigger: u8,
    pub echo: u8,
    pub right_enable: u8,
    pub left_enable: u8,
    pub right_forward: u8,
    pub right_reverse: u8,
    pub left_forward: u8,
    pub left_reverse: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            trigger: TRIGGER_PIN,
            echo: ECHO_PIN,
            right_enable: RIGHT_ENABLE_PIN,
            left_enable: LEFT_ENABLE_PIN,
            right_forward: RIGHT_FORWARD_PIN,
            right_reverse: RIGHT_REVERSE_PIN,
            left_forward: LEFT_FORWARD_PIN,
            left_reverse: LEFT_REVERSE_PIN,
        }
    }
}

impl PinConfig {
    fn all(&self) -> [(&'static str, u8); 8] {
        [
            ("trigger", self.trigger),
            ("echo", self.echo),
            ("right_enable", self.right_enable),
            ("left_enable", self.left_enable),
            ("right_forward", self.right_forward),
            ("right_reverse", self.right_reverse),
            ("left_forward", self.left_forward),
            ("left_reverse", self.left_reverse),
        ]
    }
}

/// Motor enable PWM settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PwmConfig {
    pub frequency_hz: u32,
    pub mode: PwmMode,
    /// pwmchip channel wired to `pins.right_enable`
    pub right_channel: u32,
    /// pwmchip channel wired to `pins.left_enable`
    pub left_channel: u32,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            frequency_hz: PWM_FREQUENCY_HZ,
            mode: PwmMode::MarkSpace,
            right_channel: 0,
            left_channel: 1,
        }
    }
}

/// Ultrasonic ranging parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RangingConfig {
    pub trigger_pulse_us: u64,
    pub edge_timeout_ms: u64,
    pub speed_of_sound_cm_per_us: f64,
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            trigger_pulse_us: TRIGGER_PULSE_US,
            edge_timeout_ms: EDGE_TIMEOUT_MS,
            speed_of_sound_cm_per_us: SPEED_OF_SOUND_CM_PER_US,
        }
    }
}

impl RangingConfig {
    pub fn trigger_pulse(&self) -> Duration {
        Duration::from_micros(self.trigger_pulse_us)
    }

    pub fn edge_timeout(&self) -> Duration {
        Duration::from_millis(self.edge_timeout_ms)
    }
}

/// Obstacle avoidance parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Samples strictly above this distance count as "obstacle" (cm)
    pub threshold_cm: f64,
    /// Duty cycle for both motors while cruising and turning (0-100)
    pub cruise_speed_percent: u8,
    /// How long to hold the left turn before resuming forward
    pub turn_settle_ms: u64,
    /// Pacing delay after every measurement
    pub loop_period_ms: u64,
    /// Turn counter value at start (0-3)
    pub initial_turn_count: u8,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            threshold_cm: OBSTACLE_THRESHOLD_CM,
            cruise_speed_percent: CRUISE_SPEED_PERCENT,
            turn_settle_ms: TURN_SETTLE_MS,
            loop_period_ms: LOOP_PERIOD_MS,
            initial_turn_count: 0,
        }
    }
}

impl NavigationConfig {
    pub fn turn_settle(&self) -> Duration {
        Duration::from_millis(self.turn_settle_ms)
    }

    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(self.loop_period_ms)
    }
}

/// Persisted sensor log
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub path: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: SENSOR_LOG_PATH.to_string(),
        }
    }
}

/// Mock device behaviour (only used with `device.type = "mock"`)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MockConfig {
    /// Distances replayed by the simulated sensor, in order
    pub distances_cm: Vec<f64>,
    /// Replay the script forever instead of shutting down after one pass
    pub repeat: bool,
    /// Delay between the trigger falling edge and the echo rising edge
    pub echo_delay_us: u64,
    /// Simulated time consumed by each pin read
    pub poll_step_us: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            distances_cm: vec![50.0, 60.0, 150.0, 160.0, 40.0],
            repeat: false,
            echo_delay_us: 450,
            poll_step_us: 5,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it
    ///
    /// Missing sections and fields fall back to the compile-time defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the control loop cannot run with
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (role, pin) in self.pins.all() {
            if !seen.insert(pin) {
                return Err(Error::Config(format!(
                    "pin {} assigned to '{}' is already in use",
                    pin, role
                )));
            }
        }

        if self.navigation.cruise_speed_percent > 100 {
            return Err(Error::Config(format!(
                "cruise_speed_percent must be 0-100, got {}",
                self.navigation.cruise_speed_percent
            )));
        }
        if self.navigation.initial_turn_count > 3 {
            return Err(Error::Config(format!(
                "initial_turn_count must be 0-3, got {}",
                self.navigation.initial_turn_count
            )));
        }
        if !(self.navigation.threshold_cm > 0.0) {
            return Err(Error::Config("threshold_cm must be positive".to_string()));
        }
        if !(self.ranging.speed_of_sound_cm_per_us > 0.0) {
            return Err(Error::Config(
                "speed_of_sound_cm_per_us must be positive".to_string(),
            ));
        }
        if self.ranging.edge_timeout_ms == 0 {
            return Err(Error::Config("edge_timeout_ms must be non-zero".to_string()));
        }
        if self.pwm.frequency_hz == 0 {
            return Err(Error::Config("pwm frequency_hz must be non-zero".to_string()));
        }
        if self.pwm.right_channel == self.pwm.left_channel {
            return Err(Error::Config(
                "right and left enable lines need distinct PWM channels".to_string(),
            ));
        }
        if self.device.device_type == DeviceType::Mock {
            if self.mock.distances_cm.is_empty() {
                return Err(Error::Config(
                    "mock device needs at least one distance".to_string(),
                ));
            }
            if self.mock.poll_step_us == 0 {
                return Err(Error::Config("mock poll_step_us must be non-zero".to_string()));
            }
        }
        Ok(())
    }
}
