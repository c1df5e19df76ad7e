//! H-bridge motor actuator
//!
//! Each motor has two direction inputs and one PWM enable line:
//!
//! | fwd | rev | Function |
//! |-----|-----|----------|
//! | H   | L   | Forward  |
//! | L   | H   | Reverse  |
//! | L   | L   | Coast    |
//!
//! Both-high (brake) is never driven. The enable duty cycle sets speed.

use crate::config::{Config, PwmConfig};
use crate::core::gpio::{Gpio, PinLevel, PwmMode};
use crate::error::{Error, Result};
use std::fmt;

/// Logical drive command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorCommand {
    Stop,
    Forward,
    Reverse,
    TurnLeft,
    TurnRight,
}

/// Levels for the four direction inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionPattern {
    pub right_forward: PinLevel,
    pub right_reverse: PinLevel,
    pub left_forward: PinLevel,
    pub left_reverse: PinLevel,
}

impl DirectionPattern {
    const fn new(right: (bool, bool), left: (bool, bool)) -> Self {
        const fn level(high: bool) -> PinLevel {
            if high { PinLevel::High } else { PinLevel::Low }
        }
        Self {
            right_forward: level(right.0),
            right_reverse: level(right.1),
            left_forward: level(left.0),
            left_reverse: level(left.1),
        }
    }
}

impl MotorCommand {
    pub const ALL: [MotorCommand; 5] = [
        MotorCommand::Stop,
        MotorCommand::Forward,
        MotorCommand::Reverse,
        MotorCommand::TurnLeft,
        MotorCommand::TurnRight,
    ];

    /// Direction pin pattern for this command
    pub const fn pattern(self) -> DirectionPattern {
        const FWD: (bool, bool) = (true, false);
        const REV: (bool, bool) = (false, true);
        const COAST: (bool, bool) = (false, false);

        match self {
            MotorCommand::Stop => DirectionPattern::new(COAST, COAST),
            MotorCommand::Forward => DirectionPattern::new(FWD, FWD),
            MotorCommand::Reverse => DirectionPattern::new(REV, REV),
            // Pivot: right wheel forward, left wheel reverse
            MotorCommand::TurnLeft => DirectionPattern::new(FWD, REV),
            MotorCommand::TurnRight => DirectionPattern::new(REV, FWD),
        }
    }

    /// Inverse of [`MotorCommand::pattern`]
    pub fn from_pattern(pattern: DirectionPattern) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.pattern() == pattern)
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotorCommand::Stop => "stop",
            MotorCommand::Forward => "forward",
            MotorCommand::Reverse => "reverse",
            MotorCommand::TurnLeft => "turn-left",
            MotorCommand::TurnRight => "turn-right",
        };
        f.write_str(name)
    }
}

/// BCM pins wired to the H-bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorPins {
    pub right_enable: u8,
    pub left_enable: u8,
    pub right_forward: u8,
    pub right_reverse: u8,
    pub left_forward: u8,
    pub left_reverse: u8,
}

impl MotorPins {
    fn direction_pins(&self) -> [u8; 4] {
        [
            self.right_forward,
            self.right_reverse,
            self.left_forward,
            self.left_reverse,
        ]
    }

    fn enable_pins(&self) -> [u8; 2] {
        [self.right_enable, self.left_enable]
    }
}

/// Two-motor H-bridge driven through a [`Gpio`] backend
#[derive(Debug, Clone)]
pub struct MotorActuator {
    pins: MotorPins,
    pwm_frequency_hz: u32,
    pwm_mode: PwmMode,
    /// Last command applied and its speed
    current: Option<(MotorCommand, u8)>,
}

impl MotorActuator {
    pub fn new(pins: MotorPins, pwm: &PwmConfig) -> Self {
        Self {
            pins,
            pwm_frequency_hz: pwm.frequency_hz,
            pwm_mode: pwm.mode,
            current: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let pins = MotorPins {
            right_enable: config.pins.right_enable,
            left_enable: config.pins.left_enable,
            right_forward: config.pins.right_forward,
            right_reverse: config.pins.right_reverse,
            left_forward: config.pins.left_forward,
            left_reverse: config.pins.left_reverse,
        };
        Self::new(pins, &config.pwm)
    }

    pub fn pins(&self) -> &MotorPins {
        &self.pins
    }

    /// Last command applied, with its speed
    pub fn current(&self) -> Option<(MotorCommand, u8)> {
        self.current
    }

    /// Configure enable lines for PWM at 0 % and direction pins as low outputs.
    ///
    /// Any failure is reported as [`Error::HardwareInit`].
    pub fn initialize<G: Gpio>(&mut self, gpio: &mut G) -> Result<()> {
        log::info!("Initializing motor driver...");

        for pin in self.pins.enable_pins() {
            gpio.configure_pwm(pin, self.pwm_frequency_hz, self.pwm_mode)
                .and_then(|_| gpio.set_pwm_duty_cycle(pin, 0.0))
                .map_err(|e| {
                    Error::HardwareInit(format!("PWM setup failed for pin {}: {}", pin, e))
                })?;
        }

        for pin in self.pins.direction_pins() {
            gpio.configure_output(pin)
                .and_then(|_| gpio.clear(pin))
                .map_err(|e| {
                    Error::HardwareInit(format!("direction pin {} setup failed: {}", pin, e))
                })?;
        }

        self.current = Some((MotorCommand::Stop, 0));
        log::info!(
            "Motor driver ready (PWM {} Hz on pins {} and {})",
            self.pwm_frequency_hz,
            self.pins.right_enable,
            self.pins.left_enable
        );
        Ok(())
    }

    /// Apply a drive command at `speed_percent` (0-100) to both motors.
    ///
    /// [`MotorCommand::Stop`] always ends with 0 % duty regardless of speed.
    pub fn set_command<G: Gpio>(
        &mut self,
        gpio: &mut G,
        cmd: MotorCommand,
        speed_percent: u8,
    ) -> Result<()> {
        if speed_percent > 100 {
            return Err(Error::InvalidParameter(format!(
                "speed must be 0-100%, got {}",
                speed_percent
            )));
        }
        if cmd == MotorCommand::Stop {
            return self.stop(gpio);
        }

        log::debug!("Motor command: {} at {}%", cmd, speed_percent);
        self.write_pattern(gpio, cmd.pattern())?;
        for pin in self.pins.enable_pins() {
            gpio.set_pwm_duty_cycle(pin, f32::from(speed_percent))?;
        }
        self.current = Some((cmd, speed_percent));
        Ok(())
    }

    /// Zero both duty cycles and drive every direction pin low.
    ///
    /// Every pin is attempted even if an earlier one fails; the first error
    /// is returned.
    pub fn stop<G: Gpio>(&mut self, gpio: &mut G) -> Result<()> {
        log::debug!("Motor command: stop");
        let mut first_err = None;

        for pin in self.pins.enable_pins() {
            if let Err(e) = gpio.set_pwm_duty_cycle(pin, 0.0) {
                log::error!("Failed to zero duty cycle on pin {}: {}", pin, e);
                first_err.get_or_insert(e);
            }
        }
        for pin in self.pins.direction_pins() {
            if let Err(e) = gpio.clear(pin) {
                log::error!("Failed to clear direction pin {}: {}", pin, e);
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => {
                self.current = Some((MotorCommand::Stop, 0));
                Ok(())
            }
        }
    }

    /// Zero both duty cycles without touching the direction pins
    pub fn disable<G: Gpio>(&mut self, gpio: &mut G) -> Result<()> {
        for pin in self.pins.enable_pins() {
            gpio.set_pwm_duty_cycle(pin, 0.0)?;
        }
        if let Some((cmd, _)) = self.current {
            self.current = Some((cmd, 0));
        }
        Ok(())
    }

    fn write_pattern<G: Gpio>(&self, gpio: &mut G, pattern: DirectionPattern) -> Result<()> {
        gpio.write(self.pins.right_forward, pattern.right_forward)?;
        gpio.write(self.pins.right_reverse, pattern.right_reverse)?;
        gpio.write(self.pins.left_forward, pattern.left_forward)?;
        gpio.write(self.pins.left_reverse, pattern.left_reverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::mock::{MockGpio, PinMode};

    fn setup() -> (MockGpio, MotorActuator) {
        let mut gpio = MockGpio::new();
        let mut motors = MotorActuator::from_config(&Config::default());
        motors.initialize(&mut gpio).unwrap();
        (gpio, motors)
    }

    fn pattern_of(gpio: &MockGpio, pins: &MotorPins) -> DirectionPattern {
        DirectionPattern {
            right_forward: gpio.level(pins.right_forward),
            right_reverse: gpio.level(pins.right_reverse),
            left_forward: gpio.level(pins.left_forward),
            left_reverse: gpio.level(pins.left_reverse),
        }
    }

    #[test]
    fn test_initialize_configures_pins() {
        let (gpio, motors) = setup();
        let pins = *motors.pins();

        assert_eq!(
            gpio.mode(pins.right_enable),
            Some(PinMode::Pwm {
                frequency_hz: 1000,
                mode: PwmMode::MarkSpace
            })
        );
        assert_eq!(gpio.duty(pins.left_enable), 0.0);
        for pin in pins.direction_pins() {
            assert_eq!(gpio.mode(pin), Some(PinMode::Output));
            assert_eq!(gpio.level(pin), PinLevel::Low);
        }
        assert_eq!(motors.current(), Some((MotorCommand::Stop, 0)));
    }

    #[test]
    fn test_each_motor_has_one_high_pin_when_driving() {
        for cmd in MotorCommand::ALL {
            let p = cmd.pattern();
            if cmd == MotorCommand::Stop {
                assert_eq!(p, DirectionPattern::new((false, false), (false, false)));
            } else {
                assert_ne!(p.right_forward, p.right_reverse, "{}", cmd);
                assert_ne!(p.left_forward, p.left_reverse, "{}", cmd);
            }
            assert_eq!(MotorCommand::from_pattern(p), Some(cmd));
        }
    }

    #[test]
    fn test_brake_pattern_is_not_a_command() {
        let brake = DirectionPattern::new((true, true), (true, false));
        assert_eq!(MotorCommand::from_pattern(brake), None);
    }

    #[test]
    fn test_forward_sets_pins_and_speed() {
        let (mut gpio, mut motors) = setup();
        motors
            .set_command(&mut gpio, MotorCommand::Forward, 40)
            .unwrap();

        let pins = *motors.pins();
        assert_eq!(pattern_of(&gpio, &pins), MotorCommand::Forward.pattern());
        assert_eq!(gpio.duty(pins.right_enable), 40.0);
        assert_eq!(gpio.duty(pins.left_enable), 40.0);
        assert_eq!(motors.current(), Some((MotorCommand::Forward, 40)));
    }

    #[test]
    fn test_turn_left_pivots() {
        let (mut gpio, mut motors) = setup();
        motors
            .set_command(&mut gpio, MotorCommand::TurnLeft, 40)
            .unwrap();

        let pins = *motors.pins();
        assert_eq!(gpio.level(pins.right_forward), PinLevel::High);
        assert_eq!(gpio.level(pins.left_reverse), PinLevel::High);
        assert_eq!(gpio.level(pins.right_reverse), PinLevel::Low);
        assert_eq!(gpio.level(pins.left_forward), PinLevel::Low);
    }

    #[test]
    fn test_stop_forces_zero_duty() {
        let (mut gpio, mut motors) = setup();
        motors
            .set_command(&mut gpio, MotorCommand::Reverse, 75)
            .unwrap();
        motors.set_command(&mut gpio, MotorCommand::Stop, 75).unwrap();

        let pins = *motors.pins();
        assert_eq!(pattern_of(&gpio, &pins), MotorCommand::Stop.pattern());
        assert_eq!(gpio.duty(pins.right_enable), 0.0);
        assert_eq!(gpio.duty(pins.left_enable), 0.0);
        assert_eq!(motors.current(), Some((MotorCommand::Stop, 0)));
    }

    #[test]
    fn test_disable_keeps_direction() {
        let (mut gpio, mut motors) = setup();
        motors
            .set_command(&mut gpio, MotorCommand::Forward, 40)
            .unwrap();
        motors.disable(&mut gpio).unwrap();

        let pins = *motors.pins();
        assert_eq!(pattern_of(&gpio, &pins), MotorCommand::Forward.pattern());
        assert_eq!(gpio.duty(pins.right_enable), 0.0);
        assert_eq!(motors.current(), Some((MotorCommand::Forward, 0)));
    }

    #[test]
    fn test_speed_over_100_rejected() {
        let (mut gpio, mut motors) = setup();
        let result = motors.set_command(&mut gpio, MotorCommand::Forward, 101);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
        assert_eq!(motors.current(), Some((MotorCommand::Stop, 0)));
    }

    #[test]
    fn test_init_failure_is_hardware_init() {
        let mut gpio = MockGpio::new();
        gpio.fail_configure(crate::config::LEFT_ENABLE_PIN);
        let mut motors = MotorActuator::from_config(&Config::default());

        let result = motors.initialize(&mut gpio);
        assert!(matches!(result, Err(Error::HardwareInit(_))));
        assert_eq!(motors.current(), None);
    }
}
