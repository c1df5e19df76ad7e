//! In-memory GPIO backend

use super::clock::SimClock;
use super::echo::EchoSimulator;
use crate::core::clock::Clock;
use crate::core::gpio::{Gpio, PinLevel, PwmMode};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// How a pin has been configured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinMode {
    Output,
    Input,
    Pwm { frequency_hz: u32, mode: PwmMode },
}

/// A recorded pin operation (reads are counted, not recorded)
#[derive(Debug, Clone, PartialEq)]
pub enum GpioEvent {
    ConfigureOutput(u8),
    ConfigureInput(u8),
    Set(u8),
    Clear(u8),
    ConfigurePwm {
        pin: u8,
        frequency_hz: u32,
        mode: PwmMode,
    },
    DutyCycle {
        pin: u8,
        percent: f32,
    },
}

/// Event with the simulated time it happened at
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub at: Duration,
    pub event: GpioEvent,
}

/// Mock GPIO for tests and dry runs
///
/// Cloned handles share state, so a test can inspect pins while the
/// navigation loop owns the backend.
#[derive(Clone)]
pub struct MockGpio {
    inner: Arc<Mutex<MockGpioInner>>,
    clock: SimClock,
}

struct MockGpioInner {
    modes: HashMap<u8, PinMode>,
    levels: HashMap<u8, PinLevel>,
    duty: HashMap<u8, f32>,
    reads: HashMap<u8, u64>,
    events: Vec<TimedEvent>,
    record_events: bool,
    failing_pins: HashSet<u8>,
    poll_step: Duration,
    echo: Option<EchoSimulator>,
}

impl MockGpio {
    /// Create a mock with its own simulated clock
    pub fn new() -> Self {
        Self::with_clock(SimClock::new())
    }

    /// Create a mock sharing `clock`
    pub fn with_clock(clock: SimClock) -> Self {
        MockGpio {
            inner: Arc::new(Mutex::new(MockGpioInner {
                modes: HashMap::new(),
                levels: HashMap::new(),
                duty: HashMap::new(),
                reads: HashMap::new(),
                events: Vec::new(),
                record_events: true,
                failing_pins: HashSet::new(),
                poll_step: Duration::from_micros(5),
                echo: None,
            })),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockGpioInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handle to the simulated clock driving this mock
    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }

    /// Attach a scripted ultrasonic sensor
    pub fn attach_echo(&self, echo: EchoSimulator) {
        self.lock().echo = Some(echo);
    }

    /// Builder form of [`MockGpio::attach_echo`]
    pub fn with_echo(self, echo: EchoSimulator) -> Self {
        self.attach_echo(echo);
        self
    }

    /// Simulated time consumed by every `read`
    pub fn set_poll_step(&self, step: Duration) {
        self.lock().poll_step = step;
    }

    /// Make every configure call on `pin` fail
    pub fn fail_configure(&self, pin: u8) {
        self.lock().failing_pins.insert(pin);
    }

    /// Stop recording events (long dry runs)
    pub fn without_history(self) -> Self {
        self.lock().record_events = false;
        self
    }

    pub fn level(&self, pin: u8) -> PinLevel {
        self.lock().levels.get(&pin).copied().unwrap_or(PinLevel::Low)
    }

    pub fn duty(&self, pin: u8) -> f32 {
        self.lock().duty.get(&pin).copied().unwrap_or(0.0)
    }

    pub fn mode(&self, pin: u8) -> Option<PinMode> {
        self.lock().modes.get(&pin).copied()
    }

    pub fn read_count(&self, pin: u8) -> u64 {
        self.lock().reads.get(&pin).copied().unwrap_or(0)
    }

    pub fn events(&self) -> Vec<TimedEvent> {
        self.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    fn record(&self, inner: &mut MockGpioInner, event: GpioEvent) {
        if inner.record_events {
            inner.events.push(TimedEvent {
                at: self.clock.elapsed(),
                event,
            });
        }
    }

    fn configure(&mut self, pin: u8, mode: PinMode, event: GpioEvent) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing_pins.contains(&pin) {
            return Err(Error::Gpio(format!("pin {} refused configuration", pin)));
        }
        inner.modes.insert(pin, mode);
        self.record(&mut inner, event);
        Ok(())
    }

    fn write_level(&mut self, pin: u8, level: PinLevel) -> Result<()> {
        let mut inner = self.lock();
        if inner.modes.get(&pin) != Some(&PinMode::Output) {
            return Err(Error::Gpio(format!("pin {} is not configured as output", pin)));
        }

        let previous = inner.levels.insert(pin, level).unwrap_or(PinLevel::Low);
        let now = self.clock.now();
        if let Some(echo) = inner.echo.as_mut() {
            if echo.trigger_pin == pin && previous == PinLevel::High && level == PinLevel::Low {
                echo.on_trigger(now);
            }
        }

        let event = match level {
            PinLevel::High => GpioEvent::Set(pin),
            PinLevel::Low => GpioEvent::Clear(pin),
        };
        self.record(&mut inner, event);
        Ok(())
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpio for MockGpio {
    fn configure_output(&mut self, pin: u8) -> Result<()> {
        self.configure(pin, PinMode::Output, GpioEvent::ConfigureOutput(pin))
    }

    fn configure_input(&mut self, pin: u8) -> Result<()> {
        self.configure(pin, PinMode::Input, GpioEvent::ConfigureInput(pin))
    }

    fn set(&mut self, pin: u8) -> Result<()> {
        self.write_level(pin, PinLevel::High)
    }

    fn clear(&mut self, pin: u8) -> Result<()> {
        self.write_level(pin, PinLevel::Low)
    }

    fn read(&mut self, pin: u8) -> Result<PinLevel> {
        let mut inner = self.lock();
        if inner.modes.get(&pin) != Some(&PinMode::Input) {
            return Err(Error::Gpio(format!("pin {} is not configured as input", pin)));
        }

        // Never step past a scheduled echo edge, so edges are seen exactly
        let before = self.clock.now();
        let mut until = before + inner.poll_step;
        if let Some(echo) = inner.echo.as_ref().filter(|echo| echo.echo_pin == pin) {
            if let Some(edge) = echo.next_edge_after(before) {
                until = until.min(edge);
            }
        }
        self.clock.advance(until - before);
        *inner.reads.entry(pin).or_insert(0) += 1;

        let now = self.clock.now();
        let level = match inner.echo.as_ref() {
            Some(echo) if echo.echo_pin == pin => PinLevel::from(echo.is_high_at(now)),
            _ => inner.levels.get(&pin).copied().unwrap_or(PinLevel::Low),
        };
        Ok(level)
    }

    fn configure_pwm(&mut self, pin: u8, frequency_hz: u32, mode: PwmMode) -> Result<()> {
        self.configure(
            pin,
            PinMode::Pwm { frequency_hz, mode },
            GpioEvent::ConfigurePwm {
                pin,
                frequency_hz,
                mode,
            },
        )
    }

    fn set_pwm_duty_cycle(&mut self, pin: u8, percent: f32) -> Result<()> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Error::InvalidParameter(format!(
                "duty cycle {}% out of range",
                percent
            )));
        }

        let mut inner = self.lock();
        if !matches!(inner.modes.get(&pin), Some(PinMode::Pwm { .. })) {
            return Err(Error::Gpio(format!("pin {} is not configured for PWM", pin)));
        }
        inner.duty.insert(pin, percent);
        self.record(&mut inner, GpioEvent::DutyCycle { pin, percent });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::mock::EchoResponse;

    #[test]
    fn test_output_levels_and_events() {
        let mut gpio = MockGpio::new();
        gpio.configure_output(24).unwrap();
        gpio.set(24).unwrap();
        assert_eq!(gpio.level(24), PinLevel::High);
        gpio.clear(24).unwrap();
        assert_eq!(gpio.level(24), PinLevel::Low);

        let events: Vec<_> = gpio.events().into_iter().map(|e| e.event).collect();
        assert_eq!(
            events,
            vec![
                GpioEvent::ConfigureOutput(24),
                GpioEvent::Set(24),
                GpioEvent::Clear(24)
            ]
        );
    }

    #[test]
    fn test_unconfigured_pins_are_rejected() {
        let mut gpio = MockGpio::new();
        assert!(matches!(gpio.set(5), Err(Error::Gpio(_))));
        assert!(matches!(gpio.read(5), Err(Error::Gpio(_))));
        assert!(matches!(gpio.set_pwm_duty_cycle(12, 10.0), Err(Error::Gpio(_))));
    }

    #[test]
    fn test_duty_cycle_range() {
        let mut gpio = MockGpio::new();
        gpio.configure_pwm(12, 1000, PwmMode::MarkSpace).unwrap();
        gpio.set_pwm_duty_cycle(12, 40.0).unwrap();
        assert_eq!(gpio.duty(12), 40.0);
        assert!(matches!(
            gpio.set_pwm_duty_cycle(12, 100.5),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_injected_configure_failure() {
        let mut gpio = MockGpio::new();
        gpio.fail_configure(13);
        assert!(gpio.configure_pwm(13, 1000, PwmMode::MarkSpace).is_err());
        assert!(gpio.mode(13).is_none());
    }

    #[test]
    fn test_reads_advance_time() {
        let mut gpio = MockGpio::new();
        gpio.set_poll_step(Duration::from_micros(10));
        gpio.configure_input(25).unwrap();
        for _ in 0..100 {
            gpio.read(25).unwrap();
        }
        assert_eq!(gpio.read_count(25), 100);
        assert_eq!(gpio.clock().elapsed(), Duration::from_millis(1));
    }

    #[test]
    fn test_trigger_falling_edge_starts_echo() {
        let mut gpio = MockGpio::new().with_echo(
            EchoSimulator::new(18, 25, [EchoResponse::StuckHigh])
                .with_echo_delay(Duration::from_micros(20)),
        );
        gpio.configure_output(18).unwrap();
        gpio.configure_input(25).unwrap();

        // No trigger yet: line idles low
        assert_eq!(gpio.read(25).unwrap(), PinLevel::Low);

        gpio.set(18).unwrap();
        gpio.clear(18).unwrap();
        gpio.clock().advance(Duration::from_micros(50));
        assert_eq!(gpio.read(25).unwrap(), PinLevel::High);
    }

    #[test]
    fn test_reads_land_on_echo_edges() {
        let mut gpio = MockGpio::new().with_echo(
            EchoSimulator::new(18, 25, [EchoResponse::Distance(100.0)])
                .with_echo_delay(Duration::from_micros(12)),
        );
        gpio.set_poll_step(Duration::from_micros(5));
        gpio.configure_output(18).unwrap();
        gpio.configure_input(25).unwrap();
        let clock = gpio.clock();

        gpio.set(18).unwrap();
        gpio.clear(18).unwrap();
        let triggered = clock.elapsed();

        // 5 us, 10 us, then capped at the 12 us rising edge
        while gpio.read(25).unwrap() == PinLevel::Low {}
        assert_eq!(clock.elapsed() - triggered, Duration::from_micros(12));
        assert_eq!(gpio.read_count(25), 3);

        let rise = clock.elapsed();
        while gpio.read(25).unwrap() == PinLevel::High {}
        let width = clock.elapsed() - rise;
        assert_eq!(width, crate::devices::mock::pulse_width(100.0, 0.0343));
    }
}
