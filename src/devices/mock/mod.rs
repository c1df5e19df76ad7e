//! Mock device for hardware-free testing and dry runs
//!
//! | Component | Simulation |
//! |-----------|------------|
//! | GPIO / PWM | In-memory pin modes, levels and duty cycles |
//! | HC-SR04 | Scripted echo pulses triggered by the trigger falling edge |
//! | Time | [`SimClock`], advanced by sleeps and by every pin read |
//!
//! Example configuration (`mock.toml`):
//!
//! ```toml
//! [device]
//! type = "mock"
//!
//! [mock]
//! distances_cm = [50.0, 60.0, 150.0, 160.0, 40.0]
//! repeat = false       # stop once the script has been replayed
//! echo_delay_us = 450
//! poll_step_us = 5
//! ```
//!
//! Because time is simulated, a dry run completes as fast as the CPU allows
//! and produces the same sensor log as the real robot would for the script.

mod clock;
mod echo;
mod gpio;

pub use clock::SimClock;
pub use echo::{EchoResponse, EchoSimulator, pulse_width};
pub use gpio::{GpioEvent, MockGpio, PinMode, TimedEvent};

use crate::config::Config;
use crate::utils::signal::ShutdownSignal;
use std::time::Duration;

/// Build a mock backend from `[mock]` settings
///
/// Unless `repeat` is set, `shutdown` is requested once the script runs out.
pub fn from_config(config: &Config, shutdown: &ShutdownSignal) -> (MockGpio, SimClock) {
    let clock = SimClock::new();

    let mut echo =
        EchoSimulator::from_distances(config.pins.trigger, config.pins.echo, &config.mock.distances_cm)
            .repeating(config.mock.repeat)
            .with_echo_delay(Duration::from_micros(config.mock.echo_delay_us))
            .with_speed_of_sound(config.ranging.speed_of_sound_cm_per_us);
    if !config.mock.repeat {
        echo = echo.shutdown_when_exhausted(shutdown.clone());
    }

    log::info!(
        "Mock device: {} scripted distances{}",
        config.mock.distances_cm.len(),
        if config.mock.repeat { " (repeating)" } else { "" }
    );

    let gpio = MockGpio::with_clock(clock.clone())
        .with_echo(echo)
        .without_history();
    gpio.set_poll_step(Duration::from_micros(config.mock.poll_step_us));
    (gpio, clock)
}
