//! Disha rover daemon
//!
//! Runs the obstacle-avoidance loop until Ctrl-C, then stops both motors.
//!
//! With no arguments the fixed built-in configuration is used. A config file
//! argument is for bench testing and mock dry runs only.

use disha_rover::config::{Config, DeviceType};
use disha_rover::core::SystemClock;
use disha_rover::devices::{SysfsGpio, mock};
use disha_rover::error::Result;
use disha_rover::navigation::{NavigationStats, read_sweeps};
use disha_rover::utils::signal::ShutdownSignal;
use std::env;
use std::process::ExitCode;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `disha-rover <path>` (positional)
/// - `disha-rover --config <path>` (flag-based)
/// - `disha-rover -c <path>` (short flag)
///
/// Returns `None` to run with the fixed built-in configuration.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn run() -> Result<NavigationStats> {
    let config = match parse_config_path() {
        Some(path) => {
            log::info!("Using config: {}", path);
            Config::load(&path)?
        }
        None => {
            log::info!("No config given, using built-in defaults");
            Config::default()
        }
    };

    let shutdown = ShutdownSignal::install()?;

    let stats = match config.device.device_type {
        DeviceType::Sysfs => {
            let gpio = SysfsGpio::new(&config.device, &config.pwm, &config.pins)?;
            disha_rover::app::run(&config, gpio, SystemClock, &shutdown)?
        }
        DeviceType::Mock => {
            let (gpio, clock) = mock::from_config(&config, &shutdown);
            disha_rover::app::run(&config, gpio, clock, &shutdown)?
        }
    };

    match read_sweeps(&config.log.path) {
        Ok(sweeps) => log::info!(
            "Sensor log {} holds {} sweeps",
            config.log.path,
            sweeps.len()
        ),
        Err(e) => log::warn!("Could not read back sensor log: {}", e),
    }
    Ok(stats)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Disha rover v{} starting...", env!("CARGO_PKG_VERSION"));

    match run() {
        Ok(stats) => {
            log::info!("Shutdown complete after {} iterations", stats.iterations);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
