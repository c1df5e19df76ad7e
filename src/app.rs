//! Startup sequence shared by the binary and integration tests

use crate::config::Config;
use crate::core::{Clock, Gpio};
use crate::drivers::{MotorActuator, RangingUnit};
use crate::error::Result;
use crate::navigation::{NavigationLoop, NavigationStats, SensorLog};
use crate::utils::signal::ShutdownSignal;

/// Bring up the hardware, open the sensor log and navigate until shutdown.
///
/// Hardware is initialized before the log file is created, so a board that
/// fails to come up leaves no empty log behind.
pub fn run<G: Gpio, C: Clock>(
    config: &Config,
    mut gpio: G,
    clock: C,
    shutdown: &ShutdownSignal,
) -> Result<NavigationStats> {
    config.validate()?;

    let mut motors = MotorActuator::from_config(config);
    motors.initialize(&mut gpio)?;

    let mut ranging = RangingUnit::from_config(config);
    ranging.initialize(&mut gpio)?;

    let sensor_log = SensorLog::open(&config.log.path)?;
    log::info!("Logging distances to {}", config.log.path);

    let mut nav = NavigationLoop::new(gpio, clock, ranging, motors, sensor_log, &config.navigation);
    nav.run(shutdown)
}
