//! Linux sysfs GPIO/PWM backend
//!
//! Digital pins go through `/sys/class/gpio/gpioN/{direction,value}`; the two
//! motor enable lines use hardware PWM channels under
//! `/sys/class/pwm/pwmchipN/pwmM/{period,duty_cycle,enable}`.
//!
//! On a Raspberry Pi 4 the enable pins need the two-channel overlay:
//!
//! ```text
//! dtoverlay=pwm-2chan,pin=12,func=4,pin2=13,func2=4
//! ```
//!
//! The handle owns every pin it exports and releases them on drop.

use crate::config::{DeviceConfig, PinConfig, PwmConfig};
use crate::core::gpio::{Gpio, PinLevel, PwmMode};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// How long to wait for udev to expose a freshly exported node
const EXPORT_SETTLE_TIMEOUT: Duration = Duration::from_millis(500);
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct PwmChannel {
    dir: PathBuf,
    period_ns: u64,
}

/// Owned sysfs GPIO handle
#[derive(Debug)]
pub struct SysfsGpio {
    gpio_root: PathBuf,
    pwm_chip: PathBuf,
    /// BCM pin -> pwmchip channel
    pwm_channels: HashMap<u8, u32>,
    values: HashMap<u8, File>,
    pwm: HashMap<u8, PwmChannel>,
    exported_pins: Vec<u8>,
    exported_channels: Vec<u32>,
}

impl SysfsGpio {
    /// Open the sysfs GPIO tree; fails with [`Error::HardwareInit`] if it is absent
    pub fn new(device: &DeviceConfig, pwm: &PwmConfig, pins: &PinConfig) -> Result<Self> {
        let gpio_root = PathBuf::from(&device.gpio_root);
        if !gpio_root.join("export").exists() {
            return Err(Error::HardwareInit(format!(
                "GPIO sysfs interface not found at {}",
                gpio_root.display()
            )));
        }

        let pwm_channels = HashMap::from([
            (pins.right_enable, pwm.right_channel),
            (pins.left_enable, pwm.left_channel),
        ]);

        log::info!(
            "Using sysfs GPIO at {} (PWM {})",
            gpio_root.display(),
            device.pwm_chip
        );
        Ok(Self {
            gpio_root,
            pwm_chip: PathBuf::from(&device.pwm_chip),
            pwm_channels,
            values: HashMap::new(),
            pwm: HashMap::new(),
            exported_pins: Vec::new(),
            exported_channels: Vec::new(),
        })
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.gpio_root.join(format!("gpio{}", pin))
    }

    fn export_pin(&mut self, pin: u8) -> Result<PathBuf> {
        let dir = self.pin_dir(pin);
        if !dir.exists() {
            write_attr(&self.gpio_root.join("export"), &pin.to_string())?;
            wait_for(&dir.join("direction"))?;
            self.exported_pins.push(pin);
            log::debug!("Exported GPIO {}", pin);
        }
        Ok(dir)
    }

    fn export_channel(&mut self, channel: u32) -> Result<PathBuf> {
        let dir = self.pwm_chip.join(format!("pwm{}", channel));
        if !dir.exists() {
            write_attr(&self.pwm_chip.join("export"), &channel.to_string())?;
            wait_for(&dir.join("enable"))?;
            self.exported_channels.push(channel);
            log::debug!("Exported PWM channel {}", channel);
        }
        Ok(dir)
    }

    fn configure_digital(&mut self, pin: u8, direction: &str, writable: bool) -> Result<()> {
        let dir = self.export_pin(pin)?;
        write_attr(&dir.join("direction"), direction)?;
        let value = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(dir.join("value"))
            .map_err(|e| Error::Gpio(format!("GPIO {} value: {}", pin, e)))?;
        self.values.insert(pin, value);
        Ok(())
    }

    fn value_file(&mut self, pin: u8) -> Result<&mut File> {
        self.values
            .get_mut(&pin)
            .ok_or_else(|| Error::Gpio(format!("GPIO {} is not configured", pin)))
    }

    fn write_value(&mut self, pin: u8, value: &[u8]) -> Result<()> {
        let file = self.value_file(pin)?;
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(value))
            .map_err(|e| Error::Gpio(format!("GPIO {} write: {}", pin, e)))
    }
}

impl Gpio for SysfsGpio {
    fn configure_output(&mut self, pin: u8) -> Result<()> {
        // "low" sets direction and initial level in one write
        self.configure_digital(pin, "low", true)
    }

    fn configure_input(&mut self, pin: u8) -> Result<()> {
        self.configure_digital(pin, "in", false)
    }

    fn set(&mut self, pin: u8) -> Result<()> {
        self.write_value(pin, b"1")
    }

    fn clear(&mut self, pin: u8) -> Result<()> {
        self.write_value(pin, b"0")
    }

    fn read(&mut self, pin: u8) -> Result<PinLevel> {
        let file = self.value_file(pin)?;
        let mut buf = [0u8; 1];
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| Error::Gpio(format!("GPIO {} read: {}", pin, e)))?;
        Ok(PinLevel::from(buf[0] == b'1'))
    }

    fn configure_pwm(&mut self, pin: u8, frequency_hz: u32, mode: PwmMode) -> Result<()> {
        let channel = *self.pwm_channels.get(&pin).ok_or_else(|| {
            Error::Gpio(format!("GPIO {} has no PWM channel mapping", pin))
        })?;
        if frequency_hz == 0 {
            return Err(Error::InvalidParameter("PWM frequency must be non-zero".to_string()));
        }
        if mode == PwmMode::Balanced {
            log::warn!("Balanced PWM not available through sysfs, using mark/space on GPIO {}", pin);
        }

        let dir = self.export_channel(channel)?;
        let period_ns = 1_000_000_000 / u64::from(frequency_hz);

        // Duty must never exceed period, so zero it before changing the period
        if let Err(e) = write_attr(&dir.join("enable"), "0") {
            log::debug!("PWM channel {} was not disabled before reconfiguring: {}", channel, e);
        }
        write_attr(&dir.join("duty_cycle"), "0")?;
        write_attr(&dir.join("period"), &period_ns.to_string())?;
        write_attr(&dir.join("enable"), "1")?;

        log::debug!(
            "GPIO {} -> PWM channel {} at {} Hz ({} ns)",
            pin,
            channel,
            frequency_hz,
            period_ns
        );
        self.pwm.insert(pin, PwmChannel { dir, period_ns });
        Ok(())
    }

    fn set_pwm_duty_cycle(&mut self, pin: u8, percent: f32) -> Result<()> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Error::InvalidParameter(format!(
                "duty cycle {}% out of range",
                percent
            )));
        }
        let channel = self
            .pwm
            .get(&pin)
            .ok_or_else(|| Error::Gpio(format!("GPIO {} is not configured for PWM", pin)))?;

        let duty_ns = (channel.period_ns as f64 * f64::from(percent) / 100.0).round() as u64;
        write_attr(&channel.dir.join("duty_cycle"), &duty_ns.to_string())
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        for channel in self.pwm.values() {
            release(&channel.dir.join("duty_cycle"), "0");
            release(&channel.dir.join("enable"), "0");
        }
        for channel in &self.exported_channels {
            release(&self.pwm_chip.join("unexport"), &channel.to_string());
        }

        self.values.clear();
        for pin in &self.exported_pins {
            release(&self.gpio_root.join("unexport"), &pin.to_string());
        }
        log::debug!(
            "Released {} GPIO pins and {} PWM channels",
            self.exported_pins.len(),
            self.exported_channels.len()
        );
    }
}

fn write_attr(path: &Path, value: &str) -> Result<()> {
    fs::write(path, value).map_err(|e| Error::Gpio(format!("{}: {}", path.display(), e)))
}

/// Best-effort write during teardown
fn release(path: &Path, value: &str) {
    if let Err(e) = write_attr(path, value) {
        log::debug!("Release step skipped: {}", e);
    }
}

/// Wait until udev has created `path` after an export
fn wait_for(path: &Path) -> Result<()> {
    let mut waited = Duration::ZERO;
    while !path.exists() {
        if waited >= EXPORT_SETTLE_TIMEOUT {
            return Err(Error::Gpio(format!("{} did not appear", path.display())));
        }
        thread::sleep(EXPORT_POLL_INTERVAL);
        waited += EXPORT_POLL_INTERVAL;
    }
    Ok(())
}
