use crate::sequence::Step;
use eyre::{bail, Report, WrapErr};
use rh56::DeviceId;
use serde_derive::Deserialize;
use std::fs::read_to_string;
use std::time::Duration;

const CONFIG_FILENAME: &str = "handcontrol.toml";

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub device_id: u8,
    pub serial: Option<SerialConfig>,
    pub modbus: Option<ModbusConfig>,
    /// Steps to run in order. If empty, the built-in demo runs instead.
    pub steps: Vec<Step>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: DeviceId::default().0,
            serial: None,
            modbus: None,
            steps: vec![],
        }
    }
}

impl Config {
    /// Reads the given config file, or `handcontrol.toml` in the current directory.
    pub fn from_file(filename: Option<&str>) -> Result<Config, Report> {
        Config::read(filename.unwrap_or(CONFIG_FILENAME))
    }

    fn read(filename: &str) -> Result<Config, Report> {
        let config_file =
            read_to_string(filename).wrap_err_with(|| format!("Reading {}", filename))?;
        Ok(toml::from_str(&config_file)?)
    }

    pub fn device(&self) -> DeviceId {
        DeviceId(self.device_id)
    }

    /// Which way to reach the hand. Exactly one of `[serial]` and `[modbus]` must be given.
    pub fn connection(&self) -> Result<Connection<'_>, Report> {
        match (&self.serial, &self.modbus) {
            (Some(serial), None) => Ok(Connection::Serial(serial)),
            (None, Some(modbus)) => Ok(Connection::Modbus(modbus)),
            (None, None) => bail!("No connection configured, add a [serial] or [modbus] section"),
            (Some(_), Some(_)) => bail!("Both [serial] and [modbus] are configured, pick one"),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub enum Connection<'a> {
    Serial(&'a SerialConfig),
    Modbus(&'a ModbusConfig),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerialConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// How long to wait for a reply, in milliseconds.
    #[serde(default = "default_serial_timeout_ms")]
    pub timeout_ms: u64,
}

impl SerialConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModbusConfig {
    pub host: String,
    #[serde(default = "default_modbus_port")]
    pub port: u16,
    /// Connection and response timeout, in milliseconds.
    #[serde(default = "default_modbus_timeout_ms")]
    pub timeout_ms: u64,
}

impl ModbusConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_serial_timeout_ms() -> u64 {
    rh56::bus::DEFAULT_REPLY_TIMEOUT.as_millis() as u64
}

fn default_modbus_port() -> u16 {
    rh56::modbus::DEFAULT_PORT
}

fn default_modbus_timeout_ms() -> u64 {
    1000
}
