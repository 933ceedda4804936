mod config;
mod sequence;

use config::{Config, Connection};
use eyre::{eyre, Report, WrapErr};
use log::info;
use rh56::modbus::TcpModbusClient;
use rh56::transport::open_serial;
use rh56::{HandBus, ModbusBus, SerialBus};
use std::env;
use std::net::ToSocketAddrs;

fn main() -> Result<(), Report> {
    stable_eyre::install()?;
    pretty_env_logger::init();
    color_backtrace::install();

    let config_path = env::args().nth(1);
    let config = Config::from_file(config_path.as_deref())?;
    let mut bus = open_bus(&config)?;

    let steps = if config.steps.is_empty() {
        info!("No steps configured, running the demo");
        sequence::demo()
    } else {
        config.steps.clone()
    };
    let result = sequence::run(bus.as_mut(), config.device(), &steps);
    bus.close()?;
    result
}

fn open_bus(config: &Config) -> Result<Box<dyn HandBus>, Report> {
    match config.connection()? {
        Connection::Serial(serial) => {
            let port = open_serial(&serial.port, serial.baud_rate)
                .wrap_err_with(|| format!("Failed to open serial port {}", serial.port))?;
            info!("Opened {} at {} baud", serial.port, serial.baud_rate);
            Ok(Box::new(SerialBus::with_reply_timeout(
                port,
                serial.reply_timeout(),
            )))
        }
        Connection::Modbus(modbus) => {
            let address = (modbus.host.as_str(), modbus.port)
                .to_socket_addrs()
                .wrap_err_with(|| format!("Resolving {}", modbus.host))?
                .next()
                .ok_or_else(|| eyre!("No address found for {}", modbus.host))?;
            let client = TcpModbusClient::connect(address, modbus.timeout())
                .wrap_err_with(|| format!("Failed to connect to {}", address))?;
            info!("Connected to {}", address);
            Ok(Box::new(ModbusBus::new(client)))
        }
    }
}
