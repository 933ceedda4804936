use crate::bus::{BusError, HandBus};
use crate::transport::TransportError;
use crate::{DeviceId, ProtocolError, Register, BASE_ADDRESS};
use log::trace;

/// The subset of a Modbus client needed to talk to the hand.
///
/// Failures are reported as they come, without retrying; whether to retry is up to the caller.
pub trait ModbusClient {
    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError>;

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError>;

    fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), TransportError>;

    /// Addresses subsequent requests to the given unit.
    fn set_unit_id(&mut self, _unit_id: u8) {}

    fn close(&mut self) -> Result<(), TransportError>;
}

/// Converts an absolute register address to the holding-register address used over Modbus.
pub fn holding_address(address: u16) -> Result<u16, BusError> {
    address
        .checked_sub(BASE_ADDRESS)
        .ok_or(BusError::AddressBelowBase(address))
}

/// Talks to a hand over Modbus-TCP.
///
/// Each 16-bit joint value is one holding register. Byte-wide registers are packed two to a
/// holding register, low byte first, matching their layout in device memory.
pub struct ModbusBus<C: ModbusClient> {
    client: Option<C>,
    unit_id: Option<u8>,
}

impl<C: ModbusClient> ModbusBus<C> {
    pub fn new(client: C) -> Self {
        Self {
            client: Some(client),
            unit_id: None,
        }
    }

    fn client(&mut self) -> Result<&mut C, BusError> {
        self.client
            .as_mut()
            .ok_or(BusError::Transport(TransportError::Closed))
    }

    fn select(&mut self, device: DeviceId) -> Result<(), BusError> {
        if self.unit_id != Some(device.0) {
            self.client()?.set_unit_id(device.0);
            self.unit_id = Some(device.0);
        }
        Ok(())
    }

    /// Reads `count` holding registers starting at the absolute register `address`.
    pub fn read_holding_window(&mut self, address: u16, count: u16) -> Result<Vec<u16>, BusError> {
        let holding_address = holding_address(address)?;
        trace!("Reading {} holding registers at {}", count, holding_address);
        Ok(self
            .client()?
            .read_holding_registers(holding_address, count)?)
    }

    /// Writes `values` to consecutive holding registers starting at the absolute register
    /// `address`.
    pub fn write_holding_window(&mut self, address: u16, values: &[u16]) -> Result<(), BusError> {
        let holding_address = holding_address(address)?;
        trace!("Writing {:?} to holding registers at {}", values, holding_address);
        Ok(self.client()?.write_registers(holding_address, values)?)
    }
}

impl<C: ModbusClient> HandBus for ModbusBus<C> {
    fn write_words(
        &mut self,
        device: DeviceId,
        register: Register,
        values: &[u16],
    ) -> Result<(), BusError> {
        self.select(device)?;
        self.write_holding_window(register.address(), values)
    }

    fn read_words(
        &mut self,
        device: DeviceId,
        register: Register,
        count: usize,
    ) -> Result<Vec<u16>, BusError> {
        let quantity =
            u16::try_from(count).map_err(|_| ProtocolError::PayloadTooLarge(count * 2))?;
        self.select(device)?;
        let words = self.read_holding_window(register.address(), quantity)?;
        if words.len() < count {
            return Err(BusError::IncompleteResponse {
                expected: count * 2,
                received: words.len() * 2,
            });
        }
        Ok(words)
    }

    fn write_byte(
        &mut self,
        device: DeviceId,
        register: Register,
        value: u8,
    ) -> Result<(), BusError> {
        self.select(device)?;
        let holding_address = holding_address(register.address())?;
        Ok(self
            .client()?
            .write_register(holding_address, u16::from(value))?)
    }

    fn read_bytes(
        &mut self,
        device: DeviceId,
        register: Register,
        count: usize,
    ) -> Result<Vec<u8>, BusError> {
        let quantity =
            u16::try_from((count + 1) / 2).map_err(|_| ProtocolError::PayloadTooLarge(count))?;
        self.select(device)?;
        let words = self.read_holding_window(register.address(), quantity)?;
        let mut bytes: Vec<u8> = words.iter().flat_map(|word| word.to_le_bytes()).collect();
        if bytes.len() < count {
            return Err(BusError::IncompleteResponse {
                expected: count,
                received: bytes.len(),
            });
        }
        bytes.truncate(count);
        Ok(bytes)
    }

    fn close(&mut self) -> Result<(), BusError> {
        if let Some(mut client) = self.client.take() {
            client.close()?;
        }
        Ok(())
    }
}

#[cfg(feature = "modbus")]
mod tcp {
    use super::*;
    use std::io;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio_modbus::client::sync::{self, Context, Reader, Writer};
    use tokio_modbus::slave::{Slave, SlaveContext};

    /// The port the hand listens on, rather than the usual 502.
    pub const DEFAULT_PORT: u16 = 6000;

    /// A blocking Modbus-TCP client.
    pub struct TcpModbusClient {
        context: Context,
    }

    impl TcpModbusClient {
        /// Connects to the hand. `timeout` bounds both the connection attempt and each request.
        pub fn connect(address: SocketAddr, timeout: Duration) -> io::Result<Self> {
            let context = sync::tcp::connect_slave_with_timeout(address, Slave(1), Some(timeout))?;
            Ok(Self { context })
        }
    }

    fn flatten<T>(result: tokio_modbus::Result<T>) -> Result<T, TransportError> {
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(exception)) => Err(TransportError::Exception(u8::from(exception))),
            Err(e) => Err(TransportError::Modbus(e.to_string())),
        }
    }

    impl ModbusClient for TcpModbusClient {
        fn read_holding_registers(
            &mut self,
            address: u16,
            count: u16,
        ) -> Result<Vec<u16>, TransportError> {
            flatten(self.context.read_holding_registers(address, count))
        }

        fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
            flatten(self.context.write_single_register(address, value))
        }

        fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), TransportError> {
            flatten(self.context.write_multiple_registers(address, values))
        }

        fn set_unit_id(&mut self, unit_id: u8) {
            self.context.set_slave(Slave(unit_id));
        }

        fn close(&mut self) -> Result<(), TransportError> {
            // The socket is closed when the context is dropped.
            Ok(())
        }
    }
}

#[cfg(feature = "modbus")]
pub use tcp::{TcpModbusClient, DEFAULT_PORT};
