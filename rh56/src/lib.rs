#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
pub mod bus;
mod error;
pub mod frame;
#[cfg(feature = "std")]
pub mod modbus;
pub mod registers;
#[cfg(feature = "std")]
pub mod transport;

#[cfg(feature = "std")]
pub use bus::{BusError, HandBus, SerialBus};
pub use error::ProtocolError;
#[cfg(feature = "std")]
pub use modbus::{ModbusBus, ModbusClient};
pub use registers::{address_of, Register, BASE_ADDRESS, JOINT_COUNT, MAX_JOINT_VALUE};
#[cfg(feature = "std")]
pub use transport::{ByteTransport, TransportError};

use bitflags::bitflags;

/// One value per joint, in actuator order: little finger, ring, middle, index, thumb bend,
/// thumb rotation.
pub type Joints<T> = [T; JOINT_COUNT];

/// The address of one hand on a shared serial bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DeviceId(pub u8);

impl Default for DeviceId {
    fn default() -> Self {
        Self(1)
    }
}

bitflags! {
    /// Fault flags reported by one actuator in the `ErrorCode` register.
    pub struct ActuatorErrors: u8 {
        const LOCKED_ROTOR = 0b0000_0001;
        const OVER_TEMPERATURE = 0b0000_0010;
        const OVER_CURRENT = 0b0000_0100;
        const MOTOR_FAULT = 0b0000_1000;
        const COMMUNICATION_FAULT = 0b0001_0000;
    }
}

/// Converts setpoints in the vendor's convention, where -1 means "leave this joint alone", into
/// optional values.
pub fn joint_targets(values: &[i32]) -> Result<Joints<Option<u16>>, ProtocolError> {
    if values.len() != JOINT_COUNT {
        return Err(ProtocolError::WrongJointCount(values.len()));
    }
    let mut targets = [None; JOINT_COUNT];
    for (target, &value) in targets.iter_mut().zip(values) {
        *target = match value {
            -1 => None,
            0..=1000 => Some(value as u16),
            _ => return Err(ProtocolError::InvalidJointValue(value)),
        };
    }
    Ok(targets)
}
