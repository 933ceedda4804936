use crate::frame::{self, Command, Reply};
use crate::transport::{ByteTransport, TransportError};
use crate::{
    ActuatorErrors, DeviceId, Joints, ProtocolError, Register, JOINT_COUNT, MAX_JOINT_VALUE,
};
use log::{debug, trace, warn};
use std::io;
use std::time::Duration;

/// How long to wait for each chunk of a reply before giving up on it.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(displaydoc::Display, Debug)]
pub enum BusError {
    /// {0}
    Protocol(ProtocolError),
    /// {0} is not a joint setpoint register
    InvalidRegisterForWrite(Register),
    /// {0} can't be read this way
    InvalidRegisterForRead(Register),
    /// value {value} for joint {joint} is above 1000
    JointValueOutOfRange { joint: usize, value: u16 },
    /// address {0} is below the Modbus base address
    AddressBelowBase(u16),
    /// incomplete response: expected {expected} bytes, got {received}
    IncompleteResponse { expected: usize, received: usize },
    /// transport error: {0}
    Transport(TransportError),
}

impl BusError {
    /// Whether the device simply didn't answer (fully), as opposed to the request being invalid
    /// or the connection failing.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            Self::Protocol(ProtocolError::EmptyResponse) | Self::IncompleteResponse { .. }
        )
    }
}

impl From<ProtocolError> for BusError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<TransportError> for BusError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<io::Error> for BusError {
    fn from(e: io::Error) -> Self {
        Self::Transport(TransportError::Io(e))
    }
}

impl std::error::Error for BusError {}

/// Register transactions against one or more hands.
///
/// Implementors provide raw word and byte windows; the joint-level operations are built on top of
/// those, so they behave the same whichever way the hand is connected.
pub trait HandBus {
    /// Writes consecutive 16-bit values starting at `register`.
    fn write_words(
        &mut self,
        device: DeviceId,
        register: Register,
        values: &[u16],
    ) -> Result<(), BusError>;

    /// Reads `count` consecutive 16-bit values starting at `register`.
    fn read_words(
        &mut self,
        device: DeviceId,
        register: Register,
        count: usize,
    ) -> Result<Vec<u16>, BusError>;

    /// Writes a single-byte register.
    fn write_byte(&mut self, device: DeviceId, register: Register, value: u8)
        -> Result<(), BusError>;

    /// Reads `count` consecutive bytes starting at `register`.
    fn read_bytes(
        &mut self,
        device: DeviceId,
        register: Register,
        count: usize,
    ) -> Result<Vec<u8>, BusError>;

    /// Releases the connection. Any further transaction fails.
    fn close(&mut self) -> Result<(), BusError>;

    /// Sets the angle, force threshold or speed of all six joints.
    fn write_joint_register(
        &mut self,
        device: DeviceId,
        register: Register,
        values: &Joints<u16>,
    ) -> Result<(), BusError> {
        if !register.is_joint_setpoint() {
            return Err(BusError::InvalidRegisterForWrite(register));
        }
        if let Some((joint, &value)) = values
            .iter()
            .enumerate()
            .find(|&(_, &value)| value > MAX_JOINT_VALUE)
        {
            return Err(BusError::JointValueOutOfRange { joint, value });
        }
        debug!("{:?}: {} <- {:?}", device, register, values);
        self.write_words(device, register, values)
    }

    /// Like [`write_joint_register`](Self::write_joint_register), but joints given as `None` keep
    /// their current setpoint.
    ///
    /// The protocol has no way to skip a joint within a write, so the current setpoints are read
    /// back first and re-sent for those joints. Returns the values that were written.
    fn update_joint_register(
        &mut self,
        device: DeviceId,
        register: Register,
        targets: &Joints<Option<u16>>,
    ) -> Result<Joints<u16>, BusError> {
        if !register.is_joint_setpoint() {
            return Err(BusError::InvalidRegisterForWrite(register));
        }
        let values = if targets.iter().all(Option::is_some) {
            targets.map(|target| target.unwrap_or_default())
        } else {
            let current = self.read_joint_register(device, register)?;
            debug!("{:?}: current {} for unset joints: {:?}", device, register, current);
            let mut values = current;
            for (value, target) in values.iter_mut().zip(targets) {
                if let Some(target) = target {
                    *value = *target;
                }
            }
            values
        };
        self.write_joint_register(device, register, &values)?;
        Ok(values)
    }

    /// Reads a per-joint setpoint or measurement.
    fn read_joint_register(
        &mut self,
        device: DeviceId,
        register: Register,
    ) -> Result<Joints<u16>, BusError> {
        if !register.is_joint_register() {
            return Err(BusError::InvalidRegisterForRead(register));
        }
        let words = self.read_words(device, register, JOINT_COUNT)?;
        if words.len() < JOINT_COUNT {
            return Err(BusError::IncompleteResponse {
                expected: JOINT_COUNT * 2,
                received: words.len() * 2,
            });
        }
        let mut values = [0; JOINT_COUNT];
        values.copy_from_slice(&words[..JOINT_COUNT]);
        Ok(values)
    }

    /// Reads the error flags, status or temperature of each actuator.
    fn read_diagnostic(
        &mut self,
        device: DeviceId,
        register: Register,
    ) -> Result<Joints<u8>, BusError> {
        if !register.is_diagnostic() {
            return Err(BusError::InvalidRegisterForRead(register));
        }
        let bytes = self.read_bytes(device, register, JOINT_COUNT)?;
        if bytes.len() < JOINT_COUNT {
            return Err(BusError::IncompleteResponse {
                expected: JOINT_COUNT,
                received: bytes.len(),
            });
        }
        let mut values = [0; JOINT_COUNT];
        values.copy_from_slice(&bytes[..JOINT_COUNT]);
        Ok(values)
    }

    fn read_actuator_errors(
        &mut self,
        device: DeviceId,
    ) -> Result<Joints<ActuatorErrors>, BusError> {
        let codes = self.read_diagnostic(device, Register::ErrorCode)?;
        Ok(codes.map(ActuatorErrors::from_bits_truncate))
    }

    /// Chooses which stored action sequence [`run_action_sequence`](Self::run_action_sequence)
    /// will play.
    fn select_action_sequence(&mut self, device: DeviceId, index: u8) -> Result<(), BusError> {
        self.write_byte(device, Register::ActionSequence, index)
    }

    fn run_action_sequence(&mut self, device: DeviceId) -> Result<(), BusError> {
        self.write_byte(device, Register::ActionRun, 1)
    }

    fn clear_errors(&mut self, device: DeviceId) -> Result<(), BusError> {
        self.write_byte(device, Register::ClearError, 1)
    }

    /// Starts force sensor calibration. Nothing may touch the fingers while it runs.
    fn calibrate_force(&mut self, device: DeviceId) -> Result<(), BusError> {
        self.write_byte(device, Register::ForceCalibration, 1)
    }

    fn save_parameters(&mut self, device: DeviceId) -> Result<(), BusError> {
        self.write_byte(device, Register::SaveParameters, 1)
    }

    fn reset_parameters(&mut self, device: DeviceId) -> Result<(), BusError> {
        self.write_byte(device, Register::ResetParameters, 1)
    }
}

/// Talks to hands over a serial bus (RS485, or anything else carrying the same frames).
pub struct SerialBus<T: ByteTransport> {
    transport: Option<T>,
    reply_timeout: Duration,
}

impl<T: ByteTransport> SerialBus<T> {
    pub fn new(transport: T) -> Self {
        Self::with_reply_timeout(transport, DEFAULT_REPLY_TIMEOUT)
    }

    pub fn with_reply_timeout(transport: T, reply_timeout: Duration) -> Self {
        Self {
            transport: Some(transport),
            reply_timeout,
        }
    }

    fn transport(&mut self) -> Result<&mut T, BusError> {
        self.transport
            .as_mut()
            .ok_or(BusError::Transport(TransportError::Closed))
    }

    /// Sends a frame and collects the reply to it, until either a whole reply frame has arrived
    /// or a read times out with nothing new.
    ///
    /// Frames answering some other request, such as a late acknowledgement or a reply from
    /// another hand, are skipped.
    fn transact(
        &mut self,
        request: &[u8],
        device: DeviceId,
        command: Command,
        register: Register,
    ) -> Result<Vec<u8>, BusError> {
        let address = register.address();
        let reply_timeout = self.reply_timeout;
        let transport = self.transport()?;
        trace!("Sending frame {:02x?}", request);
        transport.write(request)?;

        let mut buffer = vec![];
        loop {
            match Reply::parse(&buffer) {
                Ok((reply, used)) => {
                    if reply.answers(device, command, address) {
                        buffer.truncate(used);
                        trace!("Received {:02x?}", buffer);
                        return Ok(buffer);
                    }
                    debug!(
                        "Skipping {:?} reply from {:?} for address {}",
                        reply.command, reply.device, reply.address
                    );
                    buffer.drain(..used);
                    continue;
                }
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(e)) => {
                    trace!("Bad reply {:02x?}", buffer);
                    return Err(e.into());
                }
            }
            let chunk = transport.read_available(reply_timeout)?;
            if chunk.is_empty() {
                break;
            }
            buffer.extend(chunk);
        }

        // Timed out part way through a frame, or before anything arrived.
        if frame::partial_reply_answers(&buffer, device, command, address) == Some(false) {
            debug!("Skipping incomplete reply {:02x?}", buffer);
            buffer.clear();
        }
        trace!("Received {:02x?}", buffer);
        Ok(buffer)
    }

    fn write_payload(
        &mut self,
        device: DeviceId,
        register: Register,
        payload: &[u8],
    ) -> Result<(), BusError> {
        let request = frame::encode_write_frame(device, register.address(), payload)?;
        let reply = self.transact(&request, device, Command::Write, register)?;
        // The acknowledgement carries nothing we need, but it has to be consumed so that it isn't
        // mistaken for the reply to the next request.
        if reply.is_empty() {
            warn!("{:?}: no acknowledgement for write to {}", device, register);
        }
        Ok(())
    }

    fn read_payload(
        &mut self,
        device: DeviceId,
        register: Register,
        byte_count: usize,
    ) -> Result<Vec<u8>, BusError> {
        let count =
            u8::try_from(byte_count).map_err(|_| ProtocolError::PayloadTooLarge(byte_count))?;
        let request = frame::encode_read_frame(device, register.address(), count);
        let reply = self.transact(&request, device, Command::Read, register)?;
        let payload = frame::decode_read_response(&reply)?;
        if payload.len() < byte_count {
            return Err(BusError::IncompleteResponse {
                expected: byte_count,
                received: payload.len(),
            });
        }
        Ok(payload[..byte_count].to_vec())
    }
}

impl<T: ByteTransport> HandBus for SerialBus<T> {
    fn write_words(
        &mut self,
        device: DeviceId,
        register: Register,
        values: &[u16],
    ) -> Result<(), BusError> {
        let payload = frame::pack_words(values)?;
        self.write_payload(device, register, &payload)
    }

    fn read_words(
        &mut self,
        device: DeviceId,
        register: Register,
        count: usize,
    ) -> Result<Vec<u16>, BusError> {
        let payload = self.read_payload(device, register, count * 2)?;
        Ok(frame::unpack_words(&payload).collect())
    }

    fn write_byte(
        &mut self,
        device: DeviceId,
        register: Register,
        value: u8,
    ) -> Result<(), BusError> {
        self.write_payload(device, register, &[value])
    }

    fn read_bytes(
        &mut self,
        device: DeviceId,
        register: Register,
        count: usize,
    ) -> Result<Vec<u8>, BusError> {
        self.read_payload(device, register, count)
    }

    fn close(&mut self) -> Result<(), BusError> {
        if let Some(mut transport) = self.transport.take() {
            transport.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::checksum;
    use crate::transport::fake::FakeTransport;

    const HAND: DeviceId = DeviceId(1);

    fn reply(device: u8, command: u8, register: Register, payload: &[u8]) -> Vec<u8> {
        let mut reply = vec![0x90, 0xEB, device, payload.len() as u8 + 3, command];
        reply.extend(register.address().to_le_bytes());
        reply.extend(payload);
        let checksum = checksum(&reply);
        reply.push(checksum);
        reply
    }

    fn ack(register: Register) -> Vec<u8> {
        reply(1, 0x12, register, &[0x01])
    }

    fn angles_payload() -> Vec<u8> {
        vec![
            0x00, 0x00, 0x64, 0x00, 0xC8, 0x00, 0x2C, 0x01, 0x90, 0x01, 0xF4, 0x01,
        ]
    }

    fn bus(replies: impl IntoIterator<Item = Vec<u8>>) -> SerialBus<FakeTransport> {
        SerialBus::new(FakeTransport::with_replies(replies))
    }

    fn written(bus: &SerialBus<FakeTransport>) -> &[Vec<u8>] {
        &bus.transport.as_ref().unwrap().written
    }

    mod write {
        use super::*;

        #[test]
        fn speed_set_frame() {
            let mut bus = bus([ack(Register::SpeedSet)]);
            bus.write_joint_register(HAND, Register::SpeedSet, &[1000; 6])
                .unwrap();
            assert_eq!(
                written(&bus),
                [vec![
                    0xEB, 0x90, 0x01, 0x0F, 0x12, 0xF2, 0x05, 0xE8, 0x03, 0xE8, 0x03, 0xE8, 0x03,
                    0xE8, 0x03, 0xE8, 0x03, 0xE8, 0x03, 0x9B
                ]]
            );
        }

        #[test]
        fn missing_acknowledgement_is_not_an_error() {
            let mut bus = bus([]);
            bus.write_joint_register(HAND, Register::AngleSet, &[0; 6])
                .unwrap();
            assert_eq!(written(&bus).len(), 1);
        }

        #[test]
        fn acknowledgement_split_across_reads() {
            let ack = ack(Register::ForceSet);
            let mut bus = bus([ack[..4].to_vec(), ack[4..].to_vec(), ack.clone()]);
            bus.write_joint_register(HAND, Register::ForceSet, &[500; 6])
                .unwrap();
            // The third chunk belongs to whatever comes next, so it must not have been read.
            assert_eq!(bus.transport.as_ref().unwrap().reads, 2);
        }

        #[test]
        fn rejects_measurement_registers() {
            let mut bus = bus([]);
            assert!(matches!(
                bus.write_joint_register(HAND, Register::AngleActual, &[0; 6]),
                Err(BusError::InvalidRegisterForWrite(Register::AngleActual))
            ));
            assert!(written(&bus).is_empty());
        }

        #[test]
        fn rejects_out_of_range_values() {
            let mut bus = bus([]);
            assert!(matches!(
                bus.write_joint_register(HAND, Register::AngleSet, &[0, 0, 0, 1001, 0, 0]),
                Err(BusError::JointValueOutOfRange {
                    joint: 3,
                    value: 1001
                })
            ));
            assert!(written(&bus).is_empty());
        }

        #[test]
        fn select_and_run_action_sequence() {
            let mut bus = bus([ack(Register::ActionSequence), ack(Register::ActionRun)]);
            bus.select_action_sequence(HAND, 3).unwrap();
            bus.run_action_sequence(HAND).unwrap();
            assert_eq!(
                written(&bus),
                [
                    vec![0xEB, 0x90, 0x01, 0x04, 0x12, 0x10, 0x09, 0x03, 0x33],
                    vec![0xEB, 0x90, 0x01, 0x04, 0x12, 0x12, 0x09, 0x01, 0x33],
                ]
            );
        }

        #[test]
        fn clear_errors() {
            let mut bus = bus([ack(Register::ClearError)]);
            bus.clear_errors(HAND).unwrap();
            let frame = &written(&bus)[0];
            assert_eq!(&frame[5..8], [0xEC, 0x03, 0x01]);
        }
    }

    mod read {
        use super::*;

        #[test]
        fn angle_actual() {
            let mut bus = bus([reply(1, 0x11, Register::AngleActual, &angles_payload())]);
            let angles = bus.read_joint_register(HAND, Register::AngleActual).unwrap();
            assert_eq!(angles, [0, 100, 200, 300, 400, 500]);
            assert_eq!(
                written(&bus),
                [vec![0xEB, 0x90, 0x01, 0x04, 0x11, 0x0A, 0x06, 0x0C, 0x32]]
            );
        }

        #[test]
        fn reply_without_checksum() {
            let mut response = reply(1, 0x11, Register::AngleActual, &angles_payload());
            response.pop();
            assert_eq!(response.len(), 19);
            let mut bus = bus([response]);
            assert_eq!(
                bus.read_joint_register(HAND, Register::AngleActual).unwrap(),
                [0, 100, 200, 300, 400, 500]
            );
        }

        #[test]
        fn reply_split_across_reads() {
            let response = reply(1, 0x11, Register::ForceActual, &angles_payload());
            let mut bus = bus([
                response[..3].to_vec(),
                response[3..10].to_vec(),
                response[10..].to_vec(),
            ]);
            assert_eq!(
                bus.read_joint_register(HAND, Register::ForceActual).unwrap(),
                [0, 100, 200, 300, 400, 500]
            );
        }

        #[test]
        fn empty_reply_is_no_data() {
            let mut bus = bus([]);
            let error = bus
                .read_joint_register(HAND, Register::AngleActual)
                .unwrap_err();
            assert!(matches!(
                error,
                BusError::Protocol(ProtocolError::EmptyResponse)
            ));
            assert!(error.is_no_data());

            // The session carries on afterwards.
            bus.transport
                .as_mut()
                .unwrap()
                .replies
                .push_back(reply(1, 0x11, Register::AngleActual, &angles_payload()));
            assert!(bus.read_joint_register(HAND, Register::AngleActual).is_ok());
        }

        #[test]
        fn short_reply_is_incomplete() {
            let response = reply(1, 0x11, Register::AngleActual, &angles_payload());
            let mut bus = bus([response[..15].to_vec()]);
            let error = bus
                .read_joint_register(HAND, Register::AngleActual)
                .unwrap_err();
            assert!(matches!(
                error,
                BusError::IncompleteResponse {
                    expected: 12,
                    received: 8
                }
            ));
            assert!(error.is_no_data());
        }

        #[test]
        fn short_declared_length_is_incomplete() {
            let mut bus = bus([reply(1, 0x11, Register::AngleSet, &angles_payload()[..10])]);
            assert!(matches!(
                bus.read_joint_register(HAND, Register::AngleSet),
                Err(BusError::IncompleteResponse {
                    expected: 12,
                    received: 10
                })
            ));
        }

        #[test]
        fn bad_checksum() {
            let mut response = reply(1, 0x11, Register::AngleActual, &angles_payload());
            let last = response.len() - 1;
            response[last] = response[last].wrapping_add(1);
            let mut bus = bus([response]);
            assert!(matches!(
                bus.read_joint_register(HAND, Register::AngleActual),
                Err(BusError::Protocol(ProtocolError::ChecksumMismatch { .. }))
            ));
        }

        #[test]
        fn rejects_diagnostic_register() {
            let mut bus = bus([]);
            assert!(matches!(
                bus.read_joint_register(HAND, Register::Temperature),
                Err(BusError::InvalidRegisterForRead(Register::Temperature))
            ));
        }

        #[test]
        fn temperature() {
            let mut bus = bus([reply(1, 0x11, Register::Temperature, &[30, 31, 32, 33, 34, 35])]);
            assert_eq!(
                bus.read_diagnostic(HAND, Register::Temperature).unwrap(),
                [30, 31, 32, 33, 34, 35]
            );
            assert_eq!(written(&bus)[0][7], 6);
        }

        #[test]
        fn short_diagnostic_is_incomplete() {
            let mut bus = bus([reply(1, 0x11, Register::StatusCode, &[1, 2, 3, 4, 5])]);
            assert!(matches!(
                bus.read_diagnostic(HAND, Register::StatusCode),
                Err(BusError::IncompleteResponse {
                    expected: 6,
                    received: 5
                })
            ));
        }

        #[test]
        fn diagnostic_rejects_joint_register() {
            let mut bus = bus([]);
            assert!(matches!(
                bus.read_diagnostic(HAND, Register::AngleSet),
                Err(BusError::InvalidRegisterForRead(Register::AngleSet))
            ));
        }

        #[test]
        fn actuator_errors() {
            let mut bus = bus([reply(1, 0x11, Register::ErrorCode, &[0, 1, 0, 6, 0, 0x10])]);
            let errors = bus.read_actuator_errors(HAND).unwrap();
            assert!(errors[0].is_empty());
            assert_eq!(errors[1], ActuatorErrors::LOCKED_ROTOR);
            assert_eq!(
                errors[3],
                ActuatorErrors::OVER_TEMPERATURE | ActuatorErrors::OVER_CURRENT
            );
            assert_eq!(errors[5], ActuatorErrors::COMMUNICATION_FAULT);
        }
    }

    mod matching {
        use super::*;

        #[test]
        fn late_acknowledgement_is_skipped() {
            let mut bus = bus([
                vec![],
                ack(Register::SpeedSet),
                reply(1, 0x11, Register::AngleActual, &angles_payload()),
            ]);
            bus.write_joint_register(HAND, Register::SpeedSet, &[1000; 6])
                .unwrap();
            assert_eq!(
                bus.read_joint_register(HAND, Register::AngleActual).unwrap(),
                [0, 100, 200, 300, 400, 500]
            );
            // Nothing is left over to answer the next request.
            assert!(bus
                .read_joint_register(HAND, Register::AngleActual)
                .unwrap_err()
                .is_no_data());
        }

        #[test]
        fn acknowledgement_and_reply_in_one_chunk() {
            let mut chunk = ack(Register::SpeedSet);
            chunk.extend(reply(1, 0x11, Register::AngleActual, &angles_payload()));
            let mut bus = bus([chunk]);
            assert_eq!(
                bus.read_joint_register(HAND, Register::AngleActual).unwrap(),
                [0, 100, 200, 300, 400, 500]
            );
        }

        #[test]
        fn unrelated_acknowledgement_is_not_ours() {
            let mut bus = bus([ack(Register::SpeedSet)]);
            bus.write_joint_register(HAND, Register::ForceSet, &[500; 6])
                .unwrap();
            // The stray ack was skipped, and reading went on until the timeout.
            assert_eq!(bus.transport.as_ref().unwrap().reads, 2);
        }

        #[test]
        fn reply_for_another_register_is_no_data() {
            let mut bus = bus([reply(1, 0x11, Register::AngleActual, &angles_payload())]);
            assert!(matches!(
                bus.read_diagnostic(HAND, Register::Temperature),
                Err(BusError::Protocol(ProtocolError::EmptyResponse))
            ));
        }

        #[test]
        fn reply_from_another_hand_is_skipped() {
            let mut bus = bus([
                reply(2, 0x11, Register::Temperature, &[40; 6]),
                reply(1, 0x11, Register::Temperature, &[30, 31, 32, 33, 34, 35]),
            ]);
            assert_eq!(
                bus.read_diagnostic(HAND, Register::Temperature).unwrap(),
                [30, 31, 32, 33, 34, 35]
            );
        }

        #[test]
        fn truncated_reply_for_another_register_is_no_data() {
            let mut response = reply(1, 0x11, Register::AngleActual, &angles_payload());
            response.pop();
            let mut bus = bus([response]);
            assert!(matches!(
                bus.read_joint_register(HAND, Register::ForceActual),
                Err(BusError::Protocol(ProtocolError::EmptyResponse))
            ));
        }
    }

    mod update {
        use super::*;

        #[test]
        fn all_joints_given_writes_directly() {
            let mut bus = bus([ack(Register::AngleSet)]);
            let written_values = bus
                .update_joint_register(HAND, Register::AngleSet, &[Some(0); 6])
                .unwrap();
            assert_eq!(written_values, [0; 6]);
            assert_eq!(written(&bus).len(), 1);
            assert_eq!(written(&bus)[0][4], 0x12);
        }

        #[test]
        fn unset_joints_keep_current_setpoint() {
            let mut bus = bus([
                reply(1, 0x11, Register::AngleSet, &angles_payload()),
                ack(Register::AngleSet),
            ]);
            let written_values = bus
                .update_joint_register(
                    HAND,
                    Register::AngleSet,
                    &[None, Some(1000), None, None, Some(0), None],
                )
                .unwrap();
            assert_eq!(written_values, [0, 1000, 200, 300, 0, 500]);

            let frames = written(&bus);
            assert_eq!(frames.len(), 2);
            assert_eq!(frames[0][4], 0x11);
            assert_eq!(
                frame::unpack_words(&frames[1][7..19]).collect::<Vec<_>>(),
                [0, 1000, 200, 300, 0, 500]
            );
            // Never the raw bit pattern of -1.
            assert!(!frames[1][7..19].windows(2).any(|pair| pair == [0xFF, 0xFF]));
        }

        #[test]
        fn nothing_written_if_current_setpoint_unavailable() {
            let mut bus = bus([]);
            let error = bus
                .update_joint_register(HAND, Register::SpeedSet, &[None; 6])
                .unwrap_err();
            assert!(error.is_no_data());
            assert_eq!(written(&bus).len(), 1);
            assert_eq!(written(&bus)[0][4], 0x11);
        }
    }

    #[test]
    fn closed_bus_fails() {
        let mut bus = bus([]);
        bus.close().unwrap();
        assert!(bus.transport.is_none());
        assert!(matches!(
            bus.read_diagnostic(HAND, Register::Temperature),
            Err(BusError::Transport(TransportError::Closed))
        ));
        // Closing twice is harmless.
        bus.close().unwrap();
    }

    #[test]
    fn works_as_trait_object() {
        let mut bus: Box<dyn HandBus> = Box::new(bus([ack(Register::ActionRun)]));
        bus.run_action_sequence(HAND).unwrap();
    }
}
