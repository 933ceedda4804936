use crate::{DeviceId, ProtocolError};
use arrayvec::ArrayVec;
use nb::Error::WouldBlock;

/// The first two bytes of every request frame.
pub const HEADER: [u8; 2] = [0xEB, 0x90];
/// The length field is a single byte which also counts the command and address bytes.
pub const MAX_PAYLOAD_LEN: usize = 252;
/// Offset of the first payload byte: header, id, length, command and address come first.
pub const PAYLOAD_OFFSET: usize = 7;
pub const MAX_FRAME_LEN: usize = PAYLOAD_OFFSET + MAX_PAYLOAD_LEN + 1;

/// Bytes counted by the length field in addition to the payload.
const LENGTH_OVERHEAD: u8 = 3;

pub type FrameBuf = ArrayVec<u8, MAX_FRAME_LEN>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Command {
    Read = 0x11,
    Write = 0x12,
}

impl Command {
    pub fn parse(byte: u8) -> Option<Self> {
        match byte {
            0x11 => Some(Self::Read),
            0x12 => Some(Self::Write),
            _ => None,
        }
    }
}

/// Sums everything after the two header bytes, modulo 256.
pub fn checksum(body: &[u8]) -> u8 {
    body.iter()
        .skip(HEADER.len())
        .fold(0, |sum, byte| sum.wrapping_add(*byte))
}

/// Builds a frame writing `payload` to the device's memory starting at `address`.
pub fn encode_write_frame(
    device: DeviceId,
    address: u16,
    payload: &[u8],
) -> Result<FrameBuf, ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge(payload.len()));
    }
    Ok(encode(device, Command::Write, address, payload))
}

/// Builds a frame asking the device for `byte_count` bytes of memory starting at `address`.
///
/// Note that this is a count of bytes, not of 16-bit registers: six joint values need 12.
pub fn encode_read_frame(device: DeviceId, address: u16, byte_count: u8) -> FrameBuf {
    encode(device, Command::Read, address, &[byte_count])
}

fn encode(device: DeviceId, command: Command, address: u16, payload: &[u8]) -> FrameBuf {
    let mut frame = FrameBuf::new();
    frame.extend(HEADER);
    frame.push(device.0);
    frame.push(payload.len() as u8 + LENGTH_OVERHEAD);
    frame.push(command as u8);
    frame.extend(address.to_le_bytes());
    frame.extend(payload.iter().copied());
    frame.push(checksum(&frame));
    frame
}

fn payload_len(length: u8) -> Result<usize, ProtocolError> {
    length
        .checked_sub(LENGTH_OVERHEAD)
        .map(usize::from)
        .ok_or(ProtocolError::InvalidLength(length))
}

fn verify_checksum(body: &[u8], received: u8) -> Result<(), ProtocolError> {
    let expected = checksum(body);
    if expected == received {
        Ok(())
    } else {
        Err(ProtocolError::ChecksumMismatch { expected, received })
    }
}

/// Extracts the payload of a reply to a read request.
///
/// The length byte decides how many payload bytes there should be. If fewer than that arrived,
/// the returned slice is shorter, and it's up to the caller to decide whether that's enough. The
/// checksum is verified when it was received.
pub fn decode_read_response(bytes: &[u8]) -> Result<&[u8], ProtocolError> {
    if bytes.is_empty() {
        return Err(ProtocolError::EmptyResponse);
    }
    let length = match bytes.get(3) {
        Some(length) => *length,
        None => return Ok(&[]),
    };
    let end = PAYLOAD_OFFSET + payload_len(length)?;
    if let Some(received) = bytes.get(end) {
        verify_checksum(&bytes[..end], *received)?;
    }
    Ok(bytes
        .get(PAYLOAD_OFFSET..end.min(bytes.len()))
        .unwrap_or(&[]))
}

/// A complete frame sent back by the hand.
///
/// The hand answers with the header bytes swapped (0x90 0xEB), so the header is skipped rather
/// than matched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Reply<'a> {
    pub device: DeviceId,
    pub command: Option<Command>,
    pub address: u16,
    pub payload: &'a [u8],
}

impl<'a> Reply<'a> {
    /// Parses a reply from the start of `buf`, returning it along with the number of bytes it
    /// used. Returns `WouldBlock` until the whole frame, checksum included, has been received.
    pub fn parse(buf: &'a [u8]) -> nb::Result<(Self, usize), ProtocolError> {
        let length = match *buf {
            [_, _, _, length, ..] => length,
            _ => return Err(WouldBlock),
        };
        let end = PAYLOAD_OFFSET + payload_len(length)?;
        if buf.len() <= end {
            return Err(WouldBlock);
        }
        verify_checksum(&buf[..end], buf[end])?;

        let reply = Reply {
            device: DeviceId(buf[2]),
            command: Command::parse(buf[4]),
            address: u16::from_le_bytes([buf[5], buf[6]]),
            payload: &buf[PAYLOAD_OFFSET..end],
        };
        Ok((reply, end + 1))
    }

    /// Whether this is the reply to a `command` request for `address` on `device`.
    pub fn answers(&self, device: DeviceId, command: Command, address: u16) -> bool {
        self.device == device && self.command == Some(command) && self.address == address
    }
}

/// Like [`Reply::answers`], for a reply which may have been cut short. Returns `None` until the
/// device, command and address bytes have all arrived.
pub fn partial_reply_answers(
    buf: &[u8],
    device: DeviceId,
    command: Command,
    address: u16,
) -> Option<bool> {
    match *buf {
        [_, _, id, _, cmd, low, high, ..] => Some(
            id == device.0 && cmd == command as u8 && u16::from_le_bytes([low, high]) == address,
        ),
        _ => None,
    }
}

/// Packs 16-bit values little-endian, in order, as they are laid out in device memory.
pub fn pack_words(values: &[u16]) -> Result<ArrayVec<u8, MAX_PAYLOAD_LEN>, ProtocolError> {
    let mut bytes = ArrayVec::new();
    for value in values {
        bytes
            .try_extend_from_slice(&value.to_le_bytes())
            .map_err(|_| ProtocolError::PayloadTooLarge(values.len() * 2))?;
    }
    Ok(bytes)
}

/// The inverse of [`pack_words`]. A trailing odd byte is ignored.
pub fn unpack_words(bytes: &[u8]) -> impl Iterator<Item = u16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
}
