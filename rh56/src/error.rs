#[derive(displaydoc::Display, Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProtocolError {
    /// unknown register name
    UnknownRegister,
    /// payload of {0} bytes doesn't fit in a frame
    PayloadTooLarge(usize),
    /// no response received
    EmptyResponse,
    /// invalid length byte `{0}` in reply frame
    InvalidLength(u8),
    /// checksum mismatch: computed {expected:#04x}, received {received:#04x}
    ChecksumMismatch { expected: u8, received: u8 },
    /// joint value `{0}` is neither a placeholder (-1) nor in 0..=1000
    InvalidJointValue(i32),
    /// expected 6 joint values, got {0}
    WrongJointCount(usize),
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}
