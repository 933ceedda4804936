use crate::ProtocolError;
use core::fmt::{self, Display, Formatter};
use core::str::FromStr;

/// Offset subtracted from absolute register addresses to get Modbus holding-register addresses.
pub const BASE_ADDRESS: u16 = 1000;

/// Number of actuated degrees of freedom on the hand.
pub const JOINT_COUNT: usize = 6;

/// The largest value accepted by the angle, force and speed setpoint registers.
pub const MAX_JOINT_VALUE: u16 = 1000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum Register {
    /**
     * Hand ID
     *
     * Address of the hand on a shared RS485 bus.
     *
     * bytes: 1
     * authority: read&write
     */
    Id = 1000,

    /**
     * Baud rate
     *
     * bytes: 1
     * authority: read&write
     */
    BaudRate = 1001,

    /**
     * Clear errors
     *
     * Writing 1 clears the latched fault flags of every actuator.
     *
     * bytes: 1
     * authority: write
     */
    ClearError = 1004,

    /**
     * Save parameters
     *
     * Writing 1 stores the current configuration to flash.
     *
     * bytes: 1
     * authority: write
     */
    SaveParameters = 1005,

    /**
     * Reset parameters
     *
     * Writing 1 restores the factory configuration.
     *
     * bytes: 1
     * authority: write
     */
    ResetParameters = 1006,

    /**
     * Force sensor calibration
     *
     * Writing 1 starts calibration of the finger force sensors. The hand must not be touching
     * anything while this runs.
     *
     * bytes: 1
     * authority: write
     */
    ForceCalibration = 1009,

    /**
     * Power-on speed of each joint
     *
     * The speed setpoint loaded at start-up, until `SpeedSet` is written.
     *
     * bytes: 12 (6 × u16)
     * authority: read&write
     * minimum_value: 0
     * maximum_value: 1000
     */
    DefaultSpeedSet = 1032,

    /**
     * Angle setpoint of each joint
     *
     * bytes: 12 (6 × u16)
     * authority: read&write
     * minimum_value: 0
     * maximum_value: 1000
     */
    AngleSet = 1486,

    /**
     * Force threshold setpoint of each joint
     *
     * bytes: 12 (6 × u16)
     * authority: read&write
     * minimum_value: 0
     * maximum_value: 1000
     */
    ForceSet = 1498,

    /**
     * Speed setpoint of each joint
     *
     * bytes: 12 (6 × u16)
     * authority: read&write
     * minimum_value: 0
     * maximum_value: 1000
     */
    SpeedSet = 1522,

    /**
     * Measured angle of each joint
     *
     * bytes: 12 (6 × u16)
     * authority: read
     */
    AngleActual = 1546,

    /**
     * Measured force on each finger
     *
     * bytes: 12 (6 × u16)
     * authority: read
     */
    ForceActual = 1582,

    /**
     * Fault flags of each actuator
     *
     * See [`ActuatorErrors`](crate::ActuatorErrors) for the meaning of each bit.
     *
     * bytes: 6 (6 × u8)
     * authority: read
     */
    ErrorCode = 1606,

    /**
     * Motion status of each actuator
     *
     * bytes: 6 (6 × u8)
     * authority: read
     */
    StatusCode = 1612,

    /**
     * Temperature of each actuator
     *
     * bytes: 6 (6 × u8)
     * authority: read
     * unit: °C
     */
    Temperature = 1618,

    /**
     * Index of the stored action sequence to run
     *
     * bytes: 1
     * authority: read&write
     */
    ActionSequence = 2320,

    /**
     * Run the selected action sequence
     *
     * Writing 1 starts the sequence selected in `ActionSequence`.
     *
     * bytes: 1
     * authority: write
     */
    ActionRun = 2322,
}

impl Register {
    pub const ALL: [Register; 17] = [
        Self::Id,
        Self::BaudRate,
        Self::ClearError,
        Self::SaveParameters,
        Self::ResetParameters,
        Self::ForceCalibration,
        Self::DefaultSpeedSet,
        Self::AngleSet,
        Self::ForceSet,
        Self::SpeedSet,
        Self::AngleActual,
        Self::ForceActual,
        Self::ErrorCode,
        Self::StatusCode,
        Self::Temperature,
        Self::ActionSequence,
        Self::ActionRun,
    ];

    /// The absolute address used on the serial bus.
    pub fn address(self) -> u16 {
        self as u16
    }

    pub fn from_address(address: u16) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|register| register.address() == address)
    }

    /// The number of bytes the register occupies in device memory.
    pub fn byte_len(self) -> u8 {
        match self {
            Self::DefaultSpeedSet
            | Self::AngleSet
            | Self::ForceSet
            | Self::SpeedSet
            | Self::AngleActual
            | Self::ForceActual => 12,
            Self::ErrorCode | Self::StatusCode | Self::Temperature => 6,
            Self::Id
            | Self::BaudRate
            | Self::ClearError
            | Self::SaveParameters
            | Self::ResetParameters
            | Self::ForceCalibration
            | Self::ActionSequence
            | Self::ActionRun => 1,
        }
    }

    /// The number of 16-bit slots a transaction on this register spans.
    pub fn width(self) -> u16 {
        (u16::from(self.byte_len()) + 1) / 2
    }

    /// Whether the register holds one 16-bit setpoint per joint.
    pub fn is_joint_setpoint(self) -> bool {
        matches!(
            self,
            Self::DefaultSpeedSet | Self::AngleSet | Self::ForceSet | Self::SpeedSet
        )
    }

    /// Whether the register holds one 16-bit value per joint (setpoints or measurements).
    pub fn is_joint_register(self) -> bool {
        self.is_joint_setpoint() || matches!(self, Self::AngleActual | Self::ForceActual)
    }

    /// Whether the register holds one status byte per joint.
    pub fn is_diagnostic(self) -> bool {
        matches!(self, Self::ErrorCode | Self::StatusCode | Self::Temperature)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::BaudRate => "BaudRate",
            Self::ClearError => "ClearError",
            Self::SaveParameters => "SaveParameters",
            Self::ResetParameters => "ResetParameters",
            Self::ForceCalibration => "ForceCalibration",
            Self::DefaultSpeedSet => "DefaultSpeedSet",
            Self::AngleSet => "AngleSet",
            Self::ForceSet => "ForceSet",
            Self::SpeedSet => "SpeedSet",
            Self::AngleActual => "AngleActual",
            Self::ForceActual => "ForceActual",
            Self::ErrorCode => "ErrorCode",
            Self::StatusCode => "StatusCode",
            Self::Temperature => "Temperature",
            Self::ActionSequence => "ActionSequence",
            Self::ActionRun => "ActionRun",
        }
    }

    /// The short names used by the vendor's demo scripts.
    fn legacy_name(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::BaudRate => "baudrate",
            Self::ClearError => "clearErr",
            Self::SaveParameters => "save",
            Self::ResetParameters => "resetPara",
            Self::ForceCalibration => "forceClb",
            Self::DefaultSpeedSet => "defaultSpeedSet",
            Self::AngleSet => "angleSet",
            Self::ForceSet => "forceSet",
            Self::SpeedSet => "speedSet",
            Self::AngleActual => "angleAct",
            Self::ForceActual => "forceAct",
            Self::ErrorCode => "errCode",
            Self::StatusCode => "statusCode",
            Self::Temperature => "temp",
            Self::ActionSequence => "actionSeq",
            Self::ActionRun => "actionRun",
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = ProtocolError;

    /// Accepts both the canonical names (`AngleSet`) and the vendor's short names (`angleSet`).
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|register| register.name() == name || register.legacy_name() == name)
            .ok_or(ProtocolError::UnknownRegister)
    }
}

/// Looks up the address of a register given by name.
pub fn address_of(name: &str) -> Result<u16, ProtocolError> {
    name.parse::<Register>().map(Register::address)
}
