//! A 128-bit UUID, as exchanged with the Matter stack
//!
//! The backing storage is BIG-ENDIAN: bytes[0..8) hold the most-significant
//! 64 bits, bytes[8..16) the least-significant 64 bits. This is also the wire
//! form used for service and characteristic ids crossing the bridge.

use std::fmt;

/// A UUID (See Core Spec 5.3 Vol 1E 2.9.1. Basic Types)
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
#[repr(transparent)]
pub struct Uuid([u8; 16]);

const BASE_UUID: u128 = 0x00000000_0000_1000_8000_0080_5F9B_34FB;

/// A byte slice that is not exactly 16 bytes long was offered as a UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UuidLengthError {
    /// The length actually received
    pub len: usize,
}

impl Uuid {
    /// Constructor from a u32, relative to the Bluetooth base UUID
    pub const fn new(val: u32) -> Self {
        Self((BASE_UUID + ((val as u128) << 96)).to_be_bytes())
    }

    /// Constructor from the full 128-bit value
    pub const fn from_u128(val: u128) -> Self {
        Self(val.to_be_bytes())
    }

    /// The full 128-bit value
    pub const fn as_u128(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    /// The 16-byte big-endian wire form
    pub const fn to_bytes(&self) -> [u8; 16] {
        self.0
    }

    /// If this UUID is derived from the Bluetooth base UUID and fits in
    /// 16 bits, return the short form
    pub fn as_u16(&self) -> Option<u16> {
        let backing = self.as_u128();
        if backing & ((1u128 << 96) - 1) == BASE_UUID {
            u16::try_from(backing >> 96).ok()
        } else {
            None
        }
    }
}

impl From<[u8; 16]> for Uuid {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Uuid {
    type Error = UuidLengthError;

    fn try_from(bytes: &[u8]) -> Result<Self, UuidLengthError> {
        bytes.try_into().map(Self).map_err(|_| UuidLengthError { len: bytes.len() })
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl fmt::Display for UuidLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected 16 UUID bytes, got {}", self.len)
    }
}

impl std::error::Error for UuidLengthError {}
