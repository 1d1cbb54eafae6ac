//! An address with type (public / random)

use std::fmt;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
/// The type of an LE address (see: 5.3 Vol 6B 1.3 Device Address)
pub enum AddressType {
    /// A public address
    Public = 0x0,
    /// A random address (either random static or private)
    Random = 0x1,
}

/// The identity of a remote LE endpoint. Two sightings of the same peer
/// compare equal.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct AddressWithType {
    /// The 6 address bytes, most-significant first (display order)
    pub address: [u8; 6],
    /// The address type, either public or random
    pub address_type: AddressType,
}

impl AddressWithType {
    /// Constructor for a public address
    pub const fn public(address: [u8; 6]) -> Self {
        Self { address, address_type: AddressType::Public }
    }
}

impl fmt::Display for AddressWithType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.address;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a[0], a[1], a[2], a[3], a[4], a[5])?;
        if self.address_type == AddressType::Random {
            write!(f, " (random)")?;
        }
        Ok(())
    }
}
