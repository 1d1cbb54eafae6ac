//! These are strongly-typed identifiers representing the various objects
//! interacted with by the Matter stack

use std::fmt;

/// The bridge-internal handle for a link, as seen by the Matter stack.
/// Valid ids start at 1; see [`ConnectionId::NONE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

impl ConnectionId {
    /// Reserved: "not found / no active connection"
    pub const NONE: Self = Self(0);

    /// Id for the given 0-based slot
    pub(crate) fn from_slot(slot: usize) -> Self {
        Self(slot as u32 + 1)
    }

    /// The 0-based slot this id addresses, if it can address one
    pub(crate) fn slot(&self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }

    /// Whether this is a valid (non-zero) id
    pub fn is_valid(&self) -> bool {
        *self != Self::NONE
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
