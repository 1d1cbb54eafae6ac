//! Link-level events the platform feeds into the bridge. Each variant
//! stands in for one platform callback.

use crate::core::{address::AddressWithType, uuid::Uuid};

use super::platform::{ClientLink, GattStatus};

/// Why advertising could not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseFailure {
    /// The advertisement does not fit
    DataTooLarge,
    /// No advertising instance is available
    TooManyAdvertisers,
    /// Advertising was already started
    AlreadyStarted,
    /// Internal platform error
    InternalError,
    /// The controller does not support the requested feature
    FeatureUnsupported,
}

/// An event from the platform's GATT server or GATT client callbacks
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A peer connected to the local GATT server
    Connected {
        /// Remote endpoint
        device: AddressWithType,
    },
    /// A peer disconnected from the local GATT server, or failed to connect
    Disconnected {
        /// Remote endpoint
        device: AddressWithType,
        /// Reported status
        status: GattStatus,
    },
    /// A service was registered on the local GATT server
    ServiceAdded {
        /// Reported status
        status: GattStatus,
        /// The registered service
        service: Uuid,
    },
    /// A peer wrote a local characteristic
    CharacteristicWriteRequest {
        /// Remote endpoint
        device: AddressWithType,
        /// Used when responding
        request_id: u32,
        /// Characteristic written
        characteristic: Uuid,
        /// Written data
        value: Vec<u8>,
        /// Whether the peer expects a response
        response_needed: bool,
        /// Write offset
        offset: u32,
    },
    /// A peer wrote a local descriptor
    DescriptorWriteRequest {
        /// Remote endpoint
        device: AddressWithType,
        /// Used when responding
        request_id: u32,
        /// Descriptor written
        descriptor: Uuid,
        /// Written data
        value: Vec<u8>,
    },
    /// A notification or indication left the local GATT server
    NotificationSent {
        /// Remote endpoint
        device: AddressWithType,
        /// Reported status
        status: GattStatus,
    },
    /// Advertising started
    AdvertisingStarted,
    /// Advertising failed to start
    AdvertisingFailed(AdvertiseFailure),
    /// The connection state of a client link changed
    ClientConnectionStateChanged {
        /// The link
        link: ClientLink,
        /// Reported status
        status: GattStatus,
        /// Whether the link is now connected
        connected: bool,
    },
    /// A characteristic write issued on a client link completed
    CharacteristicWritten {
        /// The link
        link: ClientLink,
        /// Service of the written characteristic
        service: Uuid,
        /// Characteristic written
        characteristic: Uuid,
        /// Reported status
        status: GattStatus,
    },
    /// A remote characteristic changed (notification or indication received)
    CharacteristicChanged {
        /// The link
        link: ClientLink,
        /// Service of the changed characteristic
        service: Uuid,
        /// Changed characteristic
        characteristic: Uuid,
        /// New value
        value: Vec<u8>,
    },
    /// A descriptor write issued on a client link completed
    DescriptorWritten {
        /// The link
        link: ClientLink,
        /// Service of the descriptor's characteristic
        service: Uuid,
        /// The descriptor's characteristic
        characteristic: Uuid,
        /// The value that was written
        value: Vec<u8>,
        /// Reported status
        status: GattStatus,
    },
}
