//! Seams to the platform Bluetooth stack. Each platform provides its own
//! implementation of these traits and feeds its callbacks back to the
//! bridge as [`super::events::LinkEvent`]s.

use std::{fmt, sync::Arc};

use crate::core::{address::AddressWithType, uuid::Uuid};

use super::{
    advertising::{AdvertiseData, AdvertiseSettings},
    profile::GattService,
};

/// Runtime permissions the platform may withhold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Needed for any GATT operation
    Connect,
    /// Needed to start or stop advertising
    Advertise,
}

/// The status carried by a GATT response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    /// GATT_SUCCESS
    Success = 0x00,
    /// GATT_FAILURE
    Failure = 0x101,
}

/// How a characteristic write is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteType {
    /// ATT Write Request (acknowledged)
    Default,
    /// ATT Write Command (unacknowledged)
    NoResponse,
}

/// The local Bluetooth adapter
pub trait BluetoothAdapter: Send + Sync {
    /// Whether the given runtime permission is currently granted
    fn has_permission(&self, permission: Permission) -> bool;
    /// Set the name the adapter reports to peers
    fn set_name(&self, name: &str);
    /// Open a GATT server with no services. Its callbacks arrive as
    /// LinkEvents on the platform's event channel.
    fn open_gatt_server(&self) -> anyhow::Result<Arc<dyn GattServer>>;
    /// Turn the radio off
    fn disable(&self);
    /// The LE advertiser, if the adapter has one
    fn advertiser(&self) -> Option<Arc<dyn LeAdvertiser>>;
}

/// The LE advertiser
pub trait LeAdvertiser: Send + Sync {
    /// Start advertising. Completion arrives as a LinkEvent.
    fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertiseData,
    ) -> anyhow::Result<()>;
    /// Stop advertising
    fn stop_advertising(&self) -> anyhow::Result<()>;
}

/// The local GATT server that commissioners connect to
pub trait GattServer: Send + Sync {
    /// Register a primary service
    fn add_service(&self, service: GattService) -> anyhow::Result<()>;
    /// Look up a registered service
    fn service(&self, uuid: Uuid) -> Option<GattService>;
    /// Answer a read/write request from a peer
    fn send_response(
        &self,
        device: AddressWithType,
        request_id: u32,
        status: GattStatus,
        offset: u32,
        value: &[u8],
    );
    /// Set a characteristic's value and write type and push it to the peer.
    /// Returns false if the platform refused to queue it.
    fn notify_characteristic_changed(
        &self,
        device: AddressWithType,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
        write_type: WriteType,
        confirm: bool,
    ) -> bool;
    /// Drop the link to a peer
    fn cancel_connection(&self, device: AddressWithType);
    /// Close the server and all its links
    fn close(&self);
}

/// A link on which we act as the GATT client
pub trait GattClient: Send + Sync {
    /// The remote endpoint
    fn device(&self) -> AddressWithType;
    /// Look up a discovered remote service
    fn service(&self, uuid: Uuid) -> Option<GattService>;
    /// Enable or disable local delivery of changes to a characteristic
    fn set_characteristic_notification(
        &self,
        service: Uuid,
        characteristic: Uuid,
        enable: bool,
    ) -> bool;
    /// Write a descriptor on the remote. Completion arrives as a LinkEvent.
    fn write_descriptor(
        &self,
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
        value: &[u8],
    ) -> bool;
    /// Write a characteristic on the remote. Completion arrives as a
    /// LinkEvent.
    fn write_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
        write_type: WriteType,
    ) -> bool;
}

/// A handle to a client link. Two handles are equal only if they refer to
/// the same link object.
#[derive(Clone)]
pub struct ClientLink(pub Arc<dyn GattClient>);

impl ClientLink {
    /// Constructor
    pub fn new(client: Arc<dyn GattClient>) -> Self {
        Self(client)
    }
}

impl PartialEq for ClientLink {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl Eq for ClientLink {}

impl fmt::Debug for ClientLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientLink({})", self.0.device())
    }
}

impl std::ops::Deref for ClientLink {
    type Target = dyn GattClient;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
