//! Operations the Matter stack drives through the bridge, and the callbacks
//! of the client links it registered

use log::{debug, error, info, warn};

use crate::core::uuid::{Uuid, UuidLengthError};

use super::{
    bridge::{BleBridge, NotifyingTarget},
    ids::ConnectionId,
    platform::{ClientLink, GattStatus, Permission, WriteType},
    profile::{CccdValue, CharacteristicProperties, CCCD_UUID},
};

#[derive(Debug)]
/// Reasons a Matter stack operation did not go through
pub enum BridgeError {
    /// No link is registered under this id
    ConnectionNotFound(ConnectionId),
    /// A service or characteristic id was not 16 bytes long
    MalformedId(UuidLengthError),
    /// The service is not present
    ServiceNotFound(Uuid),
    /// The characteristic is not present in its service
    CharacteristicNotFound(Uuid),
    /// The characteristic has no CCCD
    DescriptorNotFound(Uuid),
    /// The platform withheld a required permission
    PermissionDenied(Permission),
    /// There is no GATT server open
    NoGattServer,
    /// The platform rejected the operation
    OperationFailed(&'static str),
}

fn parse_id(bytes: &[u8]) -> Result<Uuid, BridgeError> {
    Uuid::try_from(bytes).map_err(BridgeError::MalformedId)
}

/// Log the outcome of an operation and collapse it to success/failure
fn report(operation: &str, conn_id: ConnectionId, res: Result<(), BridgeError>) -> bool {
    match res {
        Ok(()) => true,
        Err(BridgeError::ConnectionNotFound(_)) => {
            info!("{operation}: connection {conn_id} was not found");
            false
        }
        Err(err) => {
            error!("{operation} on connection {conn_id} failed: {err:?}");
            false
        }
    }
}

impl BleBridge {
    fn require_permission(&self, permission: Permission) -> Result<(), BridgeError> {
        if self.adapter.has_permission(permission) {
            Ok(())
        } else {
            Err(BridgeError::PermissionDenied(permission))
        }
    }

    fn client_link(&self, conn_id: ConnectionId) -> Result<ClientLink, BridgeError> {
        self.connections.get(conn_id).ok_or(BridgeError::ConnectionNotFound(conn_id))
    }

    /// Enable indications (preferred) or notifications on a remote
    /// characteristic by writing its CCCD. Completion is reported through
    /// `handle_subscribe_complete`.
    pub fn subscribe_characteristic(
        &self,
        conn_id: ConnectionId,
        svc_id: &[u8],
        char_id: &[u8],
    ) -> bool {
        let res = self.write_cccd(conn_id, svc_id, char_id, true);
        report("subscribe characteristic", conn_id, res)
    }

    /// Disable indications and notifications on a remote characteristic.
    /// Completion is reported through `handle_unsubscribe_complete`.
    pub fn unsubscribe_characteristic(
        &self,
        conn_id: ConnectionId,
        svc_id: &[u8],
        char_id: &[u8],
    ) -> bool {
        let res = self.write_cccd(conn_id, svc_id, char_id, false);
        report("unsubscribe characteristic", conn_id, res)
    }

    fn write_cccd(
        &self,
        conn_id: ConnectionId,
        svc_id: &[u8],
        char_id: &[u8],
        enable: bool,
    ) -> Result<(), BridgeError> {
        let link = self.client_link(conn_id)?;
        let service_uuid = parse_id(svc_id)?;
        let char_uuid = parse_id(char_id)?;
        let service =
            link.service(service_uuid).ok_or(BridgeError::ServiceNotFound(service_uuid))?;
        let characteristic = service
            .characteristic(char_uuid)
            .ok_or(BridgeError::CharacteristicNotFound(char_uuid))?;
        self.require_permission(Permission::Connect)?;

        if !link.set_characteristic_notification(service_uuid, char_uuid, enable) {
            return Err(BridgeError::OperationFailed("set characteristic notification"));
        }

        characteristic.descriptor(CCCD_UUID).ok_or(BridgeError::DescriptorNotFound(char_uuid))?;
        let value = if !enable {
            CccdValue::Disable
        } else if characteristic.properties.contains(CharacteristicProperties::INDICATE) {
            CccdValue::EnableIndication
        } else if characteristic.properties.contains(CharacteristicProperties::NOTIFY) {
            CccdValue::EnableNotification
        } else {
            warn!("{char_uuid} supports neither indications nor notifications, CCCD left as is");
            return Ok(());
        };

        if !link.write_descriptor(service_uuid, char_uuid, CCCD_UUID, &value.bytes()) {
            return Err(BridgeError::OperationFailed("write descriptor"));
        }
        Ok(())
    }

    /// Drop a peer connected to our GATT server and turn the radio off. The
    /// radio stays off until the next explicit activation. Closing an
    /// unknown connection succeeds.
    pub fn close_connection(&self, conn_id: ConnectionId) -> bool {
        let Some(device) = self.subscribed_devices.get(conn_id) else {
            info!("tried to close BLE connection {conn_id}, but it was not found");
            return true;
        };
        if let Err(err) = self.require_permission(Permission::Connect) {
            error!("close connection {conn_id} failed: {err:?}");
            return false;
        }

        if let Some(server) = self.gatt_server() {
            server.cancel_connection(device);
        }
        info!("close connection {conn_id}: disabling BT");
        self.adapter.disable();

        self.subscribed_devices.remove(conn_id);
        if let Some(lifecycle) = &self.lifecycle {
            lifecycle.on_close_ble_complete(conn_id);
        }
        true
    }

    /// Push a value to a peer connected to our GATT server. Only one
    /// indication may be outstanding at a time: its confirmation is
    /// attributed to the most recently sent one.
    pub fn send_indication(
        &self,
        conn_id: ConnectionId,
        svc_id: &[u8],
        char_id: &[u8],
        data: &[u8],
    ) -> bool {
        let res = self.notify_peer(conn_id, svc_id, char_id, data);
        report("send indication", conn_id, res)
    }

    fn notify_peer(
        &self,
        conn_id: ConnectionId,
        svc_id: &[u8],
        char_id: &[u8],
        data: &[u8],
    ) -> Result<(), BridgeError> {
        let device =
            self.subscribed_devices.get(conn_id).ok_or(BridgeError::ConnectionNotFound(conn_id))?;
        let service_uuid = parse_id(svc_id)?;
        let char_uuid = parse_id(char_id)?;
        let server = self.gatt_server().ok_or(BridgeError::NoGattServer)?;
        let service =
            server.service(service_uuid).ok_or(BridgeError::ServiceNotFound(service_uuid))?;
        service.characteristic(char_uuid).ok_or(BridgeError::CharacteristicNotFound(char_uuid))?;
        self.require_permission(Permission::Connect)?;

        if !server.notify_characteristic_changed(
            device,
            service_uuid,
            char_uuid,
            data,
            WriteType::NoResponse,
            false,
        ) {
            return Err(BridgeError::OperationFailed("notify characteristic changed"));
        }

        self.set_notifying(NotifyingTarget { service: service_uuid, characteristic: char_uuid });
        Ok(())
    }

    /// Write a remote characteristic with acknowledgement. Completion is
    /// reported through `handle_write_confirmation`.
    pub fn send_write_request(
        &self,
        conn_id: ConnectionId,
        svc_id: &[u8],
        char_id: &[u8],
        data: &[u8],
    ) -> bool {
        let res = self.write_remote(conn_id, svc_id, char_id, data);
        report("send write request", conn_id, res)
    }

    fn write_remote(
        &self,
        conn_id: ConnectionId,
        svc_id: &[u8],
        char_id: &[u8],
        data: &[u8],
    ) -> Result<(), BridgeError> {
        let link = self.client_link(conn_id)?;
        let service_uuid = parse_id(svc_id)?;
        let char_uuid = parse_id(char_id)?;
        let service =
            link.service(service_uuid).ok_or(BridgeError::ServiceNotFound(service_uuid))?;
        service.characteristic(char_uuid).ok_or(BridgeError::CharacteristicNotFound(char_uuid))?;
        self.require_permission(Permission::Connect)?;

        if !link.write_characteristic(service_uuid, char_uuid, data, WriteType::Default) {
            return Err(BridgeError::OperationFailed("write characteristic"));
        }
        Ok(())
    }

    /// The Matter stack closed its session: drop the peer, close the GATT
    /// server entirely and turn the radio off. Returns false if the
    /// connection was not found or the teardown could not be done.
    pub fn notify_connection_closed(&self, conn_id: ConnectionId) -> bool {
        let Some(device) = self.subscribed_devices.get(conn_id) else {
            info!("tried to close BLE connection {conn_id}, but it was not found");
            return false;
        };
        if let Err(err) = self.require_permission(Permission::Connect) {
            error!("notify connection closed {conn_id} failed: {err:?}");
            return false;
        }

        if let Some(server) = self.take_gatt_server() {
            server.cancel_connection(device);
            server.close();
        }
        info!("connection {conn_id} closed: disabling BT");
        self.adapter.disable();

        self.subscribed_devices.remove(conn_id);
        if let Some(lifecycle) = &self.lifecycle {
            lifecycle.on_notify_chip_connection_closed(conn_id);
        }
        true
    }

    /// The MTU to report for a connection. 0 leaves negotiation to the
    /// Matter stack.
    pub fn get_mtu(&self, conn_id: ConnectionId) -> u16 {
        debug!("MTU requested for connection {conn_id}");
        0
    }

    /// Called by the Matter stack when it starts a new commissioning
    /// connection. Nothing to do on this side.
    pub fn on_new_connection(&self, discriminator: u16) {
        debug!("new connection requested for discriminator {discriminator:#x}");
    }

    pub(crate) fn on_client_connection_state_changed(
        &self,
        link: &ClientLink,
        status: GattStatus,
        connected: bool,
    ) {
        debug!("client {link:?} connection state changed: connected {connected} ({status:?})");
        if connected {
            return;
        }
        let conn_id = self.connections.find(link);
        if conn_id.is_valid() {
            info!("client connection {conn_id} disconnected");
            self.matter.handle_connection_error(conn_id);
        } else {
            error!("client {link:?} disconnected with no active connection");
        }
    }

    pub(crate) fn on_characteristic_written(
        &self,
        link: &ClientLink,
        service: Uuid,
        characteristic: Uuid,
        status: GattStatus,
    ) {
        let conn_id = self.connections.find(link);
        if !conn_id.is_valid() {
            error!("characteristic write completed on unknown client {link:?}");
            return;
        }
        if status != GattStatus::Success {
            warn!("characteristic write to {characteristic} on {conn_id} failed: {status:?}");
        }
        self.matter.handle_write_confirmation(
            conn_id,
            service.to_bytes(),
            characteristic.to_bytes(),
            status == GattStatus::Success,
        );
    }

    pub(crate) fn on_characteristic_changed(
        &self,
        link: &ClientLink,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) {
        let conn_id = self.connections.find(link);
        if !conn_id.is_valid() {
            error!("characteristic changed on unknown client {link:?}");
            return;
        }
        self.matter.handle_indication_received(
            conn_id,
            service.to_bytes(),
            characteristic.to_bytes(),
            value,
        );
    }

    pub(crate) fn on_descriptor_written(
        &self,
        link: &ClientLink,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
        status: GattStatus,
    ) {
        if status != GattStatus::Success {
            warn!("descriptor write on {characteristic} failed: {status:?}");
        }
        let conn_id = self.connections.find(link);
        if !conn_id.is_valid() {
            error!("descriptor write completed on unknown client {link:?}");
            return;
        }

        let svc_id = service.to_bytes();
        let char_id = characteristic.to_bytes();
        let success = status == GattStatus::Success;
        match CccdValue::parse(value) {
            Some(CccdValue::EnableIndication | CccdValue::EnableNotification) => {
                self.matter.handle_subscribe_complete(conn_id, svc_id, char_id, success)
            }
            Some(CccdValue::Disable) => {
                self.matter.handle_unsubscribe_complete(conn_id, svc_id, char_id, success)
            }
            None => debug!("descriptor write with unrecognized value {value:02x?}"),
        }
    }
}
