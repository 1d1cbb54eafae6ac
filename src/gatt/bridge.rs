//! The bridge instance: owns the connection tables, the flag mask and the
//! active GATT server, and routes link events to the server or client side

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};
use log::{error, info};

use crate::{config::BridgeConfig, core::address::AddressWithType, core::uuid::Uuid};

use super::{
    advertising::AdvertisingFlags,
    callbacks::{BleLifecycleCallbacks, CommissionableDataProvider, MatterCallbacks},
    events::LinkEvent,
    ids::ConnectionId,
    platform::{BluetoothAdapter, ClientLink, GattServer, Permission},
    profile::matter_service,
    registry::ConnectionRegistry,
};

/// The (service, characteristic) of the most recent indication sent. Only
/// one indication may be outstanding at a time; a second send before the
/// first is confirmed overwrites this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyingTarget {
    /// Service of the indicated characteristic
    pub service: Uuid,
    /// The indicated characteristic
    pub characteristic: Uuid,
}

/// Everything the bridge talks to
pub struct BridgeCollaborators {
    /// The local Bluetooth adapter
    pub adapter: Arc<dyn BluetoothAdapter>,
    /// Matter stack link callbacks
    pub matter: Arc<dyn MatterCallbacks>,
    /// Matter stack commissionable data
    pub commissionable_data: Arc<dyn CommissionableDataProvider>,
    /// Optional BLE teardown notifications
    pub lifecycle: Option<Arc<dyn BleLifecycleCallbacks>>,
}

/// Bridges platform BLE events and the Matter stack's connection-id API.
/// Construct once and share as `Arc<BleBridge>`.
pub struct BleBridge {
    pub(crate) config: BridgeConfig,
    pub(crate) adapter: Arc<dyn BluetoothAdapter>,
    pub(crate) matter: Arc<dyn MatterCallbacks>,
    pub(crate) commissionable_data: Arc<dyn CommissionableDataProvider>,
    pub(crate) lifecycle: Option<Arc<dyn BleLifecycleCallbacks>>,
    /// Client links registered by the Matter stack
    pub(crate) connections: ConnectionRegistry<ClientLink>,
    /// Peers connected to our GATT server
    pub(crate) subscribed_devices: ConnectionRegistry<AddressWithType>,
    flags: Mutex<AdvertisingFlags>,
    gatt_server: Mutex<Option<Arc<dyn GattServer>>>,
    notifying: Mutex<Option<NotifyingTarget>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl BleBridge {
    /// Constructor
    pub fn new(config: BridgeConfig, collaborators: BridgeCollaborators) -> Self {
        Self {
            config,
            adapter: collaborators.adapter,
            matter: collaborators.matter,
            commissionable_data: collaborators.commissionable_data,
            lifecycle: collaborators.lifecycle,
            connections: ConnectionRegistry::new("connections"),
            subscribed_devices: ConnectionRegistry::new("subscribed devices"),
            flags: Mutex::new(AdvertisingFlags::empty()),
            gatt_server: Mutex::new(None),
            notifying: Mutex::new(None),
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bring up the GATT server, if BLE is enabled
    pub fn init(&self) -> Result<()> {
        info!("init()");
        if !self.config.enabled {
            error!("BLE disabled, no action");
            return Ok(());
        }
        self.setup_gatt_server()
    }

    /// Open a GATT server hosting the Matter service. Replaces any server
    /// already open.
    pub fn setup_gatt_server(&self) -> Result<()> {
        info!("setting up GATT server");
        if !self.adapter.has_permission(Permission::Connect) {
            bail!("missing connect permission");
        }

        self.adapter.set_name(&self.config.device_name);
        let server = self.adapter.open_gatt_server()?;
        server.add_service(matter_service())?;

        if lock(&self.gatt_server).replace(server).is_some() {
            info!("replaced existing GATT server");
        }
        Ok(())
    }

    /// The active GATT server, if any
    pub(crate) fn gatt_server(&self) -> Option<Arc<dyn GattServer>> {
        lock(&self.gatt_server).clone()
    }

    /// Remove the active GATT server, if any
    pub(crate) fn take_gatt_server(&self) -> Option<Arc<dyn GattServer>> {
        lock(&self.gatt_server).take()
    }

    pub(crate) fn flags(&self) -> MutexGuard<'_, AdvertisingFlags> {
        lock(&self.flags)
    }

    pub(crate) fn set_notifying(&self, target: NotifyingTarget) {
        *lock(&self.notifying) = Some(target);
    }

    pub(crate) fn notifying(&self) -> Option<NotifyingTarget> {
        *lock(&self.notifying)
    }

    /// Route one link event
    pub fn dispatch(&self, event: LinkEvent) {
        match event {
            LinkEvent::Connected { device } => self.on_server_connected(device),
            LinkEvent::Disconnected { device, status } => {
                self.on_server_disconnected(device, status)
            }
            LinkEvent::ServiceAdded { status, service } => self.on_service_added(status, service),
            LinkEvent::CharacteristicWriteRequest {
                device,
                request_id,
                characteristic,
                value,
                response_needed,
                offset,
            } => self.on_characteristic_write_request(
                device,
                request_id,
                characteristic,
                &value,
                response_needed,
                offset,
            ),
            LinkEvent::DescriptorWriteRequest { device, request_id, descriptor, value } => {
                self.on_descriptor_write_request(device, request_id, descriptor, &value)
            }
            LinkEvent::NotificationSent { device, status } => {
                self.on_notification_sent(device, status)
            }
            LinkEvent::AdvertisingStarted => self.on_advertising_started(),
            LinkEvent::AdvertisingFailed(failure) => self.on_advertising_failed(failure),
            LinkEvent::ClientConnectionStateChanged { link, status, connected } => {
                self.on_client_connection_state_changed(&link, status, connected)
            }
            LinkEvent::CharacteristicWritten { link, service, characteristic, status } => {
                self.on_characteristic_written(&link, service, characteristic, status)
            }
            LinkEvent::CharacteristicChanged { link, service, characteristic, value } => {
                self.on_characteristic_changed(&link, service, characteristic, &value)
            }
            LinkEvent::DescriptorWritten { link, service, characteristic, value, status } => {
                self.on_descriptor_written(&link, service, characteristic, &value, status)
            }
        }
    }

    /// Register a client link and return its id
    pub fn add_connection(&self, link: ClientLink) -> ConnectionId {
        self.connections.add(link)
    }

    /// Forget a client link
    pub fn remove_connection(&self, conn_id: ConnectionId) -> Option<ClientLink> {
        self.connections.remove(conn_id)
    }

    /// Look up a client link
    pub fn get_connection(&self, conn_id: ConnectionId) -> Option<ClientLink> {
        self.connections.get(conn_id)
    }

    /// Id of a peer connected to our GATT server, or ConnectionId::NONE
    pub fn subscribed_device_id(&self, device: &AddressWithType) -> ConnectionId {
        self.subscribed_devices.find(device)
    }

    /// A peer connected to our GATT server
    pub fn get_subscribed_device(&self, conn_id: ConnectionId) -> Option<AddressWithType> {
        self.subscribed_devices.get(conn_id)
    }
}
