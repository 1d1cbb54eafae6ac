//! Mocked implementations of the platform Bluetooth traits for use in test

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use anyhow::{bail, Result};
use tokio::sync::mpsc::{self, unbounded_channel, UnboundedReceiver};

use crate::{
    core::{address::AddressWithType, uuid::Uuid},
    gatt::{
        advertising::{AdvertiseData, AdvertiseSettings},
        platform::{
            BluetoothAdapter, GattClient, GattServer, GattStatus, LeAdvertiser, Permission,
            WriteType,
        },
        profile::GattService,
    },
};

/// Events representing calls to the platform traits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockPlatformEvents {
    /// BluetoothAdapter#set_name invoked
    SetName(String),
    /// BluetoothAdapter#open_gatt_server invoked
    OpenGattServer,
    /// BluetoothAdapter#disable invoked
    Disable,
    /// LeAdvertiser#start_advertising invoked
    StartAdvertising(AdvertiseSettings, AdvertiseData),
    /// LeAdvertiser#stop_advertising invoked
    StopAdvertising,
    /// GattServer#add_service invoked
    AddService(Uuid),
    /// GattServer#send_response invoked
    SendResponse(AddressWithType, u32, GattStatus),
    /// GattServer#notify_characteristic_changed invoked
    NotifyCharacteristicChanged(AddressWithType, Uuid, Uuid, Vec<u8>, WriteType, bool),
    /// GattServer#cancel_connection invoked
    CancelConnection(AddressWithType),
    /// GattServer#close invoked
    CloseServer,
    /// GattClient#set_characteristic_notification invoked
    SetCharacteristicNotification(Uuid, Uuid, bool),
    /// GattClient#write_descriptor invoked
    WriteDescriptor(Uuid, Uuid, Uuid, Vec<u8>),
    /// GattClient#write_characteristic invoked
    WriteCharacteristic(Uuid, Uuid, Vec<u8>, WriteType),
}

struct Shared {
    tx: mpsc::UnboundedSender<MockPlatformEvents>,
    connect_permission: AtomicBool,
    advertise_permission: AtomicBool,
    has_advertiser: AtomicBool,
    advertising_fails: AtomicBool,
    notify_fails: AtomicBool,
}

impl Shared {
    fn send(&self, event: MockPlatformEvents) {
        self.tx.send(event).unwrap();
    }
}

/// A mocked adapter. Servers it opens and its advertiser report into the
/// same channel.
pub struct MockAdapter {
    shared: Arc<Shared>,
    servers: Mutex<Vec<Arc<MockGattServer>>>,
}

impl MockAdapter {
    /// Constructor. Returns self and the RX side of the associated channel.
    pub fn new() -> (Self, UnboundedReceiver<MockPlatformEvents>) {
        let (tx, rx) = unbounded_channel();
        let shared = Arc::new(Shared {
            tx,
            connect_permission: AtomicBool::new(true),
            advertise_permission: AtomicBool::new(true),
            has_advertiser: AtomicBool::new(true),
            advertising_fails: AtomicBool::new(false),
            notify_fails: AtomicBool::new(false),
        });
        (Self { shared, servers: Mutex::new(vec![]) }, rx)
    }

    /// Grant or revoke a permission
    pub fn set_permission(&self, permission: Permission, granted: bool) {
        match permission {
            Permission::Connect => self.shared.connect_permission.store(granted, Ordering::SeqCst),
            Permission::Advertise => {
                self.shared.advertise_permission.store(granted, Ordering::SeqCst)
            }
        }
    }

    /// Make advertiser() return None
    pub fn remove_advertiser(&self) {
        self.shared.has_advertiser.store(false, Ordering::SeqCst);
    }

    /// Make start/stop advertising return an error
    pub fn set_advertising_fails(&self, fails: bool) {
        self.shared.advertising_fails.store(fails, Ordering::SeqCst);
    }

    /// Make notify_characteristic_changed return false
    pub fn set_notify_fails(&self, fails: bool) {
        self.shared.notify_fails.store(fails, Ordering::SeqCst);
    }

    /// Every server opened so far, oldest first
    pub fn servers(&self) -> Vec<Arc<MockGattServer>> {
        self.servers.lock().unwrap().clone()
    }
}

impl BluetoothAdapter for MockAdapter {
    fn has_permission(&self, permission: Permission) -> bool {
        match permission {
            Permission::Connect => self.shared.connect_permission.load(Ordering::SeqCst),
            Permission::Advertise => self.shared.advertise_permission.load(Ordering::SeqCst),
        }
    }

    fn set_name(&self, name: &str) {
        self.shared.send(MockPlatformEvents::SetName(name.to_owned()));
    }

    fn open_gatt_server(&self) -> Result<Arc<dyn GattServer>> {
        self.shared.send(MockPlatformEvents::OpenGattServer);
        let server = Arc::new(MockGattServer {
            shared: self.shared.clone(),
            services: Mutex::new(vec![]),
            closed: AtomicBool::new(false),
        });
        self.servers.lock().unwrap().push(server.clone());
        Ok(server)
    }

    fn disable(&self) {
        self.shared.send(MockPlatformEvents::Disable);
    }

    fn advertiser(&self) -> Option<Arc<dyn LeAdvertiser>> {
        if self.shared.has_advertiser.load(Ordering::SeqCst) {
            Some(Arc::new(MockAdvertiser(self.shared.clone())))
        } else {
            None
        }
    }
}

/// A mocked LE advertiser
pub struct MockAdvertiser(Arc<Shared>);

impl LeAdvertiser for MockAdvertiser {
    fn start_advertising(&self, settings: &AdvertiseSettings, data: &AdvertiseData) -> Result<()> {
        self.0.send(MockPlatformEvents::StartAdvertising(*settings, data.clone()));
        if self.0.advertising_fails.load(Ordering::SeqCst) {
            bail!("radio unavailable");
        }
        Ok(())
    }

    fn stop_advertising(&self) -> Result<()> {
        self.0.send(MockPlatformEvents::StopAdvertising);
        if self.0.advertising_fails.load(Ordering::SeqCst) {
            bail!("radio unavailable");
        }
        Ok(())
    }
}

/// A mocked GATT server
pub struct MockGattServer {
    shared: Arc<Shared>,
    services: Mutex<Vec<GattService>>,
    closed: AtomicBool,
}

impl MockGattServer {
    /// Whether close() was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl GattServer for MockGattServer {
    fn add_service(&self, service: GattService) -> Result<()> {
        self.shared.send(MockPlatformEvents::AddService(service.uuid));
        self.services.lock().unwrap().push(service);
        Ok(())
    }

    fn service(&self, uuid: Uuid) -> Option<GattService> {
        self.services.lock().unwrap().iter().find(|s| s.uuid == uuid).cloned()
    }

    fn send_response(
        &self,
        device: AddressWithType,
        request_id: u32,
        status: GattStatus,
        _offset: u32,
        _value: &[u8],
    ) {
        self.shared.send(MockPlatformEvents::SendResponse(device, request_id, status));
    }

    fn notify_characteristic_changed(
        &self,
        device: AddressWithType,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
        write_type: WriteType,
        confirm: bool,
    ) -> bool {
        self.shared.send(MockPlatformEvents::NotifyCharacteristicChanged(
            device,
            service,
            characteristic,
            value.to_vec(),
            write_type,
            confirm,
        ));
        !self.shared.notify_fails.load(Ordering::SeqCst)
    }

    fn cancel_connection(&self, device: AddressWithType) {
        self.shared.send(MockPlatformEvents::CancelConnection(device));
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shared.send(MockPlatformEvents::CloseServer);
    }
}

/// A mocked client link with a fixed set of discovered services
pub struct MockGattClient {
    device: AddressWithType,
    services: Vec<GattService>,
    tx: mpsc::UnboundedSender<MockPlatformEvents>,
    notification_fails: AtomicBool,
    writes_fail: AtomicBool,
}

impl MockGattClient {
    /// Constructor. Returns self and the RX side of the associated channel.
    pub fn new(
        device: AddressWithType,
        services: Vec<GattService>,
    ) -> (Self, UnboundedReceiver<MockPlatformEvents>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                device,
                services,
                tx,
                notification_fails: AtomicBool::new(false),
                writes_fail: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Make set_characteristic_notification return false
    pub fn set_notification_fails(&self, fails: bool) {
        self.notification_fails.store(fails, Ordering::SeqCst);
    }

    /// Make descriptor and characteristic writes return false
    pub fn set_writes_fail(&self, fails: bool) {
        self.writes_fail.store(fails, Ordering::SeqCst);
    }
}

impl GattClient for MockGattClient {
    fn device(&self) -> AddressWithType {
        self.device
    }

    fn service(&self, uuid: Uuid) -> Option<GattService> {
        self.services.iter().find(|s| s.uuid == uuid).cloned()
    }

    fn set_characteristic_notification(
        &self,
        service: Uuid,
        characteristic: Uuid,
        enable: bool,
    ) -> bool {
        self.tx
            .send(MockPlatformEvents::SetCharacteristicNotification(
                service,
                characteristic,
                enable,
            ))
            .unwrap();
        !self.notification_fails.load(Ordering::SeqCst)
    }

    fn write_descriptor(
        &self,
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
        value: &[u8],
    ) -> bool {
        self.tx
            .send(MockPlatformEvents::WriteDescriptor(
                service,
                characteristic,
                descriptor,
                value.to_vec(),
            ))
            .unwrap();
        !self.writes_fail.load(Ordering::SeqCst)
    }

    fn write_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
        write_type: WriteType,
    ) -> bool {
        self.tx
            .send(MockPlatformEvents::WriteCharacteristic(
                service,
                characteristic,
                value.to_vec(),
                write_type,
            ))
            .unwrap();
        !self.writes_fail.load(Ordering::SeqCst)
    }
}
