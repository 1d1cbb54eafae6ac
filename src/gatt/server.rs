//! Peers connected to our GATT server: connection tracking, writes to the
//! write characteristic, CCCD writes and indication confirmations

use log::{debug, error, info, warn};

use crate::core::{address::AddressWithType, uuid::Uuid};

use super::{
    bridge::BleBridge,
    platform::{GattStatus, Permission},
    profile::{
        CccdValue, INDICATE_CHARACTERISTIC_UUID, MATTER_SERVICE_UUID, WRITE_CHARACTERISTIC_UUID,
    },
};

impl BleBridge {
    pub(crate) fn on_server_connected(&self, device: AddressWithType) {
        let conn_id = self.subscribed_devices.add(device);
        info!("BLE connection established connId: {conn_id}, {device}");
    }

    pub(crate) fn on_server_disconnected(&self, device: AddressWithType, status: GattStatus) {
        let conn_id = self.subscribed_devices.find(&device);
        self.subscribed_devices.remove(conn_id);
        info!("BLE connection terminated connId: {conn_id}, {device} ({status:?})");
    }

    pub(crate) fn on_service_added(&self, status: GattStatus, service: Uuid) {
        info!("service added: {service} ({status:?})");
    }

    pub(crate) fn on_characteristic_write_request(
        &self,
        device: AddressWithType,
        request_id: u32,
        characteristic: Uuid,
        value: &[u8],
        response_needed: bool,
        offset: u32,
    ) {
        let conn_id = self.subscribed_devices.find(&device);
        info!(
            "write request connId: {conn_id}, characteristic: {characteristic}, value: {value:02x?}"
        );
        debug!("response needed: {response_needed}, offset: {offset}");

        if !self.adapter.has_permission(Permission::Connect) {
            error!("missing connect permission, dropping write request");
            return;
        }
        let Some(server) = self.gatt_server() else {
            error!("write request with no GATT server open");
            return;
        };
        if !conn_id.is_valid() {
            warn!("write request from unknown peer {device}");
            server.send_response(device, request_id, GattStatus::Failure, 0, &[]);
            return;
        }

        let status = if characteristic == WRITE_CHARACTERISTIC_UUID {
            self.matter.handle_write_received(
                conn_id,
                MATTER_SERVICE_UUID.to_bytes(),
                characteristic.to_bytes(),
                value,
            );
            GattStatus::Success
        } else {
            warn!("rejecting write to unexpected characteristic {characteristic}");
            GattStatus::Failure
        };
        server.send_response(device, request_id, status, 0, &[]);
    }

    pub(crate) fn on_descriptor_write_request(
        &self,
        device: AddressWithType,
        request_id: u32,
        descriptor: Uuid,
        value: &[u8],
    ) {
        let conn_id = self.subscribed_devices.find(&device);
        let parsed = CccdValue::parse(value);
        info!(
            "descriptor write request connId: {conn_id}, descriptor: {descriptor}, value: {}",
            parsed.map_or_else(|| "Unknown".to_owned(), |v| format!("{v:?}"))
        );

        if !self.adapter.has_permission(Permission::Connect) {
            error!("missing connect permission, dropping descriptor write");
            return;
        }
        let Some(server) = self.gatt_server() else {
            error!("descriptor write with no GATT server open");
            return;
        };
        if !conn_id.is_valid() {
            warn!("descriptor write from unknown peer {device}");
            server.send_response(device, request_id, GattStatus::Failure, 0, &[]);
            return;
        }

        let svc_id = MATTER_SERVICE_UUID.to_bytes();
        let char_id = INDICATE_CHARACTERISTIC_UUID.to_bytes();
        let status = match parsed {
            Some(CccdValue::EnableIndication | CccdValue::EnableNotification) => {
                self.matter.handle_subscribe_received(conn_id, svc_id, char_id);
                GattStatus::Success
            }
            Some(CccdValue::Disable) => {
                self.matter.handle_unsubscribe_received(conn_id, svc_id, char_id);
                GattStatus::Success
            }
            None => {
                error!("unexpected descriptor value {value:02x?}");
                GattStatus::Failure
            }
        };
        server.send_response(device, request_id, status, 0, &[]);
    }

    pub(crate) fn on_notification_sent(&self, device: AddressWithType, status: GattStatus) {
        let conn_id = self.subscribed_devices.find(&device);
        debug!("notification sent connId: {conn_id} ({status:?})");
        if status != GattStatus::Success {
            return;
        }
        if !conn_id.is_valid() {
            warn!("notification sent to {device}, which is no longer connected");
            return;
        }

        match self.notifying() {
            Some(target) => self.matter.handle_indication_confirmation(
                conn_id,
                target.service.to_bytes(),
                target.characteristic.to_bytes(),
            ),
            None => warn!("notification sent to {device} but nothing was being notified"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

    use crate::{
        config::BridgeConfig,
        core::address::AddressWithType,
        gatt::{
            bridge::{BleBridge, BridgeCollaborators, NotifyingTarget},
            events::LinkEvent,
            ids::ConnectionId,
            mocks::{
                mock_matter_stack::{MockMatterEvents, MockMatterStack},
                mock_platform::{MockAdapter, MockPlatformEvents},
            },
            platform::{GattStatus, Permission},
            profile::{
                CCCD_UUID, DISABLE_NOTIFICATION_VALUE, ENABLE_INDICATION_VALUE,
                ENABLE_NOTIFICATION_VALUE, INDICATE_CHARACTERISTIC_UUID, MATTER_SERVICE_UUID,
                READ_CHARACTERISTIC_UUID, WRITE_CHARACTERISTIC_UUID,
            },
        },
    };

    const PEER: AddressWithType = AddressWithType::public([1, 2, 3, 4, 5, 6]);
    const OTHER_PEER: AddressWithType = AddressWithType::public([6, 5, 4, 3, 2, 1]);
    const REQUEST_ID: u32 = 7;
    const DATA: [u8; 3] = [0x0A, 0x0B, 0x0C];

    struct Harness {
        bridge: BleBridge,
        adapter: Arc<MockAdapter>,
        matter_rx: UnboundedReceiver<MockMatterEvents>,
        platform_rx: UnboundedReceiver<MockPlatformEvents>,
    }

    fn start_bridge() -> Harness {
        let (adapter, mut platform_rx) = MockAdapter::new();
        let adapter = Arc::new(adapter);
        let (matter, matter_rx) = MockMatterStack::new();
        let matter = Arc::new(matter);
        let bridge = BleBridge::new(
            BridgeConfig::default(),
            BridgeCollaborators {
                adapter: adapter.clone(),
                matter: matter.clone(),
                commissionable_data: matter,
                lifecycle: None,
            },
        );
        bridge.init().unwrap();
        while platform_rx.try_recv().is_ok() {}
        Harness { bridge, adapter, matter_rx, platform_rx }
    }

    fn write_request(characteristic: crate::core::uuid::Uuid) -> LinkEvent {
        LinkEvent::CharacteristicWriteRequest {
            device: PEER,
            request_id: REQUEST_ID,
            characteristic,
            value: DATA.to_vec(),
            response_needed: false,
            offset: 0,
        }
    }

    fn descriptor_write(value: &[u8]) -> LinkEvent {
        LinkEvent::DescriptorWriteRequest {
            device: PEER,
            request_id: REQUEST_ID,
            descriptor: CCCD_UUID,
            value: value.to_vec(),
        }
    }

    #[test]
    fn test_connect_allocates_id() {
        let h = start_bridge();

        h.bridge.dispatch(LinkEvent::Connected { device: PEER });
        h.bridge.dispatch(LinkEvent::Connected { device: OTHER_PEER });

        assert_eq!(h.bridge.subscribed_device_id(&PEER), ConnectionId(1));
        assert_eq!(h.bridge.subscribed_device_id(&OTHER_PEER), ConnectionId(2));
    }

    #[test]
    fn test_disconnect_frees_slot_without_notifying_matter() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });

        h.bridge.dispatch(LinkEvent::Disconnected { device: PEER, status: GattStatus::Success });

        assert_eq!(h.bridge.subscribed_device_id(&PEER), ConnectionId::NONE);
        assert_eq!(h.matter_rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn test_disconnect_of_unknown_peer_is_harmless() {
        let h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });

        h.bridge
            .dispatch(LinkEvent::Disconnected { device: OTHER_PEER, status: GattStatus::Failure });

        assert_eq!(h.bridge.subscribed_device_id(&PEER), ConnectionId(1));
    }

    #[test]
    fn test_write_to_write_characteristic_forwarded() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });

        h.bridge.dispatch(write_request(WRITE_CHARACTERISTIC_UUID));

        assert_eq!(
            h.matter_rx.try_recv().unwrap(),
            MockMatterEvents::WriteReceived(
                ConnectionId(1),
                MATTER_SERVICE_UUID.to_bytes(),
                WRITE_CHARACTERISTIC_UUID.to_bytes(),
                DATA.to_vec()
            )
        );
        assert_eq!(
            h.platform_rx.try_recv().unwrap(),
            MockPlatformEvents::SendResponse(PEER, REQUEST_ID, GattStatus::Success)
        );
    }

    #[test]
    fn test_write_to_other_characteristic_rejected() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });

        h.bridge.dispatch(write_request(READ_CHARACTERISTIC_UUID));

        assert_eq!(h.matter_rx.try_recv().unwrap_err(), TryRecvError::Empty);
        assert_eq!(
            h.platform_rx.try_recv().unwrap(),
            MockPlatformEvents::SendResponse(PEER, REQUEST_ID, GattStatus::Failure)
        );
    }

    #[test]
    fn test_write_without_permission_gets_no_response() {
        let mut h = start_bridge();
        h.adapter.set_permission(Permission::Connect, false);

        h.bridge.dispatch(write_request(WRITE_CHARACTERISTIC_UUID));

        assert_eq!(h.matter_rx.try_recv().unwrap_err(), TryRecvError::Empty);
        assert_eq!(h.platform_rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn test_enable_indication_subscribes() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });

        h.bridge.dispatch(descriptor_write(&ENABLE_INDICATION_VALUE));

        assert_eq!(
            h.matter_rx.try_recv().unwrap(),
            MockMatterEvents::SubscribeReceived(
                ConnectionId(1),
                MATTER_SERVICE_UUID.to_bytes(),
                INDICATE_CHARACTERISTIC_UUID.to_bytes()
            )
        );
        assert_eq!(
            h.platform_rx.try_recv().unwrap(),
            MockPlatformEvents::SendResponse(PEER, REQUEST_ID, GattStatus::Success)
        );
    }

    #[test]
    fn test_enable_notification_subscribes() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });

        h.bridge.dispatch(descriptor_write(&ENABLE_NOTIFICATION_VALUE));

        assert!(matches!(
            h.matter_rx.try_recv().unwrap(),
            MockMatterEvents::SubscribeReceived(ConnectionId(1), _, _)
        ));
    }

    #[test]
    fn test_disable_unsubscribes() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });

        h.bridge.dispatch(descriptor_write(&DISABLE_NOTIFICATION_VALUE));

        assert!(matches!(
            h.matter_rx.try_recv().unwrap(),
            MockMatterEvents::UnsubscribeReceived(ConnectionId(1), _, _)
        ));
        assert_eq!(
            h.platform_rx.try_recv().unwrap(),
            MockPlatformEvents::SendResponse(PEER, REQUEST_ID, GattStatus::Success)
        );
    }

    #[test]
    fn test_unknown_descriptor_value_rejected() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });

        h.bridge.dispatch(descriptor_write(&[0x03, 0x00]));

        assert_eq!(h.matter_rx.try_recv().unwrap_err(), TryRecvError::Empty);
        assert_eq!(
            h.platform_rx.try_recv().unwrap(),
            MockPlatformEvents::SendResponse(PEER, REQUEST_ID, GattStatus::Failure)
        );
    }

    #[test]
    fn test_notification_sent_confirms_notifying_target() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });
        h.bridge.set_notifying(NotifyingTarget {
            service: MATTER_SERVICE_UUID,
            characteristic: INDICATE_CHARACTERISTIC_UUID,
        });

        h.bridge

            .dispatch(LinkEvent::NotificationSent { device: PEER, status: GattStatus::Success });

        assert_eq!(
            h.matter_rx.try_recv().unwrap(),
            MockMatterEvents::IndicationConfirmation(
                ConnectionId(1),
                MATTER_SERVICE_UUID.to_bytes(),
                INDICATE_CHARACTERISTIC_UUID.to_bytes()
            )
        );
    }

    #[test]
    fn test_failed_notification_not_confirmed() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });
        h.bridge.set_notifying(NotifyingTarget {
            service: MATTER_SERVICE_UUID,
            characteristic: INDICATE_CHARACTERISTIC_UUID,
        });

        h.bridge

            .dispatch(LinkEvent::NotificationSent { device: PEER, status: GattStatus::Failure });

        assert_eq!(h.matter_rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn test_write_from_unknown_peer_rejected() {
        let mut h = start_bridge();

        h.bridge.dispatch(write_request(WRITE_CHARACTERISTIC_UUID));

        assert_eq!(h.matter_rx.try_recv().unwrap_err(), TryRecvError::Empty);
        assert_eq!(
            h.platform_rx.try_recv().unwrap(),
            MockPlatformEvents::SendResponse(PEER, REQUEST_ID, GattStatus::Failure)
        );
    }

    #[test]
    fn test_descriptor_write_from_unknown_peer_rejected() {
        let mut h = start_bridge();

        h.bridge.dispatch(descriptor_write(&ENABLE_INDICATION_VALUE));

        assert_eq!(h.matter_rx.try_recv().unwrap_err(), TryRecvError::Empty);
        assert_eq!(
            h.platform_rx.try_recv().unwrap(),
            MockPlatformEvents::SendResponse(PEER, REQUEST_ID, GattStatus::Failure)
        );
    }

    #[test]
    fn test_notification_sent_without_target_dropped() {
        let mut h = start_bridge();
        h.bridge.dispatch(LinkEvent::Connected { device: PEER });

        h.bridge

            .dispatch(LinkEvent::NotificationSent { device: PEER, status: GattStatus::Success });

        assert_eq!(h.matter_rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }
}
