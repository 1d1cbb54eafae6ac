mod utils;

use std::sync::Arc;

use matter_ble_bridge::{
    config::BridgeConfig,
    core::address::AddressWithType,
    gatt::{
        bridge::{BleBridge, BridgeCollaborators},
        mocks::{
            mock_lifecycle::{MockLifecycle, MockLifecycleEvents},
            mock_matter_stack::{MockMatterEvents, MockMatterStack},
            mock_platform::{MockAdapter, MockGattClient, MockPlatformEvents},
        },
        platform::{ClientLink, GattStatus, Permission},
        profile::{
            matter_service, ENABLE_INDICATION_VALUE, INDICATE_CHARACTERISTIC_UUID,
            MATTER_SERVICE_UUID, WRITE_CHARACTERISTIC_UUID,
        },
    },
    run_link_event_loop, ConnectionId, LinkEvent,
};
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver},
    task::spawn_local,
};
use utils::start_test;

const PEER: AddressWithType = AddressWithType::public([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
const SECOND_PEER: AddressWithType = AddressWithType::public([0x11, 0x21, 0x31, 0x41, 0x51, 0x61]);
const PAYLOAD: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

struct Fixture {
    bridge: Arc<BleBridge>,
    adapter: Arc<MockAdapter>,
    platform_rx: UnboundedReceiver<MockPlatformEvents>,
    matter_rx: UnboundedReceiver<MockMatterEvents>,
    lifecycle_rx: UnboundedReceiver<MockLifecycleEvents>,
}

fn start_bridge() -> Fixture {
    let (adapter, platform_rx) = MockAdapter::new();
    let adapter = Arc::new(adapter);
    let (matter, matter_rx) = MockMatterStack::new();
    let matter = Arc::new(matter);
    let (lifecycle, lifecycle_rx) = MockLifecycle::new();
    let bridge = Arc::new(BleBridge::new(
        BridgeConfig::default(),
        BridgeCollaborators {
            adapter: adapter.clone(),
            matter: matter.clone(),
            commissionable_data: matter,
            lifecycle: Some(Arc::new(lifecycle)),
        },
    ));
    Fixture { bridge, adapter, platform_rx, matter_rx, lifecycle_rx }
}

#[test]
fn test_init_opens_server_with_matter_service() {
    start_test(async {
        // arrange
        let mut f = start_bridge();

        // act
        f.bridge.init().unwrap();

        // assert
        assert_eq!(
            f.platform_rx.recv().await,
            Some(MockPlatformEvents::SetName("Matter Device".to_owned()))
        );
        assert_eq!(f.platform_rx.recv().await, Some(MockPlatformEvents::OpenGattServer));
        assert_eq!(
            f.platform_rx.recv().await,
            Some(MockPlatformEvents::AddService(MATTER_SERVICE_UUID))
        );
    });
}

#[test]
fn test_init_without_permission_fails() {
    start_test(async {
        // arrange
        let mut f = start_bridge();
        f.adapter.set_permission(Permission::Connect, false);

        // act
        let res = f.bridge.init();

        // assert
        assert!(res.is_err());
        assert!(f.platform_rx.try_recv().is_err());
    });
}

#[test]
fn test_second_setup_replaces_server() {
    start_test(async {
        // arrange
        let f = start_bridge();
        f.bridge.init().unwrap();
        f.bridge.dispatch(LinkEvent::Connected { device: PEER });

        // act
        f.bridge.setup_gatt_server().unwrap();
        f.bridge.notify_connection_closed(ConnectionId(1));

        // assert: only the newest server is torn down
        let servers = f.adapter.servers();
        assert_eq!(servers.len(), 2);
        assert!(!servers[0].is_closed());
        assert!(servers[1].is_closed());
    });
}

#[test]
fn test_event_loop_delivers_in_order() {
    start_test(async {
        // arrange
        let mut f = start_bridge();
        f.bridge.init().unwrap();
        let (tx, rx) = unbounded_channel();
        spawn_local(run_link_event_loop(f.bridge.clone(), rx));

        // act
        tx.send(LinkEvent::Connected { device: PEER }).unwrap();
        tx.send(LinkEvent::Connected { device: SECOND_PEER }).unwrap();
        tx.send(LinkEvent::CharacteristicWriteRequest {
            device: SECOND_PEER,
            request_id: 1,
            characteristic: WRITE_CHARACTERISTIC_UUID,
            value: PAYLOAD.to_vec(),
            response_needed: false,
            offset: 0,
        })
        .unwrap();
        tx.send(LinkEvent::DescriptorWriteRequest {
            device: PEER,
            request_id: 2,
            descriptor: matter_ble_bridge::gatt::profile::CCCD_UUID,
            value: ENABLE_INDICATION_VALUE.to_vec(),
        })
        .unwrap();

        // assert
        assert_eq!(
            f.matter_rx.recv().await,
            Some(MockMatterEvents::WriteReceived(
                ConnectionId(2),
                MATTER_SERVICE_UUID.to_bytes(),
                WRITE_CHARACTERISTIC_UUID.to_bytes(),
                PAYLOAD.to_vec()
            ))
        );
        assert_eq!(
            f.matter_rx.recv().await,
            Some(MockMatterEvents::SubscribeReceived(
                ConnectionId(1),
                MATTER_SERVICE_UUID.to_bytes(),
                INDICATE_CHARACTERISTIC_UUID.to_bytes()
            ))
        );
    });
}

#[test]
fn test_commissioning_round_trip() {
    start_test(async {
        // arrange: a commissioner connects and subscribes
        let mut f = start_bridge();
        f.bridge.init().unwrap();
        f.bridge.dispatch(LinkEvent::Connected { device: PEER });
        f.bridge.dispatch(LinkEvent::DescriptorWriteRequest {
            device: PEER,
            request_id: 1,
            descriptor: matter_ble_bridge::gatt::profile::CCCD_UUID,
            value: ENABLE_INDICATION_VALUE.to_vec(),
        });
        f.matter_rx.recv().await.unwrap();

        // act: the stack indicates and the peer confirms
        let sent = f.bridge.send_indication(
            ConnectionId(1),
            &MATTER_SERVICE_UUID.to_bytes(),
            &INDICATE_CHARACTERISTIC_UUID.to_bytes(),
            &PAYLOAD,
        );
        f.bridge
            .dispatch(LinkEvent::NotificationSent { device: PEER, status: GattStatus::Success });

        // assert
        assert!(sent);
        assert_eq!(
            f.matter_rx.recv().await,
            Some(MockMatterEvents::IndicationConfirmation(
                ConnectionId(1),
                MATTER_SERVICE_UUID.to_bytes(),
                INDICATE_CHARACTERISTIC_UUID.to_bytes()
            ))
        );
    });
}

#[test]
fn test_close_then_send_is_not_found() {
    start_test(async {
        // arrange
        let mut f = start_bridge();
        f.bridge.init().unwrap();
        f.bridge.dispatch(LinkEvent::Connected { device: PEER });
        f.bridge.dispatch(LinkEvent::Connected { device: SECOND_PEER });

        // act
        let closed = f.bridge.close_connection(ConnectionId(1));
        let sent = f.bridge.send_indication(
            ConnectionId(1),
            &MATTER_SERVICE_UUID.to_bytes(),
            &INDICATE_CHARACTERISTIC_UUID.to_bytes(),
            &PAYLOAD,
        );

        // assert
        assert!(closed);
        assert!(!sent);
        assert_eq!(
            f.lifecycle_rx.recv().await,
            Some(MockLifecycleEvents::CloseBleComplete(ConnectionId(1)))
        );
        assert_eq!(f.bridge.get_subscribed_device(ConnectionId(2)), Some(SECOND_PEER));
    });
}

#[test]
fn test_late_completion_after_close_is_harmless() {
    start_test(async {
        // arrange
        let mut f = start_bridge();
        f.bridge.init().unwrap();
        f.bridge.dispatch(LinkEvent::Connected { device: PEER });
        f.bridge.send_indication(
            ConnectionId(1),
            &MATTER_SERVICE_UUID.to_bytes(),
            &INDICATE_CHARACTERISTIC_UUID.to_bytes(),
            &PAYLOAD,
        );
        f.bridge.close_connection(ConnectionId(1));

        // act: the platform confirms the indication after the close
        f.bridge
            .dispatch(LinkEvent::NotificationSent { device: PEER, status: GattStatus::Success });

        // assert
        assert!(f.matter_rx.try_recv().is_err());
        assert_eq!(f.bridge.get_subscribed_device(ConnectionId(1)), None);
    });
}

#[test]
fn test_client_slot_reuse_through_bridge() {
    start_test(async {
        // arrange
        let f = start_bridge();
        let link = |device| {
            let (client, rx) = MockGattClient::new(device, vec![matter_service()]);
            (ClientLink::new(Arc::new(client)), rx)
        };
        let (a, _rx_a) = link(PEER);
        let (b, _rx_b) = link(SECOND_PEER);
        let (c, _rx_c) = link(PEER);

        // act
        assert_eq!(f.bridge.add_connection(a), ConnectionId(1));
        assert_eq!(f.bridge.add_connection(b.clone()), ConnectionId(2));
        f.bridge.remove_connection(ConnectionId(1));
        let reused = f.bridge.add_connection(c.clone());

        // assert
        assert_eq!(reused, ConnectionId(1));
        assert_eq!(f.bridge.get_connection(ConnectionId(1)), Some(c));
        assert_eq!(f.bridge.get_connection(ConnectionId(2)), Some(b));
        assert_eq!(f.bridge.get_connection(ConnectionId(999)), None);
    });
}
