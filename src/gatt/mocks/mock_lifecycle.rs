//! Mocked implementation of BleLifecycleCallbacks for use in test

use tokio::sync::mpsc::{self, unbounded_channel, UnboundedReceiver};

use crate::gatt::{callbacks::BleLifecycleCallbacks, ids::ConnectionId};

/// Routes calls to BleLifecycleCallbacks into a channel of
/// MockLifecycleEvents
pub struct MockLifecycle(mpsc::UnboundedSender<MockLifecycleEvents>);

impl MockLifecycle {
    /// Constructor. Returns self and the RX side of the associated channel.
    pub fn new() -> (Self, UnboundedReceiver<MockLifecycleEvents>) {
        let (tx, rx) = unbounded_channel();
        (Self(tx), rx)
    }
}

/// Events representing calls to BleLifecycleCallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockLifecycleEvents {
    /// BleLifecycleCallbacks#on_close_ble_complete invoked
    CloseBleComplete(ConnectionId),
    /// BleLifecycleCallbacks#on_notify_chip_connection_closed invoked
    ChipConnectionClosed(ConnectionId),
}

impl BleLifecycleCallbacks for MockLifecycle {
    fn on_close_ble_complete(&self, conn_id: ConnectionId) {
        self.0.send(MockLifecycleEvents::CloseBleComplete(conn_id)).unwrap();
    }

    fn on_notify_chip_connection_closed(&self, conn_id: ConnectionId) {
        self.0.send(MockLifecycleEvents::ChipConnectionClosed(conn_id)).unwrap();
    }
}
