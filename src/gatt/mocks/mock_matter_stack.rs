//! Mocked implementation of the Matter stack callbacks for use in test

use std::sync::atomic::{AtomicU16, Ordering};

use tokio::sync::mpsc::{self, unbounded_channel, UnboundedReceiver};

use crate::gatt::{
    callbacks::{CommissionableDataProvider, MatterCallbacks, WireUuid},
    ids::ConnectionId,
};

/// Routes calls to MatterCallbacks into a channel of MockMatterEvents, and
/// serves adjustable commissionable data
pub struct MockMatterStack {
    tx: mpsc::UnboundedSender<MockMatterEvents>,
    discriminator: AtomicU16,
    vendor_id: AtomicU16,
    product_id: AtomicU16,
}

impl MockMatterStack {
    /// Constructor. Returns self and the RX side of the associated channel.
    pub fn new() -> (Self, UnboundedReceiver<MockMatterEvents>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                tx,
                discriminator: AtomicU16::new(0xF00),
                vendor_id: AtomicU16::new(0xFFF1),
                product_id: AtomicU16::new(0x8000),
            },
            rx,
        )
    }

    /// Change the values returned through CommissionableDataProvider
    pub fn set_commissionable_data(&self, discriminator: u16, vendor_id: u16, product_id: u16) {
        self.discriminator.store(discriminator, Ordering::SeqCst);
        self.vendor_id.store(vendor_id, Ordering::SeqCst);
        self.product_id.store(product_id, Ordering::SeqCst);
    }

    fn send(&self, event: MockMatterEvents) {
        self.tx.send(event).unwrap();
    }
}

/// Events representing calls to MatterCallbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockMatterEvents {
    /// MatterCallbacks#handle_write_received invoked
    WriteReceived(ConnectionId, WireUuid, WireUuid, Vec<u8>),
    /// MatterCallbacks#handle_subscribe_received invoked
    SubscribeReceived(ConnectionId, WireUuid, WireUuid),
    /// MatterCallbacks#handle_unsubscribe_received invoked
    UnsubscribeReceived(ConnectionId, WireUuid, WireUuid),
    /// MatterCallbacks#handle_indication_confirmation invoked
    IndicationConfirmation(ConnectionId, WireUuid, WireUuid),
    /// MatterCallbacks#handle_connection_error invoked
    ConnectionError(ConnectionId),
    /// MatterCallbacks#handle_write_confirmation invoked
    WriteConfirmation(ConnectionId, WireUuid, WireUuid, bool),
    /// MatterCallbacks#handle_indication_received invoked
    IndicationReceived(ConnectionId, WireUuid, WireUuid, Vec<u8>),
    /// MatterCallbacks#handle_subscribe_complete invoked
    SubscribeComplete(ConnectionId, WireUuid, WireUuid, bool),
    /// MatterCallbacks#handle_unsubscribe_complete invoked
    UnsubscribeComplete(ConnectionId, WireUuid, WireUuid, bool),
}

impl MatterCallbacks for MockMatterStack {
    fn handle_write_received(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        data: &[u8],
    ) {
        self.send(MockMatterEvents::WriteReceived(conn_id, svc_id, char_id, data.to_vec()));
    }

    fn handle_subscribe_received(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
    ) {
        self.send(MockMatterEvents::SubscribeReceived(conn_id, svc_id, char_id));
    }

    fn handle_unsubscribe_received(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
    ) {
        self.send(MockMatterEvents::UnsubscribeReceived(conn_id, svc_id, char_id));
    }

    fn handle_indication_confirmation(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
    ) {
        self.send(MockMatterEvents::IndicationConfirmation(conn_id, svc_id, char_id));
    }

    fn handle_connection_error(&self, conn_id: ConnectionId) {
        self.send(MockMatterEvents::ConnectionError(conn_id));
    }

    fn handle_write_confirmation(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        success: bool,
    ) {
        self.send(MockMatterEvents::WriteConfirmation(conn_id, svc_id, char_id, success));
    }

    fn handle_indication_received(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        data: &[u8],
    ) {
        self.send(MockMatterEvents::IndicationReceived(conn_id, svc_id, char_id, data.to_vec()));
    }

    fn handle_subscribe_complete(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        success: bool,
    ) {
        self.send(MockMatterEvents::SubscribeComplete(conn_id, svc_id, char_id, success));
    }

    fn handle_unsubscribe_complete(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        success: bool,
    ) {
        self.send(MockMatterEvents::UnsubscribeComplete(conn_id, svc_id, char_id, success));
    }
}

impl CommissionableDataProvider for MockMatterStack {
    fn discriminator(&self) -> u16 {
        self.discriminator.load(Ordering::SeqCst)
    }

    fn vendor_id(&self) -> u16 {
        self.vendor_id.load(Ordering::SeqCst)
    }

    fn product_id(&self) -> u16 {
        self.product_id.load(Ordering::SeqCst)
    }
}
