//! The entry points the bridge calls back into on the Matter stack side.
//! Service and characteristic ids are always passed in their 16-byte
//! big-endian wire form.

use super::ids::ConnectionId;

/// A 16-byte service or characteristic id, as the Matter stack sees it
pub type WireUuid = [u8; 16];

/// Link events translated into the Matter stack's connection-id form
pub trait MatterCallbacks: Send + Sync {
    /// A peer wrote to the write characteristic
    fn handle_write_received(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        data: &[u8],
    );

    /// A peer enabled indications or notifications via the CCCD
    fn handle_subscribe_received(&self, conn_id: ConnectionId, svc_id: WireUuid, char_id: WireUuid);

    /// A peer disabled indications and notifications via the CCCD
    fn handle_unsubscribe_received(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
    );

    /// The last indication sent was confirmed by the peer
    fn handle_indication_confirmation(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
    );

    /// A client link dropped
    fn handle_connection_error(&self, conn_id: ConnectionId);

    /// A write issued with `send_write_request` completed
    fn handle_write_confirmation(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        success: bool,
    );

    /// A remote characteristic we subscribed to changed
    fn handle_indication_received(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        data: &[u8],
    );

    /// A CCCD enable write issued by `subscribe_characteristic` completed
    fn handle_subscribe_complete(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        success: bool,
    );

    /// A CCCD disable write issued by `unsubscribe_characteristic` completed
    fn handle_unsubscribe_complete(
        &self,
        conn_id: ConnectionId,
        svc_id: WireUuid,
        char_id: WireUuid,
        success: bool,
    );
}

/// Values advertised while commissionable. Read fresh each time
/// advertising starts.
pub trait CommissionableDataProvider: Send + Sync {
    /// 12-bit setup discriminator
    fn discriminator(&self) -> u16;
    /// Vendor id
    fn vendor_id(&self) -> u16;
    /// Product id
    fn product_id(&self) -> u16;
}

/// Notified when the bridge tears BLE down on the Matter stack's request
pub trait BleLifecycleCallbacks: Send + Sync {
    /// `close_connection` finished
    fn on_close_ble_complete(&self, conn_id: ConnectionId);
    /// `notify_connection_closed` finished
    fn on_notify_chip_connection_closed(&self, conn_id: ConnectionId);
}
