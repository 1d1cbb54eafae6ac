//! Resetting BLE state after commissioning: open a bare GATT server, wait a
//! bounded time for the lingering peer to reconnect, then drop it and turn
//! the radio off

use std::time::Duration;

use log::{info, trace, warn};
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};

use crate::core::address::AddressWithType;

use super::{
    bridge::BleBridge,
    events::LinkEvent,
    platform::{BluetoothAdapter, Permission},
};

#[derive(Debug)]
/// Errors that can occur while resetting the GATT server. None are fatal;
/// the caller may retry.
pub enum ResetError {
    /// The platform withheld the connect permission
    PermissionDenied,
    /// The platform could not open a GATT server
    OpenFailed(anyhow::Error),
    /// No peer connected within the allotted time
    Timeout,
    /// The event channel closed while waiting
    EventsClosed,
}

async fn wait_for_connection(events: &mut UnboundedReceiver<LinkEvent>) -> Option<AddressWithType> {
    while let Some(event) = events.recv().await {
        match event {
            LinkEvent::Connected { device } => return Some(device),
            other => trace!("ignoring {other:?} while waiting for reset connection"),
        }
    }
    None
}

/// Open a GATT server and wait at most `wait` for a peer to connect. On
/// connection, drop the peer, close the server and disable the radio.
pub async fn reset_gatt_server(
    adapter: &dyn BluetoothAdapter,
    events: &mut UnboundedReceiver<LinkEvent>,
    wait: Duration,
) -> Result<(), ResetError> {
    if !adapter.has_permission(Permission::Connect) {
        return Err(ResetError::PermissionDenied);
    }
    let server = adapter.open_gatt_server().map_err(ResetError::OpenFailed)?;

    let device = match timeout(wait, wait_for_connection(events)).await {
        Ok(Some(device)) => device,
        Ok(None) => {
            server.close();
            return Err(ResetError::EventsClosed);
        }
        Err(_) => {
            warn!("no connection within {wait:?}, giving up on reset");
            server.close();
            return Err(ResetError::Timeout);
        }
    };

    info!("reset: dropping {device} and disabling BT");
    server.cancel_connection(device);
    server.close();
    adapter.disable();
    Ok(())
}

impl BleBridge {
    /// Reset the GATT server using the configured wait bound. `events` must
    /// carry the callbacks of servers opened by this bridge's adapter.
    pub async fn reset_gatt_server(
        &self,
        events: &mut UnboundedReceiver<LinkEvent>,
    ) -> Result<(), ResetError> {
        reset_gatt_server(&*self.adapter, events, self.config.reset_timeout()).await
    }
}
