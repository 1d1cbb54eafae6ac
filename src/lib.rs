// Copyright 2022, The Android Open Source Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A BLE transport bridge for commissionable Matter accessories. Platform
//! Bluetooth callbacks come in as [`gatt::events::LinkEvent`]s and are
//! forwarded to the Matter stack keyed by connection id; the Matter stack
//! drives subscriptions, sends and advertising through [`gatt::bridge::BleBridge`].

use std::sync::Arc;

use log::info;
use tokio::sync::mpsc::UnboundedReceiver;

pub mod config;
pub mod core;
pub mod gatt;
pub mod utils;

pub use gatt::{bridge::BleBridge, events::LinkEvent, ids::ConnectionId};

/// Deliver link events to the bridge in arrival order until the sending
/// side is dropped
pub async fn run_link_event_loop(bridge: Arc<BleBridge>, mut rx: UnboundedReceiver<LinkEvent>) {
    info!("starting link event loop");
    while let Some(event) = rx.recv().await {
        bridge.dispatch(event);
    }
    info!("link event loop stopped");
}
