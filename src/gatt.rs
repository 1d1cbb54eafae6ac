//! The CHIPoBLE transport: a GATT server commissioners connect to, the
//! client links the Matter stack drives, and commissionable advertising.

pub mod advertising;
pub mod bridge;
pub mod callbacks;
pub mod client;
pub mod events;
pub mod ids;
pub mod mocks;
pub mod platform;
pub mod profile;
pub mod registry;
pub mod reset;
pub mod server;
