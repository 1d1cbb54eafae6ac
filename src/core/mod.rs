//! Shared data types used throughout the bridge

pub mod address;
pub mod uuid;
