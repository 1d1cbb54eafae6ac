//! Utilities

pub mod logging;
#[cfg(test)]
pub mod task;
