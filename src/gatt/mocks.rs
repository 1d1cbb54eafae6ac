//! Mocked collaborators for use in test. Each routes calls into a channel
//! of events.

pub mod mock_lifecycle;
pub mod mock_matter_stack;
pub mod mock_platform;
