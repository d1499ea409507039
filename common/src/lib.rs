//! Common code shared between `leaf_server` and `leaf_client`.
pub mod protocol;
pub mod report;

/// Error type.
pub type Error = Box<dyn std::error::Error>;
