pub mod codec;
pub mod error;
pub mod packet_type;
pub mod properties;
pub mod protocol;
pub mod qos;
pub mod reason;
pub mod topic;

/// A specialized `Result` type for mqttwire operations
///
/// This is defined as a convenience
pub type Result<T> = std::result::Result<T, crate::error::Error>;
