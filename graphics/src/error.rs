//! Graphics error types.

use std::fmt;
use std::time::Duration;

use crate::resources::ResourceKind;

/// Errors that can occur in the graphics system.
///
/// Running out of atlas space is not an error; see
/// [`TextureAtlas::add`](crate::TextureAtlas::add).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the device or backend.
    InitializationFailed(String),
    /// The backend returned no handle for a resource.
    ResourceCreationFailed {
        /// Kind of resource that was requested.
        kind: ResourceKind,
        /// The backend's last error message.
        reason: String,
    },
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// The device has been shut down or lost.
    DeviceLost,
    /// The device did not become idle within the allowed time.
    Timeout(Duration),
    /// An internal error occurred.
    Internal(String),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::ResourceCreationFailed { kind, reason } => {
                write!(f, "failed to create {kind}: {reason}")
            }
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::Timeout(after) => write!(f, "device not idle after {after:?}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}
