//! Error types for the Frameline GPU layer
//!
//! Device-level calls return these errors; the components above the
//! `GraphicsDevice` boundary log them and degrade (null handle, skipped draw)
//! instead of propagating them to the renderer.

use std::fmt;

/// Result type for Frameline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frameline errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock, etc.)
    BackendError(String),

    /// Out of device memory
    OutOfMemory,

    /// A descriptor pool has no room left for the requested set
    OutOfPoolMemory,

    /// Invalid resource (texture, buffer, program, etc.)
    InvalidResource(String),

    /// Initialization failed (device, context, subsystems)
    InitializationFailed(String),

    /// Format or configuration not supported by the device
    Unsupported(String),

    /// API used out of order (dispatch inside a render pass, double free, ...)
    ProtocolViolation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::OutOfPoolMemory => write!(f, "Out of descriptor pool memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            Error::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
