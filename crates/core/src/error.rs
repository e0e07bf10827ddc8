//! Error types for mouse-rebind-core.

use thiserror::Error;

/// Core library error type.
///
/// Only [`Error::Access`], [`Error::DeviceNotFound`] and [`Error::Transfer`]
/// end an enumeration or dispatch call. Descriptor reads, driver detachment
/// and configuration failures are absorbed by the caller that hits them.
#[derive(Debug, Error)]
pub enum Error {
    /// Enumeration or device open failed at the host-stack level.
    #[error("USB access error: {0}")]
    Access(String),

    /// Any other USB stack failure (descriptor reads, driver queries, configuration).
    #[error("USB error: {0}")]
    Usb(String),

    /// No attached device matches the requested identity.
    #[error("device not found: VID=0x{vendor_id:04X} PID=0x{product_id:04X}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// The SET_REPORT control transfer failed or timed out.
    #[error("control transfer failed: {0}")]
    Transfer(String),

    /// A payload token was rejected under the strict payload policy.
    #[error("invalid payload token '{token}' (expected 0-255, decimal or 0x hex)")]
    InvalidPayload { token: String },

    /// A textual integer could not be parsed or does not fit the target width.
    #[error("invalid number: '{0}' (expected decimal or 0x hex)")]
    InvalidNumber(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error is likely a permissions problem the operator can fix
    /// (run as root, install udev rules).
    pub fn is_access(&self) -> bool {
        matches!(self, Self::Access(_))
    }
}
