//! Error types for mibeacon-packet.

use thiserror::Error;
use tracing::Level;

/// Why a frame did not produce a reading.
///
/// Every variant is recoverable: the caller drops the frame and keeps
/// processing the next advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DecodeOutcome {
    /// Too short for a header, or from an unsupported product.
    #[error("frame is not applicable to this decoder")]
    NotApplicable,

    /// Valid frame with no recognized sensor objects.
    #[error("frame carries no sensor data")]
    NoData,

    /// Frame is encrypted but no bindkey is configured.
    #[error("encrypted frame received but no bindkey is configured")]
    KeyRequired,

    /// AES-CCM tag verification failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Offsets or lengths are inconsistent.
    #[error("malformed frame")]
    Malformed,
}

impl DecodeOutcome {
    /// All outcomes, in declaration order.
    pub const ALL: [DecodeOutcome; 5] = [
        DecodeOutcome::NotApplicable,
        DecodeOutcome::NoData,
        DecodeOutcome::KeyRequired,
        DecodeOutcome::AuthenticationFailed,
        DecodeOutcome::Malformed,
    ];

    /// Stable snake_case label, used in metrics and JSON output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DecodeOutcome::NotApplicable => "not_applicable",
            DecodeOutcome::NoData => "no_data",
            DecodeOutcome::KeyRequired => "key_required",
            DecodeOutcome::AuthenticationFailed => "authentication_failed",
            DecodeOutcome::Malformed => "malformed",
        }
    }

    /// Log level an adapter should use when reporting this outcome.
    ///
    /// A missing key is an operator problem and is the only outcome that
    /// warrants a warning.
    pub const fn severity(&self) -> Level {
        match self {
            DecodeOutcome::NotApplicable | DecodeOutcome::NoData | DecodeOutcome::Malformed => {
                Level::DEBUG
            }
            DecodeOutcome::AuthenticationFailed => Level::INFO,
            DecodeOutcome::KeyRequired => Level::WARN,
        }
    }
}

/// Errors from address/key parsing and frame encoding.
#[derive(Debug, Error)]
pub enum PacketError {
    /// MAC address string could not be parsed.
    #[error("Invalid MAC address: {0}")]
    InvalidAddress(String),

    /// Bindkey string could not be parsed.
    #[error("Invalid bindkey: {0}")]
    InvalidBindKey(String),

    /// Encryption error.
    #[error("Encryption error: {0}")]
    EncryptionError(String),

    /// Object data longer than the one-byte length field allows.
    #[error("Object 0x{id:04X} too large: {size} bytes (max 255)")]
    ObjectTooLarge {
        /// Object identifier.
        id: u16,
        /// Actual data length.
        size: usize,
    },
}

impl PacketError {
    /// Create an invalid address error.
    pub fn invalid_address(message: impl Into<String>) -> Self {
        PacketError::InvalidAddress(message.into())
    }

    /// Create an invalid bindkey error.
    pub fn invalid_bindkey(message: impl Into<String>) -> Self {
        PacketError::InvalidBindKey(message.into())
    }

    /// Create an encryption error.
    pub fn encryption(message: impl Into<String>) -> Self {
        PacketError::EncryptionError(message.into())
    }
}
