use thiserror::Error;

/// Message shown to users for any load failure. Deliberately vague so that a
/// wrong password and corrupted bytes look the same from the outside.
pub const LOAD_FAILED_MESSAGE: &str = "could not load image";

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CodecError {
    #[error("transport text is not valid base64")]
    DecodeError,

    #[error("container is truncated: needed {needed} bytes at offset {offset}, {available} available")]
    TruncatedContainer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("compressed plane is corrupt")]
    CorruptStream,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("canvas has no content to export")]
    NoContent,

    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("payload could not be encrypted")]
    EncryptionFailed,
}

impl CodecError {
    /// Only a failed password check can be retried; every other failure ends
    /// the load attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CodecError::AuthenticationFailed)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            CodecError::NoContent => "nothing to share: the canvas is empty",
            CodecError::InvalidDimensions { .. } => "canvas size is out of range",
            CodecError::EncryptionFailed => "could not encrypt image",
            _ => LOAD_FAILED_MESSAGE,
        }
    }
}
