//! Edge capture error types

use thiserror::Error;

/// Edge capture errors
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Shutter profile cannot produce a valid firing
    #[error("invalid shutter profile: {message}")]
    InvalidProfile { message: String },
}

impl CaptureError {
    pub fn invalid_profile(message: impl Into<String>) -> Self {
        Self::InvalidProfile {
            message: message.into(),
        }
    }
}

/// Edge capture Result type
pub type Result<T> = std::result::Result<T, CaptureError>;
