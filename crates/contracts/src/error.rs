//! Layered error definitions
//!
//! Categorized by source: config / sink / general

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink render error
    #[error("sink '{sink_name}' render error: {message}")]
    SinkRender { sink_name: String, message: String },

    /// Sink is no longer accepting snapshots
    #[error("sink '{sink_name}' closed")]
    SinkClosed { sink_name: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink render error
    pub fn sink_render(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkRender {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink closed error
    pub fn sink_closed(sink_name: impl Into<String>) -> Self {
        Self::SinkClosed {
            sink_name: sink_name.into(),
        }
    }
}
