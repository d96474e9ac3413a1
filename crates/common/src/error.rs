//! Error types shared across Reelcut crates.

use std::path::PathBuf;

/// Top-level error type for Reelcut operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelcutError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Page error: {message}")]
    Page { message: String },

    #[error("Encode error: {message} (exit code {exit_code:?}): {stderr}")]
    Encode {
        message: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Timed out after {waited_ms}ms: {message}")]
    Timeout { message: String, waited_ms: u64 },

    #[error("Delivery error: {message}")]
    Delivery { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelcutError.
pub type ReelcutResult<T> = Result<T, ReelcutError>;

impl ReelcutError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn page(msg: impl Into<String>) -> Self {
        Self::Page {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn timeout(msg: impl Into<String>, waited_ms: u64) -> Self {
        Self::Timeout {
            message: msg.into(),
            waited_ms,
        }
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
