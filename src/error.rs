// SPDX-License-Identifier: GPL-3.0-only
//! Error types for the brightness core
//!
//! Device-level failures are described by [`DeviceError`] and never escape the
//! device/engine boundary except as a boolean or sentinel. [`AppError`] covers
//! the failures that are allowed to reach a caller, enumeration first of all.

use thiserror::Error;

use crate::protocols::ControlError;

/// Failure of a single device operation
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No protocol support was established for this display at construction
    #[error("Display {id} is not controllable")]
    NotControllable { id: String },

    /// The panel protocol needs elevated privileges
    #[error("Insufficient privilege to control display {id}: {reason}")]
    PermissionDenied { id: String, reason: String },

    /// The display answers neither the high-level nor the low-level control path
    #[error("Display {id} does not support brightness control")]
    Unsupported { id: String },

    /// A single read or write failed without a structural cause
    #[error("Transient failure on display {id}: {source}")]
    Transient {
        id: String,
        #[source]
        source: ControlError,
    },
}

impl DeviceError {
    /// Attribute a protocol failure to the display `id`
    pub fn from_control(id: &str, err: ControlError) -> Self {
        match err {
            ControlError::PermissionDenied(reason) => DeviceError::PermissionDenied {
                id: id.to_string(),
                reason,
            },
            ControlError::Unsupported => DeviceError::Unsupported { id: id.to_string() },
            source => DeviceError::Transient {
                id: id.to_string(),
                source,
            },
        }
    }

    /// Whether the caller should prompt for elevation rather than report missing hardware
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, DeviceError::PermissionDenied { .. })
    }
}

/// Main error type of the crate
#[derive(Error, Debug)]
pub enum AppError {
    /// Display not known to the current enumeration
    #[error("Display {0} not found")]
    DisplayNotFound(String),

    /// The whole enumeration pass failed, no usable device set exists
    #[error("Display enumeration failed: {0}")]
    Enumeration(#[source] anyhow::Error),

    /// Device operation error
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Task join error
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::TaskJoin(err.to_string())
    }
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_errors_are_attributed() {
        let denied = ControlError::PermissionDenied("EACCES".into());
        let err = DeviceError::from_control("internal_0", denied);
        assert!(err.is_permission_denied());
        assert!(err.to_string().contains("internal_0"));

        let err = DeviceError::from_control("monitor_1", ControlError::Unsupported);
        assert!(matches!(err, DeviceError::Unsupported { ref id } if id == "monitor_1"));

        let nak = ControlError::Other(anyhow::anyhow!("nak"));
        let err = DeviceError::from_control("monitor_1", nak);
        assert!(matches!(err, DeviceError::Transient { .. }));
        assert!(!err.is_permission_denied());
    }
}
