// SPDX-License-Identifier: GPL-3.0-only
//! Display brightness control protocols
//!
//! Two unrelated protocols sit behind the real backend:
//!
//! - the panel-management protocol for the built-in display ([`backlight`])
//! - DDC/CI for externally attached monitors ([`ddc_ci`])
//!
//! The traits in this module are the seams the real device talks through, so the
//! platform can be swapped for a scripted one in tests.

pub mod backlight;
pub mod ddc_ci;

use thiserror::Error;

/// VCP (Virtual Control Panel) code for brightness
pub const BRIGHTNESS_CODE: u8 = 0x10;

/// Failure reported by a protocol call
#[derive(Error, Debug)]
pub enum ControlError {
    /// The call path is not implemented by this display or platform
    #[error("operation not supported")]
    Unsupported,

    /// The process lacks the privilege the protocol requires
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Reading of the high-level brightness call, in the monitor's native units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessRange {
    pub min: u16,
    pub current: u16,
    pub max: u16,
}

/// Reading of a VCP feature: current value and the native maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcpReading {
    pub current: u16,
    pub max: u16,
}

/// One physical monitor control handle resolved from a display output
///
/// Handles are owned values: dropping one releases whatever the platform opened
/// for it.
pub trait PhysicalMonitor: Send {
    /// High-level convenience read
    fn monitor_brightness(&mut self) -> Result<BrightnessRange, ControlError> {
        Err(ControlError::Unsupported)
    }

    /// High-level convenience write, `value` in native units
    fn set_monitor_brightness(&mut self, _value: u16) -> Result<(), ControlError> {
        Err(ControlError::Unsupported)
    }

    /// Low-level VCP feature read
    fn vcp_feature(&mut self, code: u8) -> Result<VcpReading, ControlError>;

    /// Low-level VCP feature write, `value` in native units
    fn set_vcp_feature(&mut self, code: u8, value: u16) -> Result<(), ControlError>;
}

/// The singleton brightness-control object of the built-in panel
pub trait PanelControl: Send + Sync + std::fmt::Debug {
    /// Current brightness (0-100)
    fn brightness(&self) -> Result<u16, ControlError>;

    /// Set the brightness (0-100) without a transition
    fn set_brightness(&self, percent: u16) -> Result<(), ControlError>;
}
