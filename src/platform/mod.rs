// SPDX-License-Identifier: GPL-3.0-only
//! Operating-system view of the display outputs
//!
//! The real backend never talks to the OS directly. It goes through a
//! [`DisplayPlatform`], which enumerates display outputs, resolves an output to its
//! physical monitor control handles and initialises the panel subsystem.

pub mod system;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;

use crate::protocols::{ControlError, PanelControl, PhysicalMonitor};

pub use system::SystemPlatform;

/// Keywords in an output description that mark a built-in panel
const INTERNAL_KEYWORDS: [&str; 3] = ["internal", "built-in", "laptop"];

/// Connector types wired to an embedded panel
const EMBEDDED_CONNECTORS: [&str; 3] = ["eDP", "LVDS", "DSI"];

/// One display output as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOutput {
    /// OS handle of the output, stable for one enumeration pass
    pub handle: u64,
    /// Connector name, e.g. `eDP-1` or `DP-2`
    pub connector: String,
    /// Device string, usually the EDID monitor name
    pub description: Option<String>,
    /// Whether the OS reports this output as the primary one
    pub primary: bool,
    /// Raw EDID, fallback key for physical monitor handles
    pub edid: Vec<u8>,
    /// Device number of the i2c-dev node on the connector's DDC channel
    pub ddc_device: Option<u64>,
}

impl DisplayOutput {
    /// Classify the output as a built-in panel
    ///
    /// Heuristic chain: description keywords, then embedded connector type, then
    /// the primary flag.
    pub fn is_internal(&self) -> bool {
        if let Some(description) = &self.description {
            let description = description.to_lowercase();
            if INTERNAL_KEYWORDS.iter().any(|k| description.contains(k)) {
                return true;
            }
        }

        if EMBEDDED_CONNECTORS
            .iter()
            .any(|prefix| self.connector.starts_with(prefix))
        {
            return true;
        }

        self.primary
    }
}

/// OS services the real backend depends on
pub trait DisplayPlatform: Send + Sync {
    /// Enumerate the connected display outputs
    fn outputs(&self) -> anyhow::Result<Vec<DisplayOutput>>;

    /// Resolve an output to its physical monitor handles
    ///
    /// The returned handles are released when dropped.
    fn physical_monitors(
        &self,
        output: &DisplayOutput,
    ) -> Result<Vec<Box<dyn PhysicalMonitor>>, ControlError>;

    /// Initialise the panel subsystem once and hand out its control object
    fn panel(&self) -> Result<Arc<dyn PanelControl>, ControlError>;
}
