// SPDX-License-Identifier: GPL-3.0-only
//! Device factory
//!
//! Builds the device list for the selected [`BackendMode`]. The simulated fleet
//! is fixed; the real one is derived from the platform's connected outputs.

use std::fmt;
use std::sync::Arc;

use super::device::{DeviceHandle, MonitorKind};
use super::real::RealDevice;
use super::simulated::{SIMULATED_TAG, SimulatedDevice};
use crate::error::{AppError, DeviceError, Result};
use crate::platform::DisplayPlatform;

/// Fixed id of the built-in panel, only one is ever assumed
pub const INTERNAL_ID: &str = "internal_0";
const INTERNAL_NAME: &str = "Internal Display";

/// Brightness every simulated display starts at
const SIMULATED_INITIAL: i32 = 50;

/// Which backend devices are built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendMode {
    #[default]
    Real,
    Simulated,
}

impl BackendMode {
    pub fn from_simulated(simulated: bool) -> Self {
        if simulated {
            BackendMode::Simulated
        } else {
            BackendMode::Real
        }
    }

    pub fn is_simulated(self) -> bool {
        self == BackendMode::Simulated
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Real => f.write_str("real"),
            BackendMode::Simulated => f.write_str("simulated"),
        }
    }
}

/// Source of a fresh device list, consumed by the cache
pub trait DeviceEnumerator: Send + Sync {
    /// Blocking; callers move it off the async runtime
    fn enumerate(&self) -> Result<Vec<DeviceHandle>>;
}

pub struct DeviceFactory {
    mode: BackendMode,
    platform: Arc<dyn DisplayPlatform>,
}

impl DeviceFactory {
    pub fn new(mode: BackendMode, platform: Arc<dyn DisplayPlatform>) -> Self {
        Self { mode, platform }
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub fn create_devices(&self) -> Result<Vec<DeviceHandle>> {
        match self.mode {
            BackendMode::Simulated => {
                info!("{} Refreshing monitor list", SIMULATED_TAG);
                Ok(simulated_devices())
            }
            BackendMode::Real => self.real_devices(),
        }
    }

    fn real_devices(&self) -> Result<Vec<DeviceHandle>> {
        let outputs = self.platform.outputs().map_err(AppError::Enumeration)?;

        let mut devices = Vec::with_capacity(outputs.len());
        let mut has_internal = false;
        let mut external_index = 0usize;

        for output in outputs {
            if !has_internal && output.is_internal() {
                has_internal = true;

                let panel = match self.platform.panel() {
                    Ok(panel) => Some(panel),
                    Err(err) => {
                        let err = DeviceError::from_control(INTERNAL_ID, err);
                        if err.is_permission_denied() {
                            warn!(error = %err, "Panel brightness needs elevated privileges");
                        } else {
                            warn!(error = %err, "Panel brightness control unavailable");
                        }
                        None
                    }
                };

                info!(connector = %output.connector, "Found internal display");
                let device = RealDevice::internal(
                    INTERNAL_ID,
                    INTERNAL_NAME,
                    output,
                    self.platform.clone(),
                    panel,
                );
                devices.push(DeviceHandle::new(Box::new(device)));
                continue;
            }

            let id = format!("monitor_{:08x}_{}", output.handle, external_index);
            let name = output
                .description
                .clone()
                .unwrap_or_else(|| format!("External Display {}", external_index + 1));
            external_index += 1;

            info!(
                display_id = %id,
                display_name = %name,
                connector = %output.connector,
                "Probing external display"
            );
            let device = RealDevice::external(&id, &name, output, self.platform.clone());
            devices.push(DeviceHandle::new(Box::new(device)));
        }

        info!("Created {} real monitor(s)", devices.len());
        Ok(devices)
    }
}

impl DeviceEnumerator for DeviceFactory {
    fn enumerate(&self) -> Result<Vec<DeviceHandle>> {
        self.create_devices()
    }
}

impl fmt::Debug for DeviceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceFactory").field("mode", &self.mode).finish()
    }
}

/// One internal and two external displays, internal first
fn simulated_devices() -> Vec<DeviceHandle> {
    info!("{} Creating simulated monitors", SIMULATED_TAG);

    let fleet = [
        ("sim_internal_0", "Simulated Internal Display", MonitorKind::Internal),
        ("sim_external_0", "Simulated External Display 1", MonitorKind::External),
        ("sim_external_1", "Simulated External Display 2", MonitorKind::External),
    ];

    let devices: Vec<_> = fleet
        .into_iter()
        .map(|(id, name, kind)| {
            let device = SimulatedDevice::new(id, name, kind, SIMULATED_INITIAL);
            DeviceHandle::new(Box::new(device))
        })
        .collect();

    info!("{} Created {} simulated monitors", SIMULATED_TAG, devices.len());
    devices
}
