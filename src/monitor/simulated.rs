// SPDX-License-Identifier: GPL-3.0-only
//! Simulated monitor backend
//!
//! Keeps brightness in memory and never touches the OS. Every operation emits a
//! log line prefixed with [`SIMULATED_TAG`] so test and development runs stay
//! observable without hardware.

use super::device::{MonitorDevice, MonitorKind, ScreenBrightness};
use crate::brightness::clamp_to_range;
use crate::error::DeviceError;

/// Marker prefixed to every simulated-mode log line
pub const SIMULATED_TAG: &str = "[SIMULATED]";

/// Upper bound of every simulated range
const SIMULATED_CEILING: u16 = 100;

#[derive(Debug)]
pub struct SimulatedDevice {
    id: String,
    name: String,
    kind: MonitorKind,
    min: ScreenBrightness,
    max: ScreenBrightness,
    current: ScreenBrightness,
}

impl SimulatedDevice {
    /// Simulated display with the default `0..100` range
    pub fn new(id: &str, name: &str, kind: MonitorKind, initial: i32) -> Self {
        Self::with_range(id, name, kind, 0, SIMULATED_CEILING, initial)
    }

    /// Simulated display with a custom range
    ///
    /// The range is capped at 100 and reordered if `min > max`; `initial` is
    /// clamped into it.
    pub fn with_range(
        id: &str,
        name: &str,
        kind: MonitorKind,
        min: u16,
        max: u16,
        initial: i32,
    ) -> Self {
        let (min, max) = (min.min(max), max.max(min));
        let (min, max) = (min.min(SIMULATED_CEILING), max.min(SIMULATED_CEILING));
        let current = clamp_to_range(initial, min, max);

        info!(
            "{} Monitor '{}' (ID: {}, Type: {}) initialized with brightness {} (range {}..{})",
            SIMULATED_TAG, name, id, kind, current, min, max
        );

        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            min,
            max,
            current,
        }
    }
}

impl MonitorDevice for SimulatedDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MonitorKind {
        self.kind
    }

    fn min_brightness(&self) -> ScreenBrightness {
        self.min
    }

    fn max_brightness(&self) -> ScreenBrightness {
        self.max
    }

    fn read_brightness(&mut self) -> Result<ScreenBrightness, DeviceError> {
        info!(
            "{} Monitor '{}' brightness read: {}",
            SIMULATED_TAG, self.name, self.current
        );
        Ok(self.current)
    }

    fn last_known_brightness(&self) -> ScreenBrightness {
        self.current
    }

    fn set_brightness(&mut self, value: i32) -> Result<ScreenBrightness, DeviceError> {
        let clamped = clamp_to_range(value, self.min, self.max);
        if clamped as i32 != value {
            info!(
                "{} Monitor '{}' brightness value {} clamped to {}",
                SIMULATED_TAG, self.name, value, clamped
            );
        }

        self.current = clamped;
        info!(
            "{} Monitor '{}' brightness set to {}",
            SIMULATED_TAG, self.name, self.current
        );
        Ok(clamped)
    }

    fn is_controllable(&self) -> bool {
        true
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        info!(
            "{} Monitor '{}' (ID: {}) destroyed",
            SIMULATED_TAG, self.name, self.id
        );
    }
}
