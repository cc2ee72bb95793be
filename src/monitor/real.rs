// SPDX-License-Identifier: GPL-3.0-only
//! Real monitor backend
//!
//! The built-in panel is driven through the panel-management protocol, attached
//! monitors through DDC/CI. Both are reached through the [`DisplayPlatform`], and
//! every OS handle resolved for a call is dropped before the call returns.

use std::fmt;
use std::sync::Arc;

use super::device::{MonitorDevice, MonitorKind, ScreenBrightness};
use crate::brightness::{clamp_to_range, native_to_percent, percent_to_native};
use crate::error::DeviceError;
use crate::platform::{DisplayOutput, DisplayPlatform};
use crate::protocols::{BRIGHTNESS_CODE, ControlError, PanelControl};

/// Best-known value before the first successful read
const DEFAULT_BRIGHTNESS: ScreenBrightness = 50;

/// Canonical range every real device reports
const REAL_MIN: ScreenBrightness = 0;
const REAL_MAX: ScreenBrightness = 100;

pub struct RealDevice {
    id: String,
    name: String,
    kind: MonitorKind,
    output: DisplayOutput,
    platform: Arc<dyn DisplayPlatform>,
    /// Panel protocol, internal displays only
    panel: Option<Arc<dyn PanelControl>>,
    /// DDC/CI established by the construction probe, external displays only
    supports_ddc: bool,
    last_known: ScreenBrightness,
}

impl RealDevice {
    /// Built-in panel, controllable when the panel subsystem initialised
    pub fn internal(
        id: &str,
        name: &str,
        output: DisplayOutput,
        platform: Arc<dyn DisplayPlatform>,
        panel: Option<Arc<dyn PanelControl>>,
    ) -> Self {
        let mut device = Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: MonitorKind::Internal,
            output,
            platform,
            panel,
            supports_ddc: false,
            last_known: DEFAULT_BRIGHTNESS,
        };

        if device.panel.is_some() {
            if let Err(err) = device.read_brightness() {
                warn!(
                    display_id = %device.id,
                    error = %err,
                    "Initial panel brightness read failed"
                );
            }
        }
        device
    }

    /// Attached monitor, controllable only if a live read succeeds now
    pub fn external(
        id: &str,
        name: &str,
        output: DisplayOutput,
        platform: Arc<dyn DisplayPlatform>,
    ) -> Self {
        let mut device = Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: MonitorKind::External,
            output,
            platform,
            panel: None,
            supports_ddc: true,
            last_known: DEFAULT_BRIGHTNESS,
        };

        match device.read_brightness() {
            Ok(value) => {
                debug!(display_id = %device.id, brightness = value, "DDC/CI probe succeeded");
            }
            Err(err) => {
                warn!(
                    display_id = %device.id,
                    display_name = %device.name,
                    error = %err,
                    "DDC/CI probe failed, marking the monitor non-controllable"
                );
                device.supports_ddc = false;
            }
        }
        device
    }

    fn read_external(&self) -> Result<ScreenBrightness, ControlError> {
        let mut monitors = self.platform.physical_monitors(&self.output)?;
        let Some(monitor) = monitors.first_mut() else {
            return Err(ControlError::Unsupported);
        };

        match monitor.monitor_brightness() {
            Ok(range) => Ok(native_to_percent(
                range.current.saturating_sub(range.min) as u32,
                range.max.saturating_sub(range.min) as u32,
            )),
            Err(err) => {
                debug!(
                    display_id = %self.id,
                    error = %err,
                    "High-level read unavailable, using VCP"
                );
                let reading = monitor.vcp_feature(BRIGHTNESS_CODE)?;
                if reading.max == 0 {
                    return Err(ControlError::Other(anyhow::anyhow!(
                        "monitor reported an empty brightness range"
                    )));
                }
                Ok(native_to_percent(reading.current as u32, reading.max as u32))
            }
        }
    }

    fn write_external(&self, percent: ScreenBrightness) -> Result<(), ControlError> {
        let mut monitors = self.platform.physical_monitors(&self.output)?;
        let Some(monitor) = monitors.first_mut() else {
            return Err(ControlError::Unsupported);
        };

        let high_level = monitor.monitor_brightness().and_then(|range| {
            let span = range.max.saturating_sub(range.min) as u32;
            let native = range.min + percent_to_native(percent, span) as u16;
            monitor.set_monitor_brightness(native)
        });

        match high_level {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!(
                    display_id = %self.id,
                    error = %err,
                    "High-level write unavailable, using VCP"
                );
                let native_max = match monitor.vcp_feature(BRIGHTNESS_CODE) {
                    Ok(reading) if reading.max > 0 => reading.max,
                    _ => REAL_MAX,
                };
                let native = percent_to_native(percent, native_max as u32) as u16;
                monitor.set_vcp_feature(BRIGHTNESS_CODE, native)
            }
        }
    }
}

impl MonitorDevice for RealDevice {
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
        REAL_MIN
    }

    fn max_brightness(&self) -> ScreenBrightness {
        REAL_MAX
    }

    fn read_brightness(&mut self) -> Result<ScreenBrightness, DeviceError> {
        let result = match (&self.panel, self.kind) {
            (Some(panel), MonitorKind::Internal) => panel.brightness(),
            (_, MonitorKind::External) if self.supports_ddc => self.read_external(),
            _ => {
                return Err(DeviceError::NotControllable {
                    id: self.id.clone(),
                });
            }
        };

        match result {
            Ok(value) => {
                let value = value.min(REAL_MAX);
                self.last_known = value;
                Ok(value)
            }
            Err(err) => Err(DeviceError::from_control(&self.id, err)),
        }
    }

    fn last_known_brightness(&self) -> ScreenBrightness {
        self.last_known
    }

    fn set_brightness(&mut self, value: i32) -> Result<ScreenBrightness, DeviceError> {
        let value = clamp_to_range(value, REAL_MIN, REAL_MAX);

        let result = match (&self.panel, self.kind) {
            (Some(panel), MonitorKind::Internal) => panel.set_brightness(value),
            (_, MonitorKind::External) if self.supports_ddc => self.write_external(value),
            _ => {
                return Err(DeviceError::NotControllable {
                    id: self.id.clone(),
                });
            }
        };

        match result {
            Ok(()) => {
                self.last_known = value;
                Ok(value)
            }
            Err(err) => {
                let err = DeviceError::from_control(&self.id, err);
                if err.is_permission_denied() {
                    warn!(
                        display_id = %self.id,
                        error = %err,
                        "Brightness write refused, elevated privileges are required"
                    );
                } else {
                    error!(display_id = %self.id, error = %err, "Failed to set brightness");
                }
                Err(err)
            }
        }
    }

    fn is_controllable(&self) -> bool {
        match self.kind {
            MonitorKind::Internal => self.panel.is_some(),
            MonitorKind::External => self.supports_ddc,
        }
    }
}

impl fmt::Debug for RealDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RealDevice(id: {}, name: {}, kind: {}, connector: {}, controllable: {})",
            self.id,
            self.name,
            self.kind,
            self.output.connector,
            self.is_controllable()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::platform::fake::{FakePanel, FakePlatform, MonitorState, WritePath};

    fn output(platform: &FakePlatform, handle: u64) -> DisplayOutput {
        platform
            .outputs
            .iter()
            .find(|o| o.handle == handle)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_internal_panel_read_write() {
        let panel = FakePanel::new(30);
        let platform = FakePlatform::new()
            .with_output(1, "eDP-1", None)
            .with_panel(panel.clone());
        let out = output(&platform, 1);
        let platform = Arc::new(platform);

        let control = Some(panel.clone() as Arc<dyn PanelControl>);
        let mut device = RealDevice::internal("internal_0", "Internal", out, platform, control);
        assert!(device.is_controllable());
        assert_eq!(device.brightness(), 30);

        assert_eq!(device.set_brightness(180).unwrap(), 100);
        assert_eq!(*panel.current.lock().unwrap(), 100);
        assert_eq!(device.last_known_brightness(), 100);
    }

    #[test]
    fn test_internal_permission_denied_keeps_last_known() {
        let panel = FakePanel::new(40);
        panel.permission_denied.store(true, Ordering::SeqCst);
        let platform = FakePlatform::new().with_output(1, "eDP-1", None);
        let out = output(&platform, 1);

        let control = Some(panel as Arc<dyn PanelControl>);
        let platform = Arc::new(platform);
        let mut device = RealDevice::internal("internal_0", "Internal", out, platform, control);
        let err = device.set_brightness(80).unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(device.last_known_brightness(), 40);
    }

    #[test]
    fn test_internal_without_panel_is_not_controllable() {
        let platform = FakePlatform::new().with_output(1, "eDP-1", None);
        let out = output(&platform, 1);

        let platform = Arc::new(platform);
        let mut device = RealDevice::internal("internal_0", "Internal", out, platform, None);
        assert!(!device.is_controllable());
        assert_eq!(device.brightness(), DEFAULT_BRIGHTNESS);
        assert!(matches!(
            device.set_brightness(10),
            Err(DeviceError::NotControllable { .. })
        ));
    }

    #[test]
    fn test_external_vcp_fallback_rescales() {
        let state = MonitorState::vcp(32, 64);
        let platform = FakePlatform::new()
            .with_output(7, "DP-1", Some("DELL U2720Q"))
            .with_monitor(7, state.clone());
        let out = output(&platform, 7);
        let platform = Arc::new(platform);

        let mut device =
            RealDevice::external("monitor_00000007_0", "DELL U2720Q", out, platform.clone());
        assert!(device.is_controllable());
        assert_eq!(device.brightness(), 50);

        assert_eq!(device.set_brightness(75).unwrap(), 75);
        assert_eq!(state.lock().unwrap().writes, vec![(WritePath::Vcp, 48)]);
        assert_eq!(device.brightness(), 75);
        assert_eq!(platform.open_handles(), 0);
    }

    #[test]
    fn test_external_prefers_high_level_path() {
        let state = MonitorState::high_level(20);
        let platform = FakePlatform::new()
            .with_output(3, "HDMI-A-1", None)
            .with_monitor(3, state.clone());
        let out = output(&platform, 3);

        let platform = Arc::new(platform);
        let mut device = RealDevice::external("monitor_00000003_0", "External 1", out, platform);
        assert_eq!(device.brightness(), 20);
        device.set_brightness(65).unwrap();
        assert_eq!(state.lock().unwrap().writes, vec![(WritePath::HighLevel, 65)]);
    }

    #[test]
    fn test_external_without_handles_is_not_controllable() {
        let platform = FakePlatform::new().with_output(9, "DP-2", None);
        let out = output(&platform, 9);

        let platform = Arc::new(platform);
        let mut device = RealDevice::external("monitor_00000009_0", "External 1", out, platform);
        assert!(!device.is_controllable());
        assert_eq!(device.brightness(), DEFAULT_BRIGHTNESS);
        assert!(device.set_brightness(10).is_err());
    }

    #[test]
    fn test_failed_probe_marks_non_controllable() {
        let state = MonitorState::vcp(50, 100);
        state.lock().unwrap().fail_reads = true;
        let platform = FakePlatform::new()
            .with_output(4, "DP-3", None)
            .with_monitor(4, state);
        let out = output(&platform, 4);
        let platform = Arc::new(platform);

        let device =
            RealDevice::external("monitor_00000004_0", "External 1", out, platform.clone());
        assert!(!device.is_controllable());
        assert_eq!(platform.open_handles(), 0);
    }

    #[test]
    fn test_transient_write_failure_keeps_last_known() {
        let state = MonitorState::vcp(60, 100);
        let platform = FakePlatform::new()
            .with_output(5, "DP-4", None)
            .with_monitor(5, state.clone());
        let out = output(&platform, 5);
        let platform = Arc::new(platform);

        let mut device =
            RealDevice::external("monitor_00000005_0", "External 1", out, platform.clone());
        state.lock().unwrap().fail_writes = true;

        let err = device.set_brightness(10).unwrap_err();
        assert!(matches!(err, DeviceError::Transient { .. }));
        assert_eq!(device.last_known_brightness(), 60);
        assert_eq!(platform.open_handles(), 0);

        // reads fail too now, the device degrades to the stale value
        state.lock().unwrap().fail_reads = true;
        assert_eq!(device.brightness(), 60);
    }
}
