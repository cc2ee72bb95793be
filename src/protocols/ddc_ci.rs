// SPDX-License-Identifier: GPL-3.0-only
//! DDC/CI (Display Data Channel Command Interface) protocol implementation
//!
//! DDC/CI is a standard protocol for controlling monitors over I2C bus.
//! It's supported by most modern external monitors via the video cable.
//!
//! The i2c-dev backend only speaks raw VCP, so the high-level convenience call
//! keeps the trait default and reports itself unsupported.
//!
//! An output is bound to its handle by the i2c device number of the connector's
//! DDC channel. Identical monitors share an EDID, so the EDID only decides when
//! no device number is available and exactly one handle matches it.

use ddc_hi::{Backend, Ddc, Display};

use super::{ControlError, PhysicalMonitor, VcpReading};

/// DDC/CI display implementation
pub struct DdcCiDisplay {
    display: Display,
}

impl DdcCiDisplay {
    /// Create a new DDC/CI display wrapper
    pub fn new(display: Display) -> Self {
        Self { display }
    }

    /// Enumerate all DDC/CI displays
    pub fn enumerate() -> Vec<Self> {
        Display::enumerate().into_iter().map(Self::new).collect()
    }

    /// Open the DDC/CI handle driving the output
    ///
    /// `ddc_device` is the device number of the output's i2c-dev node, `edid`
    /// its raw EDID. Every other handle opened by the scan is dropped before
    /// returning.
    pub fn for_output(ddc_device: Option<u64>, edid: &[u8]) -> Option<Self> {
        let displays = Self::enumerate();
        let identities: Vec<_> = displays
            .iter()
            .map(|d| HandleIdentity {
                device: d.device_number(),
                edid: d.edid(),
            })
            .collect();

        let index = select_handle(&identities, ddc_device, edid)?;
        displays.into_iter().nth(index)
    }

    /// Backend identifier of the handle
    pub fn id(&self) -> String {
        self.display.info.id.clone()
    }

    /// Model name reported in the EDID
    pub fn name(&self) -> String {
        self.display.info.model_name.clone().unwrap_or_default()
    }

    fn edid(&self) -> Option<&[u8]> {
        self.display.info.edid_data.as_deref()
    }

    /// ddc-hi names i2c-dev handles after the node's device number
    fn device_number(&self) -> Option<u64> {
        if self.display.info.backend != Backend::I2cDevice {
            return None;
        }
        self.display.info.id.parse().ok()
    }
}

/// What a scanned handle reveals about the monitor behind it
#[derive(Debug, Clone, Copy)]
struct HandleIdentity<'a> {
    device: Option<u64>,
    edid: Option<&'a [u8]>,
}

/// Index of the handle belonging to an output
///
/// A known device number is authoritative whenever the handles carry one.
/// Otherwise the EDID decides, and only when it is unambiguous.
fn select_handle(
    handles: &[HandleIdentity<'_>],
    ddc_device: Option<u64>,
    edid: &[u8],
) -> Option<usize> {
    if let Some(device) = ddc_device {
        if handles.iter().any(|h| h.device.is_some()) {
            return handles.iter().position(|h| h.device == Some(device));
        }
    }

    let mut matching = handles
        .iter()
        .enumerate()
        .filter(|(_, h)| edid_matches(h.edid, edid))
        .map(|(index, _)| index);
    let first = matching.next()?;
    if matching.next().is_some() {
        debug!("Several DDC/CI handles share the output's EDID, leaving it unbound");
        return None;
    }
    Some(first)
}

/// Compare the 128-byte base blocks, extension blocks may be reported differently
fn edid_matches(reported: Option<&[u8]>, expected: &[u8]) -> bool {
    match reported {
        Some(reported) => {
            let len = reported.len().min(expected.len()).min(128);
            len > 0 && reported[..len] == expected[..len]
        }
        None => false,
    }
}

impl PhysicalMonitor for DdcCiDisplay {
    fn vcp_feature(&mut self, code: u8) -> Result<VcpReading, ControlError> {
        let value = self
            .display
            .handle
            .get_vcp_feature(code)
            .map_err(|e| ControlError::Other(anyhow::Error::from(e)))?;

        Ok(VcpReading {
            current: value.value(),
            max: value.maximum(),
        })
    }

    fn set_vcp_feature(&mut self, code: u8, value: u16) -> Result<(), ControlError> {
        self.display
            .handle
            .set_vcp_feature(code, value)
            .map_err(|e| ControlError::Other(anyhow::Error::from(e)))?;
        Ok(())
    }
}

impl std::fmt::Debug for DdcCiDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DdcCiDisplay(id: {}, name: {})", self.id(), self.name())
    }
}
