// SPDX-License-Identifier: GPL-3.0-only
//! Linux platform: DRM connectors through udev, DDC/CI through ddc-hi and the
//! panel through the backlight class.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use super::{DisplayOutput, DisplayPlatform};
use crate::protocols::backlight;
use crate::protocols::ddc_ci::DdcCiDisplay;
use crate::protocols::{ControlError, PanelControl, PhysicalMonitor};

/// Offsets of the four 18-byte descriptors in an EDID base block
const EDID_DESCRIPTORS: [usize; 4] = [54, 72, 90, 108];

/// Descriptor tag of the monitor name
const EDID_MONITOR_NAME: u8 = 0xFC;

/// Sysfs class of the i2c-dev character devices
const I2C_DEV_CLASS: &str = "/sys/class/i2c-dev";

/// Platform backed by the running system
///
/// The kernel has no notion of a primary output, so every output reports
/// `primary == false` and classification relies on the description and the
/// connector type.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPlatform;

impl SystemPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl DisplayPlatform for SystemPlatform {
    fn outputs(&self) -> anyhow::Result<Vec<DisplayOutput>> {
        let mut enumerator = udev::Enumerator::new().context("Failed to create udev enumerator")?;
        enumerator
            .match_subsystem("drm")
            .context("Failed to filter udev devices on drm")?;

        let mut connectors: Vec<_> = enumerator
            .scan_devices()
            .context("Failed to scan drm devices")?
            .filter_map(|device| {
                let sysname = device.sysname().to_string_lossy().into_owned();
                // card0-eDP-1 -> eDP-1, skip card0 and render nodes
                let (_, connector) = sysname.split_once('-')?;
                let connected = device
                    .attribute_value("status")
                    .is_some_and(|s| s.to_string_lossy().trim() == "connected");
                connected.then(|| (sysname.clone(), connector.to_string(), device))
            })
            .collect();
        connectors.sort_by(|a, b| a.0.cmp(&b.0));

        let mut outputs = Vec::with_capacity(connectors.len());
        for (index, (sysname, connector, device)) in connectors.into_iter().enumerate() {
            let handle = device
                .attribute_value("connector_id")
                .and_then(|v| v.to_string_lossy().trim().parse::<u64>().ok())
                .unwrap_or(index as u64);

            let edid = match fs::read(device.syspath().join("edid")) {
                Ok(edid) => edid,
                Err(e) => {
                    debug!(output = %sysname, error = %e, "No EDID available");
                    Vec::new()
                }
            };

            let description = edid_monitor_name(&edid);
            let ddc_device = ddc_device_number(device.syspath(), Path::new(I2C_DEV_CLASS));
            debug!(
                output = %sysname,
                handle,
                description = ?description,
                ddc_device = ?ddc_device,
                "Found connected display output"
            );

            outputs.push(DisplayOutput {
                handle,
                connector,
                description,
                primary: false,
                edid,
                ddc_device,
            });
        }

        info!("Found {} connected display output(s)", outputs.len());
        Ok(outputs)
    }

    fn physical_monitors(
        &self,
        output: &DisplayOutput,
    ) -> Result<Vec<Box<dyn PhysicalMonitor>>, ControlError> {
        let monitors: Vec<_> = DdcCiDisplay::for_output(output.ddc_device, &output.edid)
            .into_iter()
            .collect();
        debug!(
            output = %output.connector,
            count = monitors.len(),
            "Resolved physical monitor handles"
        );
        Ok(monitors
            .into_iter()
            .map(|m| Box::new(m) as Box<dyn PhysicalMonitor>)
            .collect())
    }

    fn panel(&self) -> Result<Arc<dyn PanelControl>, ControlError> {
        let panel = backlight::initialize_once()?;
        Ok(panel as Arc<dyn PanelControl>)
    }
}

/// Device number of the i2c-dev node behind a connector's DDC channel
///
/// The connector's `ddc` link points at its i2c adapter, whose i2c-dev node
/// carries the `major:minor` pair.
fn ddc_device_number(connector: &Path, i2c_class: &Path) -> Option<u64> {
    let adapter = fs::canonicalize(connector.join("ddc")).ok()?;
    let name = adapter.file_name()?;
    let dev = fs::read_to_string(i2c_class.join(name).join("dev")).ok()?;
    parse_dev_number(&dev)
}

fn parse_dev_number(text: &str) -> Option<u64> {
    let (major, minor) = text.trim().split_once(':')?;
    let dev = libc::makedev(major.parse().ok()?, minor.parse().ok()?);
    Some(dev as u64)
}

/// Extract the monitor name descriptor from an EDID base block
pub fn edid_monitor_name(edid: &[u8]) -> Option<String> {
    if edid.len() < 128 {
        return None;
    }

    EDID_DESCRIPTORS.iter().find_map(|&offset| {
        let descriptor = &edid[offset..offset + 18];
        if descriptor[..3] != [0, 0, 0] || descriptor[3] != EDID_MONITOR_NAME {
            return None;
        }
        let name: String = descriptor[5..]
            .iter()
            .take_while(|&&b| b != 0x0A)
            .map(|&b| b as char)
            .collect();
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}
