// SPDX-License-Identifier: GPL-3.0-only
//! Panel-management protocol for the built-in display
//!
//! The kernel backlight class exposes the built-in panel under
//! `/sys/class/backlight/<device>/{brightness,max_brightness}`. Reading is open to
//! everyone, writing needs root or a udev rule granting write access to the
//! `brightness` attribute.
//!
//! The subsystem is initialised once per process through [`initialize_once`],
//! which hands out a shared [`PanelSubsystem`] handle. Calling it again, from any
//! thread, returns the same handle. A failed initialisation is not memoised.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::{ControlError, PanelControl};
use crate::brightness::{native_to_percent, percent_to_native};

/// Sysfs class directory of backlight devices
pub const BACKLIGHT_CLASS: &str = "/sys/class/backlight";

static PANEL: OnceCell<Arc<PanelSubsystem>> = OnceCell::new();

/// Initialise the panel subsystem, or return the handle of an earlier initialisation
pub fn initialize_once() -> Result<Arc<PanelSubsystem>, ControlError> {
    initialize_once_in(&PANEL, Path::new(BACKLIGHT_CLASS))
}

/// [`initialize_once`] against an explicit cell and class directory
pub fn initialize_once_in(
    cell: &OnceCell<Arc<PanelSubsystem>>,
    root: &Path,
) -> Result<Arc<PanelSubsystem>, ControlError> {
    cell.get_or_try_init(|| {
        let subsystem = PanelSubsystem::open(root)?;
        info!(
            root = %root.display(),
            device = ?subsystem.device_name(),
            privileged = subsystem.is_privileged(),
            "Panel subsystem initialized"
        );
        Ok(Arc::new(subsystem))
    })
    .cloned()
}

/// Handle on the backlight class
#[derive(Debug)]
pub struct PanelSubsystem {
    root: PathBuf,
    privileged: bool,
}

/// One backlight device located under the class directory
#[derive(Debug)]
struct BacklightDevice {
    path: PathBuf,
    max: u32,
}

impl PanelSubsystem {
    /// Open the backlight class rooted at `root`
    ///
    /// Fails when no backlight device can be located.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ControlError> {
        let root = root.into();
        let device = locate(&root)?;
        let privileged = is_root() || can_write(&device.path.join("brightness"));

        if !privileged {
            warn!(
                device = %device.path.display(),
                "Built-in panel brightness is read-only for this process; \
                 run with elevated privileges or install a udev rule granting write access"
            );
        }

        Ok(Self { root, privileged })
    }

    /// Whether writes are expected to be permitted
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Name of the backlight device the subsystem drives
    pub fn device_name(&self) -> Option<String> {
        locate(&self.root)
            .ok()
            .and_then(|d| d.path.file_name().map(|n| n.to_string_lossy().into_owned()))
    }
}

impl PanelControl for PanelSubsystem {
    fn brightness(&self) -> Result<u16, ControlError> {
        let device = locate(&self.root)?;
        let native = read_u32(&device.path.join("brightness"))?;
        Ok(native_to_percent(native, device.max))
    }

    fn set_brightness(&self, percent: u16) -> Result<(), ControlError> {
        let device = locate(&self.root)?;
        let native = percent_to_native(percent, device.max);
        let attr = device.path.join("brightness");

        debug!(device = %device.path.display(), percent, native, "Writing panel brightness");

        fs::write(&attr, native.to_string()).map_err(|e| map_write_error(&attr, e))
    }
}

/// Find the singleton backlight device, first match in name order wins
fn locate(root: &Path) -> Result<BacklightDevice, ControlError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        match read_u32(&path.join("max_brightness")) {
            Ok(max) if max > 0 => return Ok(BacklightDevice { path, max }),
            Ok(_) => debug!(device = %path.display(), "Skipping backlight with zero range"),
            Err(e) => {
                debug!(device = %path.display(), error = %e, "Skipping unreadable backlight")
            }
        }
    }

    Err(ControlError::Other(anyhow::anyhow!(
        "no backlight device found under {}",
        root.display()
    )))
}

fn read_u32(path: &Path) -> Result<u32, ControlError> {
    let text = fs::read_to_string(path)?;
    text.trim().parse::<u32>().map_err(|e| {
        ControlError::Other(anyhow::anyhow!("invalid value in {}: {}", path.display(), e))
    })
}

fn map_write_error(path: &Path, err: io::Error) -> ControlError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        ControlError::PermissionDenied(format!("cannot write {}: {}", path.display(), err))
    } else {
        ControlError::Io(err)
    }
}

fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Check if we can write to a sysfs attribute
fn can_write(path: &Path) -> bool {
    fs::OpenOptions::new().write(true).open(path).is_ok()
}
