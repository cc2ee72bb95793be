// SPDX-License-Identifier: GPL-3.0-only
//! Device capability interface
//!
//! Every backend, real or simulated, implements [`MonitorDevice`]. Callers hold
//! devices through a [`DeviceHandle`], which caches the immutable identity and
//! moves the blocking device calls onto the blocking thread pool.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};

pub type DisplayId = String;
pub type ScreenBrightness = u16;

/// Whether a display is the built-in panel or an attached monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    Internal,
    External,
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorKind::Internal => f.pad("internal"),
            MonitorKind::External => f.pad("external"),
        }
    }
}

/// Snapshot of one monitor as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRecord {
    pub id: DisplayId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MonitorKind,
    pub min: ScreenBrightness,
    pub max: ScreenBrightness,
    pub current: ScreenBrightness,
}

/// Common contract of all monitor backends
pub trait MonitorDevice: Send + fmt::Debug {
    /// Unique identifier within the current enumeration
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    fn kind(&self) -> MonitorKind;

    fn min_brightness(&self) -> ScreenBrightness;

    fn max_brightness(&self) -> ScreenBrightness;

    /// Live read; updates the best-known value on success
    fn read_brightness(&mut self) -> std::result::Result<ScreenBrightness, DeviceError>;

    /// Best-known brightness, used when a live read fails
    fn last_known_brightness(&self) -> ScreenBrightness;

    /// Clamp `value` into `[min, max]` and write it
    ///
    /// Returns the value written. A failed write leaves the best-known value
    /// untouched.
    fn set_brightness(&mut self, value: i32) -> std::result::Result<ScreenBrightness, DeviceError>;

    /// Whether protocol support was established for this display
    fn is_controllable(&self) -> bool;

    /// Current brightness, degrading to the best-known value when the read fails
    fn brightness(&mut self) -> ScreenBrightness {
        match self.read_brightness() {
            Ok(value) => value,
            Err(err) => {
                debug!(
                    display_id = %self.id(),
                    error = %err,
                    "Live brightness read failed, using last known value"
                );
                self.last_known_brightness()
            }
        }
    }

    fn record(&mut self) -> MonitorRecord {
        let current = self.brightness();
        MonitorRecord {
            id: self.id().to_string(),
            name: self.name().to_string(),
            kind: self.kind(),
            min: self.min_brightness(),
            max: self.max_brightness(),
            current,
        }
    }
}

/// Shared, cloneable reference to one device
#[derive(Clone)]
pub struct DeviceHandle {
    id: DisplayId,
    name: String,
    kind: MonitorKind,
    min: ScreenBrightness,
    max: ScreenBrightness,
    device: Arc<tokio::sync::Mutex<Box<dyn MonitorDevice>>>,
}

impl DeviceHandle {
    pub fn new(device: Box<dyn MonitorDevice>) -> Self {
        Self {
            id: device.id().to_string(),
            name: device.name().to_string(),
            kind: device.kind(),
            min: device.min_brightness(),
            max: device.max_brightness(),
            device: Arc::new(tokio::sync::Mutex::new(device)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MonitorKind {
        self.kind
    }

    pub fn min_brightness(&self) -> ScreenBrightness {
        self.min
    }

    pub fn max_brightness(&self) -> ScreenBrightness {
        self.max
    }

    /// Run a blocking device call on the blocking pool
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn MonitorDevice) -> T + Send + 'static,
    {
        let device = self.device.clone();
        let value = tokio::task::spawn_blocking(move || {
            let mut guard = device.blocking_lock();
            f(&mut **guard)
        })
        .await?;
        Ok(value)
    }

    /// Current brightness, degrading to the best-known value
    pub async fn brightness(&self) -> Result<ScreenBrightness> {
        self.run(|device| device.brightness()).await
    }

    /// Live read without the best-known fallback
    pub async fn read_brightness(&self) -> Result<ScreenBrightness> {
        let value = self.run(|device| device.read_brightness()).await??;
        Ok(value)
    }

    pub async fn set_brightness(&self, value: i32) -> Result<ScreenBrightness> {
        let written = self.run(move |device| device.set_brightness(value)).await??;
        Ok(written)
    }

    pub async fn is_controllable(&self) -> Result<bool> {
        self.run(|device| device.is_controllable()).await
    }

    pub async fn record(&self) -> Result<MonitorRecord> {
        self.run(|device| device.record()).await
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("range", &(self.min..=self.max))
            .finish()
    }
}
