// SPDX-License-Identifier: GPL-3.0-only
//! Enumeration cache
//!
//! Memoizes the device list for a short TTL so a UI polling the monitor list
//! does not pay for a full enumeration (DDC/CI probing in particular) on every
//! tick. A failed enumeration never replaces a good list.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use super::device::DeviceHandle;
use super::factory::DeviceEnumerator;
use crate::error::{AppError, Result};

/// Default lifetime of a memoized device list
pub const DEFAULT_TTL: Duration = Duration::from_millis(500);

struct CacheState {
    enumerator: Arc<dyn DeviceEnumerator>,
    devices: Vec<DeviceHandle>,
    refreshed_at: Option<Instant>,
}

pub struct DeviceCache {
    ttl: Duration,
    // held across an enumeration, concurrent pollers share one pass
    state: Mutex<CacheState>,
}

impl DeviceCache {
    pub fn new(enumerator: Arc<dyn DeviceEnumerator>, ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState {
                enumerator,
                devices: Vec::new(),
                refreshed_at: None,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current device list, re-enumerated when stale, empty or forced
    pub async fn devices(&self, force_refresh: bool) -> Result<Vec<DeviceHandle>> {
        let mut state = self.state.lock().await;

        let fresh = state
            .refreshed_at
            .is_some_and(|at| at.elapsed() < self.ttl);
        if !force_refresh && fresh && !state.devices.is_empty() {
            trace!(count = state.devices.len(), "Serving cached device list");
            return Ok(state.devices.clone());
        }

        let enumerator = state.enumerator.clone();
        let devices = match tokio::task::spawn_blocking(move || enumerator.enumerate()).await? {
            Ok(devices) => devices,
            Err(err) => {
                error!(
                    error = %err,
                    "Display enumeration failed, keeping previous device list"
                );
                return Err(err);
            }
        };

        debug!(count = devices.len(), forced = force_refresh, "Device list refreshed");
        state.devices = devices.clone();
        state.refreshed_at = Some(Instant::now());
        Ok(devices)
    }

    /// Drop the memoized list; the next call enumerates
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.devices.clear();
        state.refreshed_at = None;
    }

    /// Swap the device source and invalidate
    pub async fn reconfigure(&self, enumerator: Arc<dyn DeviceEnumerator>) {
        let mut state = self.state.lock().await;
        state.enumerator = enumerator;
        state.devices.clear();
        state.refreshed_at = None;
    }

    /// Device with `id`, [`AppError::DisplayNotFound`] when absent
    pub async fn find(&self, id: &str) -> Result<DeviceHandle> {
        self.devices(false)
            .await?
            .into_iter()
            .find(|device| device.id() == id)
            .ok_or_else(|| AppError::DisplayNotFound(id.to_string()))
    }
}
