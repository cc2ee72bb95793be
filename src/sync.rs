// SPDX-License-Identifier: GPL-3.0-only
//! Brightness synchronization engine
//!
//! Drives every known display from one master value using proportional mapping,
//! and animates changes as stepped transitions. At most one transition runs per
//! display; a request for a display that is already transitioning is dropped.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::join_all;

use crate::brightness::{clamp_percent, proportional_target, step_value, transition_steps};
use crate::error::{AppError, Result};
use crate::monitor::{DeviceCache, DeviceHandle, DisplayId, ScreenBrightness};

/// Step planning of animated changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionSettings {
    /// Brightness units covered by one step
    pub step_size: u16,
    /// Pause between two steps
    pub step_delay: Duration,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            step_size: 2,
            step_delay: Duration::from_millis(10),
        }
    }
}

type TransitionSet = Arc<Mutex<HashSet<DisplayId>>>;

/// Marks a display as transitioning for as long as it lives
struct TransitionGuard {
    set: TransitionSet,
    id: DisplayId,
}

impl TransitionGuard {
    /// `None` when a transition is already running for `id`
    fn acquire(set: &TransitionSet, id: &str) -> Option<Self> {
        let mut running = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(id.to_string()) {
            return None;
        }
        Some(Self {
            set: set.clone(),
            id: id.to_string(),
        })
    }
}

impl Drop for TransitionGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

pub struct SyncEngine {
    cache: Arc<DeviceCache>,
    settings: TransitionSettings,
    sync_enabled: AtomicBool,
    transitioning: TransitionSet,
}

impl SyncEngine {
    pub fn new(cache: Arc<DeviceCache>, settings: TransitionSettings) -> Self {
        Self {
            cache,
            settings,
            sync_enabled: AtomicBool::new(true),
            transitioning: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn cache(&self) -> &Arc<DeviceCache> {
        &self.cache
    }

    pub fn settings(&self) -> TransitionSettings {
        self.settings
    }

    pub fn set_sync_enabled(&self, enabled: bool) {
        self.sync_enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "Brightness sync toggled");
    }

    /// Flip sync and return the new state
    pub fn toggle_sync(&self) -> bool {
        let enabled = !self.sync_enabled.fetch_xor(true, Ordering::SeqCst);
        info!(enabled, "Brightness sync toggled");
        enabled
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.sync_enabled.load(Ordering::SeqCst)
    }

    pub fn is_transitioning(&self, id: &str) -> bool {
        self.transitioning
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Drive every known display to the same relative position
    ///
    /// Does nothing while sync is disabled. Returns how many displays were
    /// written successfully; only an enumeration failure is an error.
    pub async fn set_master_brightness(&self, target: i32, animated: bool) -> Result<usize> {
        if !self.is_sync_enabled() {
            debug!(target, "Sync disabled, ignoring master brightness");
            return Ok(0);
        }

        let target = clamp_percent(target);
        let devices = self.cache.devices(false).await?;
        info!(target, animated, displays = devices.len(), "Applying master brightness");

        let writes = devices.iter().map(|device| async move {
            if !device.is_controllable().await.unwrap_or(false) {
                debug!(display_id = %device.id(), "Skipping non-controllable display");
                return false;
            }
            let value = proportional_target(
                target as i32,
                device.min_brightness(),
                device.max_brightness(),
            );
            if animated {
                let from = match device.brightness().await {
                    Ok(from) => from,
                    Err(err) => {
                        warn!(
                            display_id = %device.id(),
                            error = %err,
                            "Failed to read brightness"
                        );
                        return false;
                    }
                };
                self.transition(device, from, value).await
            } else {
                self.write(device, value).await
            }
        });

        let written = join_all(writes).await.into_iter().filter(|ok| *ok).count();
        debug!(written, "Master brightness applied");
        Ok(written)
    }

    /// Set one display; `false` when it is unknown, not controllable or unreadable
    pub async fn set_device_brightness(&self, id: &str, target: i32, animated: bool) -> bool {
        let target = clamp_percent(target);

        let device = match self.cache.find(id).await {
            Ok(device) => device,
            Err(err @ AppError::DisplayNotFound(_)) => {
                debug!(error = %err, "Skipping brightness request");
                return false;
            }
            Err(err) => {
                warn!(display_id = %id, error = %err, "Failed to look up display");
                return false;
            }
        };

        if !device.is_controllable().await.unwrap_or(false) {
            debug!(display_id = %id, "Display is not controllable");
            return false;
        }

        let current = match device.read_brightness().await {
            Ok(current) => current,
            Err(err) => {
                warn!(display_id = %id, error = %err, "Failed to read brightness");
                return false;
            }
        };

        if animated {
            self.transition(&device, current, target).await
        } else {
            self.write(&device, target).await
        }
    }

    pub async fn increase_by(&self, step: u16) -> Result<usize> {
        self.nudge(step as i32).await
    }

    pub async fn decrease_by(&self, step: u16) -> Result<usize> {
        self.nudge(-(step as i32)).await
    }

    /// Move the mean brightness by `delta`, animated
    async fn nudge(&self, delta: i32) -> Result<usize> {
        let devices = self.cache.devices(false).await?;
        if devices.is_empty() {
            return Ok(0);
        }

        let mut sum = 0u32;
        for reading in join_all(devices.iter().map(|d| d.brightness())).await {
            sum += reading? as u32;
        }
        let mean = (sum as f64 / devices.len() as f64).round() as i32;

        self.set_master_brightness(clamp_percent(mean + delta) as i32, true)
            .await
    }

    async fn write(&self, device: &DeviceHandle, value: ScreenBrightness) -> bool {
        match device.set_brightness(value as i32).await {
            Ok(_) => true,
            Err(err) => {
                debug!(display_id = %device.id(), error = %err, "Brightness write failed");
                false
            }
        }
    }

    /// Stepped transition from `from` to `to`
    ///
    /// The steps run in their own task, so a transition that has started runs to
    /// completion even if the caller stops waiting. Returns whether the final
    /// write landed; a request dropped because the display is already
    /// transitioning returns `false`.
    async fn transition(
        &self,
        device: &DeviceHandle,
        from: ScreenBrightness,
        to: ScreenBrightness,
    ) -> bool {
        let Some(guard) = TransitionGuard::acquire(&self.transitioning, device.id()) else {
            debug!(
                display_id = %device.id(),
                to,
                "Transition already running, dropping request"
            );
            return false;
        };

        let task = tokio::spawn(run_transition(guard, device.clone(), from, to, self.settings));
        match task.await {
            Ok(landed) => landed,
            Err(err) => {
                error!(display_id = %device.id(), error = %err, "Transition task failed");
                false
            }
        }
    }
}

async fn run_transition(
    _guard: TransitionGuard,
    device: DeviceHandle,
    from: ScreenBrightness,
    to: ScreenBrightness,
    settings: TransitionSettings,
) -> bool {
    let steps = transition_steps(from, to, settings.step_size);
    if steps == 0 {
        return true;
    }
    trace!(display_id = %device.id(), from, to, steps, "Starting transition");

    for index in 1..=steps {
        let value = step_value(from, to, index, steps);
        if let Err(err) = device.set_brightness(value as i32).await {
            warn!(
                display_id = %device.id(),
                step = index,
                error = %err,
                "Transition step failed"
            );
        }
        if index < steps {
            tokio::time::sleep(settings.step_delay).await;
        }
    }

    match device.set_brightness(to as i32).await {
        Ok(_) => true,
        Err(err) => {
            warn!(display_id = %device.id(), error = %err, "Final transition write failed");
            false
        }
    }
}
