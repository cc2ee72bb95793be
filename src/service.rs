// SPDX-License-Identifier: GPL-3.0-only
//! In-process call boundary
//!
//! [`BrightnessService`] is what the surrounding application talks to. Device
//! failures are flattened to `bool` and the `-1` sentinel here; only a failed
//! enumeration reaches the caller as an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;

use crate::brightness::clamp_percent;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::monitor::{BackendMode, DeviceCache, DeviceFactory, MonitorRecord, SIMULATED_TAG};
use crate::platform::{DisplayPlatform, SystemPlatform};
use crate::sync::SyncEngine;

/// Returned by [`BrightnessService::get_brightness`] for unknown displays
pub const UNKNOWN_BRIGHTNESS: i32 = -1;

pub struct BrightnessService {
    platform: Arc<dyn DisplayPlatform>,
    simulated: AtomicBool,
    engine: Arc<SyncEngine>,
}

impl BrightnessService {
    pub fn new(config: &Config, platform: Arc<dyn DisplayPlatform>) -> Self {
        let mode = config.backend_mode();
        let factory = DeviceFactory::new(mode, platform.clone());
        let cache = DeviceCache::new(Arc::new(factory), config.cache_ttl());
        let engine = SyncEngine::new(Arc::new(cache), config.transition_settings());
        if !config.sync_enabled {
            engine.set_sync_enabled(false);
        }

        Self {
            platform,
            simulated: AtomicBool::new(mode.is_simulated()),
            engine: Arc::new(engine),
        }
    }

    /// Service backed by the running system
    pub fn system(config: &Config) -> Self {
        Self::new(config, Arc::new(SystemPlatform::new()))
    }

    pub fn mode(&self) -> BackendMode {
        BackendMode::from_simulated(self.simulated.load(Ordering::SeqCst))
    }

    /// Master brightness, sync and step operations
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Select the backend; the next enumeration uses it
    pub async fn initialize(&self, use_simulated: bool) -> bool {
        let mode = BackendMode::from_simulated(use_simulated);
        self.simulated.store(use_simulated, Ordering::SeqCst);

        let factory = DeviceFactory::new(mode, self.platform.clone());
        self.engine.cache().reconfigure(Arc::new(factory)).await;

        if use_simulated {
            info!("{} Hardware abstraction layer initialized in simulated mode", SIMULATED_TAG);
            info!("{} All monitor operations will be simulated", SIMULATED_TAG);
        } else {
            info!("Hardware abstraction layer initialized in real mode");
        }
        true
    }

    pub async fn list_monitors(&self) -> Result<Vec<MonitorRecord>> {
        let devices = self.engine.cache().devices(false).await?;
        let records = join_all(devices.iter().map(|d| d.record()))
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        if self.mode().is_simulated() {
            info!("{} Returning {} monitors", SIMULATED_TAG, records.len());
        }
        Ok(records)
    }

    /// Brightness of `id`, or [`UNKNOWN_BRIGHTNESS`]
    pub async fn get_brightness(&self, id: &str) -> i32 {
        let device = match self.engine.cache().find(id).await {
            Ok(device) => device,
            Err(err @ AppError::DisplayNotFound(_)) => {
                warn!(error = %err, "Cannot read brightness");
                return UNKNOWN_BRIGHTNESS;
            }
            Err(err) => {
                error!(display_id = %id, error = %err, "Failed to enumerate displays");
                return UNKNOWN_BRIGHTNESS;
            }
        };

        let brightness = match device.brightness().await {
            Ok(value) => value as i32,
            Err(err) => {
                error!(display_id = %id, error = %err, "Failed to read brightness");
                UNKNOWN_BRIGHTNESS
            }
        };

        if self.mode().is_simulated() {
            info!("{} get_brightness({}) = {}", SIMULATED_TAG, id, brightness);
        }
        brightness
    }

    /// Set `id` to `value` clamped into `0..=100`, without animation
    pub async fn set_brightness(&self, id: &str, value: i32) -> bool {
        let value = clamp_percent(value);
        let success = self
            .engine
            .set_device_brightness(id, value as i32, false)
            .await;

        if self.mode().is_simulated() {
            info!(
                "{} set_brightness({}, {}) = {}",
                SIMULATED_TAG,
                id,
                value,
                if success { "success" } else { "failed" }
            );
        }
        success
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::monitor::MonitorKind;
    use crate::platform::fake::{FakePanel, FakePlatform, MonitorState};

    fn simulated_service() -> BrightnessService {
        let config = Config {
            simulate: true,
            ..Config::default()
        };
        BrightnessService::new(&config, Arc::new(FakePlatform::new()))
    }

    #[tokio::test]
    async fn test_simulated_listing() {
        let service = simulated_service();
        assert!(service.initialize(true).await);
        assert_eq!(service.mode(), BackendMode::Simulated);

        let records = service.list_monitors().await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, MonitorKind::Internal);
        assert_eq!(records[1].kind, MonitorKind::External);
        assert_eq!(records[2].kind, MonitorKind::External);
        assert!(records.iter().all(|r| r.current == 50 && r.min == 0 && r.max == 100));
    }

    #[tokio::test]
    async fn test_set_brightness_is_idempotent() {
        let service = simulated_service();
        assert!(service.set_brightness("sim_external_1", 35).await);
        assert!(service.set_brightness("sim_external_1", 35).await);
        assert_eq!(service.get_brightness("sim_external_1").await, 35);
    }

    #[tokio::test]
    async fn test_set_brightness_clamps() {
        let service = simulated_service();
        assert!(service.set_brightness("sim_internal_0", 400).await);
        assert_eq!(service.get_brightness("sim_internal_0").await, 100);
        assert!(service.set_brightness("sim_internal_0", -3).await);
        assert_eq!(service.get_brightness("sim_internal_0").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_display() {
        let service = simulated_service();
        assert_eq!(service.get_brightness("nope").await, UNKNOWN_BRIGHTNESS);
        assert!(!service.set_brightness("nope", 50).await);
    }

    #[tokio::test]
    async fn test_initialize_switches_backend() {
        let platform = FakePlatform::new()
            .with_output(0x11, "eDP-1", None)
            .with_output(0x22, "DP-1", Some("DELL P2419H"))
            .with_monitor(0x22, MonitorState::vcp(80, 100))
            .with_panel(FakePanel::new(60));
        let platform = Arc::new(platform);
        let service = BrightnessService::new(&Config::default(), platform.clone());

        let real = service.list_monitors().await.unwrap();
        let ids: Vec<_> = real.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["internal_0", "monitor_00000022_0"]);
        assert_eq!(real[1].current, 80);

        assert!(service.initialize(true).await);
        let simulated = service.list_monitors().await.unwrap();
        assert_eq!(simulated[0].id, "sim_internal_0");

        assert!(service.initialize(false).await);
        assert_eq!(service.list_monitors().await.unwrap()[0].id, "internal_0");
        assert_eq!(platform.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_enumeration_failure() {
        let platform = FakePlatform::new();
        platform.fail_outputs.store(true, Ordering::SeqCst);
        let service = BrightnessService::new(&Config::default(), Arc::new(platform));

        assert!(service.list_monitors().await.is_err());
        assert_eq!(service.get_brightness("internal_0").await, UNKNOWN_BRIGHTNESS);
        assert!(!service.set_brightness("internal_0", 10).await);
    }

    #[tokio::test]
    async fn test_sync_disabled_by_config() {
        let config = Config {
            simulate: true,
            sync_enabled: false,
            ..Config::default()
        };
        let service = BrightnessService::new(&config, Arc::new(FakePlatform::new()));
        assert!(!service.engine().is_sync_enabled());
        assert_eq!(service.engine().settings(), crate::sync::TransitionSettings::default());
        assert_eq!(service.engine().set_master_brightness(10, false).await.unwrap(), 0);
        assert_eq!(service.get_brightness("sim_external_0").await, 50);
    }
}
