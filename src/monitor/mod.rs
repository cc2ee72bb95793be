// SPDX-License-Identifier: GPL-3.0-only
//! Monitor hardware abstraction: device contract, backends, factory and cache

mod cache;
mod device;
mod factory;
mod real;
mod simulated;

pub use cache::{DEFAULT_TTL, DeviceCache};
pub use device::{
    DeviceHandle, DisplayId, MonitorDevice, MonitorKind, MonitorRecord, ScreenBrightness,
};
pub use factory::{BackendMode, DeviceEnumerator, DeviceFactory, INTERNAL_ID};
pub use real::RealDevice;
pub use simulated::{SIMULATED_TAG, SimulatedDevice};
