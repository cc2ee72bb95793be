// SPDX-License-Identifier: GPL-3.0-only
//! Monitor brightness control with real and simulated backends, an enumeration
//! cache and a synchronization engine.

#[macro_use]
extern crate tracing;

pub mod brightness;
pub mod config;
pub mod error;
pub mod monitor;
pub mod platform;
pub mod protocols;
pub mod service;
pub mod sync;

pub use config::Config;
pub use error::{AppError, DeviceError, Result};
pub use monitor::{BackendMode, MonitorKind, MonitorRecord};
pub use service::BrightnessService;
pub use sync::{SyncEngine, TransitionSettings};
