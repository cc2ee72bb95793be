// SPDX-License-Identifier: GPL-3.0-only
//! Runtime configuration
//!
//! Read from `$XDG_CONFIG_HOME/brightsync/config.kdl`:
//!
//! ```kdl
//! simulate #false
//! cache-ttl-ms 500
//! sync-enabled #true
//! step-size 2
//! step-delay-ms 10
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use kdl::{KdlDocument, KdlNode};

use crate::error::{AppError, Result};
use crate::monitor::BackendMode;
use crate::sync::TransitionSettings;

pub const APP_NAME: &str = "brightsync";
const CONFIG_FILE: &str = "config.kdl";

/// Forces simulated mode when set to a truthy value
pub const SIMULATE_ENV: &str = "BRIGHTSYNC_SIMULATE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Use the in-memory backend instead of real hardware
    pub simulate: bool,
    /// Lifetime of the memoized device list
    pub cache_ttl_ms: u64,
    /// Initial state of master brightness sync
    pub sync_enabled: bool,
    /// Brightness units per transition step
    pub step_size: u16,
    pub step_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulate: false,
            cache_ttl_ms: 500,
            sync_enabled: true,
            step_size: 2,
            step_delay_ms: 10,
        }
    }
}

impl Config {
    /// Location of the config file, if the platform has a config directory
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Load the user config and apply the environment override
    pub fn load() -> Result<Self> {
        let mut config = match Self::path() {
            Some(path) => Self::load_from(&path)?,
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        };

        if let Some(simulate) = std::env::var(SIMULATE_ENV).ok().as_deref().and_then(parse_flag) {
            let state = if simulate { "forced" } else { "disabled" };
            info!("{} set, simulated mode {}", SIMULATE_ENV, state);
            config.simulate = simulate;
        }
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::parse(&text)?;
                debug!(path = %path.display(), "Loaded config");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let doc: KdlDocument = text
            .parse()
            .map_err(|e: kdl::KdlError| AppError::Config(e.to_string()))?;

        let mut config = Self::default();
        for node in doc.nodes() {
            match node.name().value() {
                "simulate" => config.simulate = bool_value(node)?,
                "cache-ttl-ms" => config.cache_ttl_ms = integer_value(node)?,
                "sync-enabled" => config.sync_enabled = bool_value(node)?,
                "step-size" => config.step_size = integer_value(node)?,
                "step-delay-ms" => config.step_delay_ms = integer_value(node)?,
                other => warn!("Ignoring unknown config node '{}'", other),
            }
        }
        Ok(config)
    }

    pub fn backend_mode(&self) -> BackendMode {
        BackendMode::from_simulated(self.simulate)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn transition_settings(&self) -> TransitionSettings {
        TransitionSettings {
            step_size: self.step_size.max(1),
            step_delay: Duration::from_millis(self.step_delay_ms),
        }
    }
}

/// Interpret an environment flag; `None` for anything unrecognised
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn bool_value(node: &KdlNode) -> Result<bool> {
    node.entries()
        .first()
        .and_then(|entry| entry.value().as_bool())
        .ok_or_else(|| AppError::Config(format!("'{}' expects a boolean", node.name().value())))
}

fn integer_value<T: TryFrom<i128>>(node: &KdlNode) -> Result<T> {
    node.entries()
        .first()
        .and_then(|entry| entry.value().as_integer())
        .and_then(|value| T::try_from(value).ok())
        .ok_or_else(|| {
            AppError::Config(format!(
                "'{}' expects a non-negative integer",
                node.name().value()
            ))
        })
}
