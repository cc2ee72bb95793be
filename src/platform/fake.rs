// SPDX-License-Identifier: GPL-3.0-only
//! Scripted platform for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{DisplayOutput, DisplayPlatform};
use crate::protocols::{
    BrightnessRange, ControlError, PanelControl, PhysicalMonitor, VcpReading, BRIGHTNESS_CODE,
};

/// Which call path last wrote to a fake monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    HighLevel,
    Vcp,
}

/// State behind one fake physical monitor
#[derive(Debug)]
pub struct MonitorState {
    pub high_level: bool,
    pub current: u16,
    pub max: u16,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: Vec<(WritePath, u16)>,
}

impl MonitorState {
    pub fn vcp(current: u16, max: u16) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            high_level: false,
            current,
            max,
            fail_reads: false,
            fail_writes: false,
            writes: Vec::new(),
        }))
    }

    pub fn high_level(current: u16) -> Arc<Mutex<Self>> {
        let state = Self::vcp(current, 100);
        state.lock().unwrap().high_level = true;
        state
    }
}

struct FakeMonitor {
    state: Arc<Mutex<MonitorState>>,
    open_handles: Arc<AtomicUsize>,
}

impl Drop for FakeMonitor {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

fn failure() -> ControlError {
    ControlError::Other(anyhow::anyhow!("no reply from monitor"))
}

impl PhysicalMonitor for FakeMonitor {
    fn monitor_brightness(&mut self) -> Result<BrightnessRange, ControlError> {
        let state = self.state.lock().unwrap();
        if !state.high_level {
            return Err(ControlError::Unsupported);
        }
        if state.fail_reads {
            return Err(failure());
        }
        Ok(BrightnessRange {
            min: 0,
            current: state.current,
            max: state.max,
        })
    }

    fn set_monitor_brightness(&mut self, value: u16) -> Result<(), ControlError> {
        let mut state = self.state.lock().unwrap();
        if !state.high_level {
            return Err(ControlError::Unsupported);
        }
        if state.fail_writes {
            return Err(failure());
        }
        state.current = value;
        state.writes.push((WritePath::HighLevel, value));
        Ok(())
    }

    fn vcp_feature(&mut self, code: u8) -> Result<VcpReading, ControlError> {
        assert_eq!(code, BRIGHTNESS_CODE);
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(failure());
        }
        Ok(VcpReading {
            current: state.current,
            max: state.max,
        })
    }

    fn set_vcp_feature(&mut self, code: u8, value: u16) -> Result<(), ControlError> {
        assert_eq!(code, BRIGHTNESS_CODE);
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(failure());
        }
        state.current = value;
        state.writes.push((WritePath::Vcp, value));
        Ok(())
    }
}

/// Fake built-in panel
#[derive(Debug)]
pub struct FakePanel {
    pub current: Mutex<u16>,
    pub permission_denied: AtomicBool,
}

impl FakePanel {
    pub fn new(current: u16) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(current),
            permission_denied: AtomicBool::new(false),
        })
    }
}

impl PanelControl for FakePanel {
    fn brightness(&self) -> Result<u16, ControlError> {
        Ok(*self.current.lock().unwrap())
    }

    fn set_brightness(&self, percent: u16) -> Result<(), ControlError> {
        if self.permission_denied.load(Ordering::SeqCst) {
            return Err(ControlError::PermissionDenied("not running elevated".into()));
        }
        *self.current.lock().unwrap() = percent;
        Ok(())
    }
}

/// Platform with scripted outputs, monitors and panel
#[derive(Default)]
pub struct FakePlatform {
    pub outputs: Vec<DisplayOutput>,
    pub monitors: HashMap<u64, Vec<Arc<Mutex<MonitorState>>>>,
    pub panel: Option<Arc<FakePanel>>,
    pub fail_outputs: AtomicBool,
    pub open_handles: Arc<AtomicUsize>,
    pub output_calls: AtomicUsize,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output; `connector` decides the classification
    pub fn with_output(mut self, handle: u64, connector: &str, description: Option<&str>) -> Self {
        self.outputs.push(DisplayOutput {
            handle,
            connector: connector.to_string(),
            description: description.map(str::to_string),
            primary: false,
            edid: Vec::new(),
            ddc_device: None,
        });
        self
    }

    pub fn with_monitor(mut self, handle: u64, state: Arc<Mutex<MonitorState>>) -> Self {
        self.monitors.entry(handle).or_default().push(state);
        self
    }

    pub fn with_panel(mut self, panel: Arc<FakePanel>) -> Self {
        self.panel = Some(panel);
        self
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl DisplayPlatform for FakePlatform {
    fn outputs(&self) -> anyhow::Result<Vec<DisplayOutput>> {
        self.output_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_outputs.load(Ordering::SeqCst) {
            anyhow::bail!("display enumeration unavailable");
        }
        Ok(self.outputs.clone())
    }

    fn physical_monitors(
        &self,
        output: &DisplayOutput,
    ) -> Result<Vec<Box<dyn PhysicalMonitor>>, ControlError> {
        let states = self.monitors.get(&output.handle).cloned().unwrap_or_default();
        Ok(states
            .into_iter()
            .map(|state| {
                self.open_handles.fetch_add(1, Ordering::SeqCst);
                Box::new(FakeMonitor {
                    state,
                    open_handles: self.open_handles.clone(),
                }) as Box<dyn PhysicalMonitor>
            })
            .collect())
    }

    fn panel(&self) -> Result<Arc<dyn PanelControl>, ControlError> {
        match &self.panel {
            Some(panel) => Ok(panel.clone() as Arc<dyn PanelControl>),
            None => Err(ControlError::Other(anyhow::anyhow!("no backlight device"))),
        }
    }
}
