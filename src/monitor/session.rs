//! Time-bounded polling sessions.
//!
//! A session polls one device's changed flag, records new values into the
//! device history, and rewrites the device log from that history on every
//! iteration. Failures on either side are logged and the step is skipped for
//! that iteration; a session always runs to its duration bound.

use super::device::Device;
use crate::config::Config;
use chrono::{DateTime, Local};
use log::{error, info, warn};
use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub duration: Duration,
    pub poll_interval: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            duration: config.monitor_duration(),
            poll_interval: config.poll_interval(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub sensor_name: String,
    pub started_at: DateTime<Local>,
    pub iterations: u64,
    pub changes: u64,
    pub elapsed: Duration,
}

/// Poll `device` until `settings.duration` has elapsed.
pub fn run_session(device: &mut Device, settings: &MonitorSettings) -> SessionReport {
    let started_at = Local::now();
    let start = Instant::now();
    let mut iterations = 0;
    let mut changes = 0;

    device.monitoring = true;
    while start.elapsed() < settings.duration {
        if poll_once(device).is_some() {
            changes += 1;
        }
        if let Err(e) = write_log(device.log_path(), device) {
            warn!(
                "Failed to write log file {} for {}: {}",
                device.log_path().display(),
                device.sensor_name(),
                e
            );
        }
        iterations += 1;
        thread::sleep(settings.poll_interval);
    }
    device.monitoring = false;

    SessionReport {
        sensor_name: device.sensor_name().to_string(),
        started_at,
        iterations,
        changes,
        elapsed: start.elapsed(),
    }
}

/// One read step. Returns the recorded value if the device had a new one.
pub fn poll_once(device: &mut Device) -> Option<String> {
    let changed = match device.source().read_changed() {
        Ok(changed) => changed,
        Err(e) => {
            warn!(
                "Failed to read changed_value for {}: {}",
                device.sensor_name(),
                e
            );
            return None;
        }
    };
    if !changed {
        return None;
    }

    // An empty value is a torn read; leave the flag set and retry next poll
    let value = match device.source().read_value() {
        Ok(value) if !value.is_empty() => value,
        Ok(_) => {
            warn!("Empty value for {}, not acknowledging", device.sensor_name());
            return None;
        }
        Err(e) => {
            warn!("Failed to read value for {}: {}", device.sensor_name(), e);
            return None;
        }
    };

    device.history.push(value.clone());
    info!("New value for {}: {}", device.sensor_name(), value);

    if let Err(e) = device.source().clear_changed() {
        warn!(
            "Failed to acknowledge changed_value for {}: {}",
            device.sensor_name(),
            e
        );
    }
    Some(value)
}

/// Overwrite the log with the full current history.
fn write_log(path: &Path, device: &Device) -> io::Result<()> {
    fs::write(path, device.history().render())
}

/// Run one session per device, each on its own thread, and wait for all of them.
///
/// Reports come back in device order. A session thread that fails to spawn or
/// panics is logged and has no report.
pub fn monitor_all(devices: &mut [Device], settings: &MonitorSettings) -> Vec<SessionReport> {
    thread::scope(|scope| {
        let handles: Vec<_> = devices
            .iter_mut()
            .map(|device| {
                let name = device.sensor_name().to_string();
                let handle = thread::Builder::new()
                    .name(format!("monitor-{}", name.to_lowercase()))
                    .spawn_scoped(scope, move || run_session(device, settings));
                (name, handle)
            })
            .collect();

        handles
            .into_iter()
            .filter_map(|(name, handle)| match handle {
                Ok(handle) => match handle.join() {
                    Ok(report) => Some(report),
                    Err(_) => {
                        error!("Monitor session for {} panicked", name);
                        None
                    }
                },
                Err(e) => {
                    error!("Failed to spawn monitor thread for {}: {}", name, e);
                    None
                }
            })
            .collect()
    })
}
