use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Seed the environment from `.env` in the working directory.
/// Variables already set in the environment are left alone.
pub fn load_dotenv() {
    let Ok(content) = fs::read_to_string(".env") else {
        return;
    };
    for (key, value) in dotenv_entries(&content) {
        if std::env::var_os(key).is_none() {
            // SAFETY: called from main before any runtime or worker thread starts
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// `KEY=value` pairs of a dotenv body. Blank lines, `#` comments and lines
/// without `=` are skipped; an optional `export ` prefix and one pair of
/// matching quotes around the value are stripped.
fn dotenv_entries(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.starts_with('#') {
            return None;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = ['"', '\'']
            .iter()
            .find_map(|&q| value.strip_prefix(q)?.strip_suffix(q))
            .unwrap_or(value);
        Some((key, value))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub devices: Vec<DeviceConfig>,
    pub transport: TransportConfig,
    pub sampling: SamplingConfig,
    pub toggle: ToggleConfig,
    pub simulator: SimulatorConfig,
}

/// Host-side polling session bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub duration_ms: u64,
    pub poll_interval_ms: u64,
    /// Directory receiving the per-device logs and received reference files.
    pub output_dir: PathBuf,
}

/// One monitored sensor: where its attributes live and where its log goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub sensor_name: String,
    pub attribute_dir: PathBuf,
    pub log_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Address of the device answering the command protocol.
    pub server_addr: String,
    /// Local address the host binds to (device-sim binds `server_addr`).
    pub bind_addr: String,
    pub recv_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub slot_interval_ms: u64,
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Root directory under which each sensor exports `value` and `changed_value`.
    pub attribute_root: PathBuf,
    /// Gap between simulated edges on one sensor line.
    pub edge_spacing_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let devices = [
            (
                "Humidity",
                "/sys/class/gpio_class_humidity/gpio_char_device_humidity",
                "humidity_log.txt",
            ),
            (
                "Saltiness",
                "/sys/class/gpio_class_saltiness/gpio_char_device_salt",
                "saltiness_log.txt",
            ),
            (
                "Light",
                "/sys/class/gpio_class_light/gpio_char_device_light",
                "light_log.txt",
            ),
        ]
        .into_iter()
        .map(|(name, dir, log)| DeviceConfig {
            sensor_name: name.to_string(),
            attribute_dir: PathBuf::from(dir),
            log_file: log.to_string(),
        })
        .collect();

        Self {
            monitor: MonitorConfig {
                duration_ms: 10_000,
                poll_interval_ms: 100,
                output_dir: PathBuf::from("."),
            },
            devices,
            transport: TransportConfig {
                server_addr: "192.168.5.5:50007".to_string(),
                bind_addr: "0.0.0.0:0".to_string(),
                recv_timeout_ms: 5_000,
            },
            sampling: SamplingConfig {
                slot_interval_ms: 50,
                debounce_ms: 200,
            },
            toggle: ToggleConfig { debounce_ms: 50 },
            simulator: SimulatorConfig {
                attribute_root: PathBuf::from("sim-attributes"),
                edge_spacing_ms: 600,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load a JSON config file, then apply environment overrides on top.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(ms) = std::env::var("MONITOR_DURATION_MS")
            && let Ok(ms) = ms.parse()
        {
            self.monitor.duration_ms = ms;
        }
        if let Ok(ms) = std::env::var("MONITOR_POLL_INTERVAL_MS")
            && let Ok(ms) = ms.parse()
        {
            self.monitor.poll_interval_ms = ms;
        }
        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            self.monitor.output_dir = PathBuf::from(dir);
        }

        if let Ok(addr) = std::env::var("DEVICE_SERVER_ADDR") {
            self.transport.server_addr = addr;
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            self.transport.bind_addr = addr;
        }
        if let Ok(ms) = std::env::var("RECV_TIMEOUT_MS")
            && let Ok(ms) = ms.parse()
        {
            self.transport.recv_timeout_ms = ms;
        }

        if let Ok(ms) = std::env::var("SAMPLING_SLOT_MS")
            && let Ok(ms) = ms.parse()
        {
            self.sampling.slot_interval_ms = ms;
        }
        if let Ok(ms) = std::env::var("SAMPLING_DEBOUNCE_MS")
            && let Ok(ms) = ms.parse()
        {
            self.sampling.debounce_ms = ms;
        }
        if let Ok(ms) = std::env::var("TOGGLE_DEBOUNCE_MS")
            && let Ok(ms) = ms.parse()
        {
            self.toggle.debounce_ms = ms;
        }

        // Point the monitored devices at the simulator's exported attributes
        if let Ok(root) = std::env::var("ATTRIBUTE_ROOT") {
            let root = PathBuf::from(root);
            self.simulator.attribute_root = root.clone();
            for device in &mut self.devices {
                device.attribute_dir = root.join(device.sensor_name.to_lowercase());
            }
        }
    }

    /// Reject settings that would make a session or sampler spin.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "poll interval must be non-zero".to_string(),
            ));
        }
        if self.devices.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "at least one device is required".to_string(),
            ));
        }
        if self.sampling.slot_interval_ms == 0 {
            return Err(BridgeError::InvalidConfig(
                "sampling slot interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn monitor_duration(&self) -> Duration {
        Duration::from_millis(self.monitor.duration_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.poll_interval_ms)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.transport.recv_timeout_ms)
    }

    /// Log file path for a device, resolved against the output directory.
    pub fn log_path(&self, device: &DeviceConfig) -> PathBuf {
        self.monitor.output_dir.join(&device.log_file)
    }

    /// Every file a fresh acquisition run starts without.
    pub fn output_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.devices.iter().map(|d| self.log_path(d)).collect();
        files.extend(
            (0..self.devices.len())
                .map(|i| crate::transport::reference_path(&self.monitor.output_dir, i)),
        );
        files
    }
}
