//! Monitored device: attribute source, bounded history and log target.

use super::history::BoundedHistory;
use crate::config::{Config, DeviceConfig};
use crate::sensors::AttributeStore;
use crate::sensors::export::{CHANGED_FILE, VALUE_FILE};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read side of a device's attribute interface as seen by the host.
pub trait AttributeSource: Send {
    /// Text of the `value` attribute without its line terminator.
    fn read_value(&self) -> io::Result<String>;

    fn read_changed(&self) -> io::Result<bool>;

    /// Acknowledge the current value.
    fn clear_changed(&self) -> io::Result<()>;
}

/// Attribute interface exposed as files in a sysfs-style directory.
#[derive(Debug, Clone)]
pub struct SysfsAttributes {
    dir: PathBuf,
}

impl SysfsAttributes {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_line(&self, file: &str) -> io::Result<String> {
        let content = fs::read_to_string(self.dir.join(file))?;
        Ok(content.lines().next().unwrap_or_default().to_string())
    }
}

impl AttributeSource for SysfsAttributes {
    fn read_value(&self) -> io::Result<String> {
        self.read_line(VALUE_FILE)
    }

    fn read_changed(&self) -> io::Result<bool> {
        Ok(self.read_line(CHANGED_FILE)? == "1")
    }

    fn clear_changed(&self) -> io::Result<()> {
        fs::write(self.dir.join(CHANGED_FILE), "0")
    }
}

/// In-process access to a store, bypassing the file mirror.
#[derive(Debug, Clone)]
pub struct StoreSource(Arc<AttributeStore>);

impl StoreSource {
    pub fn new(store: Arc<AttributeStore>) -> Self {
        Self(store)
    }

    pub fn store(&self) -> &Arc<AttributeStore> {
        &self.0
    }
}

impl AttributeSource for StoreSource {
    fn read_value(&self) -> io::Result<String> {
        Ok(self.0.read_value().to_string())
    }

    fn read_changed(&self) -> io::Result<bool> {
        Ok(self.0.read_changed())
    }

    fn clear_changed(&self) -> io::Result<()> {
        self.0.clear_changed();
        Ok(())
    }
}

pub struct Device {
    sensor_name: String,
    source: Box<dyn AttributeSource>,
    log_path: PathBuf,
    pub(crate) history: BoundedHistory,
    pub(crate) monitoring: bool,
}

impl Device {
    pub fn new(
        sensor_name: &str,
        source: Box<dyn AttributeSource>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sensor_name: sensor_name.to_string(),
            source,
            log_path: log_path.into(),
            history: BoundedHistory::new(),
            monitoring: false,
        }
    }

    /// File-backed device described by configuration.
    pub fn from_config(device: &DeviceConfig, config: &Config) -> Self {
        Self::new(
            &device.sensor_name,
            Box::new(SysfsAttributes::new(&device.attribute_dir)),
            config.log_path(device),
        )
    }

    /// The configured device set, in configuration order.
    pub fn all_from_config(config: &Config) -> Vec<Self> {
        config
            .devices
            .iter()
            .map(|d| Self::from_config(d, config))
            .collect()
    }

    pub fn sensor_name(&self) -> &str {
        &self.sensor_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn history(&self) -> &BoundedHistory {
        &self.history
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub(crate) fn source(&self) -> &dyn AttributeSource {
        self.source.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysfs_reads_first_line_and_flag() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(VALUE_FILE), "12\n").unwrap();
        fs::write(tmp.path().join(CHANGED_FILE), "1\n").unwrap();

        let attrs = SysfsAttributes::new(tmp.path());
        assert_eq!(attrs.read_value().unwrap(), "12");
        assert!(attrs.read_changed().unwrap());

        attrs.clear_changed().unwrap();
        assert!(!attrs.read_changed().unwrap());
        assert_eq!(
            fs::read_to_string(tmp.path().join(CHANGED_FILE)).unwrap(),
            "0"
        );
    }

    #[test]
    fn test_sysfs_missing_directory_is_an_error() {
        let attrs = SysfsAttributes::new("/nonexistent/gpio_char_device");
        assert!(attrs.read_value().is_err());
        assert!(attrs.read_changed().is_err());
    }

    #[test]
    fn test_store_source_acknowledges_in_place() {
        let store = Arc::new(AttributeStore::new());
        store.publish(6);

        let source: Box<dyn AttributeSource> = Box::new(StoreSource::new(store.clone()));
        assert!(source.read_changed().unwrap());
        assert_eq!(source.read_value().unwrap(), "6");
        source.clear_changed().unwrap();
        assert!(!store.read_changed());
    }

    #[test]
    fn test_store_methods_stay_reachable_with_trait_in_scope() {
        let store = Arc::new(AttributeStore::new());
        store.publish(11);

        // Inherent methods on the shared store, not the io::Result trait ones
        let changed: bool = store.read_changed();
        assert!(changed);
        store.clear_changed();
        assert!(!store.read_changed());

        let source = StoreSource::new(store.clone());
        assert_eq!(source.read_value().unwrap(), "11");
        assert!(Arc::ptr_eq(source.store(), &store));
    }

    #[test]
    fn test_devices_from_default_config() {
        let config = Config::default();
        let devices = Device::all_from_config(&config);
        let names: Vec<&str> = devices.iter().map(Device::sensor_name).collect();
        assert_eq!(names, vec!["Humidity", "Saltiness", "Light"]);
        assert!(devices.iter().all(|d| d.history().is_empty()));
        assert_eq!(devices[2].log_path(), Path::new("./light_log.txt"));
    }
}
