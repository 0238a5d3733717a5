//! File mirror of an [`AttributeStore`] in sysfs layout.
//!
//! Each sensor gets a directory holding `value` and `changed_value`. A
//! periodic [`AttributeExport::sync`] renders fresh samples into the files and
//! carries acknowledgments written by the host back into the store.

use super::attribute::AttributeStore;
use log::debug;
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const VALUE_FILE: &str = "value";
pub const CHANGED_FILE: &str = "changed_value";

#[derive(Debug, Clone, Copy)]
struct Rendered {
    version: u32,
    changed: bool,
}

pub struct AttributeExport {
    dir: PathBuf,
    store: Arc<AttributeStore>,
    rendered: Mutex<Rendered>,
}

impl AttributeExport {
    /// Create the directory and write the store's current attributes.
    pub fn create(dir: impl Into<PathBuf>, store: Arc<AttributeStore>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let export = Self {
            rendered: Mutex::new(Rendered {
                version: store.version(),
                changed: store.read_changed(),
            }),
            dir,
            store,
        };
        export.render()?;
        Ok(export)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(&self) -> &Arc<AttributeStore> {
        &self.store
    }

    /// Apply a pending host acknowledgment, then render any new state.
    ///
    /// An acknowledgment only clears the flag if no newer sample has been
    /// published since the flag was last rendered.
    pub fn sync(&self) -> io::Result<()> {
        let mut rendered = self.rendered.lock();

        if rendered.changed && self.store.version() == rendered.version {
            let payload = fs::read_to_string(self.dir.join(CHANGED_FILE))?;
            if self.store.store_changed(&payload) {
                debug!("acknowledgment applied in {}", self.dir.display());
            }
        }

        let current = Rendered {
            version: self.store.version(),
            changed: self.store.read_changed(),
        };
        if current.version != rendered.version || current.changed != rendered.changed {
            self.render()?;
            *rendered = current;
        }
        Ok(())
    }

    fn render(&self) -> io::Result<()> {
        // Value first so a reader that sees the flag also sees its value
        self.replace_file(VALUE_FILE, &self.store.render_value())?;
        self.replace_file(CHANGED_FILE, &self.store.render_changed())
    }

    /// Write through a sibling temp file and rename it over `file`, so a
    /// concurrent reader sees either the old or the new content, never a
    /// truncated file.
    fn replace_file(&self, file: &str, contents: &str) -> io::Result<()> {
        let staging = self.dir.join(format!(".{}.tmp", file));
        fs::write(&staging, contents)?;
        fs::rename(&staging, self.dir.join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(export: &AttributeExport, file: &str) -> String {
        fs::read_to_string(export.dir().join(file)).unwrap()
    }

    #[test]
    fn test_create_writes_initial_attributes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(AttributeStore::new());
        let export = AttributeExport::create(tmp.path().join("humidity"), store).unwrap();

        assert_eq!(read(&export, VALUE_FILE), "0\n");
        assert_eq!(read(&export, CHANGED_FILE), "0\n");
    }

    #[test]
    fn test_sync_renders_sample_and_applies_ack() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(AttributeStore::new());
        let export = AttributeExport::create(tmp.path(), store.clone()).unwrap();

        store.publish(7);
        export.sync().unwrap();
        assert_eq!(read(&export, VALUE_FILE), "7\n");
        assert_eq!(read(&export, CHANGED_FILE), "1\n");

        fs::write(tmp.path().join(CHANGED_FILE), "0").unwrap();
        export.sync().unwrap();
        assert!(!store.read_changed());
        assert_eq!(read(&export, CHANGED_FILE), "0\n");
    }

    #[test]
    fn test_render_leaves_only_attribute_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(AttributeStore::new());
        let export = AttributeExport::create(tmp.path(), store.clone()).unwrap();

        for value in [4, 9, 12] {
            store.publish(value);
            export.sync().unwrap();
            assert_eq!(read(&export, VALUE_FILE), format!("{}\n", value));
        }

        let mut names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![CHANGED_FILE, VALUE_FILE]);
    }

    #[test]
    fn test_non_zero_write_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(AttributeStore::new());
        let export = AttributeExport::create(tmp.path(), store.clone()).unwrap();

        store.publish(2);
        export.sync().unwrap();
        fs::write(tmp.path().join(CHANGED_FILE), "x").unwrap();
        export.sync().unwrap();
        assert!(store.read_changed());
    }

    #[test]
    fn test_stale_ack_does_not_clear_newer_sample() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Arc::new(AttributeStore::new());
        let export = AttributeExport::create(tmp.path(), store.clone()).unwrap();

        store.publish(1);
        export.sync().unwrap();

        // Host acknowledges sample 1 while sample 2 is already published
        store.publish(3);
        fs::write(tmp.path().join(CHANGED_FILE), "0").unwrap();
        export.sync().unwrap();

        assert!(store.read_changed());
        assert_eq!(read(&export, VALUE_FILE), "3\n");
        assert_eq!(read(&export, CHANGED_FILE), "1\n");
    }
}
