//! Latest-value attribute record with a consumer-acknowledged change flag.
//!
//! Provides thread-safe shared state that the sampling path publishes into and
//! any number of consumers read. The changed flag is raised only by a fresh
//! sample and lowered only by an explicit acknowledgment.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

/// Thread-safe value/flag pair exposed as the `value` and `changed_value`
/// attributes.
///
/// The version is incremented on every published sample, including samples
/// that repeat the previous value.
#[derive(Debug, Default)]
pub struct AttributeStore {
    value: AtomicU8,
    changed: AtomicBool,
    version: AtomicU32,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last sampled value, 0 before the first sample.
    pub fn read_value(&self) -> u8 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn read_changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Acknowledge the current sample. Idempotent.
    pub fn clear_changed(&self) {
        self.changed.store(false, Ordering::SeqCst);
    }

    /// Apply a write to the `changed_value` attribute.
    ///
    /// A payload starting with `'0'` clears the flag; anything else is ignored.
    /// Returns whether the payload was treated as an acknowledgment.
    pub fn store_changed(&self, payload: &str) -> bool {
        if payload.starts_with('0') {
            self.clear_changed();
            true
        } else {
            false
        }
    }

    /// Text of the `value` attribute.
    pub fn render_value(&self) -> String {
        format!("{}\n", self.read_value())
    }

    /// Text of the `changed_value` attribute.
    pub fn render_changed(&self) -> String {
        format!("{}\n", u8::from(self.read_changed()))
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    /// Record a completed sample and raise the changed flag.
    ///
    /// The value is stored before the flag so a consumer that sees the flag
    /// also sees the value it announces.
    pub(crate) fn publish(&self, value: u8) {
        self.value.store(value, Ordering::SeqCst);
        self.version.fetch_add(1, Ordering::SeqCst);
        self.changed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let store = AttributeStore::new();
        assert_eq!(store.read_value(), 0);
        assert!(!store.read_changed());
        assert_eq!(store.version(), 0);
        assert_eq!(store.render_value(), "0\n");
        assert_eq!(store.render_changed(), "0\n");
    }

    #[test]
    fn test_publish_raises_flag_until_acknowledged() {
        let store = AttributeStore::new();
        store.publish(9);
        assert_eq!(store.read_value(), 9);
        assert!(store.read_changed());

        // Reading never clears the flag
        assert!(store.read_changed());
        assert_eq!(store.render_changed(), "1\n");

        store.clear_changed();
        assert!(!store.read_changed());
        assert_eq!(store.read_value(), 9);
    }

    #[test]
    fn test_clear_changed_is_idempotent() {
        let store = AttributeStore::new();
        store.clear_changed();
        assert!(!store.read_changed());
        store.clear_changed();
        assert!(!store.read_changed());
    }

    #[test]
    fn test_repeated_value_still_bumps_version() {
        let store = AttributeStore::new();
        store.publish(3);
        store.publish(3);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_store_changed_only_honours_leading_zero() {
        let store = AttributeStore::new();
        store.publish(4);

        assert!(!store.store_changed("1"));
        assert!(store.read_changed());
        assert!(!store.store_changed(""));
        assert!(!store.store_changed(" 0"));
        assert!(store.read_changed());

        assert!(store.store_changed("0\n"));
        assert!(!store.read_changed());
    }
}
