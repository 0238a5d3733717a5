//! Debounced toggle output (pump control).
//!
//! Each accepted edge flips the output state and drives the line to match.
//! The action is O(1) and runs directly in the trigger path.

use super::debounce::DebounceGate;
use super::line::OutputLine;
use crate::config::ToggleConfig;
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

pub struct ToggleController {
    name: String,
    gate: DebounceGate,
    line: Arc<dyn OutputLine>,
    state: AtomicBool,
    version: AtomicU32,
}

impl ToggleController {
    /// Create a controller in the LOW state and drive the line low.
    pub fn new(name: &str, line: Arc<dyn OutputLine>, debounce_window: Duration) -> Self {
        line.set_level(false);
        Self {
            name: name.to_string(),
            gate: DebounceGate::new(debounce_window),
            line,
            state: AtomicBool::new(false),
            version: AtomicU32::new(0),
        }
    }

    pub fn from_config(name: &str, line: Arc<dyn OutputLine>, config: &ToggleConfig) -> Self {
        Self::new(name, line, Duration::from_millis(config.debounce_ms))
    }

    /// Current output state (`true` = HIGH).
    pub fn get(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }

    /// Number of accepted toggles.
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    /// Offer an edge stamped with the monotonic clock.
    pub fn on_edge(&self) -> Option<bool> {
        self.gate.try_accept().then(|| self.toggle())
    }

    /// Offer an edge with an explicit timestamp. Returns the new state if accepted.
    pub fn on_edge_at(&self, at: Duration) -> Option<bool> {
        self.gate.try_accept_at(at).then(|| self.toggle())
    }

    fn toggle(&self) -> bool {
        // fetch_xor with true flips the bit
        let new_state = !self.state.fetch_xor(true, Ordering::SeqCst);
        self.line.set_level(new_state);
        self.version.fetch_add(1, Ordering::SeqCst);
        info!("{} output toggled to {}", self.name, u8::from(new_state));
        new_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::line::{InputLine, SimulatedLine};

    fn controller() -> (Arc<SimulatedLine>, ToggleController) {
        let line = Arc::new(SimulatedLine::new(true));
        let toggle = ToggleController::new("Pump", line.clone(), Duration::from_millis(50));
        (line, toggle)
    }

    #[test]
    fn test_starts_low_and_drives_line_low() {
        let (line, toggle) = controller();
        assert!(!toggle.get());
        assert!(!line.is_high());
        assert_eq!(toggle.version(), 0);
    }

    #[test]
    fn test_each_accepted_edge_flips_output() {
        let (line, toggle) = controller();

        assert_eq!(toggle.on_edge_at(Duration::from_millis(0)), Some(true));
        assert!(line.is_high());
        assert_eq!(toggle.on_edge_at(Duration::from_millis(50)), Some(false));
        assert!(!line.is_high());
        assert_eq!(toggle.on_edge_at(Duration::from_millis(120)), Some(true));
        assert!(line.is_high());
        assert_eq!(toggle.version(), 3);
    }

    #[test]
    fn test_bounce_inside_window_ignored() {
        let (line, toggle) = controller();

        assert_eq!(toggle.on_edge_at(Duration::from_millis(0)), Some(true));
        assert_eq!(toggle.on_edge_at(Duration::from_millis(10)), None);
        assert_eq!(toggle.on_edge_at(Duration::from_millis(49)), None);
        assert!(toggle.get());
        assert!(line.is_high());
        assert_eq!(toggle.version(), 1);
    }
}
