//! Single-wire line abstraction.
//!
//! The sampling and toggle paths only ever read a level or drive a level, so
//! hardware access sits behind two small traits. The simulated lines here are
//! what the device simulator and the tests drive.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// A line whose electrical level can be read.
pub trait InputLine: Send + Sync {
    fn is_high(&self) -> bool;
}

/// A line that can be driven high or low.
pub trait OutputLine: Send + Sync {
    fn set_level(&self, high: bool);
}

/// Level latch: reads return whatever was last driven.
#[derive(Debug, Default)]
pub struct SimulatedLine {
    level: AtomicBool,
}

impl SimulatedLine {
    pub fn new(initial: bool) -> Self {
        Self {
            level: AtomicBool::new(initial),
        }
    }
}

impl InputLine for SimulatedLine {
    fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

impl OutputLine for SimulatedLine {
    fn set_level(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }
}

/// Input line that plays back queued levels, one per read.
///
/// Once the queue is drained every read returns the idle level (low).
#[derive(Debug, Default)]
pub struct ScriptedLine {
    levels: Mutex<VecDeque<bool>>,
}

impl ScriptedLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue levels to be returned by subsequent reads, in order.
    pub fn push_levels(&self, levels: impl IntoIterator<Item = bool>) {
        self.levels.lock().extend(levels);
    }

    /// Queue the four slot levels that encode `value` (least significant bit first).
    pub fn push_value(&self, value: u8) {
        self.push_levels((0..4).map(|bit| value & (1 << bit) != 0));
    }

    pub fn pending(&self) -> usize {
        self.levels.lock().len()
    }

    /// Drop any levels not yet read.
    pub fn clear(&self) {
        self.levels.lock().clear();
    }
}

impl InputLine for ScriptedLine {
    fn is_high(&self) -> bool {
        self.levels.lock().pop_front().unwrap_or(false)
    }
}
