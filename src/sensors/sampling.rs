//! Deferred four-slot sampling of a timing-encoded sensor line.
//!
//! An accepted edge never samples in the trigger path. It only enqueues a run
//! for the engine's single worker task, which reads the line once per slot,
//! sleeping between slots, and publishes the assembled value.
//!
//! The run queue holds at most one pending run. An edge accepted while a run
//! is pending is coalesced into it, so runs never overlap and never pile up.

use super::attribute::AttributeStore;
use super::debounce::DebounceGate;
use super::line::InputLine;
use crate::config::SamplingConfig;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Number of slots (bits) in one measurement.
pub const SLOT_COUNT: usize = 4;

/// Result of one completed slot sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleReport {
    pub value: u8,
    pub slots: [bool; SLOT_COUNT],
    /// Wall time of the whole sequence. Diagnostic only.
    pub elapsed: Duration,
}

/// What happened to an edge offered to [`SamplingEngine::on_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Accepted and a run was queued.
    Queued,
    /// Accepted, but a run was already pending.
    Coalesced,
    /// Inside the debounce window.
    Debounced,
    /// The worker has exited.
    WorkerStopped,
}

/// Pack slot levels into a value, first slot in the least significant bit.
pub fn assemble(slots: [bool; SLOT_COUNT]) -> u8 {
    slots
        .iter()
        .enumerate()
        .fold(0u8, |acc, (bit, &high)| acc | (u8::from(high) << bit))
}

/// Read `SLOT_COUNT` levels from `line`, waiting `slot_interval` after each read.
pub async fn sample_slots(line: &dyn InputLine, slot_interval: Duration) -> SampleReport {
    let started = Instant::now();
    let mut slots = [false; SLOT_COUNT];
    for slot in slots.iter_mut() {
        *slot = line.is_high();
        tokio::time::sleep(slot_interval).await;
    }
    SampleReport {
        value: assemble(slots),
        slots,
        elapsed: started.elapsed(),
    }
}

pub struct SamplingEngine {
    name: String,
    gate: DebounceGate,
    queue: mpsc::Sender<()>,
    store: Arc<AttributeStore>,
    last_sample: Arc<Mutex<Option<SampleReport>>>,
    worker: JoinHandle<()>,
}

impl SamplingEngine {
    /// Start the engine's worker task. Must be called inside a tokio runtime.
    pub fn spawn(
        name: &str,
        line: Arc<dyn InputLine>,
        store: Arc<AttributeStore>,
        slot_interval: Duration,
        debounce_window: Duration,
    ) -> Self {
        let (queue, rx) = mpsc::channel(1);
        let last_sample = Arc::new(Mutex::new(None));

        let worker = tokio::spawn(run_worker(
            name.to_string(),
            line,
            store.clone(),
            slot_interval,
            last_sample.clone(),
            rx,
        ));

        Self {
            name: name.to_string(),
            gate: DebounceGate::new(debounce_window),
            queue,
            store,
            last_sample,
            worker,
        }
    }

    pub fn from_config(
        name: &str,
        line: Arc<dyn InputLine>,
        store: Arc<AttributeStore>,
        config: &SamplingConfig,
    ) -> Self {
        Self::spawn(
            name,
            line,
            store,
            Duration::from_millis(config.slot_interval_ms),
            Duration::from_millis(config.debounce_ms),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offer an edge stamped with the monotonic clock. Never blocks.
    pub fn on_edge(&self) -> EdgeOutcome {
        if !self.gate.try_accept() {
            return EdgeOutcome::Debounced;
        }
        self.enqueue()
    }

    /// Offer an edge with an explicit timestamp relative to the engine's gate.
    pub fn on_edge_at(&self, at: Duration) -> EdgeOutcome {
        if !self.gate.try_accept_at(at) {
            return EdgeOutcome::Debounced;
        }
        self.enqueue()
    }

    fn enqueue(&self) -> EdgeOutcome {
        match self.queue.try_send(()) {
            Ok(()) => EdgeOutcome::Queued,
            Err(TrySendError::Full(())) => {
                debug!("[{}] sampling run already pending, edge coalesced", self.name);
                EdgeOutcome::Coalesced
            }
            Err(TrySendError::Closed(())) => {
                warn!("[{}] sampling worker stopped, edge dropped", self.name);
                EdgeOutcome::WorkerStopped
            }
        }
    }

    pub fn store(&self) -> Arc<AttributeStore> {
        self.store.clone()
    }

    pub fn last_sample(&self) -> Option<SampleReport> {
        *self.last_sample.lock()
    }

    /// Close the queue and wait for any in-flight run to finish.
    pub async fn shutdown(self) {
        drop(self.queue);
        if let Err(e) = self.worker.await {
            warn!("[{}] sampling worker ended abnormally: {}", self.name, e);
        }
    }
}

async fn run_worker(
    name: String,
    line: Arc<dyn InputLine>,
    store: Arc<AttributeStore>,
    slot_interval: Duration,
    last_sample: Arc<Mutex<Option<SampleReport>>>,
    mut rx: mpsc::Receiver<()>,
) {
    while rx.recv().await.is_some() {
        let report = sample_slots(line.as_ref(), slot_interval).await;
        store.publish(report.value);
        debug!(
            "[{}] slots {:?} sampled in {} ms",
            name,
            report.slots,
            report.elapsed.as_millis()
        );
        info!("{} value: {}", name, report.value);
        *last_sample.lock() = Some(report);
    }
    debug!("[{}] sampling worker exiting", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::line::ScriptedLine;

    const SLOT: Duration = Duration::from_millis(5);
    const WINDOW: Duration = Duration::from_millis(200);

    async fn wait_for_version(store: &AttributeStore, version: u32) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while store.version() < version {
            assert!(Instant::now() < deadline, "no sample published in time");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    #[test]
    fn test_assemble_first_slot_is_lsb() {
        assert_eq!(assemble([false; 4]), 0);
        assert_eq!(assemble([true, false, false, false]), 1);
        assert_eq!(assemble([false, false, false, true]), 8);
        assert_eq!(assemble([true, false, true, true]), 13);
        assert_eq!(assemble([true; 4]), 15);
    }

    #[tokio::test]
    async fn test_sample_slots_reads_four_ordered_levels() {
        let line = ScriptedLine::new();
        line.push_levels([false, true, true, false, true]);

        let report = sample_slots(&line, SLOT).await;
        assert_eq!(report.slots, [false, true, true, false]);
        assert_eq!(report.value, 6);
        assert!(report.elapsed >= SLOT * 4);
        // Fifth level left for the next run
        assert_eq!(line.pending(), 1);
    }

    #[tokio::test]
    async fn test_accepted_edge_publishes_value() {
        let line = Arc::new(ScriptedLine::new());
        line.push_value(11);
        let store = Arc::new(AttributeStore::new());
        let engine = SamplingEngine::spawn("Humidity", line, store.clone(), SLOT, WINDOW);

        assert_eq!(engine.on_edge_at(Duration::ZERO), EdgeOutcome::Queued);
        wait_for_version(&store, 1).await;

        assert_eq!(store.read_value(), 11);
        assert!(store.read_changed());
        assert_eq!(engine.last_sample().map(|r| r.value), Some(11));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_debounced_edge_does_not_sample() {
        let line = Arc::new(ScriptedLine::new());
        let store = Arc::new(AttributeStore::new());
        let engine = SamplingEngine::spawn("Light", line, store.clone(), SLOT, WINDOW);

        assert_eq!(engine.on_edge_at(Duration::from_millis(1000)), EdgeOutcome::Queued);
        assert_eq!(
            engine.on_edge_at(Duration::from_millis(1100)),
            EdgeOutcome::Debounced
        );
        engine.shutdown().await;
        assert_eq!(store.version(), 1);
    }

    #[tokio::test]
    async fn test_runs_are_serialized_not_interleaved() {
        let line = Arc::new(ScriptedLine::new());
        line.push_value(5);
        line.push_value(10);
        let store = Arc::new(AttributeStore::new());
        let engine = SamplingEngine::spawn(
            "Saltiness",
            line.clone(),
            store.clone(),
            Duration::from_millis(20),
            WINDOW,
        );

        assert_eq!(engine.on_edge_at(Duration::ZERO), EdgeOutcome::Queued);
        // Wait until the first run has started consuming its slots
        let deadline = Instant::now() + Duration::from_secs(2);
        while line.pending() == 8 {
            assert!(Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(engine.on_edge_at(WINDOW), EdgeOutcome::Queued);

        wait_for_version(&store, 1).await;
        assert_eq!(store.read_value(), 5);
        wait_for_version(&store, 2).await;
        assert_eq!(store.read_value(), 10);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_edges_while_pending_are_coalesced() {
        let line = Arc::new(ScriptedLine::new());
        let store = Arc::new(AttributeStore::new());
        let engine = SamplingEngine::spawn(
            "Humidity",
            line,
            store.clone(),
            Duration::from_millis(20),
            Duration::ZERO,
        );

        let outcomes: Vec<EdgeOutcome> = (0..5)
            .map(|i| engine.on_edge_at(Duration::from_millis(i)))
            .collect();
        assert_eq!(outcomes[0], EdgeOutcome::Queued);
        assert!(outcomes.contains(&EdgeOutcome::Coalesced));

        engine.shutdown().await;
        assert!(store.version() >= 1);
        assert!(store.version() <= 2);
    }
}
