//! Device-side acquisition.
//!
//! Raw edges pass through a [`DebounceGate`] and either schedule a deferred
//! four-slot sample ([`SamplingEngine`]) whose result lands in an
//! [`AttributeStore`], or flip an output ([`ToggleController`]).

pub mod attribute;
pub mod debounce;
pub mod export;
pub mod line;
pub mod sampling;
pub mod toggle;

pub use attribute::AttributeStore;
pub use debounce::DebounceGate;
pub use export::AttributeExport;
pub use line::{InputLine, OutputLine, ScriptedLine, SimulatedLine};
pub use sampling::{EdgeOutcome, SampleReport, SamplingEngine};
pub use toggle::ToggleController;
