//! GPIO sensor bridge library.
//!
//! Device side: debounced edges trigger deferred four-slot sampling into a
//! polled attribute record, plus a debounced toggle output.
//!
//! Host side: time-bounded concurrent monitoring sessions with bounded
//! per-device history and log files, a datagram command client, and
//! line-match scoring of logs against reference data.

pub mod config;
pub mod error;
pub mod monitor;
pub mod outputs;
pub mod sensors;
pub mod similarity;
pub mod transport;
