//! Host-side monitoring.
//!
//! Each [`Device`] is polled by its own session thread for a fixed duration;
//! [`monitor_all`] blocks until every session has finished.

pub mod device;
pub mod history;
pub mod session;

pub use device::{AttributeSource, Device, StoreSource, SysfsAttributes};
pub use history::{BoundedHistory, HISTORY_CAPACITY};
pub use session::{MonitorSettings, SessionReport, monitor_all, poll_once, run_session};
