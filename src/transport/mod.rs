//! Datagram command protocol between host and device.
//!
//! The host sends single-datagram commands ([`Command`]) and reads a fixed
//! number of reply datagrams per command. Reference payloads are persisted as
//! one byte value per line.

pub mod client;
pub mod protocol;
pub mod reference;
pub mod server;

pub use client::{CommandClient, ReferenceData};
pub use protocol::Command;
pub use reference::{reference_path, save_reference_payload};
pub use server::{CommandHandler, serve};
