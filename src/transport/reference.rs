//! Persistence of reference payloads received from the device.

use log::debug;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File receiving the payload at `index` (0-based arrival order).
pub fn reference_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("received_data_{}.txt", index + 1))
}

/// Append `payload` to its reference file, one decimal byte value per line.
pub fn save_reference_payload(dir: &Path, index: usize, payload: &[u8]) -> io::Result<PathBuf> {
    let path = reference_path(dir, index);
    let body: String = payload.iter().map(|byte| format!("{}\n", byte)).collect();

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(body.as_bytes())?;

    debug!("Saved {} bytes to {}", payload.len(), path.display());
    Ok(path)
}
