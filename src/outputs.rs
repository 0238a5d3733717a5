//! Removal of the previous run's output files.

use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Delete each file in `files`. Returns the paths actually removed.
///
/// Missing files are expected and only logged at debug; other failures are
/// logged and skipped.
pub fn reset_outputs<P: AsRef<Path>>(files: &[P]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in files {
        let path: &Path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Deleted {}", path.display());
                removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("File does not exist: {}", path.display());
            }
            Err(e) => warn!("Error deleting file {}: {}", path.display(), e),
        }
    }
    removed
}
