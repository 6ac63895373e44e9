//! CLI command implementations.

pub mod apply_edits;
pub mod auth_status;
pub mod dump_changes;
pub mod position;
pub mod snapshot;

use sheetsync_store::Store;
use std::path::Path;
use tracing::debug;

/// Opens a store that must already exist.
pub fn open_existing(path: &Path) -> Result<Store, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }
    debug!(path = %path.display(), "Opening store");
    Ok(Store::open(path)?)
}
