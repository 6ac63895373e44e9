//! Apply edits command implementation.

use super::open_existing;
use sheetsync_server::{ServerConfig, SyncServer};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runs the apply-edits command.
pub fn run(path: &Path, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let body = std::fs::read(file)?;
    let store = Arc::new(open_existing(path)?);
    let server = SyncServer::new(ServerConfig::default(), store, None);

    let outcome = server.apply_edits(&body)?;
    info!(
        file = %file.display(),
        applied = outcome.applied,
        rejected = outcome.rejected,
        "Applied edit batch"
    );
    println!("{}", outcome.message());
    if outcome.rejected > 0 || outcome.failed > 0 {
        println!(
            "{} of {} edits skipped ({} rejected, {} failed)",
            outcome.rejected + outcome.failed,
            outcome.received,
            outcome.rejected,
            outcome.failed
        );
    }

    Ok(())
}
