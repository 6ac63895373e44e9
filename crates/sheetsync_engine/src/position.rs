//! Start position capture.

use crate::error::EngineResult;
use sheetsync_protocol::SyncPosition;
use sheetsync_store::Store;
use tracing::info;

/// Reads the store's change-log head once, at startup.
///
/// Ingestion resumes strictly after this point, so history committed before
/// startup is never replayed; the initial full resync covers it instead.
/// A failure here is fatal to startup.
pub fn capture_start_position(store: &Store) -> EngineResult<SyncPosition> {
    let position = store.current_position()?;
    info!(position = %position, "Snapshot taken, change stream resumes here");
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsync_protocol::Attribution;
    use sheetsync_store::NewProduct;

    #[test]
    fn captures_head() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(capture_start_position(&store).unwrap().offset, 0);

        store
            .create_product(&NewProduct::new("Mouse", 1, 2.0, false), &Attribution::system())
            .unwrap();
        let position = capture_start_position(&store).unwrap();
        assert_eq!(position.file, "change_log");
        assert_eq!(position.offset, 1);
    }
}
