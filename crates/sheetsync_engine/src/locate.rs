//! Finding a mirror row by key.

use crate::error::EngineResult;
use crate::mirror::MirrorClient;
use sheetsync_protocol::CellValue;

/// Returns the grid index of the first data row whose key cell equals `key`.
///
/// Reads the whole key column on every call and scans it linearly. The
/// header row is never matched. An empty key never matches.
pub fn locate(client: &dyn MirrorClient, key: &str) -> EngineResult<Option<usize>> {
    if key.is_empty() {
        return Ok(None);
    }
    let keys = client.read_key_column()?;
    Ok(find_key(&keys, key))
}

fn find_key(keys: &[CellValue], key: &str) -> Option<usize> {
    keys.iter()
        .enumerate()
        .skip(1)
        .find(|(_, cell)| cell.as_text() == Some(key))
        .map(|(index, _)| index)
}
