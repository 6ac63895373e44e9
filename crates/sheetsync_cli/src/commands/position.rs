//! Position command implementation.

use super::open_existing;
use std::path::Path;

/// Runs the position command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let position = store.current_position()?;

    match format {
        "json" => {
            let value = serde_json::json!({
                "file": position.file,
                "offset": position.offset,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => println!("{position}"),
    }

    Ok(())
}
