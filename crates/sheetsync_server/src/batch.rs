//! Reverse batch apply.
//!
//! Writes a batch of mirror edits to the store inside one transaction. Each
//! edit is validated and applied on its own; a rejected or failed edit is
//! logged and left out of the count without aborting the rest.

use crate::error::ServerResult;
use sheetsync_protocol::FieldEdit;
use sheetsync_store::Store;
use tracing::{info, warn};

/// Result of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Edits in the request.
    pub received: usize,
    /// Edits written to the store.
    pub applied: usize,
    /// Edits excluded by validation.
    pub rejected: usize,
    /// Edits whose write failed.
    pub failed: usize,
}

impl BatchOutcome {
    /// Response text reported to the caller.
    pub fn message(&self) -> String {
        format!("Processed {} updates", self.applied)
    }
}

/// Applies `edits` in one transaction.
///
/// Fails only if the transaction cannot begin or commit, in which case
/// nothing from the batch is kept.
pub fn apply_batch(store: &Store, edits: &[FieldEdit]) -> ServerResult<BatchOutcome> {
    let mut outcome = BatchOutcome {
        received: edits.len(),
        ..BatchOutcome::default()
    };
    info!(edits = edits.len(), "Received mirror update batch");

    store.transaction(|tx| {
        for (index, edit) in edits.iter().enumerate() {
            let resolved = match edit.resolve() {
                Ok(resolved) => resolved,
                Err(reason) => {
                    warn!(index, key = %edit.uuid, field = %edit.field, %reason, "Skipping edit");
                    outcome.rejected += 1;
                    continue;
                }
            };
            match tx.upsert_field(&resolved) {
                Ok(()) => outcome.applied += 1,
                Err(e) => {
                    warn!(index, key = %resolved.key, field = resolved.field.label(), error = %e, "Batch item failed");
                    outcome.failed += 1;
                }
            }
        }
        Ok(())
    })?;

    Ok(outcome)
}
