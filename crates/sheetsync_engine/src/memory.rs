//! In-memory mirror.

use crate::error::{EngineError, EngineResult};
use crate::mirror::{MirrorClient, ROW_WIDTH};
use parking_lot::{Mutex, RwLock};
use sheetsync_protocol::CellValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A mirror call, as recorded by [`MemoryMirror`].
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorOp {
    /// `read_key_column`
    ReadKeys,
    /// `read_row`
    ReadRow(usize),
    /// `update_row`
    Update(usize),
    /// `append_row`
    Append,
    /// `delete_row`
    Delete(usize),
    /// `clear_data`
    Clear,
    /// `write_rows` with the number of rows written
    WriteRows(usize),
    /// `write_header`
    WriteHeader,
}

/// A mirror backed by a shared in-memory grid.
///
/// Clones share the same grid, so a test can keep one handle while the
/// worker owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryMirror {
    grid: Arc<RwLock<Vec<Vec<CellValue>>>>,
    ops: Arc<Mutex<Vec<MirrorOp>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryMirror {
    /// Creates an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mirror holding the given grid.
    pub fn with_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            grid: Arc::new(RwLock::new(rows)),
            ..Self::default()
        }
    }

    /// Makes every subsequent call fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a copy of the whole grid.
    pub fn snapshot(&self) -> Vec<Vec<CellValue>> {
        self.grid.read().clone()
    }

    /// Returns the header row, or an empty row.
    pub fn header(&self) -> Vec<CellValue> {
        self.grid.read().first().cloned().unwrap_or_default()
    }

    /// Returns the data rows, skipping the header.
    pub fn data_rows(&self) -> Vec<Vec<CellValue>> {
        self.grid.read().iter().skip(1).cloned().collect()
    }

    /// Returns the data row whose key cell equals `key`.
    pub fn find(&self, key: &str) -> Option<Vec<CellValue>> {
        self.grid
            .read()
            .iter()
            .skip(1)
            .find(|row| row.first().and_then(CellValue::as_text) == Some(key))
            .cloned()
    }

    /// Returns the calls made so far.
    pub fn ops(&self) -> Vec<MirrorOp> {
        self.ops.lock().clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_ops(&self) {
        self.ops.lock().clear();
    }

    fn record(&self, op: MirrorOp) -> EngineResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::transport_retryable(format!(
                "mirror unavailable during {op:?}"
            )));
        }
        self.ops.lock().push(op);
        Ok(())
    }
}

fn padded(values: &[CellValue]) -> Vec<CellValue> {
    let mut row = values.to_vec();
    if row.len() < ROW_WIDTH {
        row.resize(ROW_WIDTH, CellValue::Null);
    }
    row
}

impl MirrorClient for MemoryMirror {
    fn read_key_column(&self) -> EngineResult<Vec<CellValue>> {
        self.record(MirrorOp::ReadKeys)?;
        Ok(self
            .grid
            .read()
            .iter()
            .map(|row| row.first().cloned().unwrap_or(CellValue::Null))
            .collect())
    }

    fn read_row(&self, row: usize) -> EngineResult<Vec<CellValue>> {
        self.record(MirrorOp::ReadRow(row))?;
        Ok(self.grid.read().get(row).cloned().unwrap_or_default())
    }

    fn update_row(&self, row: usize, values: &[CellValue]) -> EngineResult<()> {
        self.record(MirrorOp::Update(row))?;
        let mut grid = self.grid.write();
        if grid.len() <= row {
            grid.resize(row + 1, Vec::new());
        }
        let target = &mut grid[row];
        if target.len() < ROW_WIDTH {
            target.resize(ROW_WIDTH, CellValue::Null);
        }
        for (offset, value) in values.iter().take(ROW_WIDTH - 1).enumerate() {
            target[offset + 1] = value.clone();
        }
        Ok(())
    }

    fn append_row(&self, values: &[CellValue]) -> EngineResult<()> {
        self.record(MirrorOp::Append)?;
        self.grid.write().push(padded(values));
        Ok(())
    }

    fn delete_row(&self, row: usize) -> EngineResult<()> {
        self.record(MirrorOp::Delete(row))?;
        let mut grid = self.grid.write();
        if row >= grid.len() {
            return Err(EngineError::transport_fatal(format!(
                "row {row} is outside a grid of {} rows",
                grid.len()
            )));
        }
        grid.remove(row);
        Ok(())
    }

    fn clear_data(&self) -> EngineResult<()> {
        self.record(MirrorOp::Clear)?;
        self.grid.write().truncate(1);
        Ok(())
    }

    fn write_rows(&self, rows: &[Vec<CellValue>]) -> EngineResult<()> {
        self.record(MirrorOp::WriteRows(rows.len()))?;
        let mut grid = self.grid.write();
        if grid.is_empty() {
            grid.push(Vec::new());
        }
        for (offset, row) in rows.iter().enumerate() {
            let index = offset + 1;
            if index < grid.len() {
                grid[index] = padded(row);
            } else {
                grid.push(padded(row));
            }
        }
        Ok(())
    }

    fn write_header(&self, labels: &[&str]) -> EngineResult<()> {
        self.record(MirrorOp::WriteHeader)?;
        let header = labels.iter().map(|l| CellValue::from(*l)).collect();
        let mut grid = self.grid.write();
        if grid.is_empty() {
            grid.push(header);
        } else {
            grid[0] = header;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str) -> Vec<CellValue> {
        vec![CellValue::from(key), CellValue::from("name")]
    }

    #[test]
    fn append_pads_to_row_width() {
        let mirror = MemoryMirror::new();
        mirror.append_row(&row("a")).unwrap();
        assert_eq!(mirror.snapshot()[0].len(), ROW_WIDTH);
    }

    #[test]
    fn update_writes_b_through_g() {
        let mirror = MemoryMirror::with_rows(vec![vec![CellValue::from("UUID")], row("a")]);
        let values: Vec<CellValue> = (0..6).map(|i| CellValue::Integer(i)).collect();
        mirror.update_row(1, &values).unwrap();

        let updated = mirror.find("a").unwrap();
        assert_eq!(updated[0], CellValue::from("a"));
        assert_eq!(updated[1], CellValue::Integer(0));
        assert_eq!(updated[6], CellValue::Integer(5));
    }

    #[test]
    fn clear_keeps_header() {
        let mirror = MemoryMirror::with_rows(vec![vec![CellValue::from("UUID")], row("a"), row("b")]);
        mirror.clear_data().unwrap();
        assert_eq!(mirror.snapshot().len(), 1);

        mirror.write_rows(&[row("c")]).unwrap();
        assert_eq!(mirror.data_rows().len(), 1);
        assert!(mirror.find("c").is_some());
        assert_eq!(mirror.header(), vec![CellValue::from("UUID")]);
    }

    #[test]
    fn delete_out_of_range_fails() {
        let mirror = MemoryMirror::new();
        assert!(mirror.delete_row(3).is_err());
    }

    #[test]
    fn failing_mirror_records_nothing() {
        let mirror = MemoryMirror::new();
        mirror.set_failing(true);
        let err = mirror.append_row(&row("a")).unwrap_err();
        assert!(err.is_retryable());
        assert!(mirror.ops().is_empty());
        assert!(mirror.snapshot().is_empty());

        mirror.set_failing(false);
        mirror.append_row(&row("a")).unwrap();
        assert_eq!(mirror.ops(), vec![MirrorOp::Append]);
    }

    #[test]
    fn clones_share_the_grid() {
        let mirror = MemoryMirror::new();
        let other = mirror.clone();
        other.append_row(&row("a")).unwrap();
        assert_eq!(mirror.snapshot().len(), 1);
    }
}
