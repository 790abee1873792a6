//! Owned result arena shared by the driver adapters.
//!
//! Each execution materializes its result set into one flat, indexed buffer
//! of [`Value`] cells. The buffer is cleared on re-execute and released in
//! full when the statement closes, so per-row driver buffers never outlive
//! the statement and rebinding or refetching cannot leak.

use crate::error::DbalError;
use crate::numeric;
use crate::statement::Fetched;
use crate::value::Value;

#[derive(Debug, Default)]
pub(crate) struct RowBuffer {
    ncols: usize,
    cells: Vec<Value>,
    next_row: usize,
    current: Option<usize>,
}

impl RowBuffer {
    pub(crate) fn new(ncols: usize) -> RowBuffer {
        RowBuffer {
            ncols,
            cells: Vec::new(),
            next_row: 0,
            current: None,
        }
    }

    /// Drop all rows and reset the cursor for a fresh execution.
    pub(crate) fn reset(&mut self, ncols: usize) {
        self.ncols = ncols;
        self.cells.clear();
        self.next_row = 0;
        self.current = None;
    }

    pub(crate) fn column_count(&self) -> usize {
        self.ncols
    }

    pub(crate) fn row_count(&self) -> usize {
        if self.ncols == 0 {
            0
        } else {
            self.cells.len() / self.ncols
        }
    }

    /// Append one materialized row. The cell count must match the column
    /// count fixed at execute time.
    pub(crate) fn push_row(&mut self, row: Vec<Value>) -> Result<(), DbalError> {
        if row.len() != self.ncols {
            return Err(DbalError::Fetch(format!(
                "driver produced {} cells for a {}-column row",
                row.len(),
                self.ncols
            )));
        }
        let needed = numeric::checked_add(self.cells.len(), self.ncols)?;
        self.cells.reserve(needed - self.cells.len());
        self.cells.extend(row);
        Ok(())
    }

    /// Advance the cursor by exactly one row.
    pub(crate) fn advance(&mut self) -> Fetched {
        if self.next_row < self.row_count() {
            self.current = Some(self.next_row);
            self.next_row += 1;
            Fetched::Row
        } else {
            self.current = None;
            Fetched::Done
        }
    }

    /// Read one cell of the current row. Fails if no row has been fetched
    /// or the cursor has moved past the last row.
    pub(crate) fn cell(&self, col: usize) -> Result<&Value, DbalError> {
        let row = self.current.ok_or_else(|| {
            DbalError::Fetch("no current row; call fetch before reading columns".to_string())
        })?;
        let offset = numeric::checked_add(numeric::checked_mul(row, self.ncols)?, col)?;
        Ok(&self.cells[offset])
    }
}
