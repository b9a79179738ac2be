//! Cell selection on the 4x4 field.
//!
//! A selection is the union of toggled rows, toggled columns and toggled
//! single cells, so toggling a row off never drops a cell that was picked
//! on its own.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{GRID_CELLS, GRID_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("cell {0} is outside the 4x4 field")]
    Cell(usize),
    #[error("row {0} is outside the field")]
    Row(usize),
    #[error("column {0} is outside the field")]
    Column(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    rows: BTreeSet<usize>,
    cols: BTreeSet<usize>,
    cells: BTreeSet<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: impl IntoIterator<Item = usize>) -> Result<Self, SelectionError> {
        let mut selection = Self::new();
        for index in cells {
            check_cell(index)?;
            selection.cells.insert(index);
        }
        Ok(selection)
    }

    pub fn all() -> Self {
        let mut selection = Self::new();
        selection.select_all();
        selection
    }

    pub fn toggle_cell(&mut self, index: usize) -> Result<(), SelectionError> {
        check_cell(index)?;
        toggle(&mut self.cells, index);
        Ok(())
    }

    pub fn toggle_row(&mut self, row: usize) -> Result<(), SelectionError> {
        if row >= GRID_WIDTH {
            return Err(SelectionError::Row(row));
        }
        toggle(&mut self.rows, row);
        Ok(())
    }

    pub fn toggle_col(&mut self, col: usize) -> Result<(), SelectionError> {
        if col >= GRID_WIDTH {
            return Err(SelectionError::Column(col));
        }
        toggle(&mut self.cols, col);
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.rows = (0..GRID_WIDTH).collect();
        self.cols.clear();
        self.cells.clear();
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.cols.clear();
        self.cells.clear();
    }

    /// Selected cell indices in ascending order.
    pub fn indices(&self) -> BTreeSet<usize> {
        let mut out = self.cells.clone();
        for &row in &self.rows {
            out.extend((0..GRID_WIDTH).map(|col| row * GRID_WIDTH + col));
        }
        for &col in &self.cols {
            out.extend((0..GRID_WIDTH).map(|row| row * GRID_WIDTH + col));
        }
        out
    }

    pub fn contains(&self, index: usize) -> bool {
        self.cells.contains(&index)
            || self.rows.contains(&(index / GRID_WIDTH))
            || self.cols.contains(&(index % GRID_WIDTH))
    }

    pub fn len(&self) -> usize {
        self.indices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.cols.is_empty() && self.cells.is_empty()
    }
}

fn check_cell(index: usize) -> Result<(), SelectionError> {
    if index >= GRID_CELLS {
        Err(SelectionError::Cell(index))
    } else {
        Ok(())
    }
}

fn toggle(set: &mut BTreeSet<usize>, value: usize) {
    if !set.remove(&value) {
        set.insert(value);
    }
}
