use crate::cell::CellValue;

static EMPTY: CellValue = CellValue::Empty;

/// A loaded source sheet: a dense, headerless, rectangular block of cells
/// addressed from A1 as (row, col). Column 0 is the date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGrid {
    pub name: String,
    cells: Vec<CellValue>,
    rows: usize,
    cols: usize,
}

impl SeriesGrid {
    pub fn new(name: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self {
            name: name.into(),
            cells: vec![CellValue::Empty; rows * cols],
            rows,
            cols,
        }
    }

    /// Build a grid from ragged rows; short rows are padded with empty cells.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Self::new(name, rows.len(), cols);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                grid.cells[r * cols + c] = value;
            }
        }
        grid
    }

    /// Convenience for tests and fixtures: every string goes through
    /// [`CellValue::from_input`].
    pub fn from_strings(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|s| CellValue::from_input(s)).collect())
            .collect();
        Self::from_rows(name, rows)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Out-of-range reads are empty cells.
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        if row < self.rows && col < self.cols {
            &self.cells[row * self.cols + col]
        } else {
            &EMPTY
        }
    }

    /// Write a cell, growing the grid if needed.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if row >= self.rows || col >= self.cols {
            self.resize((row + 1).max(self.rows), (col + 1).max(self.cols));
        }
        self.cells[row * self.cols + col] = value;
    }

    fn resize(&mut self, rows: usize, cols: usize) {
        let mut cells = vec![CellValue::Empty; rows * cols];
        for r in 0..self.rows {
            for c in 0..self.cols {
                cells[r * cols + c] = std::mem::take(&mut self.cells[r * self.cols + c]);
            }
        }
        self.cells = cells;
        self.rows = rows;
        self.cols = cols;
    }

    /// All cells in row-major order with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &CellValue)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i / cols, i % cols, cell))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}
