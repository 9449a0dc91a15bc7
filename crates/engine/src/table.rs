use chrono::NaiveDate;

use crate::cell::CellValue;
use crate::dates;

/// Name of the mandatory key column of every store table.
pub const DATE_COLUMN: &str = "fecha";

/// One row of a [`SeriesTable`]. `fecha` is `None` for keys that could not
/// be parsed; `values` is aligned with the table's value columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub fecha: Option<NaiveDate>,
    pub values: Vec<CellValue>,
}

/// Sort key for rows: ascending date, unparseable keys last.
pub fn row_order(fecha: Option<NaiveDate>) -> (bool, Option<NaiveDate>) {
    (fecha.is_none(), fecha)
}

/// A store table: the `fecha` key column plus one column per merged series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesTable {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl SeriesTable {
    /// A table holding only the `fecha` column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a table from already-keyed parts. Rows shorter than the
    /// column list are padded with empty cells.
    pub fn from_parts(columns: Vec<String>, rows: Vec<TableRow>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.values.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a table from a loaded sheet: a header row and raw data rows.
    ///
    /// The `fecha` column may sit anywhere in the header; it is pulled out as
    /// the key and its cells are normalized. A sheet without `fecha` is
    /// repaired by keying every row as unparseable.
    pub fn from_records(sheet: &str, header: &[String], records: Vec<Vec<CellValue>>) -> Self {
        let date_idx = header.iter().position(|h| h == DATE_COLUMN);
        if date_idx.is_none() {
            log::warn!("table '{sheet}' has no '{DATE_COLUMN}' column; adding an empty one");
        }

        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != date_idx)
            .map(|(_, h)| h.clone())
            .collect();

        let rows = records
            .into_iter()
            .map(|record| {
                let fecha = date_idx.and_then(|i| record.get(i)).and_then(dates::normalize_cell);
                let values = record
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| Some(*i) != date_idx)
                    .map(|(_, v)| v)
                    .collect();
                TableRow { fecha, values }
            })
            .collect();

        Self::from_parts(columns, rows)
    }

    /// Value columns, in order, excluding `fecha`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Full header as persisted: `fecha` first, then the value columns.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(DATE_COLUMN.to_string())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (`fecha`, `column`), if both exist.
    pub fn value(&self, fecha: Option<NaiveDate>, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row.fecha == fecha)
            .and_then(|row| row.values.get(idx))
    }

    pub fn dates(&self) -> Vec<Option<NaiveDate>> {
        self.rows.iter().map(|row| row.fecha).collect()
    }
}
