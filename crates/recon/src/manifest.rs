use gridseries_engine::SeriesGrid;

use crate::config::ManifestColumns;
use crate::error::ReconError;
use crate::model::SeriesRequest;

/// The parsed identifier manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// 0-based grid row holding the column headers.
    pub header_row: usize,
    pub requests: Vec<SeriesRequest>,
}

impl Manifest {
    /// Parse a manifest sheet.
    ///
    /// The header row is the first row containing the ID column header.
    /// Rows whose ID cell is empty are skipped but keep their position, so
    /// positions always map back to sheet rows. A blank destination table is
    /// left blank here and resolved by the store at merge time.
    pub fn from_grid(grid: &SeriesGrid, columns: &ManifestColumns) -> Result<Self, ReconError> {
        let missing = |column: &str| ReconError::MissingColumn {
            sheet: grid.name.clone(),
            column: column.to_string(),
        };

        let header_row = (0..grid.rows())
            .find(|&r| find_column(grid, r, &columns.id).is_some())
            .ok_or_else(|| missing(&columns.id))?;
        let id_col = find_column(grid, header_row, &columns.id).ok_or_else(|| missing(&columns.id))?;
        let table_col =
            find_column(grid, header_row, &columns.table).ok_or_else(|| missing(&columns.table))?;
        let series_col =
            find_column(grid, header_row, &columns.series).ok_or_else(|| missing(&columns.series))?;

        let mut requests = Vec::new();
        let mut skipped = 0usize;
        for row in header_row + 1..grid.rows() {
            let position = row - header_row - 1;
            let id = grid.get(row, id_col);
            if id.is_empty() {
                skipped += 1;
                continue;
            }
            requests.push(SeriesRequest::new(
                position,
                id.match_text(),
                grid.get(row, table_col).match_text(),
                grid.get(row, series_col).match_text().trim(),
            ));
        }
        if skipped > 0 {
            log::debug!("manifest '{}': skipped {skipped} rows without an ID", grid.name);
        }
        log::info!("manifest '{}': {} series requested", grid.name, requests.len());

        Ok(Self { header_row, requests })
    }

    /// 0-based sheet row of a request position.
    pub fn sheet_row(&self, position: usize) -> usize {
        self.header_row + 1 + position
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

fn find_column(grid: &SeriesGrid, row: usize, name: &str) -> Option<usize> {
    (0..grid.cols()).find(|&c| grid.get(row, c).match_text().trim() == name)
}
