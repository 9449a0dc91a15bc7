use gridseries_engine::dates::{normalize_many, DateToken};
use gridseries_engine::SeriesGrid;

use crate::error::ReconError;
use crate::model::{LocatedSeries, Observation};

/// Find `identifier` in `grid` and extract the value run beneath it.
///
/// The first cell in row-major order whose text form equals the identifier
/// is the anchor. Values are read down the anchor's column, dates from
/// column 0, starting one row below the anchor and stopping at the first
/// empty value cell.
pub fn locate(identifier: &str, grid: &SeriesGrid) -> Option<LocatedSeries> {
    if identifier.is_empty() {
        return None;
    }

    let (anchor_row, col) = grid
        .iter()
        .find(|(_, _, cell)| cell.match_text() == identifier)
        .map(|(r, c, _)| (r, c))?;

    let mut values = Vec::new();
    let mut tokens = Vec::new();
    let mut row = anchor_row + 1;
    while row < grid.rows() {
        let cell = grid.get(row, col);
        if cell.is_empty() {
            break;
        }
        values.push(cell.coerce_numeric());
        tokens.push(DateToken::from_cell(grid.get(row, 0)));
        row += 1;
    }

    let dates = normalize_many(&tokens);
    let unparsed = dates.iter().filter(|d| d.is_none()).count();
    if unparsed > 0 {
        log::warn!(
            "'{identifier}' in '{}': {unparsed} of {} dates could not be parsed",
            grid.name,
            dates.len()
        );
    }

    let observations = dates
        .into_iter()
        .zip(values)
        .map(|(date, value)| Observation::new(date, value))
        .collect();

    Some(LocatedSeries {
        grid: grid.name.clone(),
        anchor: (anchor_row, col),
        observations,
    })
}

/// Try each grid in priority order; the first one containing the identifier
/// wins and later grids are not scanned.
pub fn locate_any<'a>(
    identifier: &str,
    grids: impl IntoIterator<Item = &'a SeriesGrid>,
) -> Result<LocatedSeries, ReconError> {
    grids
        .into_iter()
        .find_map(|grid| locate(identifier, grid))
        .ok_or_else(|| ReconError::IdentifierNotFound(identifier.to_string()))
}
