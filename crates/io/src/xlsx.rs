// Excel workbook import (xlsx, xls, xlsb, ods) and store export (xlsx only)
//
// Import: every sheet becomes a headerless SeriesGrid addressed from A1.
// Store: one sheet per table, `fecha` first, written as date-formatted serials.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use gridseries_engine::dates::{date_to_serial, normalize_text, serial_to_date};
use gridseries_engine::{CellValue, SeriesGrid, SeriesTable, Store, DATE_COLUMN};

/// Number format used for every date written to a workbook.
pub const DATE_FORMAT: &str = "yyyy-mm-dd";

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Load every sheet of a workbook as a grid, in workbook order.
pub fn import_grids(path: &Path) -> Result<Vec<SeriesGrid>, String> {
    let mut workbook = open(path)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    if sheet_names.is_empty() {
        return Err(format!("{} contains no sheets", path.display()));
    }

    let mut grids = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;
        let grid = grid_from_range(sheet_name, &range);
        log::debug!("sheet '{}': {}x{}", sheet_name, grid.rows(), grid.cols());
        grids.push(grid);
    }

    log::info!("loaded {} sheets from {}", grids.len(), path.display());
    Ok(grids)
}

/// Load only the first sheet of a workbook.
pub fn import_first_grid(path: &Path) -> Result<SeriesGrid, String> {
    let mut workbook = open(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| format!("{} contains no sheets", path.display()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;
    Ok(grid_from_range(&sheet_name, &range))
}

fn open(path: &Path) -> Result<Sheets<std::io::BufReader<std::fs::File>>, String> {
    open_workbook_auto(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))
}

/// Copy a calamine range into a grid. Ranges may not start at A1; the
/// offset is kept so coordinates stay absolute.
fn grid_from_range(name: &str, range: &Range<Data>) -> SeriesGrid {
    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return SeriesGrid::new(name, 0, 0);
    }

    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let (start_row, start_col) = (start_row as usize, start_col as usize);

    let mut rows = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col];
        cells.extend(row.iter().map(cell_from_data));
        rows.push(cells);
    }
    SeriesGrid::from_rows(name, rows)
}

/// Map one calamine cell onto the engine's cell union.
pub fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            if s.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        // Error cells carry no usable value and end a value run.
        Data::Error(_) => CellValue::Empty,
        Data::DateTime(dt) => {
            // 1900 date system assumed, same as the serial helpers.
            let serial = dt.as_f64();
            match serial_to_date(serial) {
                Some(date) => CellValue::Date(date),
                None => CellValue::Number(serial),
            }
        }
        Data::DateTimeIso(s) => match normalize_text(s) {
            Some(date) => CellValue::Date(date),
            None => CellValue::Text(s.clone()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Load the store workbook.
///
/// A missing file is not an error: the run starts from a store holding only
/// the fallback table. Every sheet is a table whose first row is the header;
/// a sheet without `fecha` is keyed as unparseable (see
/// [`SeriesTable::from_records`]).
pub fn load_store(path: &Path, fallback: &str) -> Result<Store, String> {
    if !path.exists() {
        log::info!("{} not found; starting with an empty '{}' table", path.display(), fallback);
        return Ok(Store::initial(fallback));
    }

    let grids = import_grids(path)?;
    let mut store = Store::new(fallback);
    for grid in &grids {
        let stored_as = store.insert(&grid.name, table_from_grid(grid));
        if stored_as != grid.name {
            log::warn!("store sheet '{}' loaded as '{}'", grid.name, stored_as);
        }
    }
    Ok(store)
}

fn table_from_grid(grid: &SeriesGrid) -> SeriesTable {
    if grid.rows() == 0 {
        return SeriesTable::new();
    }

    let header: Vec<String> = (0..grid.cols())
        .map(|c| grid.get(0, c).match_text().trim().to_string())
        .collect();
    let records = (1..grid.rows())
        .map(|r| (0..grid.cols()).map(|c| grid.get(r, c).clone()).collect::<Vec<_>>())
        .filter(|record| !record.iter().all(CellValue::is_empty))
        .collect();

    SeriesTable::from_records(&grid.name, &header, records)
}

/// Write the whole store, one sheet per table in store order.
pub fn save_store(store: &Store, path: &Path) -> Result<(), String> {
    let mut xlsx_workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    let fallback_only;
    let store = if store.is_empty() {
        fallback_only = Store::initial(store.fallback());
        &fallback_only
    } else {
        store
    };

    for (name, table) in store.iter() {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))?;

        for (col, title) in table.header().iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, title, &header_format)
                .map_err(|e| format!("Failed to write header '{}': {}", title, e))?;
        }

        for (i, row) in table.rows().iter().enumerate() {
            let row32 = (i + 1) as u32;
            if let Some(fecha) = row.fecha {
                worksheet
                    .write_number_with_format(row32, 0, date_to_serial(fecha), &date_format)
                    .map_err(|e| format!("Failed to write {} in '{}': {}", DATE_COLUMN, name, e))?;
            }
            for (j, value) in row.values.iter().enumerate() {
                write_cell(worksheet, row32, (j + 1) as u16, value, None, &date_format)?;
            }
        }

        worksheet
            .set_column_width(0, 12)
            .map_err(|e| format!("Failed to size column: {}", e))?;
    }

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;

    log::info!("saved {} tables to {}", store.len(), path.display());
    Ok(())
}

/// Write one typed cell. `format` applies to every kind, and is the only
/// reason an empty cell gets written at all.
pub(crate) fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: Option<&Format>,
    date_format: &Format,
) -> Result<(), String> {
    let plain = Format::new();
    let result = match (value, format) {
        (CellValue::Empty, None) => return Ok(()),
        (CellValue::Empty, Some(format)) => worksheet.write_blank(row, col, format),
        (CellValue::Number(n), format) => {
            worksheet.write_number_with_format(row, col, *n, format.unwrap_or(&plain))
        }
        (CellValue::Text(s), format) => {
            worksheet.write_string_with_format(row, col, s, format.unwrap_or(&plain))
        }
        (CellValue::Date(d), _) => {
            worksheet.write_number_with_format(row, col, date_to_serial(*d), date_format)
        }
    };
    result
        .map(|_| ())
        .map_err(|e| format!("Failed to write cell ({}, {}): {}", row, col, e))
}
