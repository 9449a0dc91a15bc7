// Failure marking for the identifier manifest.
//
// The manifest is read back with calamine and rewritten with rust_xlsxwriter:
// values and sheet order survive, original styling does not. Rows listed as
// failed get a red font across the sheet's used width.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, Workbook as XlsxWorkbook};

use crate::xlsx::{import_grids, write_cell, DATE_FORMAT};

/// Font color of failed manifest rows.
pub const FAILURE_COLOR: u32 = 0xFF0000;

/// Rewrite the workbook at `path` with `failed_rows` (0-based, in the first
/// sheet) painted red. Returns how many rows were marked.
pub fn mark_failed_rows(path: &Path, failed_rows: &[usize]) -> Result<usize, String> {
    if failed_rows.is_empty() {
        return Ok(0);
    }

    let grids = import_grids(path)?;

    let red = Format::new().set_font_color(Color::RGB(FAILURE_COLOR));
    let red_date = red.clone().set_num_format(DATE_FORMAT);
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    let mut xlsx_workbook = XlsxWorkbook::new();
    let mut marked = 0;

    for (idx, grid) in grids.iter().enumerate() {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(&grid.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", grid.name, e))?;

        for row in 0..grid.rows() {
            let failed = idx == 0 && failed_rows.contains(&row);
            if failed {
                marked += 1;
            }
            for col in 0..grid.cols() {
                let (format, date_format) = if failed {
                    (Some(&red), &red_date)
                } else {
                    (None, &date_format)
                };
                write_cell(worksheet, row as u32, col as u16, grid.get(row, col), format, date_format)?;
            }
        }
    }

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save {}: {}", path.display(), e))?;

    log::info!("marked {} failed rows in {}", marked, path.display());
    Ok(marked)
}
