pub mod cell;
pub mod dates;
pub mod grid;
pub mod store;
pub mod table;

pub use cell::CellValue;
pub use dates::{CanonicalDate, DateToken};
pub use grid::SeriesGrid;
pub use store::Store;
pub use table::{SeriesTable, TableRow, DATE_COLUMN};
