// File I/O: Excel grids and store workbook, manifest failure marking, audit log

pub mod annotate;
pub mod audit;
pub mod xlsx;
