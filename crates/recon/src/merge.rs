use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use gridseries_engine::table::{row_order, TableRow};
use gridseries_engine::{CellValue, SeriesTable};

use crate::model::Observation;

/// Upsert one series into a table.
///
/// Rows are joined on `fecha`: dates only in the table keep their values,
/// dates only in `observations` get a new row with every other column
/// empty, and on collision the new value replaces the old one in
/// `series_name` while every other column is left untouched. The result is
/// sorted by date with at most one row per date.
///
/// Pure: the input table is not modified, and merging the same observations
/// into the result again yields an equal table.
pub fn merge(table: &SeriesTable, observations: &[Observation], series_name: &str) -> SeriesTable {
    let mut columns = table.columns().to_vec();
    let target = match columns.iter().position(|c| c == series_name) {
        Some(idx) => idx,
        None => {
            columns.push(series_name.to_string());
            columns.len() - 1
        }
    };
    let width = columns.len();

    let mut rows: BTreeMap<(bool, Option<NaiveDate>), Vec<CellValue>> = BTreeMap::new();
    let mut dropped = 0usize;
    for row in table.rows() {
        match rows.entry(row_order(row.fecha)) {
            Entry::Vacant(slot) => {
                let mut values = row.values.clone();
                values.resize(width, CellValue::Empty);
                slot.insert(values);
            }
            Entry::Occupied(_) => dropped += 1,
        }
    }
    if dropped > 0 {
        log::warn!("dropped {dropped} duplicate-date rows while merging '{series_name}'");
    }

    let mut written = HashSet::new();
    for obs in observations {
        let key = row_order(obs.date);
        if !written.insert(key) {
            log::debug!("'{series_name}': repeated date {:?}; keeping the first value", obs.date);
            continue;
        }
        let values = rows.entry(key).or_insert_with(|| vec![CellValue::Empty; width]);
        values[target] = obs.value.clone();
    }

    let rows = rows
        .into_iter()
        .map(|((_, fecha), values)| TableRow { fecha, values })
        .collect();

    SeriesTable::from_parts(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn obs(date: Option<NaiveDate>, v: f64) -> Observation {
        Observation::new(date, CellValue::Number(v))
    }

    fn two_series_table() -> SeriesTable {
        SeriesTable::from_parts(
            vec!["IPC".into(), "EMAE".into()],
            vec![
                TableRow { fecha: ymd(2023, 12, 31), values: vec![CellValue::Number(1.0), CellValue::Number(100.0)] },
                TableRow { fecha: ymd(2022, 12, 31), values: vec![CellValue::Number(0.5), CellValue::Number(90.0)] },
            ],
        )
    }

    #[test]
    fn test_merge_into_empty_table() {
        let merged = merge(
            &SeriesTable::new(),
            &[obs(ymd(2024, 12, 31), 11.2), obs(ymd(2023, 12, 31), 10.5)],
            "IPC",
        );
        assert_eq!(merged.header(), vec!["fecha", "IPC"]);
        assert_eq!(merged.dates(), vec![ymd(2023, 12, 31), ymd(2024, 12, 31)]);
        assert_eq!(merged.value(ymd(2024, 12, 31), "IPC"), Some(&CellValue::Number(11.2)));
    }

    #[test]
    fn test_new_value_overwrites_existing() {
        let merged = merge(&two_series_table(), &[obs(ymd(2023, 12, 31), 9.9)], "IPC");
        assert_eq!(merged.value(ymd(2023, 12, 31), "IPC"), Some(&CellValue::Number(9.9)));
        // other column on the same date untouched
        assert_eq!(merged.value(ymd(2023, 12, 31), "EMAE"), Some(&CellValue::Number(100.0)));
        // date only in the table untouched
        assert_eq!(merged.value(ymd(2022, 12, 31), "IPC"), Some(&CellValue::Number(0.5)));
    }

    #[test]
    fn test_new_dates_get_empty_other_columns() {
        let merged = merge(&two_series_table(), &[obs(ymd(2024, 12, 31), 2.0)], "IPC");
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.value(ymd(2024, 12, 31), "EMAE"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_column_set_grows_by_at_most_one() {
        let merged = merge(&two_series_table(), &[obs(ymd(2024, 12, 31), 2.0)], "PBI");
        assert_eq!(merged.header(), vec!["fecha", "IPC", "EMAE", "PBI"]);
        assert_eq!(merged.value(ymd(2022, 12, 31), "PBI"), Some(&CellValue::Empty));

        let merged = merge(&two_series_table(), &[obs(ymd(2024, 12, 31), 2.0)], "IPC");
        assert_eq!(merged.header(), vec!["fecha", "IPC", "EMAE"]);
    }

    #[test]
    fn test_no_suffix_columns_survive() {
        let merged = merge(&two_series_table(), &[obs(ymd(2023, 12, 31), 3.0)], "IPC");
        assert!(merged
            .columns()
            .iter()
            .all(|c| !c.ends_with("_nuevo") && !c.ends_with("_existente")));
    }

    #[test]
    fn test_sorted_and_one_row_per_date() {
        let table = SeriesTable::from_parts(
            vec!["IPC".into()],
            vec![
                TableRow { fecha: None, values: vec![CellValue::Number(7.0)] },
                TableRow { fecha: ymd(2024, 1, 31), values: vec![CellValue::Number(1.0)] },
                TableRow { fecha: ymd(2024, 1, 31), values: vec![CellValue::Number(2.0)] },
                TableRow { fecha: ymd(2023, 1, 31), values: vec![CellValue::Number(3.0)] },
            ],
        );
        let merged = merge(&table, &[obs(ymd(2023, 6, 30), 4.0)], "IPC");
        assert_eq!(
            merged.dates(),
            vec![ymd(2023, 1, 31), ymd(2023, 6, 30), ymd(2024, 1, 31), None]
        );
        // first existing occurrence of a duplicated date is kept
        assert_eq!(merged.value(ymd(2024, 1, 31), "IPC"), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_repeated_dates_in_batch_keep_first() {
        let merged = merge(
            &SeriesTable::new(),
            &[obs(ymd(2024, 12, 31), 1.0), obs(ymd(2024, 12, 31), 2.0)],
            "X",
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.value(ymd(2024, 12, 31), "X"), Some(&CellValue::Number(1.0)));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let observations = [obs(ymd(2023, 12, 31), 9.0), obs(ymd(2025, 12, 31), 1.0), obs(None, 5.0)];
        let once = merge(&two_series_table(), &observations, "IPC");
        let twice = merge(&once, &observations, "IPC");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_input_table_is_not_modified() {
        let table = two_series_table();
        let before = table.clone();
        let _ = merge(&table, &[obs(ymd(2030, 12, 31), 1.0)], "NEW");
        assert_eq!(table, before);
    }
}
