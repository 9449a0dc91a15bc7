use crate::table::SeriesTable;

/// Default destination for series without a usable table name.
pub const DEFAULT_TABLE: &str = "Otros";

/// Longest table name a workbook sheet accepts.
pub const MAX_TABLE_NAME_CHARS: usize = 31;

/// Characters a workbook sheet name may not contain. Each one becomes `_`.
pub const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Sanitize a destination table name so it can be persisted as a sheet:
/// forbidden characters replaced, trimmed of blanks and edge apostrophes,
/// cut to 31 characters, and replaced by `fallback` when nothing usable is
/// left, or for the literal `nan` and the reserved name `History`.
pub fn table_name(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let truncated: String = trim_sheet_edges(&cleaned).chars().take(MAX_TABLE_NAME_CHARS).collect();
    let name = trim_sheet_edges(&truncated);
    if name.is_empty() || name.eq_ignore_ascii_case("nan") || name.eq_ignore_ascii_case("history") {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

fn trim_sheet_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\'')
}

/// Sheet names compare case-insensitively in a workbook.
fn same_sheet(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// All destination tables of a run, in insertion order.
///
/// Names are sanitized on the way in, so every key is a valid sheet name
/// and two spellings that persist to the same sheet share one table. Names
/// differing only in case are the same sheet; the first spelling is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    fallback: String,
    tables: Vec<(String, SeriesTable)>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE)
    }
}

impl Store {
    /// An empty store. `fallback` names the table used for blank names.
    pub fn new(fallback: &str) -> Self {
        Self {
            fallback: table_name(fallback, DEFAULT_TABLE),
            tables: Vec::new(),
        }
    }

    /// The store a run starts from when nothing has been persisted yet: a
    /// single empty fallback table.
    pub fn initial(fallback: &str) -> Self {
        let mut store = Self::new(fallback);
        let name = store.fallback.clone();
        store.tables.push((name, SeriesTable::new()));
        store
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn sanitize(&self, raw: &str) -> String {
        table_name(raw, &self.fallback)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|(n, _)| same_sheet(n, name))
    }

    /// The name a table is (or would be) stored under: the existing
    /// spelling when a case variant is already present.
    pub fn resolve(&self, raw_name: &str) -> String {
        let name = self.sanitize(raw_name);
        match self.position(&name) {
            Some(idx) => self.tables[idx].0.clone(),
            None => name,
        }
    }

    /// Insert or replace a table. Returns the name it was stored under.
    pub fn insert(&mut self, raw_name: &str, table: SeriesTable) -> String {
        let name = self.sanitize(raw_name);
        match self.position(&name) {
            Some(idx) => {
                self.tables[idx].1 = table;
                self.tables[idx].0.clone()
            }
            None => {
                self.tables.push((name.clone(), table));
                name
            }
        }
    }

    pub fn get(&self, raw_name: &str) -> Option<&SeriesTable> {
        let name = self.sanitize(raw_name);
        self.position(&name).map(|idx| &self.tables[idx].1)
    }

    /// The named table, created with only `fecha` if absent.
    pub fn table_mut_or_create(&mut self, raw_name: &str) -> &mut SeriesTable {
        let name = self.sanitize(raw_name);
        let idx = match self.position(&name) {
            Some(idx) => idx,
            None => {
                log::debug!("creating table '{name}'");
                self.tables.push((name, SeriesTable::new()));
                self.tables.len() - 1
            }
        };
        &mut self.tables[idx].1
    }

    pub fn contains(&self, raw_name: &str) -> bool {
        self.get(raw_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SeriesTable)> {
        self.tables.iter().map(|(n, t)| (n.as_str(), t))
    }
}
