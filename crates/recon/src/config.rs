use std::path::{Path, PathBuf};

use gridseries_engine::store::{table_name, DEFAULT_TABLE, MAX_TABLE_NAME_CHARS};
use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration, usually `gridseries.toml` next to the workbooks.
///
/// Every path is relative to the config file's directory unless absolute.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    #[serde(default = "default_store")]
    pub store: PathBuf,
    /// Source workbooks, in lookup priority order.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_fallback_table")]
    pub fallback_table: String,
    /// Mark failed manifest rows in red after the run.
    #[serde(default = "default_true")]
    pub annotate_failures: bool,
    #[serde(default)]
    pub manifest_columns: ManifestColumns,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            store: default_store(),
            sources: Vec::new(),
            log_dir: default_log_dir(),
            fallback_table: default_fallback_table(),
            annotate_failures: true,
            manifest_columns: ManifestColumns::default(),
            api: ApiConfig::default(),
        }
    }
}

fn default_manifest() -> PathBuf {
    PathBuf::from("Codigos.xlsx")
}

fn default_store() -> PathBuf {
    PathBuf::from("BD.xlsx")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_fallback_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Manifest columns
// ---------------------------------------------------------------------------

/// Header names of the manifest columns.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ManifestColumns {
    #[serde(default = "default_id_column")]
    pub id: String,
    #[serde(default = "default_table_column")]
    pub table: String,
    #[serde(default = "default_series_column")]
    pub series: String,
}

impl Default for ManifestColumns {
    fn default() -> Self {
        Self {
            id: default_id_column(),
            table: default_table_column(),
            series: default_series_column(),
        }
    }
}

fn default_id_column() -> String {
    "ID".into()
}

fn default_table_column() -> String {
    "Pestaña BD".into()
}

fn default_series_column() -> String {
    "Serie".into()
}

// ---------------------------------------------------------------------------
// Series API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://apis.datos.gob.ar".into()
}

fn default_page_size() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file and resolve its relative paths against the file's
    /// directory. Not validated: callers may still override fields and must
    /// call [`RunConfig::validate`] afterwards.
    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
        let config: RunConfig =
            toml::from_str(&input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolved_against(base))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.sources.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one source workbook is required".into(),
            ));
        }

        let fallback = self.fallback_table.trim();
        if fallback.is_empty() || fallback.chars().count() > MAX_TABLE_NAME_CHARS {
            return Err(ReconError::ConfigValidation(format!(
                "fallback_table must be 1 to {MAX_TABLE_NAME_CHARS} characters, got '{}'",
                self.fallback_table
            )));
        }
        if table_name(fallback, "") != fallback {
            return Err(ReconError::ConfigValidation(format!(
                "fallback_table '{}' is not a usable table name",
                self.fallback_table
            )));
        }

        let cols = &self.manifest_columns;
        if cols.id == cols.table || cols.id == cols.series || cols.table == cols.series {
            return Err(ReconError::ConfigValidation(
                "manifest_columns must name three distinct columns".into(),
            ));
        }

        if self.api.page_size == 0 {
            return Err(ReconError::ConfigValidation("api.page_size must be positive".into()));
        }

        Ok(())
    }

    /// Make every relative path relative to `base`.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let join = |p: &Path| if p.is_absolute() { p.to_path_buf() } else { base.join(p) };
        self.manifest = join(&self.manifest);
        self.store = join(&self.store);
        self.log_dir = join(&self.log_dir);
        self.sources = self.sources.iter().map(|p| join(p)).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
sources = ["actividad_ied.xlsx"]
"#;

    #[test]
    fn parse_minimal_uses_defaults() {
        let config = RunConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.manifest, PathBuf::from("Codigos.xlsx"));
        assert_eq!(config.store, PathBuf::from("BD.xlsx"));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.fallback_table, "Otros");
        assert!(config.annotate_failures);
        assert_eq!(config.manifest_columns, ManifestColumns::default());
        assert_eq!(config.api.base_url, "https://apis.datos.gob.ar");
        assert_eq!(config.api.page_size, 1000);
    }

    #[test]
    fn parse_full() {
        let input = r#"
manifest = "codes.xlsx"
store = "out/db.xlsx"
sources = ["a.xlsx", "b.xlsx"]
log_dir = "audit"
fallback_table = "Misc"
annotate_failures = false

[manifest_columns]
id = "Code"
table = "Sheet"
series = "Name"

[api]
base_url = "http://localhost:8080"
page_size = 50
"#;
        let config = RunConfig::from_toml(input).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.fallback_table, "Misc");
        assert!(!config.annotate_failures);
        assert_eq!(config.manifest_columns.id, "Code");
        assert_eq!(config.api.page_size, 50);
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn reject_no_sources() {
        let err = RunConfig::from_toml("store = \"BD.xlsx\"").unwrap_err();
        assert!(err.to_string().contains("at least one source"));
    }

    #[test]
    fn reject_bad_fallback() {
        let input = r#"
sources = ["a.xlsx"]
fallback_table = "nan"
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("not a usable table name"));

        let input = r#"
sources = ["a.xlsx"]
fallback_table = "this name is much longer than thirty one"
"#;
        assert!(RunConfig::from_toml(input).is_err());
    }

    #[test]
    fn reject_duplicate_manifest_columns() {
        let input = r#"
sources = ["a.xlsx"]
[manifest_columns]
id = "X"
table = "X"
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn reject_unknown_type() {
        let input = r#"
sources = "a.xlsx"
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let config = RunConfig::from_toml(MINIMAL)
            .unwrap()
            .resolved_against(Path::new("/data/run"));
        assert_eq!(config.manifest, PathBuf::from("/data/run/Codigos.xlsx"));
        assert_eq!(config.sources, vec![PathBuf::from("/data/run/actividad_ied.xlsx")]);
        assert_eq!(config.log_dir, PathBuf::from("/data/run/logs"));
    }
}
