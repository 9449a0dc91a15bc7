use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (no sources, bad fallback name, etc.).
    ConfigValidation(String),
    /// Missing required column in the manifest header.
    MissingColumn { sheet: String, column: String },
    /// No cell in any source grid equals the identifier.
    IdentifierNotFound(String),
    /// A series would overwrite the `fecha` key column.
    ReservedColumn(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl ReconError {
    /// Whether this error only affects a single identifier. Everything else
    /// aborts the run.
    pub fn is_per_series(&self) -> bool {
        matches!(self, Self::IdentifierNotFound(_) | Self::ReservedColumn(_))
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { sheet, column } => {
                write!(f, "sheet '{sheet}': missing column '{column}'")
            }
            Self::IdentifierNotFound(id) => write!(f, "ID {id} not found"),
            Self::ReservedColumn(name) => {
                write!(f, "series name '{name}' collides with the date column")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
