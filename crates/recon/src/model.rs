use chrono::NaiveDate;
use gridseries_engine::CellValue;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One manifest entry: which identifier to look for and where it lands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRequest {
    /// 0-based data-row index in the manifest.
    pub position: usize,
    pub id: String,
    /// Destination table, as written in the manifest (sanitized at merge time).
    pub table: String,
    /// Output column name in the destination table.
    pub series: String,
}

impl SeriesRequest {
    pub fn new(
        position: usize,
        id: impl Into<String>,
        table: impl Into<String>,
        series: impl Into<String>,
    ) -> Self {
        Self {
            position,
            id: id.into(),
            table: table.into(),
            series: series.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// A single extracted point. `date` is `None` when the source token could
/// not be parsed; `value` is a Number or a Text, never Empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub date: Option<NaiveDate>,
    pub value: CellValue,
}

impl Observation {
    pub fn new(date: Option<NaiveDate>, value: CellValue) -> Self {
        Self { date, value }
    }
}

/// Result of a successful locate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatedSeries {
    /// Name of the grid the anchor was found in.
    pub grid: String,
    /// (row, col) of the anchor cell.
    pub anchor: (usize, usize),
    pub observations: Vec<Observation>,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Error,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSeries {
    /// 0-based manifest data-row index, for failure annotation.
    pub position: usize,
    pub id: String,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Set when a cancel request stopped the run before the last request.
    pub interrupted: bool,
    pub failures: Vec<FailedSeries>,
}

impl RunResult {
    pub fn failed_positions(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.position).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Series: {} | Succeeded: {} | Failed: {}",
            self.total, self.succeeded, self.failed
        )
    }
}
