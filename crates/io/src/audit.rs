// Append-only audit log: one `timestamp|subject|STATUS[|message]` line per
// run event, in a file per calendar day.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use gridseries_recon::{EventSink, RunEvent};

/// Render one event as a log line, without the trailing newline.
pub fn format_line(event: &RunEvent) -> String {
    let mut line = format!(
        "{}|{}|{}",
        event.timestamp.format("%Y%m%d_%H%M%S"),
        event.subject,
        event.status
    );
    if !event.message.is_empty() {
        line.push('|');
        line.push_str(&event.message.replace('\n', " || "));
    }
    line
}

/// Daily log file for a timestamp: `<dir>/log_YYYYmmdd.txt`.
pub fn log_path(dir: &Path, timestamp: &NaiveDateTime) -> PathBuf {
    dir.join(format!("log_{}.txt", timestamp.format("%Y%m%d")))
}

/// Event sink that appends to the daily log file in `dir`.
///
/// The file is opened per event so that concurrent runs and external
/// readers see complete lines.
pub struct LogFileSink {
    dir: PathBuf,
    failed_writes: usize,
}

impl LogFileSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, String> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create log directory {}: {}", dir.display(), e))?;
        Ok(Self { dir, failed_writes: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Events that could not be written.
    pub fn failed_writes(&self) -> usize {
        self.failed_writes
    }

    fn append(&self, event: &RunEvent) -> std::io::Result<()> {
        let path = log_path(&self.dir, &event.timestamp);
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", format_line(event))
    }
}

impl EventSink for LogFileSink {
    fn emit(&mut self, event: RunEvent) {
        if let Err(e) = self.append(&event) {
            self.failed_writes += 1;
            log::error!("audit log write failed in {}: {}", self.dir.display(), e);
        }
    }
}
