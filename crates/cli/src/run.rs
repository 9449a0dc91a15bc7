//! `gridseries run` — the full consolidation pipeline.
//!
//! Load manifest, sources and store; run; save the store; mark failed
//! manifest rows. Every load or save failure is also written to the audit
//! log as a SISTEMA/ERROR line; `FIN` is only written once everything was
//! persisted.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use gridseries_engine::SeriesGrid;
use gridseries_io::audit::LogFileSink;
use gridseries_io::{annotate, xlsx};
use gridseries_recon::{EventSink, Manifest, RunConfig, RunEvent, RunOptions, RunResult, RunStatus};

use crate::exit_codes::{EXIT_RUN_INTERRUPTED, EXIT_RUN_LOAD, EXIT_RUN_PERSIST, EXIT_RUN_UNRESOLVED};
use crate::{interrupt, CliError};

#[derive(Args)]
pub struct RunArgs {
    /// TOML run configuration; relative paths in it resolve against its directory
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Identifier manifest workbook [default: Codigos.xlsx]
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Store workbook, created if missing [default: BD.xlsx]
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Source workbook, in priority order. Repeatable; replaces the config list.
    #[arg(long = "source")]
    pub sources: Vec<PathBuf>,

    /// Directory of the daily audit log [default: logs]
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Table used for blank destination names [default: Otros]
    #[arg(long)]
    pub fallback_table: Option<String>,

    /// Do not mark failed rows in the manifest
    #[arg(long)]
    pub no_annotate: bool,

    /// Output JSON to stdout instead of human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct RunReport<'a> {
    store: String,
    tables: Vec<&'a str>,
    #[serde(flatten)]
    result: &'a RunResult,
}

/// Build the effective config: file (if any), then flags on top.
pub fn resolve_config(args: &RunArgs) -> Result<RunConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path).map_err(|e| CliError::args(e.to_string()))?,
        None => RunConfig::default(),
    };

    if let Some(manifest) = &args.manifest {
        config.manifest = manifest.clone();
    }
    if let Some(store) = &args.store {
        config.store = store.clone();
    }
    if !args.sources.is_empty() {
        config.sources = args.sources.clone();
    }
    if let Some(log_dir) = &args.log_dir {
        config.log_dir = log_dir.clone();
    }
    if let Some(fallback) = &args.fallback_table {
        config.fallback_table = fallback.clone();
    }
    if args.no_annotate {
        config.annotate_failures = false;
    }

    if let Err(e) = config.validate() {
        let err = CliError::args(e.to_string());
        return Err(if config.sources.is_empty() {
            err.with_hint("pass --source or set `sources` in the config file")
        } else {
            err
        });
    }
    Ok(config)
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = resolve_config(&args)?;

    let mut sink = LogFileSink::new(&config.log_dir).map_err(|e| CliError::new(EXIT_RUN_PERSIST, e))?;

    // ── Load ──────────────────────────────────────────────────────────
    let manifest = load_manifest(&config).map_err(|e| system_failure(&mut sink, EXIT_RUN_LOAD, e))?;
    let grids = load_sources(&config.sources).map_err(|e| system_failure(&mut sink, EXIT_RUN_LOAD, e))?;
    let mut store = xlsx::load_store(&config.store, &config.fallback_table)
        .map_err(|e| system_failure(&mut sink, EXIT_RUN_LOAD, e))?;

    // ── Run ───────────────────────────────────────────────────────────
    let options = RunOptions { cancel: Some(interrupt::install()) };
    let result = gridseries_recon::run(&manifest.requests, &grids, &mut store, &mut sink, &options);

    // ── Persist ───────────────────────────────────────────────────────
    xlsx::save_store(&store, &config.store).map_err(|e| system_failure(&mut sink, EXIT_RUN_PERSIST, e))?;

    if config.annotate_failures && !result.failures.is_empty() {
        let rows: Vec<usize> = result
            .failed_positions()
            .into_iter()
            .map(|p| manifest.sheet_row(p))
            .collect();
        annotate::mark_failed_rows(&config.manifest, &rows)
            .map_err(|e| system_failure(&mut sink, EXIT_RUN_PERSIST, e))?;
    }
    gridseries_recon::finish(&result, &mut sink);

    // ── Report ────────────────────────────────────────────────────────
    if args.json {
        let report = RunReport {
            store: config.store.display().to_string(),
            tables: store.table_names(),
            result: &result,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
        println!("{json}");
    } else {
        print_summary(&result, &config.store);
    }

    if sink.failed_writes() > 0 {
        eprintln!("warning: {} audit log lines could not be written", sink.failed_writes());
    }

    if result.interrupted {
        Err(CliError::new(EXIT_RUN_INTERRUPTED, "run interrupted; completed series were saved"))
    } else if result.failed > 0 {
        Err(CliError::silent(EXIT_RUN_UNRESOLVED))
    } else {
        Ok(())
    }
}

fn load_manifest(config: &RunConfig) -> Result<Manifest, String> {
    let grid = xlsx::import_first_grid(&config.manifest)?;
    Manifest::from_grid(&grid, &config.manifest_columns)
        .map_err(|e| format!("{}: {}", config.manifest.display(), e))
}

fn load_sources(paths: &[PathBuf]) -> Result<Vec<SeriesGrid>, String> {
    let mut grids = Vec::new();
    for path in paths {
        grids.extend(xlsx::import_grids(path)?);
    }
    Ok(grids)
}

/// Record a fatal load/save error in the audit log and turn it into a CLI error.
pub(crate) fn system_failure(sink: &mut dyn EventSink, code: u8, message: String) -> CliError {
    sink.emit(RunEvent::system(RunStatus::Error, message.clone()));
    CliError::new(code, message)
}

fn print_summary(result: &RunResult, store: &Path) {
    for failure in &result.failures {
        eprintln!("  {:<10} {}  {}", failure.kind.to_string(), failure.id, failure.message);
    }
    println!("{}", result.summary());
    println!("store: {}", store.display());
    if result.failed > 0 {
        eprintln!("{} series unresolved", result.failed);
    }
}
