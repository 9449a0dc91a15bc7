//! `gridseries locate` and `gridseries normalize` — inspect what a run would
//! see without touching the store.

use std::path::PathBuf;

use gridseries_engine::dates::normalize_text;
use gridseries_io::xlsx;
use gridseries_recon::{locate_any, LocatedSeries, ReconError};

use crate::exit_codes::{EXIT_RUN_LOAD, EXIT_RUN_UNRESOLVED};
use crate::CliError;

pub fn cmd_locate(id: String, sources: Vec<PathBuf>, json: bool) -> Result<(), CliError> {
    let mut grids = Vec::new();
    for path in &sources {
        grids.extend(xlsx::import_grids(path).map_err(|e| CliError::new(EXIT_RUN_LOAD, e))?);
    }

    let located = match locate_any(&id, &grids) {
        Ok(located) => located,
        Err(e @ ReconError::IdentifierNotFound(_)) => {
            return Err(CliError::new(EXIT_RUN_UNRESOLVED, e.to_string())
                .with_hint(format!("searched {} sheets", grids.len())));
        }
        Err(e) => return Err(CliError::general(e.to_string())),
    };

    if json {
        let out = serde_json::to_string_pretty(&located)
            .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
        println!("{out}");
    } else {
        print_located(&located);
    }
    Ok(())
}

fn print_located(located: &LocatedSeries) {
    let (row, col) = located.anchor;
    eprintln!(
        "found in '{}' at row {}, column {} ({} values)",
        located.grid,
        row + 1,
        col + 1,
        located.observations.len()
    );
    for obs in &located.observations {
        let date = obs.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        println!("{date}\t{}", obs.value.match_text());
    }
}

/// Print `token<TAB>date` per token; unparseable tokens get an empty date
/// and make the command exit 3.
pub fn cmd_normalize(tokens: Vec<String>) -> Result<(), CliError> {
    let mut unparsed = 0;
    for token in &tokens {
        match normalize_text(token) {
            Some(date) => println!("{token}\t{}", date.format("%Y-%m-%d")),
            None => {
                unparsed += 1;
                println!("{token}\t");
            }
        }
    }

    if unparsed > 0 {
        return Err(CliError::new(EXIT_RUN_UNRESOLVED, format!("{unparsed} tokens could not be parsed")));
    }
    Ok(())
}
