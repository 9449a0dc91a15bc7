use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gridseries_engine::{SeriesGrid, Store, DATE_COLUMN};

use crate::error::ReconError;
use crate::events::{EventSink, RunEvent, RunStatus};
use crate::locator::locate_any;
use crate::merge::merge;
use crate::model::{FailedSeries, FailureKind, RunResult, SeriesRequest};

/// Shared flag checked between requests. Set it from another thread (or a
/// signal handler) to stop the run.
pub type CancelToken = Arc<AtomicBool>;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cancel: Option<CancelToken>,
}

impl RunOptions {
    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
    }
}

/// Locate every requested series in `grids` and merge it into `store`.
///
/// Requests are handled in order. A request that fails is recorded and the
/// run moves on; nothing a single identifier does aborts the run. Exactly
/// one event is emitted per handled request, after `INICIO`. The closing
/// `FIN` belongs to the caller: see [`finish`].
pub fn run(
    requests: &[SeriesRequest],
    grids: &[SeriesGrid],
    store: &mut Store,
    sink: &mut dyn EventSink,
    options: &RunOptions,
) -> RunResult {
    sink.emit(RunEvent::system(RunStatus::Started, "Extraction started"));
    log::info!("processing {} series against {} grids", requests.len(), grids.len());

    let mut result = RunResult {
        total: requests.len(),
        ..Default::default()
    };

    for request in requests {
        if options.cancelled() {
            log::warn!("run cancelled after {} of {} series", result.succeeded + result.failed, result.total);
            sink.emit(RunEvent::system(RunStatus::Interrupted, "Run stopped on request"));
            result.interrupted = true;
            break;
        }

        match process(request, grids, store) {
            Ok((dest, rows)) => {
                log::info!("'{}' ({}) -> '{dest}': {rows} rows", request.series, request.id);
                sink.emit(RunEvent::series(
                    &request.id,
                    RunStatus::Ok,
                    format!("Rows extracted: {rows}"),
                ));
                result.succeeded += 1;
            }
            Err(err) => {
                let (status, kind) = match err {
                    ReconError::IdentifierNotFound(_) => (RunStatus::NotFound, FailureKind::NotFound),
                    _ => (RunStatus::Error, FailureKind::Error),
                };
                let message = err.to_string();
                log::warn!("{}: {message}", request.id);
                sink.emit(RunEvent::series(&request.id, status, message.clone()));
                result.failed += 1;
                result.failures.push(FailedSeries {
                    position: request.position,
                    id: request.id.clone(),
                    kind,
                    message,
                });
            }
        }
    }

    log::info!("{}", result.summary());
    result
}

/// Emit the run's `FIN` event with its summary.
///
/// Call it once the store (and anything else the run produces) has been
/// persisted. A run whose output could not be written ends with a SISTEMA
/// `ERROR` instead and never reaches `FIN`.
pub fn finish(result: &RunResult, sink: &mut dyn EventSink) {
    sink.emit(RunEvent::system(RunStatus::Finished, result.summary()));
}

/// Locate and merge one request. Returns the table it landed in and the
/// number of extracted rows.
fn process(
    request: &SeriesRequest,
    grids: &[SeriesGrid],
    store: &mut Store,
) -> Result<(String, usize), ReconError> {
    let located = locate_any(&request.id, grids)?;

    let series_name = if request.series.trim().is_empty() {
        request.id.as_str()
    } else {
        request.series.as_str()
    };
    if series_name == DATE_COLUMN {
        return Err(ReconError::ReservedColumn(series_name.to_string()));
    }

    let dest = store.resolve(&request.table);
    log::debug!(
        "'{}' found in '{}' at {:?}",
        request.id,
        located.grid,
        located.anchor
    );

    let table = store.table_mut_or_create(&dest);
    *table = merge(table, &located.observations, series_name);

    Ok((dest, located.observations.len()))
}
