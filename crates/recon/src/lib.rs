//! `gridseries-recon` — locate series in spreadsheet grids and merge them
//! into a date-keyed store.
//!
//! Pure engine crate: receives pre-loaded grids and a store, returns the
//! run outcome and reports through an injected event sink. No CLI or IO
//! dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod locator;
pub mod manifest;
pub mod merge;
pub mod model;

pub use config::RunConfig;
pub use engine::{finish, run, CancelToken, RunOptions};
pub use error::ReconError;
pub use events::{EventCollector, EventSink, RunEvent, RunStatus, Subject};
pub use locator::{locate, locate_any};
pub use manifest::Manifest;
pub use merge::merge;
pub use model::{FailedSeries, FailureKind, LocatedSeries, Observation, RunResult, SeriesRequest};
