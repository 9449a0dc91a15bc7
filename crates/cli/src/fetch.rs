//! `gridseries fetch` — download one series from the series API and merge it
//! into the store.
//!
//! The API serves CSV pages of at most `limit` rows:
//!
//! ```text
//! GET {base}/series/api/series?ids=<id>&format=csv&limit=1000[&start=N]
//!
//! indice_tiempo,<value column>
//! 2024-01-01,101.5
//! ```
//!
//! Paging continues while a page comes back full. A failed first page is an
//! error; a failed later page ends the download with what was collected.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use serde::Serialize;
use url::Url;

use gridseries_engine::dates::normalize_text;
use gridseries_engine::{CellValue, DATE_COLUMN};
use gridseries_io::audit::LogFileSink;
use gridseries_io::xlsx;
use gridseries_recon::{merge, EventSink, Observation, RunConfig, RunEvent, RunStatus};

use crate::exit_codes::{
    self, EXIT_FETCH_NOT_FOUND, EXIT_FETCH_PAYLOAD, EXIT_FETCH_UPSTREAM, EXIT_RUN_LOAD,
    EXIT_RUN_PERSIST,
};
use crate::run::system_failure;
use crate::CliError;

const USER_AGENT: &str = concat!("gridseries/", env!("CARGO_PKG_VERSION"));
const API_PATH: &str = "series/api/series";
const TIME_COLUMN: &str = "indice_tiempo";

#[derive(Args)]
pub struct FetchArgs {
    /// Series identifier on the API
    pub id: String,

    /// Output column name [default: the identifier]
    #[arg(long)]
    pub series: Option<String>,

    /// Destination table [default: the fallback table]
    #[arg(long)]
    pub table: Option<String>,

    /// Store workbook, created if missing [default: from config, else BD.xlsx]
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// TOML run configuration (only `store`, `log_dir`, `fallback_table` and `[api]` are used)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// API base URL
    #[arg(long, env = "GRIDSERIES_API_BASE")]
    pub base_url: Option<String>,

    /// Table used for a blank destination name [default: Otros]
    #[arg(long)]
    pub fallback_table: Option<String>,

    /// Output JSON to stdout instead of human summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct FetchReport<'a> {
    id: &'a str,
    table: &'a str,
    series: &'a str,
    pages: usize,
    observations: usize,
    store: String,
}

// ── Client ──────────────────────────────────────────────────────────

/// Outcome of a paged download.
#[derive(Debug)]
pub struct FetchedSeries {
    pub observations: Vec<Observation>,
    pub pages: usize,
}

pub struct SeriesApiClient {
    http: reqwest::blocking::Client,
    base: Url,
    page_size: usize,
}

impl SeriesApiClient {
    pub fn with_base_url(base_url: &str, page_size: usize, timeout_secs: u64) -> Result<Self, CliError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| CliError::args(format!("invalid API base URL '{base_url}': {e}")))?;
        // Url::join drops the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CliError::general(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base, page_size: page_size.max(1) })
    }

    fn page_url(&self, id: &str, start: usize) -> Result<Url, CliError> {
        let mut url = self
            .base
            .join(API_PATH)
            .map_err(|e| CliError::args(format!("invalid API base URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("ids", id);
            query.append_pair("format", "csv");
            query.append_pair("limit", &self.page_size.to_string());
            if start > 0 {
                query.append_pair("start", &start.to_string());
            }
        }
        Ok(url)
    }

    /// Download every page of `id`.
    pub fn fetch_series(&self, id: &str) -> Result<FetchedSeries, CliError> {
        let mut observations = Vec::new();
        let mut pages = 0;
        let mut start = 0;

        loop {
            let url = self.page_url(id, start)?;
            log::debug!("GET {url}");

            let resp = self.http.get(url).send().map_err(|e| {
                CliError::new(EXIT_FETCH_UPSTREAM, format!("series API request failed: {e}"))
            })?;

            let status = resp.status().as_u16();
            if !resp.status().is_success() {
                if pages == 0 {
                    return Err(CliError::new(
                        exit_codes::fetch_status_exit_code(status),
                        format!("series API error ({status}) for '{id}'"),
                    ));
                }
                log::warn!("series API returned {status} at start={start}; keeping {pages} pages");
                break;
            }

            let body = resp.text().map_err(|e| {
                CliError::new(EXIT_FETCH_UPSTREAM, format!("failed to read series API response: {e}"))
            })?;
            let (rows, page) = parse_page(&body)?;

            if rows == 0 {
                if pages == 0 {
                    return Err(CliError::new(
                        EXIT_FETCH_NOT_FOUND,
                        format!("series API returned no data for '{id}'"),
                    ));
                }
                break;
            }

            pages += 1;
            observations.extend(page);
            if rows < self.page_size {
                break;
            }
            start += rows;
        }

        Ok(FetchedSeries { observations, pages })
    }
}

/// Parse one CSV page. Returns the number of data rows (blank values
/// included, they count towards a full page) and the observations.
pub fn parse_page(body: &str) -> Result<(usize, Vec<Observation>), CliError> {
    if body.trim().is_empty() {
        return Ok((0, Vec::new()));
    }

    let payload_err = |msg: String| CliError::new(EXIT_FETCH_PAYLOAD, msg);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| payload_err(format!("unreadable CSV header: {e}")))?
        .clone();

    let time_idx = headers
        .iter()
        .position(|h| h.trim() == TIME_COLUMN)
        .ok_or_else(|| payload_err(format!("response has no '{TIME_COLUMN}' column")))?;
    let value_idx = (0..headers.len())
        .find(|&i| i != time_idx)
        .ok_or_else(|| payload_err("response has no value column".into()))?;

    let mut rows = 0;
    let mut observations = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| payload_err(format!("malformed CSV row: {e}")))?;
        rows += 1;

        let value = CellValue::from_input(record.get(value_idx).unwrap_or(""));
        if value.is_empty() {
            continue;
        }
        let date = normalize_text(record.get(time_idx).unwrap_or(""));
        observations.push(Observation::new(date, value));
    }

    Ok((rows, observations))
}

// ── Command ─────────────────────────────────────────────────────────

/// Column the fetched values land in: `--series` when it has text, else the id.
fn series_column(explicit: Option<&str>, id: &str) -> String {
    match explicit.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => id.trim().to_string(),
    }
}

pub fn cmd_fetch(args: FetchArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path).map_err(|e| CliError::args(e.to_string()))?,
        None => RunConfig::default(),
    };
    if let Some(store) = &args.store {
        config.store = store.clone();
    }
    if let Some(base) = &args.base_url {
        config.api.base_url = base.clone();
    }
    if let Some(fallback) = &args.fallback_table {
        config.fallback_table = fallback.clone();
    }

    let series = series_column(args.series.as_deref(), &args.id);
    if series == DATE_COLUMN {
        return Err(CliError::args(format!("'{DATE_COLUMN}' is reserved for the date column"))
            .with_hint("pass --series with another column name"));
    }

    let mut sink = LogFileSink::new(&config.log_dir).map_err(|e| CliError::new(EXIT_RUN_PERSIST, e))?;

    let client = SeriesApiClient::with_base_url(
        &config.api.base_url,
        config.api.page_size,
        config.api.timeout_secs,
    )?;
    let fetched = match client.fetch_series(&args.id) {
        Ok(fetched) => fetched,
        Err(e) => {
            let status = if e.code == EXIT_FETCH_NOT_FOUND {
                RunStatus::NotFound
            } else {
                RunStatus::Error
            };
            sink.emit(RunEvent::series(&args.id, status, e.message.clone()));
            return Err(e);
        }
    };

    let mut store = xlsx::load_store(&config.store, &config.fallback_table)
        .map_err(|e| system_failure(&mut sink, EXIT_RUN_LOAD, e))?;
    let table_name = store.resolve(args.table.as_deref().unwrap_or(""));
    let table = store.table_mut_or_create(&table_name);
    *table = merge(table, &fetched.observations, &series);
    xlsx::save_store(&store, &config.store).map_err(|e| system_failure(&mut sink, EXIT_RUN_PERSIST, e))?;

    sink.emit(RunEvent::series(
        &args.id,
        RunStatus::Ok,
        format!("Rows extracted: {}", fetched.observations.len()),
    ));

    if args.json {
        let report = FetchReport {
            id: &args.id,
            table: &table_name,
            series: &series,
            pages: fetched.pages,
            observations: fetched.observations.len(),
            store: config.store.display().to_string(),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
        println!("{json}");
    } else {
        println!(
            "{}: {} observations in {} pages -> {} / {}",
            args.id,
            fetched.observations.len(),
            fetched.pages,
            table_name,
            series
        );
        println!("store: {}", config.store.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use httpmock::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, day)
    }

    #[test]
    fn test_parse_page_uses_first_value_column() {
        let body = "indice_tiempo,pbi_real\n2023-01-01,100.5\n2023-04-01,\n2023-07-01,102\n";
        let (rows, obs) = parse_page(body).unwrap();
        assert_eq!(rows, 3);
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0], Observation::new(d(2023, 1, 1), CellValue::Number(100.5)));
        assert_eq!(obs[1], Observation::new(d(2023, 7, 1), CellValue::Number(102.0)));
    }

    #[test]
    fn test_parse_page_value_column_before_time() {
        let body = "valor,indice_tiempo\n7,2024-01-01\n";
        let (_, obs) = parse_page(body).unwrap();
        assert_eq!(obs, vec![Observation::new(d(2024, 1, 1), CellValue::Number(7.0))]);
    }

    #[test]
    fn test_parse_page_missing_time_column() {
        let err = parse_page("fecha,valor\n2024-01-01,1\n").unwrap_err();
        assert_eq!(err.code, EXIT_FETCH_PAYLOAD);
        assert!(err.message.contains("indice_tiempo"), "message: {}", err.message);
    }

    #[test]
    fn test_parse_page_empty_body() {
        assert_eq!(parse_page("").unwrap().0, 0);
        assert_eq!(parse_page("indice_tiempo,v\n").unwrap().0, 0);
    }

    #[test]
    fn test_pagination_two_pages() {
        let server = MockServer::start();

        let page1 = server.mock(|when, then| {
            when.method(GET)
                .path("/series/api/series")
                .query_param("ids", "143.3_NO_PR_2004_A_21")
                .query_param("format", "csv")
                .query_param("limit", "2")
                .query_param_missing("start");
            then.status(200)
                .header("content-type", "text/csv")
                .body("indice_tiempo,pbi\n2020-01-01,1\n2021-01-01,2\n");
        });
        let page2 = server.mock(|when, then| {
            when.method(GET)
                .path("/series/api/series")
                .query_param("start", "2");
            then.status(200)
                .header("content-type", "text/csv")
                .body("indice_tiempo,pbi\n2022-01-01,3\n");
        });

        let client = SeriesApiClient::with_base_url(&server.base_url(), 2, 5).unwrap();
        let fetched = client.fetch_series("143.3_NO_PR_2004_A_21").unwrap();

        page1.assert();
        page2.assert();
        assert_eq!(fetched.pages, 2);
        assert_eq!(fetched.observations.len(), 3);
        assert_eq!(fetched.observations[2].date, d(2022, 1, 1));
    }

    #[test]
    fn test_full_last_page_then_empty_page() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/series/api/series").query_param_missing("start");
            then.status(200).body("indice_tiempo,v\n2020-01-01,1\n");
        });
        let empty = server.mock(|when, then| {
            when.method(GET).path("/series/api/series").query_param("start", "1");
            then.status(200).body("indice_tiempo,v\n");
        });

        let client = SeriesApiClient::with_base_url(&server.base_url(), 1, 5).unwrap();
        let fetched = client.fetch_series("X").unwrap();

        empty.assert();
        assert_eq!(fetched.pages, 1);
        assert_eq!(fetched.observations.len(), 1);
    }

    #[test]
    fn test_later_page_error_keeps_collected_rows() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/series/api/series").query_param_missing("start");
            then.status(200).body("indice_tiempo,v\n2020-01-01,1\n");
        });
        server.mock(|when, then| {
            when.method(GET).path("/series/api/series").query_param("start", "1");
            then.status(500).body("boom");
        });

        let client = SeriesApiClient::with_base_url(&server.base_url(), 1, 5).unwrap();
        let fetched = client.fetch_series("X").unwrap();
        assert_eq!(fetched.observations.len(), 1);
    }

    #[test]
    fn test_first_page_404_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/series/api/series");
            then.status(404).body("not found");
        });

        let client = SeriesApiClient::with_base_url(&server.base_url(), 1000, 5).unwrap();
        let err = client.fetch_series("NOPE").unwrap_err();
        assert_eq!(err.code, EXIT_FETCH_NOT_FOUND);
        assert!(err.message.contains("404"), "message: {}", err.message);
    }

    #[test]
    fn test_first_page_400_is_validation() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/series/api/series");
            then.status(400).body("bad ids");
        });

        let client = SeriesApiClient::with_base_url(&server.base_url(), 1000, 5).unwrap();
        let err = client.fetch_series("bad id").unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_VALIDATION);
    }

    #[test]
    fn test_empty_first_page_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/series/api/series");
            then.status(200).body("indice_tiempo,v\n");
        });

        let client = SeriesApiClient::with_base_url(&server.base_url(), 1000, 5).unwrap();
        let err = client.fetch_series("X").unwrap_err();
        assert_eq!(err.code, EXIT_FETCH_NOT_FOUND);
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let client = SeriesApiClient::with_base_url("http://localhost:9/proxy", 10, 5).unwrap();
        let url = client.page_url("A B", 20).unwrap();
        assert_eq!(url.path(), "/proxy/series/api/series");
        assert_eq!(url.query(), Some("ids=A+B&format=csv&limit=10&start=20"));
    }

    #[test]
    fn test_invalid_base_url_is_usage_error() {
        let err = SeriesApiClient::with_base_url("not a url", 10, 5).err().unwrap();
        assert_eq!(err.code, exit_codes::EXIT_USAGE);
    }

    #[test]
    fn test_series_column_is_trimmed() {
        assert_eq!(series_column(Some("  IPC "), "143.3_NO_PR_2004_A_21"), "IPC");
        assert_eq!(series_column(Some(" fecha "), "X"), DATE_COLUMN);
        assert_eq!(series_column(Some("   "), "X"), "X");
        assert_eq!(series_column(None, "X"), "X");
    }
}
