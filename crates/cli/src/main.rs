// gridseries CLI - consolidate spreadsheet time series into a date-keyed store

mod exit_codes;
mod fetch;
mod interrupt;
mod inspect;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "gridseries")]
#[command(about = "Locate time series in spreadsheets and merge them into a date-keyed store")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Diagnostic log filter (overrides RUST_LOG), e.g. "debug" or "gridseries_recon=debug"
    #[arg(long, global = true, value_name = "FILTER")]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the manifest against the source workbooks and update the store
    #[command(after_help = "\
Examples:
  gridseries run --config gridseries.toml
  gridseries run --source actividad_ied.xlsx
  gridseries run --manifest Codigos.xlsx --store BD.xlsx --source a.xlsx --source b.xlsx --json")]
    Run(run::RunArgs),

    /// Find one identifier in the source workbooks and print its series
    #[command(after_help = "\
Examples:
  gridseries locate 143.3_NO_PR_2004_A_21 --source actividad_ied.xlsx
  gridseries locate 100 --source a.xlsx --json")]
    Locate {
        /// Identifier to search for (compared exactly, not trimmed)
        id: String,

        /// Source workbook, in priority order. Repeatable.
        #[arg(long = "source", required = true)]
        sources: Vec<PathBuf>,

        /// Output JSON instead of tab-separated lines
        #[arg(long)]
        json: bool,
    },

    /// Normalize date tokens the way source grids are read
    #[command(after_help = "\
Examples:
  gridseries normalize 2024 'III 24' 'Dic-23' 2024-03-15")]
    Normalize {
        /// Tokens to normalize
        #[arg(required = true)]
        tokens: Vec<String>,
    },

    /// Download a series from the series API and merge it into the store
    #[command(after_help = "\
Examples:
  gridseries fetch 143.3_NO_PR_2004_A_21 --series PBI --table Actividad
  gridseries fetch 148.3_INIVELNAL_DICI_M_26 --series IPC --store BD.xlsx --base-url http://localhost:8080")]
    Fetch(fetch::FetchArgs),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  gridseries-engine ", env!("CARGO_PKG_VERSION"),
        "\nbuild:   ", env!("BUILD_PROFILE"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(filter: Option<&str>) {
    let env_filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("gridseries_cli=info,gridseries_recon=info,gridseries_io=info")
        }),
    };

    // Diagnostics go to stderr; stdout is reserved for command output.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let result = match cli.command {
        Commands::Run(args) => run::cmd_run(args),
        Commands::Locate { id, sources, json } => inspect::cmd_locate(id, sources, json),
        Commands::Normalize { tokens } => inspect::cmd_normalize(tokens),
        Commands::Fetch(args) => fetch::cmd_fetch(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Exit with `code` and no message; the command already reported.
    pub fn silent(code: u8) -> Self {
        Self::new(code, String::new())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
