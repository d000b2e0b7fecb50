//! Pegada CLI
//!
//! Command-line front end for the footprint engine:
//! - `calc`: one-shot calculation from annual quantities
//! - `quiz`: the five-question interview in the terminal
//! - `serve`: HTTP endpoints for the request-style interface
//! - `factors`: print the normalized factor table

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pegada_core::FactorTable;

mod calc;
mod quiz;
mod server;

#[derive(Parser)]
#[command(name = "pegada")]
#[command(author, version, about = "Pegada: annual carbon footprint estimator")]
struct Cli {
    /// Emission factor file (JSON). A missing or invalid file falls back to built-in defaults.
    #[arg(
        long,
        global = true,
        env = "PEGADA_FACTORS",
        default_value = "factors.json"
    )]
    factors: PathBuf,

    /// Increase log verbosity (`-v` debug, `-vv` trace). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a footprint from annual quantities (flags or a JSON request file).
    Calc(CalcArgs),

    /// Answer the five questions interactively and get a report.
    ///
    /// Answers are per month (energy), per week (transport, diet, waste) or
    /// per year (flights) and are annualized automatically.
    Quiz(QuizArgs),

    /// Serve `POST /calcular`, `POST /relatorio`, `GET /fatores` and `GET /healthz`.
    Serve(ServeArgs),

    /// Print the factor table actually in use, after normalization.
    Factors,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CalcArgs {
    /// Electricity consumption (kWh per year).
    #[arg(long, default_value_t = 0.0)]
    pub energia: f64,

    /// Distance travelled (km per year).
    #[arg(long, default_value_t = 0.0)]
    pub km: f64,

    /// Transport mode (e.g. `carro`, `onibus`). Unknown modes fall back to `carro`.
    #[arg(long)]
    pub tipo: Option<String>,

    /// Meat consumption (kg per year).
    #[arg(long, default_value_t = 0.0)]
    pub carne: f64,

    /// Flight hours per year.
    #[arg(long, default_value_t = 0.0)]
    pub aviao: f64,

    /// Household waste (kg per year).
    #[arg(long, default_value_t = 0.0)]
    pub lixo: f64,

    /// Read a request-style JSON body instead of the flags (`-` for stdin).
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output format: `json` or `html`.
    #[arg(long, default_value = "json")]
    pub format: String,

    /// Write the artifact here instead of stdout (json) or a temp file (html).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct QuizArgs {
    /// Read answers/commands from a file (`-` for stdin) instead of prompting.
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Answer or command to run non-interactively (repeatable, runs after `--script`).
    #[arg(long = "answer", short = 'a')]
    pub answers: Vec<String>,

    /// Keep going after a rejected answer in scripted mode.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Do not echo scripted lines.
    #[arg(long)]
    pub quiet: bool,

    /// Where to write the HTML report (default: a new temp file).
    #[arg(long)]
    pub html_out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ServeArgs {
    /// Listen address (use `127.0.0.1:0` to auto-pick a free port).
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,

    /// Write `{ "addr": ..., "pid": ... }` here once the listener is bound.
    #[arg(long)]
    pub ready_file: Option<PathBuf>,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let factors = FactorTable::from_path(&cli.factors);

    match cli.command {
        Commands::Calc(args) => calc::cmd_calc(&args, &factors),
        Commands::Quiz(args) => {
            if args.script.is_some() || !args.answers.is_empty() {
                quiz::cmd_quiz_script(&args, &factors)
            } else {
                quiz::cmd_quiz(&args, &factors)
            }
        }
        Commands::Serve(args) => server::cmd_serve(&args, factors),
        Commands::Factors => {
            println!("{}", serde_json::to_string_pretty(&factors)?);
            Ok(())
        }
    }
}
