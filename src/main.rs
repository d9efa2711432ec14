//! Cartsplit CLI

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use cartsplit::{
    input::load_problem,
    solvers::{
        DemandPolicy, SolveOptions,
        milp::{MILPSolver, NoopObserver, renderers::text::FormulationWriter},
    },
};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Registry,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

/// Demand policy accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum DemandArg {
    /// Buy at least the desired quantity of every item.
    AtLeast,

    /// Buy exactly the desired quantity of every item.
    Exactly,
}

impl From<DemandArg> for DemandPolicy {
    fn from(arg: DemandArg) -> Self {
        match arg {
            DemandArg::AtLeast => DemandPolicy::AtLeast,
            DemandArg::Exactly => DemandPolicy::Exactly,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "cartsplit",
    about = "Split a purchase across retailers at the lowest total cost",
    long_about = None
)]
struct Cli {
    /// Problem file (YAML)
    #[arg(short, long)]
    input: PathBuf,

    /// Demand policy (at-least, exactly)
    #[arg(short, long, value_enum)]
    demand: DemandArg,

    /// Write the plan report (YAML) to this file
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Write the rendered model formulation to this file
    #[arg(long)]
    formulation: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_subscriber(&cli)?;

    let problem = load_problem(&cli.input)
        .with_context(|| format!("failed to load problem from {}", cli.input.display()))?;

    let options = SolveOptions::new(cli.demand.into());

    let solved = match &cli.formulation {
        Some(path) => {
            let mut writer = FormulationWriter::new(&problem);
            let solved = MILPSolver::solve_with_observer(&problem, options, &mut writer);

            // Written even when solving fails, so infeasible models can be inspected.
            writer
                .write(path)
                .with_context(|| format!("failed to write formulation to {}", path.display()))?;

            solved
        }
        None => MILPSolver::solve_with_observer(&problem, options, &mut NoopObserver),
    };

    let plan = solved.context("failed to find a purchase plan")?;

    let mut stdout = io::stdout().lock();

    plan.write_to(&mut stdout)?;
    stdout.flush()?;

    if let Some(path) = &cli.out {
        plan.write_report(path)
            .with_context(|| format!("failed to write plan to {}", path.display()))?;

        info!(path = %path.display(), "wrote plan report");
    }

    Ok(())
}

fn init_subscriber(cli: &Cli) -> Result<()> {
    match cli.log_format {
        LogFormat::Compact => init_with_layer(
            cli,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(io::stderr),
        ),
        LogFormat::Json => init_with_layer(
            cli,
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_writer(io::stderr),
        ),
    }
}

fn build_env_filter(cli: &Cli) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level))
}

fn init_with_layer<L>(cli: &Cli, fmt_layer: L) -> Result<()>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_env_filter(cli))
        .try_init()?;

    Ok(())
}
