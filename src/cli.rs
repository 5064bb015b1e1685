//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::write_history_csv;
use crate::domain::error::QuantkitError;
use crate::domain::numeric::{format_decimal, format_pct};
use crate::logging;
use crate::runner::{RunResult, Runner};

pub const DONE_MARKER: &str = "DONE";

#[derive(Parser, Debug)]
#[command(name = "quantkit", about = "Algo-pipeline portfolio backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Run {
        /// Local configuration, merged over --base when given
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        base: Option<PathBuf>,
        /// Write the per-tick history as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration without loading data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        base: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    logging::init();
    match cli.command {
        Command::Run {
            config,
            base,
            output,
        } => run_backtest(&config, base.as_deref(), output.as_deref()),
        Command::Validate { config, base } => run_validate(&config, base.as_deref()),
    }
}

fn fail(err: &QuantkitError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

/// `--base` is the base document when present; otherwise `--config` stands
/// alone.
pub fn init_runner(config: &Path, base: Option<&Path>) -> Result<Runner, QuantkitError> {
    match base {
        Some(base) => Runner::init(base, Some(config)),
        None => Runner::init(config, None),
    }
}

fn run_backtest(config: &Path, base: Option<&Path>, output: Option<&Path>) -> ExitCode {
    let runner = match init_runner(config, base) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    let result = match runner.run() {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    print_summary(&result);

    if let Some(path) = output {
        if let Err(e) = write_history_csv(&result.history, path) {
            return fail(&e);
        }
        eprintln!("\nHistory written to: {}", path.display());
    }

    println!("{DONE_MARKER}");
    ExitCode::SUCCESS
}

fn print_summary(result: &RunResult) {
    let m = &result.metrics;
    eprintln!("\n=== {} ===", result.strategy);
    eprintln!("Ticks:            {}", result.history.len());
    eprintln!("Final Value:      {}", format_decimal(m.final_value, 2));
    eprintln!("Total Return:     {}", format_pct(m.total_return, 2));
    eprintln!("Annualized:       {}", format_pct(m.annualized_return, 2));
    eprintln!("Volatility:       {}", format_pct(m.volatility, 2));
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Max Drawdown:     -{}", format_pct(m.max_drawdown, 1));
    eprintln!("Commissions:      {}", format_decimal(m.total_commissions, 2));
    eprintln!("Avg Turnover:     {}", format_pct(m.avg_turnover, 1));
    eprintln!("Fills:            {}", m.total_fills);
    eprintln!("Aborted Ticks:    {}", m.aborted_ticks);

    if !result.positions.is_empty() {
        eprintln!("\n=== Positions ===");
        for (id, p) in &result.positions {
            eprintln!(
                "  {:<12} qty {:>14}  mark {:>12}",
                id,
                format_decimal(p.quantity, 4),
                format_decimal(p.last_mark, 4)
            );
        }
    }
}

fn run_validate(config: &Path, base: Option<&Path>) -> ExitCode {
    match init_runner(config, base) {
        Ok(runner) => {
            let cfg = runner.config();
            eprintln!("Strategy: {}", cfg.strategy.name);
            for spec in &cfg.strategy.algos {
                eprintln!("  {}", spec.name);
            }
            if !cfg.data.is_empty() {
                let names: Vec<&str> = cfg.data.keys().map(String::as_str).collect();
                eprintln!("Series: {}", names.join(", "));
            }
            eprintln!("Configuration is valid");
            println!("{DONE_MARKER}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
