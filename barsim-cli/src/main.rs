//! barsim CLI: run backtests and generate synthetic data.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and save the run directory
//! - `synth`: write a seeded synthetic OHLCV series as CSV
//! - `show`: print the metrics of a saved run

use anyhow::{bail, Context, Result};
use barsim_runner::{
    generate_synthetic_bars, load_run, run_single_backtest, write_csv, BacktestConfig,
    BacktestOutcome, PerformanceMetrics, RunParams, SavedRun, SyntheticConfig,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "barsim", about = "barsim: event-driven bar-by-bar backtester")]
struct Cli {
    /// Log filter used when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for run directories.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary without writing anything.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Write synthetic OHLCV bars as CSV.
    Synth {
        /// Symbol the series is seeded from.
        #[arg(long)]
        symbol: String,

        /// Number of weekday bars to generate.
        #[arg(long, default_value_t = 252)]
        bars: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// First calendar date (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start: String,

        /// Output file. Defaults to data/<SYMBOL>.csv.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the metrics of a saved run.
    Show {
        /// Path to a run directory written by `run`.
        run_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            no_save,
        } => run_backtest_cmd(&config, &output_dir, no_save),
        Commands::Synth {
            symbol,
            bars,
            seed,
            start,
            out,
        } => run_synth(&symbol, bars, seed, &start, out),
        Commands::Show { run_dir } => run_show(&run_dir),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid --log-level '{level}'"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}

fn run_backtest_cmd(config_path: &Path, output_dir: &Path, no_save: bool) -> Result<()> {
    let config = BacktestConfig::load(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let outcome = run_single_backtest(&config).context("backtest failed")?;
    print_summary(&outcome);

    if !no_save {
        let run_dir = outcome
            .save(output_dir)
            .with_context(|| format!("saving run under {}", output_dir.display()))?;
        println!("Run saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_synth(symbol: &str, bars: usize, seed: u64, start: &str, out: Option<PathBuf>) -> Result<()> {
    if bars == 0 {
        bail!("--bars must be positive");
    }
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start '{start}', expected YYYY-MM-DD"))?;
    let out = out.unwrap_or_else(|| PathBuf::from("data").join(format!("{symbol}.csv")));

    let series = generate_synthetic_bars(symbol, &SyntheticConfig { bars, seed }, start);
    write_csv(&out, &series).with_context(|| format!("writing {}", out.display()))?;

    info!(symbol, bars = series.len(), path = %out.display(), "synthetic bars written");
    println!("Wrote {} bars for {symbol} to {}", series.len(), out.display());
    Ok(())
}

fn run_show(run_dir: &Path) -> Result<()> {
    let (Some(base), Some(name)) = (run_dir.parent(), run_dir.file_name().and_then(|n| n.to_str()))
    else {
        bail!("not a run directory: {}", run_dir.display());
    };
    let saved: SavedRun<RunParams> =
        load_run(base, name).with_context(|| format!("loading {}", run_dir.display()))?;

    println!("Run:       {} ({})", saved.params.config.name, &saved.params.run_id[..12]);
    println!("Symbols:   {}", saved.params.config.symbols.join(", "));
    println!("Bars:      {}", saved.params.counters.bars);
    print_metrics(&saved.metrics);
    Ok(())
}

fn print_summary(outcome: &BacktestOutcome) {
    let config = &outcome.params.config;
    let counters = &outcome.result.counters;

    println!();
    println!("=== {} ===", config.name);
    println!("Run id:    {}", &outcome.params.run_id[..12]);
    println!("Symbols:   {}", config.symbols.join(", "));
    println!("Data hash: {}", &outcome.params.dataset_hash[..12]);
    println!(
        "Events:    {} bars, {} signals, {} orders, {} fills, {} errors",
        counters.bars, counters.signals, counters.orders, counters.fills, counters.event_errors
    );
    if !outcome.result.resting_orders.is_empty() {
        println!("Resting:   {} unfilled orders at halt", outcome.result.resting_orders.len());
    }
    println!(
        "Equity:    {:.2} -> {:.2}",
        config.simulation.initial_capital,
        outcome.result.final_equity()
    );
    println!("Slippage:  {:.2}", outcome.result.portfolio.slippage());
    print_metrics(&outcome.metrics);
}

fn print_metrics(m: &PerformanceMetrics) {
    println!();
    println!("Total return:     {:>10.2}%", m.total_return * 100.0);
    println!("CAGR:             {:>10.2}%", m.cagr * 100.0);
    println!("Volatility:       {:>10.2}%", m.annualized_volatility * 100.0);
    println!("Sharpe:           {:>10.2}", m.sharpe);
    println!("Sortino:          {:>10.2}", m.sortino);
    println!("Max drawdown:     {:>10.2}%", m.max_drawdown * 100.0);
    println!("Drawdown days:    {:>10}", m.max_drawdown_duration_days);
    println!("Calmar:           {:>10.2}", m.calmar);
    println!("Trades:           {:>10}", m.trade_count);
    println!("Win rate:         {:>10.1}%", m.win_rate * 100.0);
    println!("Profit factor:    {:>10.2}", m.profit_factor);
    println!("Avg trade pnl:    {:>10.2}", m.avg_trade_pnl);
    println!("Win/loss ratio:   {:>10.2}", m.avg_win_loss_ratio);
    println!("Avg duration (d): {:>10.1}", m.avg_duration_days);
    println!("  winners / losers {:>9.1} / {:.1}", m.avg_win_duration_days, m.avg_loss_duration_days);
    println!("Exposure (days):  {:>10}", m.market_exposure_days);
    println!("Commission:       {:>10.2}", m.total_commission);
}
