//! Run directory export and import.
//!
//! A saved run is a directory `<base>/<name>/` holding:
//! - `positions.csv`: signed position per symbol at every snapshot
//! - `holdings.csv`: market value per symbol, cash, commission, total
//! - `closed_trades.csv`: the realized trade log
//! - `equity_curve.csv`: total, returns and compounded equity
//! - `params.json`: whatever parameters the caller wants kept with the run
//! - `metrics.json`: the computed performance metrics

use crate::data_loader::format_timestamp;
use crate::metrics::PerformanceMetrics;
use barsim_core::domain::{ClosedTrade, EquityPoint};
use barsim_core::RunResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const POSITIONS_FILE: &str = "positions.csv";
pub const HOLDINGS_FILE: &str = "holdings.csv";
pub const TRADES_FILE: &str = "closed_trades.csv";
pub const EQUITY_FILE: &str = "equity_curve.csv";
pub const PARAMS_FILE: &str = "params.json";
pub const METRICS_FILE: &str = "metrics.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no saved run at {0}")]
    MissingRun(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What `load_run` reads back from a run directory.
#[derive(Debug, Clone)]
pub struct SavedRun<P> {
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub params: P,
    pub metrics: PerformanceMetrics,
}

// ── Save ─────────────────────────────────────────────────────────────

/// Write every artifact of `result` under `<base>/<name>/` and return that path.
pub fn save_run<P: Serialize>(
    base: &Path,
    name: &str,
    result: &RunResult,
    params: &P,
    metrics: &PerformanceMetrics,
) -> Result<PathBuf, ExportError> {
    let dir = base.join(name);
    std::fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
        path: dir.clone(),
        source,
    })?;

    write_positions(&dir.join(POSITIONS_FILE), result)?;
    write_holdings(&dir.join(HOLDINGS_FILE), result)?;
    write_records(&dir.join(TRADES_FILE), result.closed_trades())?;
    write_records(&dir.join(EQUITY_FILE), &result.equity_curve())?;
    write_json(&dir.join(PARAMS_FILE), params)?;
    write_json(&dir.join(METRICS_FILE), metrics)?;

    info!(dir = %dir.display(), "run saved");
    Ok(dir)
}

/// Wide table: one column per symbol.
fn write_positions(path: &Path, result: &RunResult) -> Result<(), ExportError> {
    let symbols = result.portfolio.positions().keys().cloned().collect::<Vec<_>>();
    let mut wtr = csv_writer(path)?;

    let mut header = vec!["datetime".to_string()];
    header.extend(symbols.iter().cloned());
    wtr.write_record(&header).map_err(csv_err(path))?;

    for row in result.position_history() {
        let mut record = vec![format_timestamp(row.timestamp)];
        record.extend(
            symbols
                .iter()
                .map(|s| row.positions.get(s).copied().unwrap_or(0).to_string()),
        );
        wtr.write_record(&record).map_err(csv_err(path))?;
    }
    flush(wtr, path)
}

fn write_holdings(path: &Path, result: &RunResult) -> Result<(), ExportError> {
    let symbols = result.portfolio.positions().keys().cloned().collect::<Vec<_>>();
    let mut wtr = csv_writer(path)?;

    let mut header = vec!["datetime".to_string()];
    header.extend(symbols.iter().cloned());
    header.extend(["cash", "commission", "total"].map(String::from));
    wtr.write_record(&header).map_err(csv_err(path))?;

    for row in result.holdings_history() {
        let mut record = vec![format_timestamp(row.timestamp)];
        record.extend(symbols.iter().map(|s| {
            format!("{:.6}", row.market_values.get(s).copied().unwrap_or(0.0))
        }));
        record.push(format!("{:.6}", row.cash));
        record.push(format!("{:.6}", row.commission));
        record.push(format!("{:.6}", row.total));
        wtr.write_record(&record).map_err(csv_err(path))?;
    }
    flush(wtr, path)
}

fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), ExportError> {
    let mut wtr = csv_writer(path)?;
    for record in records {
        wtr.serialize(record).map_err(csv_err(path))?;
    }
    flush(wtr, path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>, ExportError> {
    csv::Writer::from_path(path).map_err(csv_err(path))
}

fn flush(mut wtr: csv::Writer<File>, path: &Path) -> Result<(), ExportError> {
    wtr.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> ExportError + '_ {
    move |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

// ── Load ─────────────────────────────────────────────────────────────

/// Read back a directory written by `save_run`.
pub fn load_run<P: DeserializeOwned>(base: &Path, name: &str) -> Result<SavedRun<P>, ExportError> {
    let dir = base.join(name);
    if !dir.is_dir() {
        return Err(ExportError::MissingRun(dir));
    }

    Ok(SavedRun {
        closed_trades: read_records(&dir.join(TRADES_FILE))?,
        equity_curve: read_records(&dir.join(EQUITY_FILE))?,
        params: read_json(&dir.join(PARAMS_FILE))?,
        metrics: read_json(&dir.join(METRICS_FILE))?,
    })
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ExportError> {
    let mut rdr = csv::Reader::from_path(path).map_err(csv_err(path))?;
    rdr.deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err(path))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ExportError> {
    let file = File::open(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })
}
