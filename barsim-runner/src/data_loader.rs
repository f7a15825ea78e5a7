//! Bar loading: per-symbol CSV files or seeded synthetic series.
//!
//! CSV layout is one file per symbol, `<data_dir>/<SYMBOL>.csv`, with a
//! header row and the columns `datetime,open,high,low,close,volume`. The
//! datetime column accepts `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.

use crate::config::{BacktestConfig, SyntheticConfig};
use barsim_core::domain::Bar;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unparseable datetime '{value}' in {path} (row {row})")]
    BadTimestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("no bars for '{symbol}' inside the requested window")]
    EmptyWindow { symbol: String },
}

/// Bars ready to hand to the simulation.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbols: Vec<String>,
    pub bars: HashMap<String, Vec<Bar>>,
    /// BLAKE3 hash over every loaded bar, for reproducibility checks.
    pub dataset_hash: String,
    pub synthetic: bool,
}

/// Load every configured symbol, from CSV or the synthetic generator.
pub fn load_bars(config: &BacktestConfig) -> Result<LoadedData, LoadError> {
    let mut bars = HashMap::with_capacity(config.symbols.len());

    for symbol in &config.symbols {
        let series = match config.synthetic {
            Some(synth) => {
                let start = config.start.unwrap_or_else(default_synthetic_start);
                generate_synthetic_bars(symbol, &synth, start)
            }
            None => {
                let path = config.data_dir.join(format!("{symbol}.csv"));
                read_csv(&path, symbol)?
            }
        };
        let series = filter_window(series, config.start, config.end);
        if series.is_empty() {
            return Err(LoadError::EmptyWindow {
                symbol: symbol.clone(),
            });
        }
        debug!(symbol = %symbol, bars = series.len(), "bars loaded");
        bars.insert(symbol.clone(), series);
    }

    let dataset_hash = compute_dataset_hash(&bars);
    info!(
        symbols = config.symbols.len(),
        synthetic = config.synthetic.is_some(),
        hash = %&dataset_hash[..12],
        "dataset ready"
    );

    Ok(LoadedData {
        symbols: config.symbols.clone(),
        bars,
        dataset_hash,
        synthetic: config.synthetic.is_some(),
    })
}

// ── CSV ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "date", alias = "Date", alias = "timestamp")]
    datetime: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

/// Read one symbol's CSV file, sorted by time.
pub fn read_csv(path: &Path, symbol: &str) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv_from(file, path, symbol)
}

/// Parse CSV from any reader; `path` only labels errors.
pub fn read_csv_from<R: Read>(reader: R, path: &Path, symbol: &str) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();

    for (i, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let timestamp = parse_timestamp(&row.datetime).ok_or_else(|| LoadError::BadTimestamp {
            path: path.to_path_buf(),
            row: i + 1,
            value: row.datetime.clone(),
        })?;
        bars.push(Bar {
            symbol: symbol.to_string(),
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Write bars in the same layout `read_csv` accepts.
pub fn write_csv(path: &Path, bars: &[Bar]) -> Result<(), LoadError> {
    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| LoadError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    wtr.write_record(["datetime", "open", "high", "low", "close", "volume"])
        .map_err(csv_err)?;
    for bar in bars {
        wtr.write_record(&[
            format_timestamp(bar.timestamp),
            format!("{:.6}", bar.open),
            format!("{:.6}", bar.high),
            format!("{:.6}", bar.low),
            format!("{:.6}", bar.close),
            format!("{:.0}", bar.volume),
        ])
        .map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Date only for midnight timestamps, full datetime otherwise.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    if ts.num_seconds_from_midnight() == 0 {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Keep bars whose date falls in `[start, end]`.
fn filter_window(bars: Vec<Bar>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<Bar> {
    let before = bars.len();
    let kept: Vec<Bar> = bars
        .into_iter()
        .filter(|b| {
            let date = b.timestamp.date();
            start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
        })
        .collect();
    if kept.len() < before {
        debug!(dropped = before - kept.len(), "bars outside window dropped");
    }
    kept
}

// ── Hashing ──────────────────────────────────────────────────────────

/// Hash all bars in symbol order.
pub fn compute_dataset_hash(bars: &HashMap<String, Vec<Bar>>) -> String {
    let mut hasher = blake3::Hasher::new();

    let mut symbols: Vec<&String> = bars.keys().collect();
    symbols.sort();

    for symbol in symbols {
        hasher.update(symbol.as_bytes());
        for bar in &bars[symbol] {
            hasher.update(bar.timestamp.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }

    hasher.finalize().to_hex().to_string()
}

// ── Synthetic ────────────────────────────────────────────────────────

fn default_synthetic_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Random-walk weekday bars starting at 100.0.
///
/// The RNG is seeded from the symbol and `synth.seed`, so the same inputs
/// always produce the same series.
pub fn generate_synthetic_bars(symbol: &str, synth: &SyntheticConfig, start: NaiveDate) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&synth.seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let mut bars = Vec::with_capacity(synth.bars);
    let mut price = 100.0_f64;
    let mut day = start;

    while bars.len() < synth.bars {
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64) as f64;

        let Some(timestamp) = day.and_hms_opt(0, 0, 0) else {
            warn!(%day, "synthetic calendar overflow");
            break;
        };
        bars.push(Bar {
            symbol: symbol.to_string(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        day += chrono::Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyConfig;
    use barsim_core::SimulationConfig;

    const SAMPLE: &str = "\
datetime,open,high,low,close,volume
2023-01-04,101.0,102.0,100.0,101.5,2000
2023-01-03,100.0,101.0,99.0,100.5,1000
2023-01-05 00:00:00,102.0,103.0,101.0,102.5,3000
";

    fn config(dir: &Path, synthetic: Option<SyntheticConfig>) -> BacktestConfig {
        BacktestConfig {
            name: "t".into(),
            data_dir: dir.to_path_buf(),
            symbols: vec!["AAPL".into()],
            start: None,
            end: None,
            simulation: SimulationConfig::default(),
            strategy: StrategyConfig::BuyAndHold { hold_bars: 2 },
            synthetic,
        }
    }

    // ── CSV ──

    #[test]
    fn reads_and_sorts_rows() {
        let bars = read_csv_from(SAMPLE.as_bytes(), Path::new("AAPL.csv"), "AAPL").unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].close, 100.5);
        assert_eq!(bars[2].volume, 3000.0);
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(bars.iter().all(|b| b.symbol == "AAPL"));
    }

    #[test]
    fn accepts_capitalized_headers() {
        let csv = "Date,Open,High,Low,Close,Volume\n2023-01-03,1,2,0.5,1.5,10\n";
        let bars = read_csv_from(csv.as_bytes(), Path::new("x.csv"), "X").unwrap();
        assert_eq!(bars[0].high, 2.0);
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let csv = "datetime,open,high,low,close,volume\n2023-01-03,1,2,0.5,1.5,10\nyesterday,1,2,0.5,1.5,10\n";
        let err = read_csv_from(csv.as_bytes(), Path::new("x.csv"), "X").unwrap_err();
        assert!(matches!(err, LoadError::BadTimestamp { row: 2, .. }));
    }

    #[test]
    fn non_numeric_field_is_csv_error() {
        let csv = "datetime,open,high,low,close,volume\n2023-01-03,abc,2,0.5,1.5,10\n";
        let err = read_csv_from(csv.as_bytes(), Path::new("x.csv"), "X").unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_bars(&config(dir.path(), None)).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn write_then_read_preserves_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("AAPL.csv");
        let original = read_csv_from(SAMPLE.as_bytes(), &path, "AAPL").unwrap();
        write_csv(&path, &original).unwrap();
        assert_eq!(read_csv(&path, "AAPL").unwrap(), original);
    }

    #[test]
    fn window_filters_by_date() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AAPL.csv"), SAMPLE).unwrap();
        let mut cfg = config(dir.path(), None);
        cfg.start = NaiveDate::from_ymd_opt(2023, 1, 4);
        let loaded = load_bars(&cfg).unwrap();
        assert_eq!(loaded.bars["AAPL"].len(), 2);

        cfg.start = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(matches!(load_bars(&cfg), Err(LoadError::EmptyWindow { .. })));
    }

    #[test]
    fn timestamp_formats() {
        let midnight = parse_timestamp("2023-01-03").unwrap();
        assert_eq!(format_timestamp(midnight), "2023-01-03");
        let intraday = parse_timestamp("2023-01-03 09:30:00").unwrap();
        assert_eq!(format_timestamp(intraday), "2023-01-03 09:30:00");
        assert_eq!(parse_timestamp("2023-01-03T09:30:00"), Some(intraday));
        assert!(parse_timestamp("03/01/2023").is_none());
    }

    // ── Synthetic ──

    #[test]
    fn synthetic_is_deterministic_and_sane() {
        let synth = SyntheticConfig { bars: 60, seed: 3 };
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let a = generate_synthetic_bars("SPY", &synth, start);
        let b = generate_synthetic_bars("SPY", &synth, start);
        assert_eq!(a, b);
        assert_eq!(a.len(), 60);
        assert!(a.iter().all(Bar::is_sane));
        assert!(a
            .iter()
            .all(|b| !matches!(b.timestamp.weekday(), Weekday::Sat | Weekday::Sun)));

        let other_seed = generate_synthetic_bars("SPY", &SyntheticConfig { bars: 60, seed: 4 }, start);
        assert_ne!(a, other_seed);
        let other_symbol = generate_synthetic_bars("QQQ", &synth, start);
        assert_ne!(a[5].close, other_symbol[5].close);
    }

    #[test]
    fn synthetic_load_hashes_stably() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), Some(SyntheticConfig { bars: 30, seed: 1 }));
        let a = load_bars(&cfg).unwrap();
        let b = load_bars(&cfg).unwrap();
        assert!(a.synthetic);
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.bars["AAPL"].len(), 30);
    }
}
