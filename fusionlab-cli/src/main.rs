//! FusionLab CLI: backtests and indicator dumps over CSV bars.
//!
//! Commands:
//! - `run` backtests one symbol from a bars CSV and an optional TOML config
//! - `batch` backtests every `<SYMBOL>.csv` in a directory in parallel
//! - `indicators` prints the indicator series the technical source votes on

mod io;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fusionlab_core::indicators::{bollinger_of_series, closes, ema_of_series, macd_of_series, rsi_of_series, sma_of_series};
use fusionlab_core::providers::TechnicalConfig;
use fusionlab_runner::{
    run_backtest, run_batch, BacktestConfig, BacktestResult, BatchJob, SignalInputs, Strategy, StrategyConfig,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fusionlab", about = "FusionLab CLI: multi-source signal backtesting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest a single symbol.
    Run {
        /// Bars CSV: timestamp,open,high,low,close,volume.
        #[arg(long)]
        bars: PathBuf,

        /// TOML config. Defaults apply to every missing field.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Signals CSV: timestamp,model_probability,sentiment (blank cells allowed).
        #[arg(long)]
        signals: Option<PathBuf>,

        /// Symbol label. Defaults to the bars file stem.
        #[arg(long)]
        symbol: Option<String>,

        /// Write the full result JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Backtest every `<SYMBOL>.csv` in a directory.
    Batch {
        /// Directory of bars CSVs; `<SYMBOL>.signals.csv` files are picked up alongside.
        #[arg(long)]
        bars_dir: PathBuf,

        /// TOML config shared by every symbol.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for per-symbol result JSON and summary.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Print indicator series for a bars CSV as CSV on stdout.
    Indicators {
        #[arg(long)]
        bars: PathBuf,

        /// Take indicator periods from this config's strategy section.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            bars,
            config,
            signals,
            symbol,
            output,
        } => run_cmd(&bars, config.as_deref(), signals.as_deref(), symbol, output.as_deref()),
        Commands::Batch {
            bars_dir,
            config,
            output_dir,
        } => {
            let cancel = interrupt_flag()?;
            batch_cmd(&bars_dir, config.as_deref(), &output_dir, Some(&*cancel))
        }
        Commands::Indicators { bars, config } => indicators_cmd(&bars, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    match path {
        Some(p) => BacktestConfig::load(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string()
}

fn run_cmd(
    bars_path: &Path,
    config_path: Option<&Path>,
    signals_path: Option<&Path>,
    symbol: Option<String>,
    output: Option<&Path>,
) -> Result<()> {
    let symbol = symbol.unwrap_or_else(|| file_stem(bars_path));
    let config = load_config(config_path)?.for_symbol(&symbol);
    let bars = io::read_bars(bars_path)?;
    let inputs = match signals_path {
        Some(p) => io::read_signals(p)?,
        None => SignalInputs::default(),
    };
    let strategy = Strategy::from_config(&config, inputs).context("building strategy")?;

    let result = run_backtest(&bars, &strategy, &config).with_context(|| format!("backtesting {symbol}"))?;
    let json = result.to_json()?;
    match output {
        Some(path) => {
            write_file(path, &json)?;
            print_summary(&result);
            info!(path = %path.display(), "result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// One row of `summary.json`.
#[derive(Debug, Serialize)]
struct BatchRow {
    symbol: String,
    ok: bool,
    total_return: Option<f64>,
    sharpe_ratio: Option<f64>,
    max_drawdown: Option<f64>,
    total_trades: Option<usize>,
    error: Option<String>,
}

/// Set once Ctrl-C arrives. Running backtests stop at their next bar.
fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting interrupt listener")?;
    let setter = Arc::clone(&flag);
    thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling batch");
                    setter.store(true, Ordering::Relaxed);
                }
            })
        })
        .context("spawning interrupt listener")?;
    Ok(flag)
}

fn batch_cmd(
    bars_dir: &Path,
    config_path: Option<&Path>,
    output_dir: &Path,
    cancel: Option<&AtomicBool>,
) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;
    let files = io::discover_symbols(bars_dir)?;
    if files.is_empty() {
        bail!("no <SYMBOL>.csv files in {}", bars_dir.display());
    }

    let jobs = files
        .par_iter()
        .map(|f| -> Result<BatchJob<Strategy>> {
            let bars = io::read_bars(&f.bars)?;
            let inputs = match &f.signals {
                Some(p) => io::read_signals(p)?,
                None => SignalInputs::default(),
            };
            let strategy = Strategy::from_config(&config, inputs)
                .with_context(|| format!("building strategy for {}", f.symbol))?;
            Ok(BatchJob::new(f.symbol.clone(), bars, strategy, &config))
        })
        .collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(output_dir).with_context(|| format!("creating {}", output_dir.display()))?;
    let results = run_batch(&jobs, cancel);

    let mut rows = Vec::with_capacity(results.len());
    for (job, result) in jobs.iter().zip(results) {
        match result {
            Ok(r) => {
                write_file(&output_dir.join(format!("{}.json", job.symbol)), &r.to_json()?)?;
                rows.push(BatchRow {
                    symbol: job.symbol.clone(),
                    ok: true,
                    total_return: Some(r.summary.total_return),
                    sharpe_ratio: Some(r.summary.sharpe_ratio),
                    max_drawdown: Some(r.summary.max_drawdown),
                    total_trades: Some(r.summary.total_trades),
                    error: None,
                });
            }
            Err(e) => {
                error!(symbol = %job.symbol, error = %e, "backtest failed");
                rows.push(BatchRow {
                    symbol: job.symbol.clone(),
                    ok: false,
                    total_return: None,
                    sharpe_ratio: None,
                    max_drawdown: None,
                    total_trades: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    write_file(&output_dir.join("summary.json"), &serde_json::to_string_pretty(&rows)?)?;
    let failed = rows.iter().filter(|r| !r.ok).count();
    info!(symbols = rows.len(), failed, output = %output_dir.display(), "batch complete");
    if failed == rows.len() {
        bail!("all {failed} backtests failed");
    }
    Ok(())
}

fn technical_settings(config: &BacktestConfig) -> TechnicalConfig {
    match &config.strategy {
        StrategyConfig::Technical { technical } | StrategyConfig::Ensemble { technical, .. } => technical.clone(),
        StrategyConfig::BuyAndHold => TechnicalConfig::default(),
    }
}

#[derive(Debug, Serialize)]
struct IndicatorRow {
    timestamp: i64,
    close: f64,
    sma: Option<f64>,
    ema: Option<f64>,
    rsi: Option<f64>,
    macd: Option<f64>,
    macd_signal: Option<f64>,
    macd_histogram: Option<f64>,
    bb_upper: Option<f64>,
    bb_middle: Option<f64>,
    bb_lower: Option<f64>,
    bb_percent_b: Option<f64>,
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn indicators_cmd(bars_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let t = technical_settings(&load_config(config_path)?);
    let bars = io::read_bars(bars_path)?;
    let close = closes(&bars);

    let sma = sma_of_series(&close, t.bollinger_period);
    let ema = ema_of_series(&close, t.bollinger_period);
    let rsi = rsi_of_series(&close, t.rsi_period, t.rsi_smoothing);
    let macd = macd_of_series(&close, t.macd_fast, t.macd_slow, t.macd_signal);
    let bands = bollinger_of_series(&close, t.bollinger_period, t.bollinger_multiplier);

    let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
    for (i, bar) in bars.iter().enumerate() {
        writer.serialize(IndicatorRow {
            timestamp: bar.timestamp,
            close: bar.close,
            sma: finite(sma[i]),
            ema: finite(ema[i]),
            rsi: finite(rsi[i]),
            macd: finite(macd.line[i]),
            macd_signal: finite(macd.signal[i]),
            macd_histogram: finite(macd.histogram[i]),
            bb_upper: finite(bands[i].upper),
            bb_middle: finite(bands[i].middle),
            bb_lower: finite(bands[i].lower),
            bb_percent_b: finite(bands[i].percent_b),
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    let d = &result.detailed;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Strategy:       {}", result.strategy);
    println!(
        "Bars:           {} ({} warmup)",
        result.diagnostics.bar_count, result.diagnostics.warmup_bars
    );
    println!("Trades:         {}", s.total_trades);
    println!();
    println!("--- Performance ---");
    println!("Final Value:    {:.2}", s.final_value);
    println!("Total Return:   {:.2}%", s.total_return * 100.0);
    println!("Annual Return:  {:.2}%", s.annual_return * 100.0);
    println!("Sharpe:         {:.3}", s.sharpe_ratio);
    println!("Sortino:        {:.3}", d.sortino);
    println!("Max Drawdown:   {:.2}%", s.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    println!("Exposure:       {:.1}%", d.exposure * 100.0);
    println!("Fees:           {:.2}", d.total_fees);
    if result.diagnostics.rejected_signals > 0 {
        println!("WARNING: {} bars had rejected signals", result.diagnostics.rejected_signals);
    }
    for (source, bars) in &result.diagnostics.missing_source_bars {
        if *bars > 0 {
            println!("NOTE: {source} unavailable on {bars} bars");
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn write_wave(dir: &Path, name: &str, n: usize) -> PathBuf {
        let mut body = String::from("timestamp,open,high,low,close,volume\n");
        for i in 0..n {
            let c = 100.0 + (i as f64 * 0.15).sin() * 8.0;
            body.push_str(&format!("{i},{c},{},{},{c},1000\n", c + 1.0, c - 1.0));
        }
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_writes_result_json() {
        let dir = tempfile::tempdir().unwrap();
        let bars = write_wave(dir.path(), "SPY.csv", 120);
        let out = dir.path().join("out/result.json");
        run_cmd(&bars, None, None, None, Some(&out)).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["symbol"], "SPY");
        assert_eq!(json["strategy"], "ensemble");
        assert_eq!(json["equity_curve"].as_array().unwrap().len(), 120);
    }

    #[test]
    fn run_uses_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let bars = write_wave(dir.path(), "QQQ.csv", 60);
        let config = dir.path().join("bh.toml");
        fs::write(
            &config,
            "[strategy]\ntype = \"buy_and_hold\"\n\n[backtest]\ninitial_capital = 5000.0\n",
        )
        .unwrap();
        let out = dir.path().join("r.json");
        run_cmd(&bars, Some(&config), None, Some("TEST".into()), Some(&out)).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["symbol"], "TEST");
        assert_eq!(json["strategy"], "buy_and_hold");
        assert_eq!(json["summary"]["total_trades"], 1);
    }

    #[test]
    fn batch_writes_per_symbol_files_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bars");
        fs::create_dir_all(&input).unwrap();
        write_wave(&input, "AAA.csv", 80);
        write_wave(&input, "BBB.csv", 90);
        let output = dir.path().join("results");

        batch_cmd(&input, None, &output, None).unwrap();

        assert!(output.join("AAA.json").is_file());
        assert!(output.join("BBB.json").is_file());
        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(output.join("summary.json")).unwrap()).unwrap();
        let rows = summary.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["symbol"], "AAA");
        assert_eq!(rows[1]["ok"], true);
    }

    #[test]
    fn interrupted_batch_records_cancelled_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bars");
        fs::create_dir_all(&input).unwrap();
        write_wave(&input, "AAA.csv", 80);
        write_wave(&input, "BBB.csv", 80);
        let output = dir.path().join("results");

        let cancel = AtomicBool::new(true);
        assert!(batch_cmd(&input, None, &output, Some(&cancel)).is_err());

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(output.join("summary.json")).unwrap()).unwrap();
        for row in summary.as_array().unwrap() {
            assert_eq!(row["ok"], false);
            assert!(row["error"].as_str().unwrap().contains("cancelled"));
        }
        assert!(!output.join("AAA.json").exists());
    }

    #[test]
    fn batch_on_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(batch_cmd(dir.path(), None, &dir.path().join("out"), None).is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("nope.toml"));
    }

    #[test]
    fn buy_and_hold_config_uses_default_indicator_periods() {
        let config = BacktestConfig {
            strategy: StrategyConfig::BuyAndHold,
            ..BacktestConfig::default()
        };
        assert_eq!(technical_settings(&config), TechnicalConfig::default());
    }
}
