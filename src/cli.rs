//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult, SignalConfig};
use crate::domain::config_validation::{
    parse_date, parse_weights, validate_backtest_config, validate_run_settings,
    validate_signal_config,
};
use crate::domain::error::{EngineError, SignalfolioError};
use crate::domain::indicator::RsiMethod;
use crate::domain::metrics::RiskMetrics;
use crate::domain::portfolio::Weights;
use crate::domain::signal::SignalThresholds;
use crate::domain::universe::{parse_codes, validate_universe};
use crate::logging::init_logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "signalfolio", about = "RSI / moving-average basket backtester")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Run a single code instead of the configured basket
        #[arg(long)]
        code: Option<String>,
    },
    /// Validate a configuration file without loading data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for code(s)
    Info {
        #[arg(long)]
        code: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List codes available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    match cli.command {
        Command::Backtest {
            config,
            output,
            code,
        } => run_backtest(&config, output.as_ref(), code.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { code, config } => run_info(code.as_deref(), &config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SignalfolioError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: SignalfolioError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn data_dir(adapter: &FileConfigAdapter) -> PathBuf {
    adapter
        .get_path("data", "path")
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn build_signal_config(adapter: &dyn ConfigPort) -> Result<SignalConfig, SignalfolioError> {
    let defaults = SignalConfig::default();
    let rsi_method = match adapter.get_string("signal", "rsi_method") {
        Some(s) => s
            .parse::<RsiMethod>()
            .map_err(|reason| SignalfolioError::ConfigInvalid {
                section: "signal".into(),
                key: "rsi_method".into(),
                reason,
            })?,
        None => defaults.rsi_method,
    };

    let period = |key: &str, default: usize| -> usize {
        adapter.get_int("signal", key, default as i64).max(0) as usize
    };

    Ok(SignalConfig {
        rsi_period: period("rsi_period", defaults.rsi_period),
        rsi_method,
        short_ma_period: period("short_ma", defaults.short_ma_period),
        long_ma_period: period("long_ma", defaults.long_ma_period),
        thresholds: SignalThresholds {
            oversold: adapter.get_double("signal", "oversold", defaults.thresholds.oversold),
            overbought: adapter.get_double(
                "signal",
                "overbought",
                defaults.thresholds.overbought,
            ),
        },
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SignalfolioError> {
    let start_date = parse_date(
        adapter.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        adapter.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;
    let benchmark = adapter
        .get_string("backtest", "benchmark")
        .map(|b| b.to_uppercase())
        .ok_or_else(|| SignalfolioError::ConfigMissing {
            section: "backtest".into(),
            key: "benchmark".into(),
        })?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.0),
        benchmark,
        weights: parse_weights(adapter)?,
        signal: build_signal_config(adapter)?,
    })
}

pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, SignalfolioError> {
    if let Some(c) = code_override {
        return Ok(vec![c.trim().to_uppercase()]);
    }

    let (key, raw) = match config.get_string("backtest", "codes") {
        Some(codes) => ("codes", codes),
        None => match config.get_string("backtest", "code") {
            Some(code) => ("code", code),
            None => return Ok(vec![]),
        },
    };

    parse_codes(&raw).map_err(|e| SignalfolioError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: e.to_string(),
    })
}

/// Weights of the accepted codes, renormalised when some codes were dropped.
pub fn weights_for_accepted(
    codes: &[String],
    weights: &[f64],
    accepted: &[&str],
) -> Result<Vec<f64>, EngineError> {
    if weights.len() != codes.len() {
        return Err(EngineError::InvalidParameter {
            name: "weights".into(),
            reason: format!("{} weights given for {} codes", weights.len(), codes.len()),
        });
    }
    let raw: Vec<f64> = accepted
        .iter()
        .filter_map(|code| codes.iter().position(|c| c == code).map(|i| weights[i]))
        .collect();
    if raw.len() == codes.len() {
        return Ok(raw);
    }
    Ok(Weights::normalized(&raw)?.as_slice().to_vec())
}

fn run_backtest(config_path: &Path, output_path: Option<&PathBuf>, code_override: Option<&str>) -> ExitCode {
    // Stage 1: Load and validate config
    info!(path = %config_path.display(), "loading config");
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // A --code run replaces the configured basket, so codes and weights are not checked.
    let validated = match code_override {
        Some(_) => validate_run_settings(&adapter),
        None => validate_backtest_config(&adapter),
    };
    if let Err(e) = validated {
        return fail(e);
    }
    if let Err(e) = validate_signal_config(&adapter) {
        return fail(e);
    }

    // Stage 2: Build BacktestConfig
    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if code_override.is_some() {
        bt_config.weights = None;
    }

    // Stage 3: Resolve codes
    let codes = match resolve_codes(code_override, &adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if codes.is_empty() {
        eprintln!("error: no codes configured");
        return ExitCode::from(2);
    }

    let output = output_path
        .cloned()
        .or_else(|| adapter.get_path("report", "output"));
    let data_port = CsvAdapter::new(data_dir(&adapter));

    run_backtest_pipeline(
        &data_port,
        &CsvReportAdapter,
        &bt_config,
        &codes,
        output.as_deref(),
    )
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    bt_config: &BacktestConfig,
    codes: &[String],
    output_path: Option<&Path>,
) -> ExitCode {
    // Stage 4: Fetch and validate universe
    let validation = match validate_universe(
        data_port,
        codes,
        bt_config.start_date,
        bt_config.end_date,
        bt_config.signal.min_bars(),
    ) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };

    let mut config = bt_config.clone();
    if let Some(weights) = &bt_config.weights {
        if !validation.skipped.is_empty() {
            warn!("codes skipped; renormalising configured weights");
        }
        match weights_for_accepted(codes, weights, &validation.codes()) {
            Ok(w) => config.weights = Some(w),
            Err(e) => return fail(e.into()),
        }
    }

    // Stage 5: Benchmark
    let benchmark = match data_port.fetch_prices(
        &bt_config.benchmark,
        bt_config.start_date,
        bt_config.end_date,
    ) {
        Ok(b) => b,
        Err(e) => return fail(e),
    };

    // Stage 6: Run engine
    info!(
        start = %bt_config.start_date,
        end = %bt_config.end_date,
        skipped = validation.skipped.len(),
        "universe loaded"
    );
    let result = match backtest_engine::run_backtest(&validation.prices, &benchmark, &config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    // Stage 7: Console summary
    print_summary(&result, bt_config.start_date, bt_config.end_date);

    // Stage 8: Report
    if let Some(path) = output_path {
        if let Err(e) = report_port.write(&result, path) {
            return fail(e);
        }
        eprintln!("\nReport written to: {}", path.display());
    }

    ExitCode::SUCCESS
}

fn metrics_line(label: &str, metrics: &Result<RiskMetrics, EngineError>) -> String {
    match metrics {
        Ok(m) => format!(
            "{:<20} {:>9.2}% {:>9.2}% {:>7.2} {:>8.1}% {:>6.2} {:>9.2}%",
            label,
            m.annualized_return * 100.0,
            m.annualized_volatility * 100.0,
            m.sharpe_ratio,
            m.max_drawdown * 100.0,
            m.beta,
            m.cumulative_return * 100.0,
        ),
        Err(e) => format!("{:<20} unavailable ({e})", label),
    }
}

fn print_summary(result: &BacktestResult, start: NaiveDate, end: NaiveDate) {
    let header = format!(
        "{:<20} {:>10} {:>10} {:>7} {:>9} {:>6} {:>10}",
        "", "Ann.Ret", "Ann.Vol", "Sharpe", "MaxDD", "Beta", "Cum.Ret"
    );

    eprintln!("\n=== Portfolio Results ({} to {}) ===", start, end);
    eprintln!("{header}");
    eprintln!("{}", metrics_line("Buy & hold", &result.base.metrics));
    eprintln!("{}", metrics_line("Strategy", &result.strategy.metrics));
    if let (Some(base), Some(strategy)) = (result.base.value.last(), result.strategy.value.last()) {
        eprintln!(
            "Final value:         {:.4} (buy & hold), {:.4} (strategy)",
            base.equity, strategy.equity
        );
    }

    eprintln!("\n=== Per-Code Summary ===");
    eprintln!("{header}");
    for (instrument, weight) in result.instruments.iter().zip(result.weights.as_slice()) {
        let label = format!("{} ({:.0}%)", instrument.code, weight * 100.0);
        eprintln!("{}", metrics_line(&label, &instrument.base_metrics));
        eprintln!(
            "{}",
            metrics_line(&format!("  {} strategy", instrument.code), &instrument.strategy_metrics)
        );
    }

    for failure in &result.failures {
        eprintln!("{}: excluded ({})", failure.code, failure.error);
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(e);
    }
    if let Err(e) = validate_signal_config(&adapter) {
        return fail(e);
    }

    let config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let codes = match resolve_codes(None, &adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let signal = &config.signal;

    eprintln!("\nBacktest:");
    eprintln!("  window:     {} to {}", config.start_date, config.end_date);
    eprintln!("  benchmark:  {}", config.benchmark);
    eprintln!("  risk-free:  {:.2}%", config.risk_free_rate * 100.0);
    eprintln!("  codes:      {}", codes.join(", "));
    match &config.weights {
        Some(w) => eprintln!(
            "  weights:    {}",
            w.iter().map(|w| w.to_string()).collect::<Vec<_>>().join(", ")
        ),
        None => eprintln!("  weights:    equal"),
    }

    eprintln!("\nSignal:");
    eprintln!("  RSI({}) {:?}", signal.rsi_period, signal.rsi_method);
    eprintln!("  SMA({}) vs SMA({})", signal.short_ma_period, signal.long_ma_period);
    eprintln!(
        "  oversold < {} / overbought > {}",
        signal.thresholds.oversold, signal.thresholds.overbought
    );
    eprintln!("  minimum bars per code: {}", signal.min_bars());
    eprintln!("  data directory: {}", data_dir(&adapter).display());

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(code: Option<&str>, config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let mut codes = match resolve_codes(code, &config) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if code.is_none() {
        if let Some(benchmark) = config.get_string("backtest", "benchmark") {
            codes.push(benchmark.to_uppercase());
        }
    }
    if codes.is_empty() {
        eprintln!("error: no codes configured (use --code or set [backtest] codes)");
        return ExitCode::from(2);
    }

    let adapter = CsvAdapter::new(data_dir(&config));
    for c in &codes {
        match adapter.get_data_range(c) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", c, count, min_date, max_date);
            }
            Ok(None) => {
                eprintln!("{}: no data found", c);
            }
            Err(e) => {
                eprintln!("error querying {}: {}", c, e);
            }
        }
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let adapter = CsvAdapter::new(data_dir(&config));
    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
