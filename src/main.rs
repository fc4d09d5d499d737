use anyhow::{anyhow, Context, Result};
use backtest_engine::{
    backtester::Backtester,
    config::{
        BacktestConfig, MetricsSettings, DEFAULT_INITIAL_CAPITAL, DEFAULT_POSITION_SIZE_FRACTION,
        DEFAULT_TIMEFRAME,
    },
    market_data::{load_bar_series, save_bar_snapshot},
    param_utils::parse_parameter_pair,
    portfolio::{LedgerEvent, PortfolioLedger},
    strategy::{create_strategy, SignalEvaluator},
};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde_json::json;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "backtest-engine")]
#[command(about = "Bar-based strategy backtesting and performance metrics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one strategy over a bar series and print the JSON result
    Backtest {
        /// Path to a JSON bar file or a .bin snapshot
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: PathBuf,
        /// Strategy template ID
        #[arg(long, default_value = "close_comparison")]
        strategy: String,
        /// Strategy parameter as key=value (repeatable)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_INITIAL_CAPITAL)]
        initial_capital: f64,
        /// Fraction of capital committed per trade, in (0, 1]
        #[arg(long, default_value_t = DEFAULT_POSITION_SIZE_FRACTION)]
        position_size: f64,
        /// Informational timeframe label
        #[arg(long, default_value = DEFAULT_TIMEFRAME)]
        timeframe: String,
        /// Close a position still open at the last bar instead of dropping it
        #[arg(long)]
        close_at_end: bool,
        /// Write the result here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Run several strategies over the same bars in parallel and print a summary
    Compare {
        #[arg(long = "data-file", value_name = "PATH")]
        data_file: PathBuf,
        /// Comma separated list of strategy template IDs
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        strategies: Vec<String>,
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_INITIAL_CAPITAL)]
        initial_capital: f64,
        #[arg(long, default_value_t = DEFAULT_POSITION_SIZE_FRACTION)]
        position_size: f64,
    },
    /// Convert a JSON bar file into a binary snapshot
    Snapshot {
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Replay a JSON buy/sell event log and print portfolio performance
    Portfolio {
        #[arg(long = "events-file", value_name = "PATH")]
        events_file: PathBuf,
        #[arg(long, default_value_t = 100_000.0)]
        initial_capital: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let Cli { command } = Cli::parse();

    let settings_map: HashMap<String, String> = env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();
    let metrics_settings = MetricsSettings::from_settings_map(&settings_map)?;

    match command {
        Commands::Backtest {
            data_file,
            strategy,
            params,
            initial_capital,
            position_size,
            timeframe,
            close_at_end,
            output,
        } => {
            let mut config = BacktestConfig::new(initial_capital, position_size)
                .with_timeframe(timeframe);
            config.close_open_position_at_end = close_at_end;
            config.metrics = metrics_settings;
            run_backtest(&data_file, &strategy, &params, config, output.as_deref()).await?;
        }
        Commands::Compare {
            data_file,
            strategies,
            params,
            initial_capital,
            position_size,
        } => {
            let mut config = BacktestConfig::new(initial_capital, position_size);
            config.metrics = metrics_settings;
            run_compare(&data_file, &strategies, &params, config).await?;
        }
        Commands::Snapshot { input, output } => {
            let bars = load_bar_series(&input).await?;
            save_bar_snapshot(&output, &bars).await?;
        }
        Commands::Portfolio {
            events_file,
            initial_capital,
        } => {
            run_portfolio(&events_file, initial_capital, &metrics_settings).await?;
        }
    }

    Ok(())
}

fn parse_parameters(raw: &[String]) -> Result<HashMap<String, f64>> {
    raw.iter().map(|pair| parse_parameter_pair(pair)).collect()
}

async fn run_backtest(
    data_file: &Path,
    template_id: &str,
    raw_params: &[String],
    config: BacktestConfig,
    output: Option<&Path>,
) -> Result<()> {
    let evaluator = create_strategy(template_id, parse_parameters(raw_params)?)?;
    let bars = load_bar_series(data_file)
        .await
        .with_context(|| format!("cannot backtest {}", template_id))?;

    let run = tokio::task::spawn_blocking(move || {
        Backtester::new(config).run_detailed(&bars, evaluator.as_ref())
    })
    .await?;
    let run = match run {
        Ok(run) => run,
        Err(err) => {
            warn!("Backtest rejected: {err}");
            return Err(err.into());
        }
    };

    if let Some(open) = run.open_trade.as_ref() {
        info!(
            "Position still open at series end ({} from {} at {}); excluded from trades and metrics",
            open.direction.as_str(),
            open.entry_time,
            open.entry_price
        );
    }

    let rendered = serde_json::to_string_pretty(&run.result)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote backtest result to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn run_compare(
    data_file: &Path,
    template_ids: &[String],
    raw_params: &[String],
    config: BacktestConfig,
) -> Result<()> {
    if template_ids.is_empty() {
        return Err(anyhow!("at least one strategy is required"));
    }
    let parameters = parse_parameters(raw_params)?;
    let evaluators = template_ids
        .iter()
        .map(|id| create_strategy(id.trim(), parameters.clone()))
        .collect::<Result<Vec<Box<dyn SignalEvaluator + Send + Sync>>>>()?;
    let bars = load_bar_series(data_file).await?;

    let results = tokio::task::spawn_blocking(move || {
        Backtester::new(config).run_batch(&bars, &evaluators)
    })
    .await?;

    for (template_id, result) in results {
        match result {
            Ok(result) => {
                let m = &result.metrics;
                println!(
                    "{:<18} trades={:<4} win_rate={:.3} profit_factor={:.3} total_profit={:.2} max_drawdown={:.2} sharpe={:.3}",
                    template_id,
                    m.total_trades,
                    m.win_rate,
                    m.profit_factor,
                    m.total_profit,
                    m.max_drawdown,
                    m.sharpe_ratio
                );
            }
            Err(err) => warn!("{template_id} failed: {err}"),
        }
    }
    Ok(())
}

async fn run_portfolio(
    events_file: &Path,
    initial_capital: f64,
    settings: &MetricsSettings,
) -> Result<()> {
    let bytes = tokio::fs::read(events_file)
        .await
        .with_context(|| format!("failed to read {}", events_file.display()))?;
    let events: Vec<LedgerEvent> = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse {}", events_file.display()))?;

    let mut ledger = PortfolioLedger::from_events(initial_capital, &events)?;
    let report = ledger.performance(settings);
    let summary = ledger.summary(&HashMap::new());

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "summary": summary,
            "performance": report,
        }))?
    );
    Ok(())
}
