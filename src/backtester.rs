use crate::bar_utils::validate_bar_series;
use crate::config::BacktestConfig;
use crate::error::BacktestError;
use crate::models::*;
use crate::performance::PerformanceCalculator;
use crate::strategy::SignalEvaluator;
use log::{debug, info, warn};
use rayon::prelude::*;

/// Replays a bar series through a signal rule with a Flat/Long/Short
/// position state machine.
///
/// Fills happen at the evaluated bar's close with no slippage or fees.
/// A position still open after the last bar is left out of the trade log,
/// capital and metrics unless `close_open_position_at_end` is set; it is
/// reported in [`BacktestRun::open_trade`].
pub struct Backtester {
    config: BacktestConfig,
}

struct SimulationState {
    position: PositionState,
    capital: f64,
    open_trade: Option<Trade>,
    closed_trades: Vec<Trade>,
    events: Vec<PositionEvent>,
    signals: Vec<GeneratedSignal>,
}

impl SimulationState {
    fn new(initial_capital: f64) -> Self {
        Self {
            position: PositionState::Flat,
            capital: initial_capital,
            open_trade: None,
            closed_trades: Vec::new(),
            events: Vec::new(),
            signals: Vec::new(),
        }
    }

    fn open_position(
        &mut self,
        direction: TradeDirection,
        bar: &PriceBar,
        bar_index: usize,
        size_fraction: f64,
    ) {
        let size = size_fraction * self.capital / bar.close;
        debug!(
            "Opening {} at {} (bar {}, size {:.6})",
            direction.as_str(),
            bar.close,
            bar_index,
            size
        );
        self.open_trade = Some(Trade::open(direction, bar.close, bar.timestamp, size));
        self.position = direction.position_state();
        self.events.push(PositionEvent {
            bar_index,
            timestamp: bar.timestamp,
            kind: PositionEventKind::Open,
            direction,
        });
    }

    fn close_position(&mut self, bar: &PriceBar, bar_index: usize) {
        let Some(mut trade) = self.open_trade.take() else {
            return;
        };
        let profit = trade.close(bar.close, bar.timestamp);
        self.capital += profit;
        debug!(
            "Closed {} at {} (bar {}), profit {:.4}, capital {:.4}",
            trade.direction.as_str(),
            bar.close,
            bar_index,
            profit,
            self.capital
        );
        self.events.push(PositionEvent {
            bar_index,
            timestamp: bar.timestamp,
            kind: PositionEventKind::Close,
            direction: trade.direction,
        });
        self.closed_trades.push(trade);
        self.position = PositionState::Flat;
    }
}

impl Backtester {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn run<S>(&self, bars: &[PriceBar], evaluator: &S) -> Result<BacktestResult, BacktestError>
    where
        S: SignalEvaluator + ?Sized,
    {
        self.run_detailed(bars, evaluator).map(|run| run.result)
    }

    pub fn run_detailed<S>(
        &self,
        bars: &[PriceBar],
        evaluator: &S,
    ) -> Result<BacktestRun, BacktestError>
    where
        S: SignalEvaluator + ?Sized,
    {
        self.config.validate()?;
        validate_bar_series(bars)?;

        let min_data_points = evaluator.get_min_data_points();
        if bars.len() > 1 && bars.len() < min_data_points {
            warn!(
                "{} needs {} bars but the series has {}; no signals will fire",
                evaluator.get_template_id(),
                min_data_points,
                bars.len()
            );
        }

        let mut state = SimulationState::new(self.config.initial_capital);
        let actions = evaluator.generate_signals(bars);

        for (bar_index, (bar, action)) in bars.iter().zip(actions).enumerate().skip(1) {
            if action != SignalAction::Hold {
                state.signals.push(GeneratedSignal {
                    bar_index,
                    timestamp: bar.timestamp,
                    action,
                });
            }

            match (state.position, action) {
                (PositionState::Flat, SignalAction::Buy) => state.open_position(
                    TradeDirection::Long,
                    bar,
                    bar_index,
                    self.config.position_size_fraction,
                ),
                (PositionState::Flat, SignalAction::Sell) => state.open_position(
                    TradeDirection::Short,
                    bar,
                    bar_index,
                    self.config.position_size_fraction,
                ),
                (PositionState::Long, SignalAction::Sell)
                | (PositionState::Short, SignalAction::Buy) => {
                    state.close_position(bar, bar_index)
                }
                _ => {}
            }
        }

        if self.config.close_open_position_at_end && state.open_trade.is_some() {
            if let Some(last_index) = bars.len().checked_sub(1) {
                state.close_position(&bars[last_index], last_index);
            }
        }

        let profits = PerformanceCalculator::realized_profits(&state.closed_trades);
        let report = PerformanceCalculator::calculate_report(
            &profits,
            self.config.initial_capital,
            &self.config.metrics,
        );

        info!(
            "Backtest {} ({}) over {} bars: {} closed trades, total profit {:.4}, open position: {}",
            evaluator.get_template_id(),
            self.config.timeframe_label,
            bars.len(),
            report.metrics.total_trades,
            report.metrics.total_profit,
            state.open_trade.is_some()
        );

        Ok(BacktestRun {
            result: BacktestResult {
                trades: state.closed_trades,
                metrics: report.metrics,
                equity_curve: report.equity_curve,
                drawdowns: report.drawdowns,
            },
            open_trade: state.open_trade,
            events: state.events,
            signals: state.signals,
        })
    }

    /// Runs several evaluators over the same series in parallel. Results
    /// come back in the order of `evaluators`.
    pub fn run_batch(
        &self,
        bars: &[PriceBar],
        evaluators: &[Box<dyn SignalEvaluator + Send + Sync>],
    ) -> Vec<(String, Result<BacktestResult, BacktestError>)> {
        evaluators
            .par_iter()
            .map(|evaluator| {
                (
                    evaluator.get_template_id().to_string(),
                    self.run(bars, evaluator.as_ref()),
                )
            })
            .collect()
    }
}
