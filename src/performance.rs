//! Performance statistics over a sequence of realized profits.
//!
//! Everything here is a pure function of its inputs. Degenerate inputs
//! (no trades, a single trade, zero variance) resolve to fixed values
//! instead of errors: Sharpe and drawdown become `0`, a profit factor
//! with wins and no losses is `+inf`, and one with neither is `0`.

use crate::config::MetricsSettings;
use crate::models::{PerformanceMetrics, PerformanceReport, Trade};
use statrs::statistics::Statistics;

/// Standard deviation at or below this fraction of the largest excess
/// return counts as zero variance.
const VARIANCE_TOLERANCE: f64 = 1e-12;

pub struct PerformanceCalculator;

impl PerformanceCalculator {
    /// Realized profits of finalized trades, in log order.
    pub fn realized_profits(trades: &[Trade]) -> Vec<f64> {
        trades.iter().filter_map(|trade| trade.profit).collect()
    }

    pub fn calculate_report(
        profits: &[f64],
        initial_capital: f64,
        settings: &MetricsSettings,
    ) -> PerformanceReport {
        let equity_curve = Self::equity_curve(initial_capital, profits);
        let drawdowns = Self::drawdown_series(&equity_curve);
        let metrics = Self::metrics_from_curves(profits, &drawdowns, settings);
        PerformanceReport {
            metrics,
            equity_curve,
            drawdowns,
        }
    }

    pub fn calculate_metrics(
        profits: &[f64],
        initial_capital: f64,
        settings: &MetricsSettings,
    ) -> PerformanceMetrics {
        Self::calculate_report(profits, initial_capital, settings).metrics
    }

    fn metrics_from_curves(
        profits: &[f64],
        drawdowns: &[f64],
        settings: &MetricsSettings,
    ) -> PerformanceMetrics {
        let total_trades = profits.len();
        if total_trades == 0 {
            return PerformanceMetrics::default();
        }

        let wins: Vec<f64> = profits.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = profits.iter().copied().filter(|p| *p < 0.0).collect();

        PerformanceMetrics {
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: Self::win_rate(profits),
            average_win: Self::average(&wins),
            average_loss: Self::average(&losses),
            profit_factor: Self::profit_factor(profits),
            total_profit: profits.iter().sum(),
            max_drawdown: Self::max_drawdown(drawdowns),
            sharpe_ratio: Self::sharpe_ratio(profits, settings),
        }
    }

    /// `equity[0]` is the starting capital; each profit adds one point.
    pub fn equity_curve(initial_capital: f64, profits: &[f64]) -> Vec<f64> {
        let mut curve = Vec::with_capacity(profits.len() + 1);
        let mut equity = initial_capital;
        curve.push(equity);
        for profit in profits {
            equity += profit;
            curve.push(equity);
        }
        curve
    }

    /// Distance of each equity point below its running peak (always `<= 0`).
    pub fn drawdown_series(equity_curve: &[f64]) -> Vec<f64> {
        let mut peak = f64::NEG_INFINITY;
        equity_curve
            .iter()
            .map(|&equity| {
                peak = peak.max(equity);
                equity - peak
            })
            .collect()
    }

    pub fn max_drawdown(drawdowns: &[f64]) -> f64 {
        let deepest = drawdowns.iter().copied().fold(0.0_f64, f64::min);
        deepest.abs()
    }

    /// Annualized Sharpe ratio treating each profit as one period's return.
    pub fn sharpe_ratio(profits: &[f64], settings: &MetricsSettings) -> f64 {
        if profits.len() < 2 || settings.periods_per_year <= 0.0 {
            return 0.0;
        }

        let per_period_rate = settings.risk_free_rate_per_period();
        let excess_returns: Vec<f64> = profits.iter().map(|p| p - per_period_rate).collect();

        let mean_excess = excess_returns.iter().mean();
        let std_dev = excess_returns.iter().std_dev();
        // Running variance leaves rounding residue on constant series.
        let scale = excess_returns.iter().fold(0.0_f64, |acc, e| acc.max(e.abs()));
        if !std_dev.is_finite()
            || !mean_excess.is_finite()
            || std_dev <= scale * VARIANCE_TOLERANCE
        {
            return 0.0;
        }

        settings.periods_per_year.sqrt() * mean_excess / std_dev
    }

    pub fn win_rate(profits: &[f64]) -> f64 {
        if profits.is_empty() {
            return 0.0;
        }
        let wins = profits.iter().filter(|p| **p > 0.0).count();
        wins as f64 / profits.len() as f64
    }

    pub fn profit_factor(profits: &[f64]) -> f64 {
        let gross_profit: f64 = profits.iter().filter(|p| **p > 0.0).sum();
        let gross_loss: f64 = profits.iter().filter(|p| **p < 0.0).map(|p| p.abs()).sum();
        let has_wins = profits.iter().any(|p| *p > 0.0);
        let has_losses = profits.iter().any(|p| *p < 0.0);

        match (has_wins, has_losses) {
            (true, false) => f64::INFINITY,
            (_, true) => gross_profit / gross_loss,
            (false, false) => 0.0,
        }
    }

    fn average(values: &[f64]) -> f64 {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }
}
