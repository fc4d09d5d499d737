use crate::models::*;
use anyhow::Result;
use std::collections::HashMap;

/// A pluggable trading rule.
///
/// `bars` holds the history up to and including the bar being evaluated,
/// so `bars[bar_index]` is the current bar and `bars[bar_index - 1]` the
/// previous one. The simulator never calls this for `bar_index == 0`.
pub trait SignalEvaluator {
    fn get_template_id(&self) -> &str;
    fn generate_signal(&self, bars: &[PriceBar], bar_index: usize) -> SignalAction;
    /// Bars required before the rule can emit anything other than `Hold`.
    /// Earlier bars are not evaluated.
    fn get_min_data_points(&self) -> usize {
        2
    }
    /// One action per bar of `bars`. Entry `i` must equal
    /// `generate_signal(&bars[..=i], i)`; rules whose indicators carry
    /// state across bars override this to compute the series in one pass.
    fn generate_signals(&self, bars: &[PriceBar]) -> Vec<SignalAction> {
        let first = first_evaluated_index(self.get_min_data_points());
        (0..bars.len())
            .map(|bar_index| {
                if bar_index < first {
                    SignalAction::Hold
                } else {
                    self.generate_signal(&bars[..=bar_index], bar_index)
                }
            })
            .collect()
    }
}

/// Index of the first bar a rule needing `min_data_points` bars is asked
/// about. Bar 0 has no predecessor and is never evaluated.
pub fn first_evaluated_index(min_data_points: usize) -> usize {
    min_data_points.saturating_sub(1).max(1)
}

impl<T: SignalEvaluator + ?Sized> SignalEvaluator for Box<T> {
    fn get_template_id(&self) -> &str {
        (**self).get_template_id()
    }

    fn generate_signal(&self, bars: &[PriceBar], bar_index: usize) -> SignalAction {
        (**self).generate_signal(bars, bar_index)
    }

    fn get_min_data_points(&self) -> usize {
        (**self).get_min_data_points()
    }

    fn generate_signals(&self, bars: &[PriceBar]) -> Vec<SignalAction> {
        (**self).generate_signals(bars)
    }
}

/// Adapts a `(previous, current)` closure into a [`SignalEvaluator`].
pub struct FnSignal<F> {
    template_id: String,
    rule: F,
}

impl<F> FnSignal<F>
where
    F: Fn(&PriceBar, &PriceBar) -> SignalAction,
{
    pub fn new(template_id: impl Into<String>, rule: F) -> Self {
        Self {
            template_id: template_id.into(),
            rule,
        }
    }
}

impl<F> SignalEvaluator for FnSignal<F>
where
    F: Fn(&PriceBar, &PriceBar) -> SignalAction,
{
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signal(&self, bars: &[PriceBar], bar_index: usize) -> SignalAction {
        if bar_index == 0 || bar_index >= bars.len() {
            return SignalAction::Hold;
        }
        (self.rule)(&bars[bar_index - 1], &bars[bar_index])
    }
}

#[path = "strategies/close_comparison.rs"]
pub mod close_comparison;

pub use close_comparison::CloseComparisonStrategy;

#[path = "strategies/buy_and_hold.rs"]
pub mod buy_and_hold;

pub use buy_and_hold::BuyAndHoldStrategy;

#[path = "strategies/sma_crossover.rs"]
pub mod sma_crossover;

pub use sma_crossover::SmaCrossoverStrategy;

#[path = "strategies/rsi.rs"]
pub mod rsi;

pub use rsi::RSIStrategy;

pub const TEMPLATE_IDS: [&str; 4] = ["close_comparison", "buy_and_hold", "sma_crossover", "rsi"];

pub fn create_strategy(
    template_id: &str,
    parameters: HashMap<String, f64>,
) -> Result<Box<dyn SignalEvaluator + Send + Sync>> {
    match template_id {
        "close_comparison" => Ok(Box::new(CloseComparisonStrategy::new())),
        "buy_and_hold" => Ok(Box::new(BuyAndHoldStrategy::new())),
        "sma_crossover" => Ok(Box::new(SmaCrossoverStrategy::new(parameters))),
        "rsi" => Ok(Box::new(RSIStrategy::new(parameters))),
        _ => Err(anyhow::anyhow!(
            "Unknown strategy template: {}",
            template_id
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: base + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 100.0,
            })
            .collect()
    }

    #[test]
    fn factory_knows_every_template() {
        for id in TEMPLATE_IDS {
            let strategy = create_strategy(id, HashMap::new()).unwrap();
            assert_eq!(strategy.get_template_id(), id);
        }
        assert!(create_strategy("pine_script", HashMap::new()).is_err());
    }

    #[test]
    fn closure_adapter_sees_previous_and_current_bar() {
        let rule = FnSignal::new("gap_up", |prev: &PriceBar, cur: &PriceBar| {
            if cur.open > prev.close {
                SignalAction::Buy
            } else {
                SignalAction::Hold
            }
        });
        let mut series = bars(&[10.0, 10.0]);
        series[1].open = 10.5;

        assert_eq!(rule.get_template_id(), "gap_up");
        assert_eq!(rule.generate_signal(&series, 1), SignalAction::Buy);
        assert_eq!(rule.generate_signal(&series, 0), SignalAction::Hold);
    }

    #[test]
    fn boxed_evaluators_delegate() {
        let boxed: Box<dyn SignalEvaluator + Send + Sync> =
            create_strategy("close_comparison", HashMap::new()).unwrap();
        let series = bars(&[10.0, 9.0]);
        assert_eq!(boxed.generate_signal(&series, 1), SignalAction::Sell);
        assert_eq!(boxed.get_min_data_points(), 2);
        assert_eq!(
            boxed.generate_signals(&series),
            vec![SignalAction::Hold, SignalAction::Sell]
        );
    }

    #[test]
    fn evaluation_starts_after_min_data_points() {
        assert_eq!(first_evaluated_index(0), 1);
        assert_eq!(first_evaluated_index(2), 1);
        assert_eq!(first_evaluated_index(15), 14);
    }

    #[test]
    fn batch_signals_match_per_bar_signals() {
        let series = bars(&[
            50.0, 48.0, 47.5, 49.0, 52.0, 51.0, 55.0, 54.0, 50.0, 46.0, 45.0, 47.0, 52.0, 53.0,
        ]);
        let mut params = HashMap::new();
        params.insert("period".to_string(), 3.0);
        params.insert("fastPeriod".to_string(), 2.0);
        params.insert("slowPeriod".to_string(), 4.0);

        for id in TEMPLATE_IDS {
            let strategy = create_strategy(id, params.clone()).unwrap();
            let first = first_evaluated_index(strategy.get_min_data_points());
            let expected: Vec<SignalAction> = (0..series.len())
                .map(|i| {
                    if i < first {
                        SignalAction::Hold
                    } else {
                        strategy.generate_signal(&series[..=i], i)
                    }
                })
                .collect();
            assert_eq!(strategy.generate_signals(&series), expected, "{}", id);
        }
    }
}
