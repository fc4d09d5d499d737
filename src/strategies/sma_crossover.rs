use crate::indicators::sma_at;
use crate::models::*;
use crate::param_utils::get_param_usize_at_least;
use std::collections::HashMap;

/// Buys when the fast SMA crosses above the slow SMA, sells on the reverse cross.
pub struct SmaCrossoverStrategy {
    template_id: String,
    fast_period: usize,
    slow_period: usize,
}

impl SmaCrossoverStrategy {
    pub fn new(parameters: HashMap<String, f64>) -> Self {
        let fast = get_param_usize_at_least(&parameters, "fastPeriod", 8, 1);
        let slow = get_param_usize_at_least(&parameters, "slowPeriod", 21, 1);
        // A swapped pair still describes the same crossover.
        let (fast_period, slow_period) = if fast <= slow { (fast, slow) } else { (slow, fast) };
        Self {
            template_id: "sma_crossover".to_string(),
            fast_period,
            slow_period,
        }
    }
}

impl super::SignalEvaluator for SmaCrossoverStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signal(&self, bars: &[PriceBar], bar_index: usize) -> SignalAction {
        if bar_index == 0 || bar_index >= bars.len() || self.fast_period == self.slow_period {
            return SignalAction::Hold;
        }

        let (Some(fast_prev), Some(slow_prev), Some(fast_now), Some(slow_now)) = (
            sma_at(bars, self.fast_period, bar_index - 1),
            sma_at(bars, self.slow_period, bar_index - 1),
            sma_at(bars, self.fast_period, bar_index),
            sma_at(bars, self.slow_period, bar_index),
        ) else {
            return SignalAction::Hold;
        };

        if fast_prev <= slow_prev && fast_now > slow_now {
            SignalAction::Buy
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            SignalAction::Sell
        } else {
            SignalAction::Hold
        }
    }

    fn get_min_data_points(&self) -> usize {
        self.slow_period + 1
    }
}
