use crate::models::*;
use std::cmp::Ordering;

/// Buys when the close rises over the previous close and sells when it falls.
pub struct CloseComparisonStrategy {
    template_id: String,
}

impl CloseComparisonStrategy {
    pub fn new() -> Self {
        Self {
            template_id: "close_comparison".to_string(),
        }
    }
}

impl Default for CloseComparisonStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl super::SignalEvaluator for CloseComparisonStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signal(&self, bars: &[PriceBar], bar_index: usize) -> SignalAction {
        if bar_index == 0 || bar_index >= bars.len() {
            return SignalAction::Hold;
        }

        let previous = bars[bar_index - 1].close;
        let current = bars[bar_index].close;
        match current.partial_cmp(&previous) {
            Some(Ordering::Greater) => SignalAction::Buy,
            Some(Ordering::Less) => SignalAction::Sell,
            _ => SignalAction::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::SignalEvaluator;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn compares_consecutive_closes() {
        let base = Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap();
        let bars: Vec<PriceBar> = [10.0, 11.0, 11.0, 9.5]
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: base + Duration::hours(i as i64),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 0.0,
            })
            .collect();
        let strategy = CloseComparisonStrategy::new();

        assert_eq!(strategy.generate_signal(&bars, 0), SignalAction::Hold);
        assert_eq!(strategy.generate_signal(&bars, 1), SignalAction::Buy);
        assert_eq!(strategy.generate_signal(&bars, 2), SignalAction::Hold);
        assert_eq!(strategy.generate_signal(&bars, 3), SignalAction::Sell);
        assert_eq!(strategy.generate_signal(&bars, 4), SignalAction::Hold);
    }
}
