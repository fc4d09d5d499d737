use crate::indicators;
use crate::models::*;
use crate::param_utils::{get_param_f64_clamped, get_param_usize_at_least};
use std::collections::HashMap;

pub struct RSIStrategy {
    pub template_id: String,
    period: usize,
    oversold_level: f64,
    overbought_level: f64,
}

impl RSIStrategy {
    pub fn new(parameters: HashMap<String, f64>) -> Self {
        let period = get_param_usize_at_least(&parameters, "period", 14, 1);
        let oversold_level = get_param_f64_clamped(&parameters, "oversoldLevel", 30.0, 0.0, 100.0);
        let overbought_level =
            get_param_f64_clamped(&parameters, "overboughtLevel", 70.0, 0.0, 100.0);
        Self {
            template_id: "rsi".to_string(),
            period,
            oversold_level,
            overbought_level,
        }
    }

    fn classify(&self, rsi: f64) -> SignalAction {
        if rsi < self.oversold_level {
            SignalAction::Buy
        } else if rsi > self.overbought_level {
            SignalAction::Sell
        } else {
            SignalAction::Hold
        }
    }
}

impl super::SignalEvaluator for RSIStrategy {
    fn get_template_id(&self) -> &str {
        &self.template_id
    }

    fn generate_signal(&self, bars: &[PriceBar], bar_index: usize) -> SignalAction {
        match indicators::calculate_rsi_at(bars, self.period, bar_index) {
            Some(current_rsi) => self.classify(current_rsi),
            None => SignalAction::Hold,
        }
    }

    fn get_min_data_points(&self) -> usize {
        self.period + 1
    }

    // Wilder smoothing depends on the whole history, so the series is built once.
    fn generate_signals(&self, bars: &[PriceBar]) -> Vec<SignalAction> {
        let rsi_values = indicators::calculate_rsi(&indicators::closes(bars), self.period);
        rsi_values
            .into_iter()
            .enumerate()
            .map(|(bar_index, value)| {
                if bar_index < self.period {
                    SignalAction::Hold
                } else {
                    self.classify(value)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::SignalEvaluator;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(closes: impl Iterator<Item = f64>) -> Vec<PriceBar> {
        let base = Utc.with_ymd_and_hms(2021, 7, 1, 0, 0, 0).unwrap();
        closes
            .enumerate()
            .map(|(i, close)| PriceBar {
                timestamp: base + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn oversold_buys_and_overbought_sells() {
        let mut params = HashMap::new();
        params.insert("period".to_string(), 3.0);
        let strategy = RSIStrategy::new(params);

        let falling = bars((0..6).map(|i| 100.0 - i as f64));
        let rising = bars((0..6).map(|i| 100.0 + i as f64));

        assert_eq!(strategy.generate_signal(&falling, 5), SignalAction::Buy);
        assert_eq!(strategy.generate_signal(&rising, 5), SignalAction::Sell);
        // Not enough history for a reading.
        assert_eq!(strategy.generate_signal(&rising, 2), SignalAction::Hold);
    }

    #[test]
    fn neutral_reading_holds() {
        let strategy = RSIStrategy::new(HashMap::new());
        let flat = bars(std::iter::repeat(50.0).take(30));
        assert_eq!(strategy.generate_signal(&flat, 29), SignalAction::Hold);
        assert_eq!(strategy.get_min_data_points(), 15);
    }

    #[test]
    fn series_pass_matches_bar_by_bar_evaluation() {
        let mut params = HashMap::new();
        params.insert("period".to_string(), 4.0);
        let strategy = RSIStrategy::new(params);
        let series = bars((0..60).map(|i| 100.0 + 8.0 * ((i as f64) * 0.45).sin()));

        let signals = strategy.generate_signals(&series);
        assert_eq!(signals.len(), series.len());
        for (i, signal) in signals.iter().enumerate().skip(1) {
            assert_eq!(*signal, strategy.generate_signal(&series[..=i], i));
        }
        assert!(signals.contains(&SignalAction::Buy));
        assert!(signals.contains(&SignalAction::Sell));
    }
}
