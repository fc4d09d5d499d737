use crate::models::PriceBar;

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|bar| bar.close).collect()
}

/// Simple moving average of the closes of the `period` bars ending at `index`.
pub fn sma_at(bars: &[PriceBar], period: usize, index: usize) -> Option<f64> {
    if period == 0 || index >= bars.len() || index + 1 < period {
        return None;
    }
    let sum: f64 = bars[index + 1 - period..=index]
        .iter()
        .map(|bar| bar.close)
        .sum();
    Some(sum / period as f64)
}

fn rsi_from_avgs(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// Wilder-smoothed RSI. Values before `period` are neutral (50).
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period + 1 {
        return vec![50.0; prices.len()];
    }

    let mut rsi_values = vec![50.0; prices.len()];
    let (sum_gain, sum_loss) = prices[..=period]
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0f64, 0.0f64), |(gain, loss), delta| {
            if delta >= 0.0 {
                (gain + delta, loss)
            } else {
                (gain, loss - delta)
            }
        });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;
    rsi_values[period] = rsi_from_avgs(avg_gain, avg_loss);

    for i in (period + 1)..prices.len() {
        let delta = prices[i] - prices[i - 1];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;
        rsi_values[i] = rsi_from_avgs(avg_gain, avg_loss);
    }

    rsi_values
}

pub fn calculate_rsi_at(bars: &[PriceBar], period: usize, bar_index: usize) -> Option<f64> {
    if period == 0 || bar_index < period || bar_index >= bars.len() {
        return None;
    }
    calculate_rsi(&closes(&bars[..=bar_index]), period)
        .get(bar_index)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone, Utc};

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        let base = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: base + Duration::hours(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn sma_averages_trailing_closes() {
        let series = bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(sma_at(&series, 3, 1), None);
        assert_eq!(sma_at(&series, 3, 2), Some(2.0));
        assert_eq!(sma_at(&series, 3, 5), Some(5.0));
        assert_eq!(sma_at(&series, 1, 4), Some(5.0));
        assert_eq!(sma_at(&series, 0, 3), None);
        assert_eq!(sma_at(&series, 3, 6), None);
    }

    #[test]
    fn rsi_point_lookup_matches_full_series() {
        let series = bars(&[44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1, 45.9]);
        let full = calculate_rsi(&closes(&series), 4);
        assert_eq!(calculate_rsi_at(&series, 4, 3), None);
        for i in 4..series.len() {
            assert_eq!(calculate_rsi_at(&series, 4, i), Some(full[i]));
        }
    }

    #[test]
    fn rsi_extremes_for_monotonic_prices() {
        let rising: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        let flat = vec![10.0; 20];

        assert_eq!(*calculate_rsi(&rising, 14).last().unwrap(), 100.0);
        assert_eq!(*calculate_rsi(&falling, 14).last().unwrap(), 0.0);
        assert_eq!(*calculate_rsi(&flat, 14).last().unwrap(), 50.0);
        assert_eq!(calculate_rsi(&rising[..5], 14), vec![50.0; 5]);
    }

    #[test]
    fn rsi_stays_within_bounds() {
        let prices = [44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1, 45.9];
        for value in calculate_rsi(&prices, 5) {
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
