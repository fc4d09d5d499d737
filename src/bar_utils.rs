use crate::error::BacktestError;
use crate::models::PriceBar;

/// Checks that timestamps strictly increase, prices are positive and finite,
/// and volume is a non-negative finite number.
pub fn validate_bar_series(bars: &[PriceBar]) -> Result<(), BacktestError> {
    for (index, bar) in bars.iter().enumerate() {
        validate_bar(index, bar)?;
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(BacktestError::NonIncreasingTimestamp { index });
        }
    }
    Ok(())
}

fn validate_bar(index: usize, bar: &PriceBar) -> Result<(), BacktestError> {
    let prices = [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
    ];
    for (field, value) in prices {
        if !value.is_finite() || value <= 0.0 {
            return Err(BacktestError::InvalidBar {
                index,
                field,
                value,
            });
        }
    }
    if !bar.volume.is_finite() || bar.volume < 0.0 {
        return Err(BacktestError::InvalidBar {
            index,
            field: "volume",
            value: bar.volume,
        });
    }
    Ok(())
}
