use crate::error::BacktestError;
use crate::param_utils::{coerce_binary_param, get_param};
use std::collections::HashMap;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_POSITION_SIZE_FRACTION: f64 = 0.1;
pub const DEFAULT_TIMEFRAME: &str = "1d";
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;
const MIN_RISK_FREE_RATE: f64 = 0.0;
const MAX_RISK_FREE_RATE: f64 = 1.0;

/// Settings for the Sharpe ratio calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSettings {
    pub risk_free_rate: f64, // annual
    pub periods_per_year: f64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

impl MetricsSettings {
    /// Reads `RISK_FREE_RATE` and `PERIODS_PER_YEAR`. Missing or blank keys
    /// fall back to the defaults.
    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self, BacktestError> {
        let risk_free_rate = optional_setting_f64(
            settings,
            "RISK_FREE_RATE",
            DEFAULT_RISK_FREE_RATE,
            Some(MIN_RISK_FREE_RATE),
            Some(MAX_RISK_FREE_RATE),
        )?;
        let periods_per_year = optional_setting_f64(
            settings,
            "PERIODS_PER_YEAR",
            DEFAULT_PERIODS_PER_YEAR,
            None,
            None,
        )?;
        if periods_per_year <= 0.0 {
            return Err(BacktestError::InvalidSetting {
                key: "PERIODS_PER_YEAR".to_string(),
                reason: format!("must be > 0 (value: {})", periods_per_year),
            });
        }

        Ok(Self {
            risk_free_rate,
            periods_per_year,
        })
    }

    pub fn risk_free_rate_per_period(&self) -> f64 {
        self.risk_free_rate / self.periods_per_year
    }
}

/// Everything a single backtest run needs besides bars and a signal rule.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub position_size_fraction: f64,
    /// Informational only; never used in arithmetic.
    pub timeframe_label: String,
    /// Close a still-open position at the final bar instead of dropping it.
    pub close_open_position_at_end: bool,
    pub metrics: MetricsSettings,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            position_size_fraction: DEFAULT_POSITION_SIZE_FRACTION,
            timeframe_label: DEFAULT_TIMEFRAME.to_string(),
            close_open_position_at_end: false,
            metrics: MetricsSettings::default(),
        }
    }
}

impl BacktestConfig {
    pub fn new(initial_capital: f64, position_size_fraction: f64) -> Self {
        Self {
            initial_capital,
            position_size_fraction,
            ..Self::default()
        }
    }

    /// Create a config from a parameter map using camelCase keys.
    pub fn from_parameters(parameters: &HashMap<String, f64>) -> Self {
        Self {
            initial_capital: get_param(parameters, "initialCapital", DEFAULT_INITIAL_CAPITAL),
            position_size_fraction: get_param(
                parameters,
                "positionSize",
                DEFAULT_POSITION_SIZE_FRACTION,
            ),
            timeframe_label: DEFAULT_TIMEFRAME.to_string(),
            close_open_position_at_end: coerce_binary_param(
                get_param(parameters, "closeAtEnd", 0.0),
                0.0,
            ) >= 0.5,
            metrics: MetricsSettings {
                risk_free_rate: get_param(parameters, "riskFreeRate", DEFAULT_RISK_FREE_RATE),
                periods_per_year: get_param(
                    parameters,
                    "periodsPerYear",
                    DEFAULT_PERIODS_PER_YEAR,
                ),
            },
        }
    }

    pub fn with_timeframe(mut self, label: impl Into<String>) -> Self {
        self.timeframe_label = label.into();
        self
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::InvalidCapital(self.initial_capital));
        }
        let fraction = self.position_size_fraction;
        if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
            return Err(BacktestError::InvalidPositionSize(fraction));
        }
        let rate = self.metrics.risk_free_rate;
        if !rate.is_finite() || !(MIN_RISK_FREE_RATE..=MAX_RISK_FREE_RATE).contains(&rate) {
            return Err(BacktestError::InvalidSetting {
                key: "riskFreeRate".to_string(),
                reason: format!(
                    "must be between {} and {} (value: {})",
                    MIN_RISK_FREE_RATE, MAX_RISK_FREE_RATE, rate
                ),
            });
        }
        if !self.metrics.periods_per_year.is_finite() || self.metrics.periods_per_year <= 0.0 {
            return Err(BacktestError::InvalidSetting {
                key: "periodsPerYear".to_string(),
                reason: format!("must be > 0 (value: {})", self.metrics.periods_per_year),
            });
        }
        Ok(())
    }
}

fn optional_setting_f64(
    settings: &HashMap<String, String>,
    key: &str,
    default: f64,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<f64, BacktestError> {
    let Some(raw) = settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
    else {
        return Ok(default);
    };

    let invalid = |reason: String| BacktestError::InvalidSetting {
        key: key.to_string(),
        reason,
    };

    let value = raw
        .parse::<f64>()
        .map_err(|_| invalid(format!("must be a number (value: {})", raw)))?;
    if !value.is_finite() {
        return Err(invalid(format!("must be finite (value: {})", raw)));
    }
    if let Some(min_value) = min {
        if value < min_value {
            return Err(invalid(format!("must be >= {} (value: {})", min_value, raw)));
        }
    }
    if let Some(max_value) = max {
        if value > max_value {
            return Err(invalid(format!("must be <= {} (value: {})", max_value, raw)));
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn metrics_settings_default_when_keys_missing() {
        let parsed = MetricsSettings::from_settings_map(&HashMap::new()).unwrap();
        assert_eq!(parsed, MetricsSettings::default());

        let blank = MetricsSettings::from_settings_map(&settings(&[("RISK_FREE_RATE", "  ")]))
            .unwrap();
        assert_eq!(blank.risk_free_rate, DEFAULT_RISK_FREE_RATE);
    }

    #[test]
    fn metrics_settings_reject_bad_values() {
        let err = MetricsSettings::from_settings_map(&settings(&[("RISK_FREE_RATE", "abc")]))
            .unwrap_err();
        assert!(matches!(err, BacktestError::InvalidSetting { ref key, .. } if key == "RISK_FREE_RATE"));

        assert!(
            MetricsSettings::from_settings_map(&settings(&[("PERIODS_PER_YEAR", "0")])).is_err()
        );
        assert!(
            MetricsSettings::from_settings_map(&settings(&[("RISK_FREE_RATE", "1.5")])).is_err()
        );

        let parsed = MetricsSettings::from_settings_map(&settings(&[
            ("RISK_FREE_RATE", "0.05"),
            ("PERIODS_PER_YEAR", "365"),
        ]))
        .unwrap();
        assert!((parsed.risk_free_rate_per_period() - 0.05 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn validate_checks_capital_and_fraction() {
        assert!(BacktestConfig::default().validate().is_ok());
        assert_eq!(
            BacktestConfig::new(0.0, 0.1).validate(),
            Err(BacktestError::InvalidCapital(0.0))
        );
        assert_eq!(
            BacktestConfig::new(1000.0, 0.0).validate(),
            Err(BacktestError::InvalidPositionSize(0.0))
        );
        assert_eq!(
            BacktestConfig::new(1000.0, 1.5).validate(),
            Err(BacktestError::InvalidPositionSize(1.5))
        );
        assert!(BacktestConfig::new(1000.0, 1.0).validate().is_ok());
        assert!(BacktestConfig::new(f64::NAN, 0.5).validate().is_err());
    }

    #[test]
    fn validate_applies_settings_map_rate_range() {
        let mut params = HashMap::new();
        params.insert("riskFreeRate".to_string(), 1.5);
        let err = BacktestConfig::from_parameters(&params).validate().unwrap_err();
        assert!(matches!(err, BacktestError::InvalidSetting { ref key, .. } if key == "riskFreeRate"));

        params.insert("riskFreeRate".to_string(), -0.01);
        assert!(BacktestConfig::from_parameters(&params).validate().is_err());

        params.insert("riskFreeRate".to_string(), 1.0);
        assert!(BacktestConfig::from_parameters(&params).validate().is_ok());
        params.insert("riskFreeRate".to_string(), 0.0);
        assert!(BacktestConfig::from_parameters(&params).validate().is_ok());
    }

    #[test]
    fn from_parameters_reads_camel_case_keys() {
        let mut params = HashMap::new();
        params.insert("initialCapital".to_string(), 2500.0);
        params.insert("positionSize".to_string(), 0.25);
        params.insert("closeAtEnd".to_string(), 1.0);

        let config = BacktestConfig::from_parameters(&params);
        assert_eq!(config.initial_capital, 2500.0);
        assert_eq!(config.position_size_fraction, 0.25);
        assert!(config.close_open_position_at_end);
        assert_eq!(config.metrics, MetricsSettings::default());
    }
}
