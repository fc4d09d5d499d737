use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sampled interval of market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Long => "long",
            TradeDirection::Short => "short",
        }
    }

    pub fn position_state(&self) -> PositionState {
        match self {
            TradeDirection::Long => PositionState::Long,
            TradeDirection::Short => PositionState::Short,
        }
    }
}

/// A round-trip position. `exit_price`, `exit_time` and `profit` are set
/// together by [`Trade::close`] and never touched afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub size: f64,
    pub exit_price: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
    pub profit: Option<f64>,
}

impl Trade {
    pub fn open(
        direction: TradeDirection,
        entry_price: f64,
        entry_time: DateTime<Utc>,
        size: f64,
    ) -> Self {
        Self {
            direction,
            entry_price,
            entry_time,
            size,
            exit_price: None,
            exit_time: None,
            profit: None,
        }
    }

    /// Profit this trade would realize if closed at `exit_price`.
    pub fn profit_at(&self, exit_price: f64) -> f64 {
        match self.direction {
            TradeDirection::Long => (exit_price - self.entry_price) * self.size,
            TradeDirection::Short => (self.entry_price - exit_price) * self.size,
        }
    }

    /// Finalizes the trade and returns the realized profit.
    pub fn close(&mut self, exit_price: f64, exit_time: DateTime<Utc>) -> f64 {
        let profit = self.profit_at(exit_price);
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
        self.profit = Some(profit);
        profit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub average_win: f64,
    pub average_loss: f64,
    /// `f64::INFINITY` when there are wins and no losses, written as the
    /// string `"Infinity"` since JSON has no infinite numbers.
    #[serde(with = "non_finite_f64")]
    pub profit_factor: f64,
    pub total_profit: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            average_win: 0.0,
            average_loss: 0.0,
            profit_factor: 0.0,
            total_profit: 0.0,
            max_drawdown: 0.0,
            sharpe_ratio: 0.0,
        }
    }
}

/// Finite values stay plain numbers; infinities and NaN become the strings
/// `"Infinity"`, `"-Infinity"` and `"NaN"`.
mod non_finite_f64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(de::Error::custom(format!("invalid number '{}'", other))),
            },
        }
    }
}

/// Metrics plus the curves they were derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<f64>,
    pub drawdowns: Vec<f64>,
}

/// Output of a backtest run. Only finalized trades are listed; a position
/// still open at the last bar is reported through
/// [`BacktestRun::open_trade`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<f64>,
    pub drawdowns: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionEventKind {
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEvent {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub kind: PositionEventKind,
    pub direction: TradeDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSignal {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub action: SignalAction,
}

#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub result: BacktestResult,
    pub open_trade: Option<Trade>,
    pub events: Vec<PositionEvent>,
    pub signals: Vec<GeneratedSignal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn closing_sets_exit_fields_together() {
        let entry = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let exit = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let mut trade = Trade::open(TradeDirection::Short, 50.0, entry, 2.0);
        assert!(trade.exit_price.is_none());
        assert!(trade.profit.is_none());

        let profit = trade.close(45.0, exit);
        assert!((profit - 10.0).abs() < 1e-9);
        assert_eq!(trade.exit_price, Some(45.0));
        assert_eq!(trade.exit_time, Some(exit));
        assert_eq!(trade.profit, Some(profit));
    }

    #[test]
    fn infinite_profit_factor_survives_json() {
        let metrics = PerformanceMetrics {
            total_trades: 2,
            winning_trades: 2,
            win_rate: 1.0,
            profit_factor: f64::INFINITY,
            ..PerformanceMetrics::default()
        };
        let value = serde_json::to_value(&metrics).unwrap();
        assert_eq!(value["profit_factor"], serde_json::json!("Infinity"));
        assert_eq!(value["win_rate"], serde_json::json!(1.0));

        let parsed: PerformanceMetrics = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, metrics);

        let finite = serde_json::to_value(PerformanceMetrics {
            profit_factor: 2.5,
            ..PerformanceMetrics::default()
        })
        .unwrap();
        assert_eq!(finite["profit_factor"], serde_json::json!(2.5));
        assert!(serde_json::from_str::<PerformanceMetrics>(
            &finite.to_string().replace("2.5", "\"lots\"")
        )
        .is_err());
    }

    #[test]
    fn result_serializes_with_four_top_level_fields() {
        let result = BacktestResult {
            trades: Vec::new(),
            metrics: PerformanceMetrics::default(),
            equity_curve: vec![1000.0],
            drawdowns: vec![0.0],
        };
        let value = serde_json::to_value(&result).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["drawdowns", "equity_curve", "metrics", "trades"]);
    }
}
