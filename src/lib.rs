pub mod backtester;
pub mod bar_utils;
pub mod config;
pub mod error;
pub mod indicators;
pub mod market_data;
pub mod models;
pub mod param_utils;
pub mod performance;
pub mod portfolio;
pub mod strategy;

pub use backtester::Backtester;
pub use config::{BacktestConfig, MetricsSettings};
pub use error::{BacktestError, DataError, PortfolioError};
pub use models::{BacktestResult, PerformanceMetrics, PriceBar, SignalAction, Trade};
pub use performance::PerformanceCalculator;
pub use strategy::{create_strategy, FnSignal, SignalEvaluator};
