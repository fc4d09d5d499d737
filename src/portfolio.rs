//! Trade-log aggregation across symbols.
//!
//! Unlike [`crate::backtester`], nothing here walks bars: the ledger only
//! applies buy/sell events, tracks cash and average-cost positions, and
//! feeds realized sell profits to the same [`PerformanceCalculator`].

use crate::config::MetricsSettings;
use crate::error::PortfolioError;
use crate::models::PerformanceReport;
use crate::performance::PerformanceCalculator;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const QUANTITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    #[serde(rename = "type")]
    pub side: LedgerSide,
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub entry_date: DateTime<Utc>,
    pub pnl: f64,
    pub pnl_percentage: f64,
}

impl Position {
    fn mark(&mut self, price: f64) {
        self.current_price = price;
        self.pnl = (price - self.entry_price) * self.quantity;
        self.pnl_percentage = if self.entry_price > 0.0 {
            (price / self.entry_price - 1.0) * 100.0
        } else {
            0.0
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub cash: f64,
    pub positions: Vec<Position>,
    /// Percent of total value per symbol, plus a `cash` entry.
    pub allocation: BTreeMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    initial_capital: f64,
    cash: f64,
    positions: BTreeMap<String, Position>,
    history: Vec<LedgerEvent>,
    realized_profits: Vec<f64>,
}

impl PortfolioLedger {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            history: Vec::new(),
            realized_profits: Vec::new(),
        }
    }

    /// Replays a recorded event log in order, stopping at the first rejected event.
    pub fn from_events(
        initial_capital: f64,
        events: &[LedgerEvent],
    ) -> Result<Self, PortfolioError> {
        let mut ledger = Self::new(initial_capital);
        for event in events {
            match event.side {
                LedgerSide::Buy => {
                    ledger.buy(&event.symbol, event.quantity, event.price, event.timestamp)?
                }
                LedgerSide::Sell => {
                    ledger.sell(&event.symbol, event.quantity, event.price, event.timestamp)?;
                }
            }
        }
        Ok(ledger)
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(&normalize_symbol(symbol))
    }

    pub fn history(&self) -> &[LedgerEvent] {
        &self.history
    }

    pub fn realized_profits(&self) -> &[f64] {
        &self.realized_profits
    }

    pub fn buy(
        &mut self,
        symbol: &str,
        quantity: f64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PortfolioError> {
        let symbol = normalize_symbol(symbol);
        validate_order(&symbol, quantity, price)?;

        let cost = quantity * price;
        if self.cash < cost {
            return Err(PortfolioError::InsufficientFunds {
                required: cost,
                available: self.cash,
            });
        }

        match self.positions.get_mut(&symbol) {
            Some(position) => {
                let total_quantity = position.quantity + quantity;
                position.entry_price = (position.entry_price * position.quantity
                    + price * quantity)
                    / total_quantity;
                position.quantity = total_quantity;
                position.mark(price);
            }
            None => {
                let mut position = Position {
                    symbol: symbol.clone(),
                    quantity,
                    entry_price: price,
                    current_price: price,
                    entry_date: timestamp,
                    pnl: 0.0,
                    pnl_percentage: 0.0,
                };
                position.mark(price);
                self.positions.insert(symbol.clone(), position);
            }
        }

        self.cash -= cost;
        debug!("Bought {} {} at {}", quantity, symbol, price);
        self.history.push(LedgerEvent {
            side: LedgerSide::Buy,
            symbol,
            quantity,
            price,
            timestamp,
        });
        Ok(())
    }

    /// Reduces or closes a position and returns the realized profit against
    /// the average entry price.
    pub fn sell(
        &mut self,
        symbol: &str,
        quantity: f64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<f64, PortfolioError> {
        let symbol = normalize_symbol(symbol);
        validate_order(&symbol, quantity, price)?;

        let position = self
            .positions
            .get_mut(&symbol)
            .ok_or_else(|| PortfolioError::UnknownPosition(symbol.clone()))?;
        if position.quantity + QUANTITY_EPSILON < quantity {
            return Err(PortfolioError::InsufficientQuantity {
                symbol,
                requested: quantity,
                held: position.quantity,
            });
        }

        let profit = (price - position.entry_price) * quantity;
        position.quantity -= quantity;
        if position.quantity <= QUANTITY_EPSILON {
            self.positions.remove(&symbol);
        } else {
            position.mark(price);
        }

        self.cash += quantity * price;
        self.realized_profits.push(profit);
        debug!(
            "Sold {} {} at {}, realized {:.4}",
            quantity, symbol, price, profit
        );
        self.history.push(LedgerEvent {
            side: LedgerSide::Sell,
            symbol,
            quantity,
            price,
            timestamp,
        });
        Ok(profit)
    }

    /// Marks open positions to `prices` (symbols missing from the map keep
    /// their last known price) and computes allocation percentages.
    pub fn summary(&mut self, prices: &HashMap<String, f64>) -> PortfolioSummary {
        for (symbol, position) in self.positions.iter_mut() {
            if let Some(price) = prices
                .get(symbol)
                .copied()
                .filter(|p| p.is_finite() && *p > 0.0)
            {
                position.mark(price);
            }
        }

        let positions_value: BTreeMap<String, f64> = self
            .positions
            .iter()
            .map(|(symbol, position)| (symbol.clone(), position.quantity * position.current_price))
            .collect();
        let total_value = self.cash + positions_value.values().sum::<f64>();

        let percent_of_total = |value: f64| {
            if total_value > 0.0 {
                value / total_value * 100.0
            } else {
                0.0
            }
        };
        let mut allocation: BTreeMap<String, f64> = positions_value
            .iter()
            .map(|(symbol, value)| (symbol.clone(), percent_of_total(*value)))
            .collect();
        allocation.insert("cash".to_string(), percent_of_total(self.cash));

        PortfolioSummary {
            total_value,
            cash: self.cash,
            positions: self.positions.values().cloned().collect(),
            allocation,
        }
    }

    /// Metrics over realized sell profits, one entry per sell.
    pub fn performance(&self, settings: &MetricsSettings) -> PerformanceReport {
        PerformanceCalculator::calculate_report(
            &self.realized_profits,
            self.initial_capital,
            settings,
        )
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn validate_order(symbol: &str, quantity: f64, price: f64) -> Result<(), PortfolioError> {
    let reason = if symbol.is_empty() {
        Some("symbol must not be empty")
    } else if !quantity.is_finite() || quantity <= 0.0 {
        Some("quantity must be positive")
    } else if !price.is_finite() || price <= 0.0 {
        Some("price must be positive")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PortfolioError::InvalidOrder {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
