use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A single FIFO cost-basis lot (spec §3, §4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Lot {
    pub amount: Decimal,
    pub cost: Decimal,
}

/// A per-token position inside a `Portfolio` (spec §3).
///
/// `lots` is the FIFO queue `executeTrade` consumes from on sells and appends
/// to on buys. `lots_stale` marks a position whose aggregate fields were set
/// through the `updatePosition` fast path (spec §9 Open Question b) without
/// touching the queue; `portfolio::PortfolioManager` reconstructs a single
/// synthetic lot from `total_amount`/`average_purchase_price` the next time
/// `executeTrade` touches this position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub address: String,
    pub lots: VecDeque<Lot>,
    pub total_amount: Decimal,
    pub average_purchase_price: Decimal,
    pub current_price: Decimal,
    pub value: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub lots_stale: bool,
}

impl Position {
    pub fn new(address: String) -> Self {
        Self {
            address,
            lots: VecDeque::new(),
            total_amount: Decimal::ZERO,
            average_purchase_price: Decimal::ZERO,
            current_price: Decimal::ZERO,
            value: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            lots_stale: false,
        }
    }

    /// Marks the position up to the given price and recomputes its value and
    /// unrealized P&L. Called every round after `refreshPrices`.
    pub fn mark_to_market(&mut self, price: Decimal) {
        self.current_price = price;
        self.value = self.total_amount * price;
        let cost_basis = self.total_amount * self.average_purchase_price;
        self.unrealized_pnl = self.value - cost_basis;
    }
}

/// Per-experiment financial state (spec §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub experiment_id: uuid::Uuid,
    pub available_balance: Decimal,
    pub positions: HashMap<String, Position>,
}

impl Portfolio {
    pub fn new(experiment_id: uuid::Uuid, initial_native: Decimal) -> Self {
        Self {
            experiment_id,
            available_balance: initial_native,
            positions: HashMap::new(),
        }
    }

    pub fn total_invested(&self) -> Decimal {
        self.positions
            .values()
            .map(|p| p.total_amount * p.average_purchase_price)
            .sum()
    }

    pub fn total_positions_value(&self) -> Decimal {
        self.positions.values().map(|p| p.value).sum()
    }

    pub fn total_value(&self) -> Decimal {
        self.available_balance + self.total_positions_value()
    }

    pub fn total_pnl(&self) -> Decimal {
        self.positions
            .values()
            .map(|p| p.realized_pnl + p.unrealized_pnl)
            .sum()
    }
}
