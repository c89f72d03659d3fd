use crate::error::PortfolioError;
use core_types::enums::TradeAction;
use core_types::ledger::{Lot, Portfolio, Position};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Outcome of `executeTrade` (spec §4.3) — mirrors the uniform
/// `{success, reason?}` shape every executor operation returns (spec §7),
/// carried alongside the realized P&L delta a sell produced.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub success: bool,
    pub reason: Option<String>,
    pub realized_pnl_delta: Decimal,
}

impl TradeOutcome {
    fn ok(realized_pnl_delta: Decimal) -> Self {
        Self {
            success: true,
            reason: None,
            realized_pnl_delta,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            realized_pnl_delta: Decimal::ZERO,
        }
    }
}

/// The per-experiment financial ledger (spec §4.3). Holds no state itself —
/// every call takes the `Portfolio` it operates on — so one manager can
/// serve every experiment the scheduler drives.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortfolioManager;

impl PortfolioManager {
    pub fn new() -> Self {
        Self
    }

    pub fn create_portfolio(&self, experiment_id: Uuid, initial_native: Decimal) -> Portfolio {
        Portfolio::new(experiment_id, initial_native)
    }

    /// `updatePosition` — the idempotent "set" used by holding-sync paths
    /// (spec §4.3). Replaces the position's aggregate view without touching
    /// the FIFO lot queue; marks the position `lots_stale` so the next
    /// `execute_trade` reconstructs a single synthetic lot from the declared
    /// aggregate cost before proceeding (spec §9 Open Question b).
    pub fn update_position(
        &self,
        portfolio: &mut Portfolio,
        address: &str,
        amount: Decimal,
        avg_price: Decimal,
    ) {
        let position = portfolio
            .positions
            .entry(address.to_string())
            .or_insert_with(|| Position::new(address.to_string()));

        position.total_amount = amount;
        position.average_purchase_price = avg_price;
        position.lots_stale = true;

        if amount.is_zero() {
            position.lots.clear();
            position.lots_stale = false;
        }
    }

    /// Rebuilds a single synthetic lot matching the declared aggregate, so
    /// FIFO consumption on the next sell has something to consume from.
    fn reconcile_stale_lots(position: &mut Position) {
        if !position.lots_stale {
            return;
        }
        position.lots.clear();
        if !position.total_amount.is_zero() {
            position.lots.push_back(Lot {
                amount: position.total_amount,
                cost: position.total_amount * position.average_purchase_price,
            });
        }
        position.lots_stale = false;
    }

    /// `executeTrade` — the only mutator of a position's FIFO queue (spec
    /// §4.3). Buys append a lot; sells consume from the head of the queue,
    /// allowing partial consumption of the head lot.
    pub fn execute_trade(
        &self,
        portfolio: &mut Portfolio,
        address: &str,
        direction: TradeAction,
        token_amount: Decimal,
        unit_price: Decimal,
    ) -> Result<TradeOutcome, PortfolioError> {
        match direction {
            TradeAction::Buy => self.execute_buy(portfolio, address, token_amount, unit_price),
            TradeAction::Sell => self.execute_sell(portfolio, address, token_amount, unit_price),
        }
    }

    fn execute_buy(
        &self,
        portfolio: &mut Portfolio,
        address: &str,
        token_amount: Decimal,
        unit_price: Decimal,
    ) -> Result<TradeOutcome, PortfolioError> {
        let cost = token_amount * unit_price;
        if portfolio.available_balance < cost {
            return Ok(TradeOutcome::fail("insufficient funds"));
        }

        portfolio.available_balance -= cost;

        let position = portfolio
            .positions
            .entry(address.to_string())
            .or_insert_with(|| Position::new(address.to_string()));
        Self::reconcile_stale_lots(position);

        position.lots.push_back(Lot {
            amount: token_amount,
            cost,
        });
        position.total_amount += token_amount;

        let total_cost: Decimal = position.lots.iter().map(|l| l.cost).sum();
        position.average_purchase_price = if position.total_amount.is_zero() {
            Decimal::ZERO
        } else {
            total_cost / position.total_amount
        };

        Ok(TradeOutcome::ok(Decimal::ZERO))
    }

    fn execute_sell(
        &self,
        portfolio: &mut Portfolio,
        address: &str,
        token_amount: Decimal,
        unit_price: Decimal,
    ) -> Result<TradeOutcome, PortfolioError> {
        let position = portfolio
            .positions
            .get_mut(address)
            .ok_or_else(|| PortfolioError::PositionNotFound(address.to_string()))?;
        Self::reconcile_stale_lots(position);

        if position.total_amount < token_amount {
            return Ok(TradeOutcome::fail(format!(
                "insufficient holdings: requested {token_amount}, available {}",
                position.total_amount
            )));
        }

        let mut remaining = token_amount;
        let mut cost_of_sold = Decimal::ZERO;

        while remaining > Decimal::ZERO {
            let Some(front) = position.lots.front_mut() else {
                break;
            };
            if front.amount <= remaining {
                cost_of_sold += front.cost;
                remaining -= front.amount;
                position.lots.pop_front();
            } else {
                let portion = remaining / front.amount;
                let portion_cost = front.cost * portion;
                cost_of_sold += portion_cost;
                front.amount -= remaining;
                front.cost -= portion_cost;
                remaining = Decimal::ZERO;
            }
        }

        let proceeds = token_amount * unit_price;
        let realized_delta = proceeds - cost_of_sold;

        position.total_amount -= token_amount;
        let total_cost: Decimal = position.lots.iter().map(|l| l.cost).sum();
        position.average_purchase_price = if position.total_amount.is_zero() {
            Decimal::ZERO
        } else {
            total_cost / position.total_amount
        };
        position.realized_pnl += realized_delta;

        portfolio.available_balance += proceeds;

        Ok(TradeOutcome::ok(realized_delta))
    }

    /// Marks every open position to the supplied prices; tokens without a
    /// price this round are left untouched (spec §7 `PriceUnavailable`).
    pub fn mark_to_market(&self, portfolio: &mut Portfolio, prices: &std::collections::HashMap<String, Decimal>) {
        for (address, position) in portfolio.positions.iter_mut() {
            if let Some(price) = prices.get(address) {
                position.mark_to_market(*price);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fresh_portfolio(balance: Decimal) -> Portfolio {
        Portfolio::new(Uuid::new_v4(), balance)
    }

    #[test]
    fn s1_fifo_realized_pnl_across_two_buys_and_a_sell_all() {
        let mgr = PortfolioManager::new();
        let mut p = fresh_portfolio(dec!(1));

        // Buy 1 card worth (0.025 native) @ price 0.5 -> 0.05 tokens.
        let buy1_amount = dec!(0.05);
        mgr.execute_trade(&mut p, "tokenX", TradeAction::Buy, buy1_amount, dec!(0.5))
            .unwrap();

        // Buy 1 more card (0.025 native) @ price 1.0 -> 0.025 tokens.
        let buy2_amount = dec!(0.025);
        mgr.execute_trade(&mut p, "tokenX", TradeAction::Buy, buy2_amount, dec!(1.0))
            .unwrap();

        let position = &p.positions["tokenX"];
        assert_eq!(position.total_amount, dec!(0.075));

        // Sell everything @ 0.75.
        let outcome = mgr
            .execute_trade(&mut p, "tokenX", TradeAction::Sell, dec!(0.075), dec!(0.75))
            .unwrap();
        assert!(outcome.success);

        // proceeds = 0.075*0.75 = 0.05625; cost = 0.025+0.025=0.05; pnl=0.00625
        assert_eq!(outcome.realized_pnl_delta, dec!(0.00625));
        assert_eq!(p.positions["tokenX"].total_amount, Decimal::ZERO);
    }

    #[test]
    fn invariant_3_available_balance_never_negative_on_buy() {
        let mgr = PortfolioManager::new();
        let mut p = fresh_portfolio(dec!(0.01));
        let outcome = mgr
            .execute_trade(&mut p, "tokenX", TradeAction::Buy, dec!(0.025), dec!(1))
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.reason.as_deref(), Some("insufficient funds"));
        assert_eq!(p.available_balance, dec!(0.01));
    }

    #[test]
    fn invariant_2_lot_amounts_sum_to_total_amount() {
        let mgr = PortfolioManager::new();
        let mut p = fresh_portfolio(dec!(10));
        mgr.execute_trade(&mut p, "tokenX", TradeAction::Buy, dec!(2), dec!(1))
            .unwrap();
        mgr.execute_trade(&mut p, "tokenX", TradeAction::Buy, dec!(3), dec!(2))
            .unwrap();
        let position = &p.positions["tokenX"];
        let lot_sum: Decimal = position.lots.iter().map(|l| l.amount).sum();
        assert_eq!(lot_sum, position.total_amount);
    }

    #[test]
    fn partial_sell_consumes_head_lot_partially() {
        let mgr = PortfolioManager::new();
        let mut p = fresh_portfolio(dec!(10));
        mgr.execute_trade(&mut p, "tokenX", TradeAction::Buy, dec!(5), dec!(1))
            .unwrap();
        mgr.execute_trade(&mut p, "tokenX", TradeAction::Sell, dec!(2), dec!(1))
            .unwrap();
        let position = &p.positions["tokenX"];
        assert_eq!(position.lots.len(), 1);
        assert_eq!(position.lots.front().unwrap().amount, dec!(3));
        assert_eq!(position.total_amount, dec!(3));
    }

    #[test]
    fn update_position_then_trade_reconciles_stale_lots() {
        let mgr = PortfolioManager::new();
        let mut p = fresh_portfolio(dec!(10));
        // Holding sync sets an aggregate position without any lots.
        mgr.update_position(&mut p, "tokenY", dec!(4), dec!(0.5));
        assert!(p.positions["tokenY"].lots_stale);

        // Next trade must reconstruct a synthetic lot before selling.
        let outcome = mgr
            .execute_trade(&mut p, "tokenY", TradeAction::Sell, dec!(4), dec!(0.6))
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.realized_pnl_delta, dec!(0.4)); // proceeds 2.4 - cost 2.0
        assert!(!p.positions["tokenY"].lots_stale);
    }

    #[test]
    fn sell_exceeding_holdings_fails_without_mutating_state() {
        let mgr = PortfolioManager::new();
        let mut p = fresh_portfolio(dec!(10));
        mgr.execute_trade(&mut p, "tokenX", TradeAction::Buy, dec!(1), dec!(1))
            .unwrap();
        let outcome = mgr
            .execute_trade(&mut p, "tokenX", TradeAction::Sell, dec!(2), dec!(1))
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(p.positions["tokenX"].total_amount, dec!(1));
    }
}
