use crate::error::CardError;
use core_types::enums::TradeAction;
use core_types::token::CardAllocation;
use rust_decimal::Decimal;

/// How many cards a sell request targets (spec §4.2: `cards | "all"`).
///
/// The spec's "all" sentinel is rendered as a typed variant rather than a
/// stringly-typed literal — the natural Rust shape for the same union, and
/// not a behavior change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellCards {
    Count(u32),
    All,
}

/// Discretizes capital into `total_cards` indivisible units per token
/// (spec §4.2). Operates on a `CardAllocation` the caller owns (typically the
/// one stored on `core_types::Token`); every method either returns the new
/// state or mutates `&mut CardAllocation` in place and preserves
/// `native_cards + token_cards == total_cards` on every path.
pub struct CardPositionManager {
    pub min_cards_for_trade: u32,
}

impl Default for CardPositionManager {
    fn default() -> Self {
        Self {
            min_cards_for_trade: 1,
        }
    }
}

impl CardPositionManager {
    pub fn new(min_cards_for_trade: u32) -> Self {
        Self { min_cards_for_trade }
    }

    /// Constructs a fresh, validated `CardAllocation` (spec §3: created with
    /// the configured initial split when a token is first considered for
    /// trading).
    pub fn initial_allocation(
        &self,
        total_cards: u32,
        per_card_native: Decimal,
        native_cards: u32,
        token_cards: u32,
    ) -> Result<CardAllocation, CardError> {
        if !(2..=36).contains(&total_cards) {
            return Err(CardError::TotalCardsOutOfRange(total_cards));
        }
        if native_cards + token_cards != total_cards {
            return Err(CardError::UnbalancedSplit {
                native: native_cards,
                token: token_cards,
                total: total_cards,
            });
        }
        Ok(CardAllocation::new(total_cards, per_card_native, native_cards, token_cards))
    }

    /// `setInitialAllocation` — runtime reconfiguration (spec §4.2). Rejects a
    /// split that doesn't sum to `total_cards`; leaves `allocation` untouched
    /// on error.
    pub fn set_initial_allocation(
        &self,
        allocation: &mut CardAllocation,
        native_cards: u32,
        token_cards: u32,
    ) -> Result<(), CardError> {
        if native_cards + token_cards != allocation.total_cards {
            return Err(CardError::UnbalancedSplit {
                native: native_cards,
                token: token_cards,
                total: allocation.total_cards,
            });
        }
        allocation.native_cards = native_cards;
        allocation.token_cards = token_cards;
        Ok(())
    }

    /// `canTrade` — true iff the relevant side has at least `min_cards_for_trade`.
    pub fn can_trade(&self, allocation: &CardAllocation, direction: TradeAction) -> bool {
        match direction {
            TradeAction::Buy => allocation.native_cards >= self.min_cards_for_trade,
            TradeAction::Sell => allocation.token_cards >= self.min_cards_for_trade,
        }
    }

    /// `calculateBuyAmount` — native-currency value of buying `cards` cards.
    /// Returns zero (and logs a warning) if there are no native cards to draw
    /// from, per spec §4.2.
    pub fn calculate_buy_amount(&self, allocation: &CardAllocation, cards: u32) -> Decimal {
        if allocation.native_cards == 0 {
            tracing::warn!("calculate_buy_amount called with zero native_cards available");
            return Decimal::ZERO;
        }
        let usable = cards.min(allocation.native_cards);
        allocation.per_card_native * Decimal::from(usable)
    }

    /// `calculateSellAmount` — token amount to sell out of `token_balance`.
    pub fn calculate_sell_amount(
        &self,
        allocation: &CardAllocation,
        token_balance: Decimal,
        cards: SellCards,
    ) -> Decimal {
        match cards {
            SellCards::All => token_balance,
            SellCards::Count(requested) => {
                if allocation.token_cards == 0 {
                    tracing::warn!("calculate_sell_amount called with zero token_cards available");
                    return Decimal::ZERO;
                }
                let usable = requested.min(allocation.token_cards);
                token_balance * Decimal::from(usable) / Decimal::from(allocation.token_cards)
            }
        }
    }

    /// `afterBuy` — moves `cards` cards from the native side to the token
    /// side. Clamps to what's available and logs a warning rather than
    /// erroring, per spec §4.2 ("the operation clamps ... and proceeds").
    pub fn after_buy(&self, allocation: &mut CardAllocation, cards: u32) {
        let moved = cards.min(allocation.native_cards);
        if moved < cards {
            tracing::warn!(
                requested = cards,
                available = allocation.native_cards,
                "after_buy: clamping card transfer to available native cards"
            );
        }
        allocation.native_cards -= moved;
        allocation.token_cards += moved;
        debug_assert!(allocation.is_balanced());
    }

    /// `afterSell` — moves cards from the token side back to the native side.
    pub fn after_sell(&self, allocation: &mut CardAllocation, cards: SellCards) {
        let moved = match cards {
            SellCards::All => allocation.token_cards,
            SellCards::Count(requested) => {
                let moved = requested.min(allocation.token_cards);
                if moved < requested {
                    tracing::warn!(
                        requested,
                        available = allocation.token_cards,
                        "after_sell: clamping card transfer to available token cards"
                    );
                }
                moved
            }
        };
        allocation.token_cards -= moved;
        allocation.native_cards += moved;
        debug_assert!(allocation.is_balanced());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn allocation(native: u32, token: u32) -> CardAllocation {
        CardAllocation::new(4, dec!(0.025), native, token)
    }

    #[test]
    fn s1_card_accounting_under_fifo() {
        let mgr = CardPositionManager::default();
        let mut a = allocation(4, 0);

        // Buy 1 card.
        let buy1 = mgr.calculate_buy_amount(&a, 1);
        assert_eq!(buy1, dec!(0.025));
        mgr.after_buy(&mut a, 1);
        assert_eq!((a.native_cards, a.token_cards), (3, 1));

        // Buy 1 more card.
        let buy2 = mgr.calculate_buy_amount(&a, 1);
        assert_eq!(buy2, dec!(0.025));
        mgr.after_buy(&mut a, 1);
        assert_eq!((a.native_cards, a.token_cards), (2, 2));

        // Sell all.
        mgr.after_sell(&mut a, SellCards::All);
        assert_eq!((a.native_cards, a.token_cards), (4, 0));
    }

    #[test]
    fn calculate_buy_amount_warns_and_zeroes_with_no_native_cards() {
        let mgr = CardPositionManager::default();
        let a = allocation(0, 4);
        assert_eq!(mgr.calculate_buy_amount(&a, 1), Decimal::ZERO);
    }

    #[test]
    fn after_buy_clamps_to_available_native_cards() {
        let mgr = CardPositionManager::default();
        let mut a = allocation(2, 2);
        mgr.after_buy(&mut a, 5);
        assert_eq!((a.native_cards, a.token_cards), (0, 4));
        assert!(a.is_balanced());
    }

    #[test]
    fn sell_all_then_buy_leaves_expected_split() {
        // Property S10: sell-all then buy(k) leaves token_cards = k.
        let mgr = CardPositionManager::default();
        let mut a = allocation(2, 2);
        mgr.after_sell(&mut a, SellCards::All);
        assert_eq!((a.native_cards, a.token_cards), (4, 0));
        mgr.after_buy(&mut a, 3);
        assert_eq!((a.native_cards, a.token_cards), (1, 3));
    }

    #[test]
    fn set_initial_allocation_rejects_unbalanced_split() {
        let mgr = CardPositionManager::default();
        let mut a = allocation(4, 0);
        let err = mgr.set_initial_allocation(&mut a, 1, 1).unwrap_err();
        assert!(matches!(err, CardError::UnbalancedSplit { .. }));
        // Untouched on error.
        assert_eq!((a.native_cards, a.token_cards), (4, 0));
    }

    #[test]
    fn can_trade_respects_minimum_threshold() {
        let mgr = CardPositionManager::new(2);
        let a = allocation(1, 3);
        assert!(!mgr.can_trade(&a, TradeAction::Buy));
        assert!(mgr.can_trade(&a, TradeAction::Sell));
    }
}
