//! A pure-logic crate depending only on `core-types` and `factors` (spec
//! §4.4): `StrategyEngine` loads a set of user-defined strategies, validates
//! their conditions against the known factor-id set once at load time, and
//! evaluates them in priority order each round. `expr` is the hand-rolled
//! boolean/arithmetic expression language conditions are written in.

pub mod error;
pub mod expr;

pub use error::StrategyError;
pub use expr::Expr;

use chrono::{DateTime, Utc};
use core_types::enums::TradeAction;
use core_types::token::StrategyExecutionState;
use factors::FactorMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

fn default_enabled() -> bool {
    true
}

/// A single strategy definition (spec §4.4): `{id, name, action, priority,
/// cooldownSeconds, maxExecutions?, cards, condition}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub id: String,
    pub name: String,
    pub action: TradeAction,
    pub priority: u32,
    pub cooldown_seconds: u64,
    pub max_executions: Option<u32>,
    /// Number of cards to move on a fired signal. A value `>=` the token's
    /// `total_cards` is treated as "sell all" for a sell strategy (the
    /// `engine` crate is where this maps onto `cards::SellCards`).
    pub cards: u32,
    pub condition: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A `StrategyConfig` with its condition already compiled and validated
/// against a known factor-id set (spec §4.4 `loadStrategies`).
#[derive(Debug, Clone)]
pub struct StrategyDef {
    pub config: StrategyConfig,
    condition: Expr,
}

impl StrategyDef {
    pub fn id(&self) -> &str {
        &self.config.id
    }
}

/// Loads, validates, and evaluates strategy definitions (spec §4.4).
/// Strategies are kept sorted ascending by `priority`; `evaluate` returns the
/// first one whose gating and condition both pass.
#[derive(Debug, Clone)]
pub struct StrategyEngine {
    strategies: Vec<StrategyDef>,
}

impl StrategyEngine {
    /// Validates every condition against `known_factors`, rejecting the
    /// whole batch if any strategy references an unknown factor, then sorts
    /// by priority ascending (spec §4.4 `loadStrategies`).
    pub fn load_strategies(
        configs: &[StrategyConfig],
        known_factors: &HashSet<String>,
    ) -> Result<Self, StrategyError> {
        let mut strategies = Vec::with_capacity(configs.len());
        for config in configs {
            let condition = Expr::compile(&config.id, &config.condition, known_factors)?;
            strategies.push(StrategyDef {
                config: config.clone(),
                condition,
            });
        }
        strategies.sort_by_key(|s| s.config.priority);
        Ok(Self { strategies })
    }

    pub fn strategies(&self) -> &[StrategyDef] {
        &self.strategies
    }

    /// Evaluates strategies in priority order against `factors`, gating each
    /// on enabled/cooldown/maxExecutions before the condition is even
    /// evaluated (spec §4.4 `evaluate`). Returns the first match; callers are
    /// responsible for the token-status gate (buy ⇒ monitoring, sell ⇒
    /// bought) and for updating counters only after dispatch succeeds.
    pub fn evaluate<'a>(
        &'a self,
        factors: &FactorMap,
        token_address: &str,
        now: DateTime<Utc>,
        per_strategy_state: &HashMap<String, StrategyExecutionState>,
    ) -> Option<&'a StrategyDef> {
        for strategy in &self.strategies {
            if !strategy.config.enabled {
                continue;
            }

            if let Some(state) = per_strategy_state.get(&strategy.config.id) {
                if let Some(last) = state.last_execution_at {
                    let elapsed = (now - last).num_seconds();
                    if elapsed < strategy.config.cooldown_seconds as i64 {
                        continue;
                    }
                }
                if let Some(max) = strategy.config.max_executions {
                    if state.count >= max {
                        continue;
                    }
                }
            }

            if strategy.condition.eval_bool(factors) {
                tracing::debug!(token_address, strategy = strategy.config.id.as_str(), "strategy condition matched");
                return Some(strategy);
            }
        }
        None
    }

    /// Hard-coded defaults used when an experiment's `strategiesConfig` is
    /// absent or empty (spec §6) — virtual and backtest modes only; live
    /// must supply explicit configuration. Mirrors the S3 scenario's
    /// default pair: buy on an early 80-120% pop, sell on a 30% profit.
    pub fn default_strategies() -> Vec<StrategyConfig> {
        vec![
            StrategyConfig {
                id: "default-buy".to_string(),
                name: "Default early-pop buy".to_string(),
                action: TradeAction::Buy,
                priority: 1,
                cooldown_seconds: 0,
                max_executions: None,
                cards: 1,
                condition: "earlyReturn >= 80 AND earlyReturn <= 120".to_string(),
                enabled: true,
            },
            StrategyConfig {
                id: "default-sell".to_string(),
                name: "Default take-profit sell".to_string(),
                action: TradeAction::Sell,
                priority: 2,
                cooldown_seconds: 0,
                max_executions: None,
                cards: u32::MAX,
                condition: "profitPercent >= 30".to_string(),
                enabled: true,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factors::FACTOR_KEYS;

    fn known_factors() -> HashSet<String> {
        FACTOR_KEYS.iter().map(|s| s.to_string()).collect()
    }

    fn factors(pairs: &[(&str, f64)]) -> FactorMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn loads_and_sorts_by_priority_ascending() {
        let configs = vec![
            StrategyConfig {
                id: "low".to_string(),
                name: "low".to_string(),
                action: TradeAction::Buy,
                priority: 5,
                cooldown_seconds: 0,
                max_executions: None,
                cards: 1,
                condition: "earlyReturn > 0".to_string(),
                enabled: true,
            },
            StrategyConfig {
                id: "high".to_string(),
                name: "high".to_string(),
                action: TradeAction::Buy,
                priority: 1,
                cooldown_seconds: 0,
                max_executions: None,
                cards: 1,
                condition: "earlyReturn > 0".to_string(),
                enabled: true,
            },
        ];
        let engine = StrategyEngine::load_strategies(&configs, &known_factors()).unwrap();
        assert_eq!(engine.strategies()[0].id(), "high");
        assert_eq!(engine.strategies()[1].id(), "low");
    }

    #[test]
    fn rejects_the_whole_batch_on_an_unknown_factor() {
        let configs = vec![StrategyConfig {
            id: "bad".to_string(),
            name: "bad".to_string(),
            action: TradeAction::Buy,
            priority: 1,
            cooldown_seconds: 0,
            max_executions: None,
            cards: 1,
            condition: "notAFactor > 0".to_string(),
            enabled: true,
        }];
        let err = StrategyEngine::load_strategies(&configs, &known_factors()).unwrap_err();
        assert!(matches!(err, StrategyError::UnknownFactor { .. }));
    }

    #[test]
    fn s2_cooldown_and_max_executions_gate_firing() {
        let configs = vec![StrategyConfig {
            id: "s".to_string(),
            name: "s".to_string(),
            action: TradeAction::Buy,
            priority: 1,
            cooldown_seconds: 60,
            max_executions: Some(2),
            cards: 1,
            condition: "profitPercent >= 30".to_string(),
            enabled: true,
        }];
        let engine = StrategyEngine::load_strategies(&configs, &known_factors()).unwrap();
        let f = factors(&[("profitPercent", 31.0)]);
        let base = Utc::now();

        let mut state = HashMap::new();
        assert!(engine.evaluate(&f, "0xabc", base, &state).is_some());

        state.insert(
            "s".to_string(),
            StrategyExecutionState {
                count: 1,
                last_execution_at: Some(base),
            },
        );
        assert!(engine.evaluate(&f, "0xabc", base + chrono::Duration::seconds(30), &state).is_none());
        assert!(engine.evaluate(&f, "0xabc", base + chrono::Duration::seconds(65), &state).is_some());

        state.insert(
            "s".to_string(),
            StrategyExecutionState {
                count: 2,
                last_execution_at: Some(base + chrono::Duration::seconds(65)),
            },
        );
        assert!(engine.evaluate(&f, "0xabc", base + chrono::Duration::seconds(200), &state).is_none());
    }

    #[test]
    fn first_match_wins_when_two_strategies_would_fire() {
        let configs = vec![
            StrategyConfig {
                id: "high-priority".to_string(),
                name: "high".to_string(),
                action: TradeAction::Buy,
                priority: 1,
                cooldown_seconds: 0,
                max_executions: None,
                cards: 1,
                condition: "earlyReturn >= 0".to_string(),
                enabled: true,
            },
            StrategyConfig {
                id: "low-priority".to_string(),
                name: "low".to_string(),
                action: TradeAction::Buy,
                priority: 2,
                cooldown_seconds: 0,
                max_executions: None,
                cards: 1,
                condition: "earlyReturn >= 0".to_string(),
                enabled: true,
            },
        ];
        let engine = StrategyEngine::load_strategies(&configs, &known_factors()).unwrap();
        let matched = engine
            .evaluate(&factors(&[("earlyReturn", 10.0)]), "0xabc", Utc::now(), &HashMap::new())
            .unwrap();
        assert_eq!(matched.id(), "high-priority");
    }

    #[test]
    fn disabled_strategy_never_fires() {
        let configs = vec![StrategyConfig {
            id: "off".to_string(),
            name: "off".to_string(),
            action: TradeAction::Buy,
            priority: 1,
            cooldown_seconds: 0,
            max_executions: None,
            cards: 1,
            condition: "earlyReturn >= 0".to_string(),
            enabled: false,
        }];
        let engine = StrategyEngine::load_strategies(&configs, &known_factors()).unwrap();
        assert!(engine
            .evaluate(&factors(&[("earlyReturn", 10.0)]), "0xabc", Utc::now(), &HashMap::new())
            .is_none());
    }

    #[test]
    fn default_strategies_compile_against_the_known_factor_set() {
        let configs = StrategyEngine::default_strategies();
        let engine = StrategyEngine::load_strategies(&configs, &known_factors()).unwrap();
        assert_eq!(engine.strategies().len(), 2);
    }
}
