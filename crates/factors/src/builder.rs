use chrono::{DateTime, Utc};
use core_types::token::Token;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;

/// The closed set of factor keys `StrategyEngine::load_strategies` validates
/// conditions against (spec §4.5). Kept as a const array so `factors`,
/// `strategies`, and anything that needs "all known factor ids" (tests,
/// diagnostics) share one source of truth.
pub const FACTOR_KEYS: &[&str] = &[
    "age",
    "currentPrice",
    "collectionPrice",
    "launchPrice",
    "earlyReturn",
    "riseSpeed",
    "buyPrice",
    "holdDuration",
    "profitPercent",
    "highestPrice",
    "highestPriceTimestamp",
    "drawdownFromHighest",
    "txVolumeU24h",
    "holders",
    "tvl",
    "fdv",
    "marketCap",
    "trendCV",
    "trendDirectionCount",
    "trendStrengthScore",
    "trendTotalReturn",
    "trendRiseRatio",
    "trendConsecutiveDowns",
    "trendRecentDownRatio",
    "trendPriceChangeFromDetect",
    "trendSinceBuyReturn",
];

pub type FactorMap = HashMap<String, f64>;

fn to_f64(d: rust_decimal::Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Builds a `FactorMap` from a token's current state (spec §4.5).
///
/// Stateless: every number comes off the `Token` itself, which `TokenPool`
/// keeps current via `update_price`/`mark_as_bought`. There is no separate
/// "launch price" data source in this collaborator set, so `launchPrice`
/// aliases `collectionPrice` (the price at first observation) — see
/// DESIGN.md.
#[derive(Debug, Default, Clone, Copy)]
pub struct FactorBuilder;

impl FactorBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, token: &Token, now: DateTime<Utc>) -> FactorMap {
        let mut factors = FactorMap::with_capacity(FACTOR_KEYS.len());

        let age_minutes = (now - token.created_at).num_seconds() as f64 / 60.0;
        let current_price = to_f64(token.current_price);
        let collection_price = to_f64(token.collection_price);
        let launch_price = collection_price;
        let highest_price = to_f64(token.highest_price);

        let early_return = if launch_price > 0.0 {
            (current_price - launch_price) / launch_price * 100.0
        } else {
            0.0
        };
        let rise_speed = if age_minutes > 0.0 { early_return / age_minutes } else { 0.0 };

        let (buy_price, hold_duration, profit_percent, since_buy_return) = match (token.buy_price, token.buy_time) {
            (Some(buy_price), Some(buy_time)) => {
                let buy_price_f = to_f64(buy_price);
                let hold_duration = (now - buy_time).num_seconds() as f64;
                let profit_percent = if buy_price_f > 0.0 {
                    (current_price - buy_price_f) / buy_price_f * 100.0
                } else {
                    0.0
                };
                (buy_price_f, hold_duration.max(0.0), profit_percent, profit_percent)
            }
            _ => (0.0, 0.0, 0.0, 0.0),
        };

        let drawdown_from_highest = if highest_price > 0.0 {
            ((current_price - highest_price) / highest_price * 100.0).clamp(-100.0, 0.0)
        } else {
            0.0
        };

        factors.insert("age".to_string(), age_minutes);
        factors.insert("currentPrice".to_string(), current_price);
        factors.insert("collectionPrice".to_string(), collection_price);
        factors.insert("launchPrice".to_string(), launch_price);
        factors.insert("earlyReturn".to_string(), early_return);
        factors.insert("riseSpeed".to_string(), rise_speed);
        factors.insert("buyPrice".to_string(), buy_price);
        factors.insert("holdDuration".to_string(), hold_duration);
        factors.insert("profitPercent".to_string(), profit_percent);
        factors.insert("highestPrice".to_string(), highest_price);
        factors.insert(
            "highestPriceTimestamp".to_string(),
            token.highest_price_at.timestamp() as f64,
        );
        factors.insert("drawdownFromHighest".to_string(), drawdown_from_highest);

        factors.insert(
            "txVolumeU24h".to_string(),
            token.metrics.tx_volume_u_24h.map(to_f64).unwrap_or(0.0),
        );
        factors.insert("holders".to_string(), token.metrics.holders.unwrap_or(0) as f64);
        factors.insert("tvl".to_string(), token.metrics.tvl.map(to_f64).unwrap_or(0.0));
        factors.insert("fdv".to_string(), token.metrics.fdv.map(to_f64).unwrap_or(0.0));
        factors.insert("marketCap".to_string(), token.metrics.market_cap.map(to_f64).unwrap_or(0.0));

        let trend = trend_factors(token);
        factors.insert("trendCV".to_string(), trend.cv);
        factors.insert("trendDirectionCount".to_string(), trend.direction_count as f64);
        factors.insert("trendStrengthScore".to_string(), trend.strength_score);
        factors.insert("trendTotalReturn".to_string(), trend.total_return);
        factors.insert("trendRiseRatio".to_string(), trend.rise_ratio);
        factors.insert("trendConsecutiveDowns".to_string(), trend.consecutive_downs as f64);
        factors.insert("trendRecentDownRatio".to_string(), trend.recent_down_ratio);
        factors.insert("trendPriceChangeFromDetect".to_string(), trend.price_change_from_detect);
        factors.insert("trendSinceBuyReturn".to_string(), since_buy_return);

        factors
    }
}

struct TrendFactors {
    cv: f64,
    direction_count: u32,
    strength_score: f64,
    total_return: f64,
    rise_ratio: f64,
    consecutive_downs: u32,
    recent_down_ratio: f64,
    price_change_from_detect: f64,
}

/// How many of the most recent samples `trendRecentDownRatio` looks at.
const RECENT_WINDOW: usize = 5;

/// Derives the trend family of factors from `token.price_history`, the
/// bounded rolling window `TokenPool` maintains (spec §4.5).
fn trend_factors(token: &Token) -> TrendFactors {
    let prices: Vec<f64> = token.price_history.iter().map(|(_, p)| to_f64(*p)).collect();

    if prices.len() < 2 {
        return TrendFactors {
            cv: 0.0,
            direction_count: 0,
            strength_score: 0.0,
            total_return: 0.0,
            rise_ratio: 0.0,
            consecutive_downs: 0,
            recent_down_ratio: 0.0,
            price_change_from_detect: 0.0,
        };
    }

    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    let cv = if mean != 0.0 { variance.sqrt() / mean.abs() } else { 0.0 };

    let steps: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let rises = steps.iter().filter(|s| **s > 0.0).count();
    let direction_count = steps
        .windows(2)
        .filter(|w| w[0].signum() != 0.0 && w[1].signum() != 0.0 && w[0].signum() != w[1].signum())
        .count() as u32;

    let net_move = prices.last().unwrap() - prices.first().unwrap();
    let path_length: f64 = steps.iter().map(|s| s.abs()).sum();
    let strength_score = if path_length > 0.0 { net_move.abs() / path_length } else { 0.0 };

    let first = *prices.first().unwrap();
    let last = *prices.last().unwrap();
    let total_return = if first != 0.0 { (last - first) / first * 100.0 } else { 0.0 };
    let rise_ratio = if !steps.is_empty() { rises as f64 / steps.len() as f64 } else { 0.0 };

    let mut consecutive_downs = 0u32;
    for step in steps.iter().rev() {
        if *step < 0.0 {
            consecutive_downs += 1;
        } else {
            break;
        }
    }

    let recent = &steps[steps.len().saturating_sub(RECENT_WINDOW)..];
    let recent_downs = recent.iter().filter(|s| **s < 0.0).count();
    let recent_down_ratio = if !recent.is_empty() { recent_downs as f64 / recent.len() as f64 } else { 0.0 };

    let price_change_from_detect = if first != 0.0 {
        (to_f64(token.current_price) - first) / first * 100.0
    } else {
        0.0
    };

    TrendFactors {
        cv,
        direction_count,
        strength_score,
        total_return,
        rise_ratio,
        consecutive_downs,
        recent_down_ratio,
        price_change_from_detect,
    }
}
