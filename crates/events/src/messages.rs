use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted once per scheduler round (spec §4.6 step 7, SPEC_FULL §4A): tokens
/// evaluated, signals emitted, trades executed, and which tokens were
/// skipped for lack of a price this round. The dashboard that would consume
/// this is out of scope, but the event itself — an internal observability
/// seam rather than a UI payload — is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub experiment_id: Uuid,
    pub loop_count: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub tokens_evaluated: u32,
    pub signals_emitted: u32,
    pub trades_executed: u32,
    pub no_price_skips: Vec<String>,
}

/// Accumulates a `RoundSummary` across a round's sequential per-token loop
/// (spec §5: token evaluation is strictly sequential, so no synchronization
/// is needed here).
#[derive(Debug, Default)]
pub struct RoundSummaryBuilder {
    tokens_evaluated: u32,
    signals_emitted: u32,
    trades_executed: u32,
    no_price_skips: Vec<String>,
}

impl RoundSummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_token_evaluated(&mut self) {
        self.tokens_evaluated += 1;
    }

    pub fn record_no_price_skip(&mut self, token_address: impl Into<String>) {
        self.no_price_skips.push(token_address.into());
    }

    pub fn record_signal_emitted(&mut self) {
        self.signals_emitted += 1;
    }

    pub fn record_trade_executed(&mut self) {
        self.trades_executed += 1;
    }

    pub fn finish(self, experiment_id: Uuid, loop_count: u64, started_at: DateTime<Utc>) -> RoundSummary {
        let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        RoundSummary {
            experiment_id,
            loop_count,
            started_at,
            duration_ms,
            tokens_evaluated: self.tokens_evaluated,
            signals_emitted: self.signals_emitted,
            trades_executed: self.trades_executed,
            no_price_skips: self.no_price_skips,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_tallies_counts_and_skips() {
        let started_at = Utc::now();
        let mut builder = RoundSummaryBuilder::new();
        builder.record_token_evaluated();
        builder.record_token_evaluated();
        builder.record_no_price_skip("0xdead");
        builder.record_signal_emitted();
        builder.record_trade_executed();

        let summary = builder.finish(Uuid::new_v4(), 7, started_at);
        assert_eq!(summary.tokens_evaluated, 2);
        assert_eq!(summary.signals_emitted, 1);
        assert_eq!(summary.trades_executed, 1);
        assert_eq!(summary.no_price_skips, vec!["0xdead".to_string()]);
        assert_eq!(summary.loop_count, 7);
    }
}
