//! Demo wiring: boots a single virtual-mode experiment against in-memory
//! collaborator fakes and drives it for a handful of rounds, the way the
//! teacher repo's `zenith-core` binary wires a live `Engine` together
//! (spec §2, §4.6 — the dashboard/API surface around it is out of scope).

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use collaborators::fakes::{FakeMarketDataApi, FakeTokenListingSource};
use collaborators::types::{HarvestedToken, PriceQuote};
use core_types::enums::Mode;
use core_types::experiment::{Experiment, ExperimentConfig};
use engine::{Scheduler, VirtualAdapter};
use events::EventBus;
use persistence::{InMemoryPersistence, Persistence};
use rust_decimal_macros::dec;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = configuration::load_config(None)?;
    configuration::init_tracing(&config.logging)?;

    let listing_source = Arc::new(FakeTokenListingSource::new(vec![HarvestedToken {
        address: "0xdemo".to_string(),
        symbol: "DEMO".to_string(),
        blockchain: "ethereum".to_string(),
        created_at: Utc::now(),
        current_price: Some(dec!(1)),
        creator_address: None,
    }]));
    let market_data = Arc::new(FakeMarketDataApi::default());
    market_data.set_price(
        &core_types::chain::market_data_id("0xdemo", "ethereum"),
        PriceQuote {
            price: dec!(2.2),
            ..PriceQuote::default()
        },
    );

    let adapter = VirtualAdapter::new(listing_source, market_data);
    let persistence: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::default());
    let events = EventBus::default();
    let mut summaries = events.subscribe();

    let experiment = Experiment::new(
        "demo-virtual".to_string(),
        Mode::Virtual,
        "ethereum".to_string(),
        ExperimentConfig {
            initial_capital: dec!(100),
            ..ExperimentConfig::default()
        },
    );

    // The Experiment row is created externally (spec §3) before the engine
    // ever sees it; `bootstrap` only transitions its status.
    persistence.insert_experiment(&experiment).await?;

    let scheduler = Scheduler::bootstrap(experiment, adapter, persistence.clone(), events).await?;
    let cancellation = scheduler.cancellation_handle();

    tokio::spawn(async move {
        while let Ok(summary) = summaries.recv().await {
            tracing::info!(
                loop_count = summary.loop_count,
                tokens_evaluated = summary.tokens_evaluated,
                signals_emitted = summary.signals_emitted,
                trades_executed = summary.trades_executed,
                "round summary"
            );
        }
    });

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        cancellation.store(true, Ordering::Relaxed);
    });

    let finished = scheduler.run(config.scheduler.tick_interval).await?;
    tracing::info!(status = ?finished.status, "experiment finished");

    Ok(())
}
