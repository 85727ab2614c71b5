//! `run` and `once` command handlers: wire the engine, oracle, and
//! orchestrator together from configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use crate::archive::{create_pool, run_migrations, MarketArchive};
use crate::config::Config;
use crate::engine::SettlementEngine;
use crate::error::Result;
use crate::oracle::{Clock, HermesOracle, SystemClock};
use crate::orchestrator::Orchestrator;

/// Build the engine from configuration, rehydrating archived state when a
/// database is configured.
pub fn build_engine(config: &Config, clock: Arc<dyn Clock>) -> Result<Arc<SettlementEngine>> {
    let mut engine = SettlementEngine::new(config.market_params(), clock);

    if !config.database.path.is_empty() {
        let pool = create_pool(&config.database.path)?;
        run_migrations(&pool)?;
        let archive = Arc::new(MarketArchive::new(pool));
        let snapshot = archive.load()?;
        info!(
            markets = snapshot.markets.len(),
            positions = snapshot.positions.len(),
            path = %config.database.path,
            "archive loaded"
        );
        engine = engine.with_archive(archive);
        engine.restore(snapshot.markets, snapshot.positions);
    }

    Ok(Arc::new(engine))
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = build_engine(config, clock.clone())?;
    let oracle = Arc::new(HermesOracle::new(
        config.oracle_endpoint()?,
        Duration::from_secs(config.oracle.request_timeout_seconds),
        Duration::from_millis(config.oracle.cache_ttl_ms),
    )?);

    Ok(Orchestrator::new(
        engine,
        oracle,
        clock,
        config.feed(),
        config.orchestrator_settings(),
    ))
}

/// Run the settlement loop until interrupted.
pub async fn execute(config: Config) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = tokio::spawn(async move { orchestrator.run(shutdown_rx).await });

    signal::ctrl_c().await?;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = worker.await;

    Ok(())
}

/// Run a single settlement cycle and print the report.
pub async fn execute_once(config: Config, json: bool) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    let report = orchestrator.run_once().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "cycle at {}: created {}, closed {}, resolved {}, cancelled {}, deferred {}, errors {}",
            report.now,
            report
                .created
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "none".into()),
            report.closed.len(),
            report.resolved.len(),
            report.cancelled.len(),
            report.deferred.len(),
            report.errors.len(),
        );
        for error in &report.errors {
            println!(
                "  error ({}): {}",
                error
                    .market
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".into()),
                error.detail
            );
        }
    }

    Ok(())
}
