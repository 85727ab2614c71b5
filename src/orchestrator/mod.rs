//! Settlement orchestrator: the periodic driver of lifecycle transitions.
//!
//! A single fixed-interval loop is the only writer of lifecycle
//! transitions. Each cycle runs three independent steps - create, close,
//! resolve - and collects per-market failures into the cycle report rather
//! than aborting: one market's oracle trouble never blocks the others.
//! Anything that fails this cycle is retried on the next one, and a market
//! that stays unresolvable past its cancel threshold is cancelled instead
//! of left stuck.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::{FeedId, Market, MarketKey, PricePoint};
use crate::engine::SettlementEngine;
use crate::error::OracleError;
use crate::oracle::{Clock, PriceOracle};

/// Orchestrator timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Interval between settlement cycles.
    pub poll_interval: Duration,
    /// Create the next epoch's market once its boundary is this close.
    pub create_lookahead_seconds: i64,
    /// Cancel a closed market still unresolved this long after its end.
    pub cancel_after_seconds: i64,
    /// Upper bound on any single oracle call.
    pub oracle_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            create_lookahead_seconds: 60,
            cancel_after_seconds: 900,
            oracle_timeout: Duration::from_secs(10),
        }
    }
}

/// A failure affecting one market (or the create step) during a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleError {
    pub market: Option<MarketKey>,
    pub detail: String,
}

/// What one settlement cycle did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    /// Clock reading at the start of the cycle.
    pub now: i64,
    /// Market created for the upcoming boundary, if any.
    pub created: Option<MarketKey>,
    /// Markets transitioned Open -> Closed.
    pub closed: Vec<MarketKey>,
    /// Markets transitioned Closed -> Resolved.
    pub resolved: Vec<MarketKey>,
    /// Markets cancelled after staying unresolvable too long.
    pub cancelled: Vec<MarketKey>,
    /// Markets whose resolution was deferred to the next cycle.
    pub deferred: Vec<MarketKey>,
    /// Per-market failures; everything here is retried next cycle.
    pub errors: Vec<CycleError>,
}

impl CycleReport {
    /// True if the cycle neither transitioned anything nor failed.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.created.is_none()
            && self.closed.is_empty()
            && self.resolved.is_empty()
            && self.cancelled.is_empty()
            && self.deferred.is_empty()
            && self.errors.is_empty()
    }
}

/// Next epoch boundary at or after `now`: `ceil(now / epoch) * epoch`.
#[must_use]
pub fn next_aligned_boundary(now: i64, epoch_seconds: i64) -> i64 {
    // Equivalent to signed `i64::div_ceil`, which is still unstable on stable Rust.
    let quotient = now / epoch_seconds;
    let remainder = now % epoch_seconds;
    let ceil = if remainder != 0 && (remainder > 0) == (epoch_seconds > 0) {
        quotient + 1
    } else {
        quotient
    };
    ceil * epoch_seconds
}

/// Periodic driver of market lifecycle transitions.
pub struct Orchestrator {
    engine: Arc<SettlementEngine>,
    oracle: Arc<dyn PriceOracle>,
    clock: Arc<dyn Clock>,
    feed: FeedId,
    settings: Settings,
}

impl Orchestrator {
    /// Create an orchestrator driving `engine` from `oracle` and `clock`.
    #[must_use]
    pub fn new(
        engine: Arc<SettlementEngine>,
        oracle: Arc<dyn PriceOracle>,
        clock: Arc<dyn Clock>,
        feed: FeedId,
        settings: Settings,
    ) -> Self {
        Self {
            engine,
            oracle,
            clock,
            feed,
            settings,
        }
    }

    /// Run settlement cycles until `shutdown` flips to true.
    ///
    /// The in-flight cycle always completes before the loop exits; no
    /// market is left mid-transition by a stop request.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            poll_interval_seconds = self.settings.poll_interval.as_secs(),
            feed = %self.feed,
            oracle = self.oracle.source_name(),
            "orchestrator started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_once().await;
                    self.log_report(&report);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("orchestrator stopped");
    }

    /// Run one settlement cycle: create, close, resolve.
    pub async fn run_once(&self) -> CycleReport {
        let now = self.clock.now();
        let mut report = CycleReport {
            now,
            ..CycleReport::default()
        };

        self.create_step(now, &mut report).await;
        self.close_step(&mut report);
        self.resolve_step(now, &mut report).await;
        report
    }

    /// Create the market for the next aligned boundary once it is near.
    ///
    /// Existence is checked by boundary key, not by time alone, so restarts
    /// and duplicate polls are no-ops once the market exists.
    async fn create_step(&self, now: i64, report: &mut CycleReport) {
        let epoch = self.engine.params().epoch_seconds;
        let boundary = next_aligned_boundary(now, epoch);
        if boundary - now >= self.settings.create_lookahead_seconds {
            return;
        }

        let key = MarketKey::for_epoch(&self.feed, boundary);
        if self.engine.has_market(&key) {
            return;
        }

        match self.fetch_price(&self.feed).await {
            Ok(price) => {
                let max_staleness = self.engine.params().max_staleness_seconds;
                if price.is_stale(now, max_staleness) {
                    report.errors.push(CycleError {
                        market: Some(key),
                        detail: format!(
                            "start price is stale ({}s old), deferring market creation",
                            price.age(now)
                        ),
                    });
                    return;
                }
                if let Some(market) = self.engine.open_market(self.feed.clone(), boundary, price) {
                    report.created = Some(market.key().clone());
                }
            }
            Err(e) => report.errors.push(CycleError {
                market: Some(key),
                detail: e.to_string(),
            }),
        }
    }

    /// Close every open market whose betting window has elapsed. Each
    /// transition is independent; order across markets is irrelevant.
    fn close_step(&self, report: &mut CycleReport) {
        for key in self.engine.markets_due_for_close() {
            match self.engine.close_market(&key) {
                Ok(_) => report.closed.push(key),
                Err(e) => report.errors.push(CycleError {
                    market: Some(key),
                    detail: e.to_string(),
                }),
            }
        }
    }

    /// Resolve every closed market for which a fresh price is available.
    async fn resolve_step(&self, now: i64, report: &mut CycleReport) {
        let max_staleness = self.engine.params().max_staleness_seconds;

        for market in self.engine.markets_awaiting_resolution() {
            match self.fetch_price(market.feed()).await {
                Ok(price) if !price.is_stale(now, max_staleness) => {
                    match self.engine.resolve_market(market.key(), price) {
                        Ok(_) => report.resolved.push(market.key().clone()),
                        Err(e) => report.errors.push(CycleError {
                            market: Some(market.key().clone()),
                            detail: e.to_string(),
                        }),
                    }
                }
                Ok(price) => {
                    debug!(
                        market = %market.key(),
                        age_seconds = price.age(now),
                        "resolution price stale, deferring"
                    );
                    self.defer_or_cancel(&market, now, report);
                }
                Err(e) => {
                    report.errors.push(CycleError {
                        market: Some(market.key().clone()),
                        detail: e.to_string(),
                    });
                    self.defer_or_cancel(&market, now, report);
                }
            }
        }
    }

    /// Defer a stuck market to the next cycle, or cancel it once it has
    /// been unresolvable past the configured threshold.
    fn defer_or_cancel(&self, market: &Market, now: i64, report: &mut CycleReport) {
        if now - market.end_ts() < self.settings.cancel_after_seconds {
            report.deferred.push(market.key().clone());
            return;
        }

        match self.engine.cancel_market(market.key()) {
            Ok(_) => report.cancelled.push(market.key().clone()),
            Err(e) => report.errors.push(CycleError {
                market: Some(market.key().clone()),
                detail: e.to_string(),
            }),
        }
    }

    /// Fetch the latest price with a hard time bound. A timeout means
    /// "price unavailable this cycle", never a crash.
    async fn fetch_price(&self, feed: &FeedId) -> Result<PricePoint, OracleError> {
        match timeout(self.settings.oracle_timeout, self.oracle.latest_price(feed)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout {
                timeout_seconds: self.settings.oracle_timeout.as_secs(),
            }),
        }
    }

    fn log_report(&self, report: &CycleReport) {
        if report.is_quiet() {
            debug!(now = report.now, "cycle complete, nothing to do");
            return;
        }

        info!(
            now = report.now,
            created = ?report.created,
            closed = report.closed.len(),
            resolved = report.resolved.len(),
            cancelled = report.cancelled.len(),
            deferred = report.deferred.len(),
            errors = report.errors.len(),
            "cycle complete"
        );
        for error in &report.errors {
            warn!(
                market = ?error.market,
                detail = %error.detail,
                "cycle error, will retry next cycle"
            );
        }
    }
}
