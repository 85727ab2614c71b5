//! Deterministic collaborators for tests.
//!
//! Enabled with the `testkit` feature (the crate's own tests pull it in as
//! a dev-dependency). Nothing here is compiled into release builds.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{FeedId, PricePoint};
use crate::error::OracleError;
use crate::oracle::{Clock, PriceOracle};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    #[must_use]
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Advance by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// An oracle that replays a scripted queue of responses.
///
/// Each `latest_price` call pops the front of the queue; once the queue is
/// empty the fallback price (if set) is served forever, otherwise the call
/// fails with `MissingFeed`.
#[derive(Default)]
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<PricePoint, OracleError>>>,
    fallback: Mutex<Option<PricePoint>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    /// Create an oracle with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful price response.
    pub fn push_price(&self, point: PricePoint) {
        self.responses.lock().push_back(Ok(point));
    }

    /// Queue a failure response.
    pub fn push_error(&self, error: OracleError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Serve `point` whenever the scripted queue is empty.
    pub fn set_fallback(&self, point: PricePoint) {
        *self.fallback.lock() = Some(point);
    }

    /// Number of `latest_price` calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for ScriptedOracle {
    async fn latest_price(&self, feed: &FeedId) -> Result<PricePoint, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.responses.lock().pop_front() {
            return response;
        }
        self.fallback.lock().map(Ok).unwrap_or_else(|| {
            Err(OracleError::MissingFeed {
                feed: feed.to_string(),
            })
        })
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A SOL-style price sample: mantissa at expo -8, zero confidence.
#[must_use]
pub fn sample_price(mantissa: i64, publish_time: i64) -> PricePoint {
    PricePoint::new(mantissa, -8, 0, publish_time)
}
