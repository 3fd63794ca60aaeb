//! Per-handler tickers feeding the dispatch queue
//!
//! This module handles:
//! - One independent periodic timer per registered handler
//! - Enqueueing the handler on every tick, blocking when the queue is full
//! - Per-ticker stop tokens so every ticker exits promptly on shutdown

use crate::fetcher::handler::SharedHandler;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A single handler's periodic timer
///
/// The first tick fires one full interval after start. Ticks that elapse
/// while the ticker is blocked on a full queue are skipped, not replayed.
pub(crate) struct Ticker {
    handler: SharedHandler,
    queue: mpsc::Sender<SharedHandler>,
    stop: CancellationToken,
}

impl Ticker {
    pub fn new(
        handler: SharedHandler,
        queue: mpsc::Sender<SharedHandler>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            handler,
            queue,
            stop,
        }
    }

    /// Runs until the stop token fires or the queue is closed
    pub async fn run(self) {
        let period = self.handler.refresh_interval();
        let Some(start) = Instant::now().checked_add(period) else {
            tracing::warn!(
                handler = self.handler.name(),
                interval = ?period,
                "Refresh interval out of range, ticker idle until stop"
            );
            self.stop.cancelled().await;
            return;
        };
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.enqueue().await {
                        break;
                    }
                }
            }
        }

        tracing::trace!(handler = self.handler.name(), "Ticker exited");
    }

    /// Places the handler on the queue
    ///
    /// Returns `false` when the ticker should exit (stopped while blocked, or
    /// the worker is gone).
    async fn enqueue(&self) -> bool {
        match self.queue.try_send(self.handler.clone()) {
            Ok(()) => return true,
            Err(TrySendError::Closed(_)) => return false,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    handler = self.handler.name(),
                    url = self.handler.url(),
                    "Dispatch queue full, ticker blocked until the worker catches up"
                );
            }
        }

        tokio::select! {
            biased;
            _ = self.stop.cancelled() => false,
            sent = self.queue.send(self.handler.clone()) => sent.is_ok(),
        }
    }
}

/// Decrements the live-ticker count when a ticker task ends, however it ends
struct LiveTicker(Arc<AtomicUsize>);

impl LiveTicker {
    fn register(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live.clone())
    }
}

impl Drop for LiveTicker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The set of running tickers, one per handler present at start
pub(crate) struct Scheduler {
    tickers: JoinSet<()>,
}

impl Scheduler {
    /// Spawns one ticker per handler
    ///
    /// Each ticker gets a private child of `shutdown`, so cancelling
    /// `shutdown` stops all of them. `live` counts running ticker tasks.
    pub fn start(
        handlers: &[SharedHandler],
        queue: &mpsc::Sender<SharedHandler>,
        shutdown: &CancellationToken,
        live: &Arc<AtomicUsize>,
    ) -> Self {
        let mut tickers = JoinSet::new();

        for handler in handlers {
            tracing::debug!(
                handler = handler.name(),
                url = handler.url(),
                interval = ?handler.refresh_interval(),
                "Starting ticker"
            );

            let guard = LiveTicker::register(live);
            let ticker = Ticker::new(handler.clone(), queue.clone(), shutdown.child_token());
            tickers.spawn(async move {
                let _guard = guard;
                ticker.run().await;
            });
        }

        Self { tickers }
    }

    /// Returns the number of ticker tasks not yet joined
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    /// Returns whether no tickers were started
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Waits for every ticker task to exit
    pub async fn join(mut self) {
        while let Some(result) = self.tickers.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Ticker task ended abnormally");
            }
        }
    }
}
