//! Fetcher orchestrator
//!
//! Owns the registered handlers and drives them through the lifecycle:
//! - Registration while unstarted
//! - Starting one ticker per handler plus the single dispatch worker
//! - Closing: stopping every ticker, draining the queue and joining the worker

use crate::config::FetcherConfig;
use crate::fetcher::client::Fetch;
use crate::fetcher::dispatcher::Dispatcher;
use crate::fetcher::handler::{SharedHandler, MAX_REFRESH_INTERVAL};
use crate::fetcher::scheduler::Scheduler;
use crate::FetcherError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

const UNSTARTED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;
const STOPPED: u8 = 3;

/// Lifecycle state of a [`Fetcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherState {
    /// Handlers may be registered
    Unstarted,
    /// Tickers and the dispatch worker are active
    Running,
    /// Stop has been signalled, the worker is draining
    Stopping,
    /// Terminal; every task has exited
    Stopped,
}

impl FetcherState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            UNSTARTED => FetcherState::Unstarted,
            RUNNING => FetcherState::Running,
            STOPPING => FetcherState::Stopping,
            _ => FetcherState::Stopped,
        }
    }
}

/// Counters for completed dispatch cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetcherStats {
    /// Cycles that fetched and handled successfully
    pub succeeded: u64,
    /// Cycles that ended in a fetch error, handler error or panic
    pub failed: u64,
}

/// Periodic multi-source fetcher
///
/// Register handlers, then drive [`Fetcher::run`] as a background task and
/// call [`Fetcher::close`] from elsewhere to shut it down:
///
/// ```no_run
/// use api_fetcher::config::{FetcherConfig, HttpConfig};
/// use api_fetcher::fetcher::SharedHandler;
/// use api_fetcher::{Fetcher, HttpClient, LoggingHandler};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(&HttpConfig::default())?;
/// let mut fetcher = Fetcher::new(Arc::new(client), FetcherConfig::default());
/// let example: SharedHandler = Arc::new(LoggingHandler::new(
///     "example",
///     "http://google.com",
///     Duration::from_secs(10),
/// ));
/// fetcher.register_handlers([example])?;
///
/// let fetcher = Arc::new(fetcher);
/// let task = tokio::spawn({
///     let fetcher = fetcher.clone();
///     async move { fetcher.run().await }
/// });
///
/// tokio::signal::ctrl_c().await?;
/// fetcher.close().await?;
/// task.await??;
/// # Ok(())
/// # }
/// ```
pub struct Fetcher {
    handlers: Vec<SharedHandler>,
    dispatcher: Dispatcher,
    queue_capacity: usize,
    state: AtomicU8,
    shutdown: CancellationToken,
    stopped: watch::Sender<bool>,
    live_tickers: Arc<AtomicUsize>,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl Fetcher {
    /// Creates an unstarted fetcher using `client` for every GET
    pub fn new(client: Arc<dyn Fetch>, config: FetcherConfig) -> Self {
        let (stopped, _) = watch::channel(false);

        Self {
            handlers: Vec::new(),
            dispatcher: Dispatcher::new(client, config.fetch_timeout()),
            queue_capacity: config.queue_capacity.max(1),
            state: AtomicU8::new(UNSTARTED),
            shutdown: CancellationToken::new(),
            stopped,
            live_tickers: Arc::new(AtomicUsize::new(0)),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Appends handlers to the set polled by [`Fetcher::run`]
    ///
    /// Every handler is checked before any is added, so a rejected call
    /// leaves the set unchanged.
    ///
    /// # Errors
    ///
    /// * `FetcherError::AlreadyStarted` - the fetcher has left the unstarted state
    /// * `FetcherError::InvalidRefreshInterval` - a handler's interval is zero
    ///   or longer than [`MAX_REFRESH_INTERVAL`]
    pub fn register_handlers<I>(&mut self, handlers: I) -> Result<(), FetcherError>
    where
        I: IntoIterator<Item = SharedHandler>,
    {
        if self.state() != FetcherState::Unstarted {
            return Err(FetcherError::AlreadyStarted);
        }

        let handlers: Vec<SharedHandler> = handlers.into_iter().collect();
        if let Some(invalid) = handlers.iter().find(|h| {
            let interval = h.refresh_interval();
            interval.is_zero() || interval > MAX_REFRESH_INTERVAL
        }) {
            return Err(FetcherError::InvalidRefreshInterval {
                url: invalid.url().to_string(),
            });
        }

        for handler in &handlers {
            tracing::debug!(
                handler = handler.name(),
                url = handler.url(),
                interval = ?handler.refresh_interval(),
                "Registered handler"
            );
        }
        self.handlers.extend(handlers);

        Ok(())
    }

    /// Runs the tickers and the dispatch worker until [`Fetcher::close`]
    ///
    /// Handler failures never surface here; they are logged per cycle.
    /// Returns immediately if the fetcher was closed before it started.
    ///
    /// # Errors
    ///
    /// * `FetcherError::AlreadyStarted` - `run` was already called
    pub async fn run(&self) -> Result<(), FetcherError> {
        match self
            .state
            .compare_exchange(UNSTARTED, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {}
            Err(STOPPED) => {
                tracing::debug!("Fetcher closed before start, not running");
                return Ok(());
            }
            Err(_) => return Err(FetcherError::AlreadyStarted),
        }

        let _guard = RunGuard(self);

        let (queue_tx, mut queue_rx) = mpsc::channel::<SharedHandler>(self.queue_capacity);
        let tickers = Scheduler::start(
            &self.handlers,
            &queue_tx,
            &self.shutdown,
            &self.live_tickers,
        );

        tracing::info!(
            tickers = tickers.len(),
            queue_capacity = self.queue_capacity,
            "Fetcher started"
        );
        if tickers.is_empty() {
            tracing::debug!("No handlers registered, worker idle until close");
        }

        // The worker keeps its own sender until shutdown so the queue stays
        // open with zero handlers. Once every sender is gone, recv drains
        // what is already queued and then yields None.
        let mut queue_tx = Some(queue_tx);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled(), if queue_tx.is_some() => {
                    tracing::debug!("Fetcher stop received, draining queue");
                    queue_tx = None;
                }
                item = queue_rx.recv() => match item {
                    Some(handler) => self.process(&handler).await,
                    None => break,
                },
            }
        }

        tickers.join().await;

        let stats = self.stats();
        tracing::info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Fetcher exited"
        );

        Ok(())
    }

    /// Stops every ticker and waits for the worker to drain and exit
    ///
    /// A cycle already in progress runs to completion, as do items already
    /// queued. Calling `close` more than once is harmless. Closing an
    /// unstarted fetcher moves it straight to the stopped state.
    pub async fn close(&self) -> Result<(), FetcherError> {
        if self
            .state
            .compare_exchange(UNSTARTED, STOPPED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.stopped.send_replace(true);
            tracing::debug!("Fetcher closed before start");
            return Ok(());
        }

        if self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::debug!("Fetcher closing");
            self.shutdown.cancel();
        }

        let mut stopped = self.stopped.subscribe();
        // The sender lives in `self`, so the channel cannot close under us
        let _ = stopped.wait_for(|done| *done).await;

        tracing::debug!("Fetcher exited");
        Ok(())
    }

    /// Like [`Fetcher::close`], but gives up waiting once `interrupt` completes
    ///
    /// Returns `Ok(false)` if the drain was still in progress when interrupted.
    /// The stop signal has been sent either way; abort the task driving
    /// [`Fetcher::run`] to abandon the remaining work.
    pub async fn close_or_interrupt<F>(&self, interrupt: F) -> Result<bool, FetcherError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            result = self.close() => result.map(|()| true),
            () = interrupt => {
                tracing::warn!(state = ?self.state(), "Fetcher close interrupted before drain finished");
                Ok(false)
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> FetcherState {
        FetcherState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Number of ticker tasks currently running
    pub fn active_tickers(&self) -> usize {
        self.live_tickers.load(Ordering::SeqCst)
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Outcome counters for cycles completed so far
    pub fn stats(&self) -> FetcherStats {
        FetcherStats {
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }

    async fn process(&self, handler: &SharedHandler) {
        match self.dispatcher.dispatch(handler).await {
            Ok(()) => self.succeeded.fetch_add(1, Ordering::SeqCst),
            Err(_) => self.failed.fetch_add(1, Ordering::SeqCst),
        };
    }
}

/// Marks the fetcher stopped when `run` ends, including when its future is
/// dropped mid-flight, so `close` never waits on a worker that is gone.
struct RunGuard<'a>(&'a Fetcher);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.shutdown.cancel();
        self.0.state.store(STOPPED, Ordering::SeqCst);
        self.0.stopped.send_replace(true);
    }
}
