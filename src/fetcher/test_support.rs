//! Stub collaborators shared by the fetcher unit tests

use crate::fetcher::client::Fetch;
use crate::fetcher::handler::Handler;
use crate::FetchError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned response for one URL
#[derive(Clone)]
enum Reply {
    Body(&'static str),
    Status(u16, &'static str),
}

/// In-memory [`Fetch`] returning canned responses per URL
#[derive(Default)]
pub struct StubFetch {
    replies: HashMap<String, Reply>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: &'static str) -> Self {
        self.replies.insert(url.to_string(), Reply::Body(body));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16, body: &'static str) -> Self {
        self.replies
            .insert(url.to_string(), Reply::Status(status, body));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for StubFetch {
    async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.replies.get(url) {
            Some(Reply::Body(body)) => Ok(Bytes::from_static(body.as_bytes())),
            Some(Reply::Status(status, body)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
                body: body.to_string(),
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
                body: String::new(),
            }),
        }
    }
}

/// What a [`RecordingHandler`] does with a payload
#[derive(Clone, Copy)]
pub enum Behavior {
    Succeed,
    Fail(&'static str),
    Panic(&'static str),
}

/// Handler recording every payload it receives
///
/// Flags `reentered` if a call starts while another is still in flight.
pub struct RecordingHandler {
    url: String,
    interval: Duration,
    behavior: Behavior,
    work: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicBool,
    reentered: AtomicBool,
    payloads: Mutex<Vec<String>>,
    journal: Option<Journal>,
}

/// Dispatch order shared between several handlers, one URL per call
pub type Journal = Arc<Mutex<Vec<String>>>;

impl RecordingHandler {
    pub fn new(url: &str, interval: Duration) -> Self {
        Self {
            url: url.to_string(),
            interval,
            behavior: Behavior::Succeed,
            work: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicBool::new(false),
            reentered: AtomicBool::new(false),
            payloads: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    /// Appends this handler's URL to `journal` at the start of every call
    pub fn journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Makes every call take `work` to complete
    pub fn working_for(mut self, work: Duration) -> Self {
        self.work = Some(work);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reentered(&self) -> bool {
        self.reentered.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn handle(&self, payload: Bytes) -> anyhow::Result<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.reentered.store(true, Ordering::SeqCst);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(self.url.clone());
        }
        self.payloads
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(&payload).into_owned());

        if let Some(work) = self.work {
            tokio::time::sleep(work).await;
        }
        self.in_flight.store(false, Ordering::SeqCst);

        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(message) => Err(anyhow::anyhow!(message)),
            Behavior::Panic(message) => panic!("{}", message),
        }
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn refresh_interval(&self) -> Duration {
        self.interval
    }
}

/// Tracks in-flight calls across several handlers
///
/// Wraps a [`RecordingHandler`] and reports overlap with any other handler
/// sharing the same gate.
pub struct GatedHandler {
    inner: RecordingHandler,
    gate: Arc<AtomicBool>,
    overlap: Arc<AtomicBool>,
}

impl GatedHandler {
    pub fn new(
        inner: RecordingHandler,
        gate: Arc<AtomicBool>,
        overlap: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inner,
            gate,
            overlap,
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

#[async_trait]
impl Handler for GatedHandler {
    async fn handle(&self, payload: Bytes) -> anyhow::Result<()> {
        if self.gate.swap(true, Ordering::SeqCst) {
            self.overlap.store(true, Ordering::SeqCst);
        }
        let result = self.inner.handle(payload).await;
        self.gate.store(false, Ordering::SeqCst);
        result
    }

    fn url(&self) -> &str {
        self.inner.url()
    }

    fn refresh_interval(&self) -> Duration {
        self.inner.refresh_interval()
    }
}
