//! Fetch-and-handle cycles for the dispatch worker
//!
//! One cycle fetches a handler's URL under a fixed timeout and passes the
//! payload to the handler. Every failure, a handler panic included, ends the
//! cycle as a [`DispatchError`] that is logged and recorded on the cycle's
//! span; nothing escapes to the worker loop.

use crate::fetcher::client::Fetch;
use crate::fetcher::handler::SharedHandler;
use crate::{DispatchError, FetchError};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{field, Instrument, Span};

/// Runs fetch-and-handle cycles against a shared fetch client
#[derive(Clone)]
pub(crate) struct Dispatcher {
    client: Arc<dyn Fetch>,
    fetch_timeout: Duration,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn Fetch>, fetch_timeout: Duration) -> Self {
        Self {
            client,
            fetch_timeout,
        }
    }

    /// Executes one cycle for `handler`
    ///
    /// The error is returned for callers that want to count outcomes; it has
    /// already been logged.
    pub async fn dispatch(&self, handler: &SharedHandler) -> Result<(), DispatchError> {
        let span = tracing::info_span!(
            "fetch_api",
            handler = handler.name(),
            url = handler.url(),
            otel.status_code = field::Empty,
            error = field::Empty
        );

        let result = AssertUnwindSafe(self.cycle(handler).instrument(span.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(DispatchError::Panic(panic_message(payload.as_ref()))));

        if let Err(err) = &result {
            record_error(&span, handler, err);
        }

        result
    }

    async fn cycle(&self, handler: &SharedHandler) -> Result<(), DispatchError> {
        let url = handler.url();

        let payload = match tokio::time::timeout(self.fetch_timeout, self.client.get(url)).await {
            Ok(fetched) => fetched?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    after: self.fetch_timeout,
                }
                .into())
            }
        };

        tracing::trace!(bytes = payload.len(), "Fetched payload");

        handler.handle(payload).await.map_err(DispatchError::Handle)
    }
}

fn record_error(span: &Span, handler: &SharedHandler, err: &DispatchError) {
    span.record("otel.status_code", "ERROR");
    span.record("error", field::display(err));

    let _entered = span.enter();
    match err {
        DispatchError::Fetch(e) => {
            tracing::error!(url = handler.url(), error = %e, "Fetch failed");
        }
        DispatchError::Handle(e) => {
            tracing::error!(url = handler.url(), error = %format!("{e:#}"), "Handle failed");
        }
        DispatchError::Panic(message) => {
            tracing::error!(url = handler.url(), panic = %message, "Handler panicked");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(err) = panic.downcast_ref::<anyhow::Error>() {
        format!("{err:#}")
    } else {
        "unknown panic payload".to_string()
    }
}
