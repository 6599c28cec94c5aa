//! Built-in pipeline behaviors.
//!
//! - [`TracingBehavior`]: Opens an `errand.request` span around the rest of
//!   the chain and records elapsed time and outcome
//! - [`ValidationBehavior`]: Rejects requests whose [`Validate`] check fails
//! - [`CancellationBehavior`]: Stops waiting once the caller's token fires
//!
//! All three are generic over the request type, so one value can be
//! registered for any number of requests.

use async_trait::async_trait;
use std::any::type_name;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, Instrument};

use crate::handler::HandlerResult;
use crate::pipeline::{Next, PipelineBehavior};
use crate::Request;

/// Wraps the remainder of the chain in a tracing span.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBehavior;

#[async_trait]
impl<R: Request> PipelineBehavior<R> for TracingBehavior {
    async fn handle(
        &self,
        _request: &R,
        next: Next<'_, R>,
        _cancel: &CancellationToken,
    ) -> HandlerResult<R::Response> {
        let span = debug_span!(
            "errand.request",
            request = type_name::<R>(),
            response = type_name::<R::Response>()
        );
        let started = Instant::now();
        let result = next.run().instrument(span.clone()).await;
        let elapsed_us = started.elapsed().as_micros() as u64;

        span.in_scope(|| match &result {
            Ok(_) => debug!(elapsed_us, outcome = "ok", "request handled"),
            Err(err) => debug!(elapsed_us, outcome = "error", error = %err, "request handled"),
        });
        result
    }
}

/// Error returned when a request fails its own validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid '{field}': {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Requests that can check their own fields.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Runs [`Validate::validate`] and only continues the chain if it passes.
///
/// A rejected request never reaches inner behaviors or the handler; the
/// caller receives the [`ValidationError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationBehavior;

#[async_trait]
impl<R: Request + Validate> PipelineBehavior<R> for ValidationBehavior {
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, R>,
        _cancel: &CancellationToken,
    ) -> HandlerResult<R::Response> {
        request.validate()?;
        next.run().await
    }
}

/// Error returned by [`CancellationBehavior`] once the token has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request was cancelled")]
pub struct Cancelled;

/// Races the rest of the chain against the cancellation token.
///
/// An already-cancelled token fails immediately without running anything
/// inside this behavior. Otherwise the inner future is dropped as soon as the
/// token fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct CancellationBehavior;

#[async_trait]
impl<R: Request> PipelineBehavior<R> for CancellationBehavior {
    async fn handle(
        &self,
        _request: &R,
        next: Next<'_, R>,
        cancel: &CancellationToken,
    ) -> HandlerResult<R::Response> {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled.into()),
            result = next.run() => result,
        }
    }
}
