//! Test fixtures for code built on errand.
//!
//! - [`ExecutionLog`]: Shared, ordered record of what ran
//! - [`RecordingBehavior`]: Logs `name:before` / `name:after` around the chain
//! - [`ShortCircuitBehavior`]: Fails without running the rest of the chain
//! - [`RepeatBehavior`]: Runs the rest of the chain several times
//! - [`CountingResolver`]: Counts the queries made against another resolver
//! - [`StubDispatcher`]: A [`Dispatch`] double with canned responses
//!
//! ```rust
//! use std::sync::Arc;
//! use errand::{Errand, handler_fn, Lifetime, Request, ServiceRegistry};
//! use errand_test::{ExecutionLog, RecordingBehavior};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Ping;
//!
//! impl Request for Ping {
//!     type Response = u8;
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let log = ExecutionLog::new();
//! let registry = Arc::new(ServiceRegistry::new());
//! let handler_log = log.clone();
//! registry.add_handler::<Ping, _>(Lifetime::Transient, move || {
//!     let log = handler_log.clone();
//!     handler_fn(move |_: &Ping, _: &CancellationToken| {
//!         log.push("handler");
//!         async { Ok(1) }
//!     })
//! });
//! let behavior_log = log.clone();
//! registry.add_behavior::<Ping, _>(Lifetime::Transient, move || {
//!     RecordingBehavior::new("outer", behavior_log.clone())
//! });
//!
//! Errand::new(registry).send(Ping, &CancellationToken::new()).await.unwrap();
//! assert_eq!(log.entries(), ["outer:before", "handler", "outer:after"]);
//! # });
//! ```

use async_trait::async_trait;
use errand::{
    Capability, CapabilityKind, Dispatch, ErrandError, HandlerKey, HandlerResult, Instance, Next,
    PipelineBehavior, Request, Resolver,
};
use parking_lot::Mutex;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ordered, cloneable record of pipeline events.
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Snapshot of the entries recorded so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of entries equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Records `name:before` and `name:after` around the rest of the chain.
///
/// `name:after` is recorded even when the inner chain fails.
#[derive(Debug, Clone)]
pub struct RecordingBehavior {
    name: String,
    log: ExecutionLog,
}

impl RecordingBehavior {
    pub fn new(name: impl Into<String>, log: ExecutionLog) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for RecordingBehavior {
    async fn handle(
        &self,
        _request: &R,
        next: Next<'_, R>,
        _cancel: &CancellationToken,
    ) -> HandlerResult<R::Response> {
        self.log.push(format!("{}:before", self.name));
        let result = next.run().await;
        self.log.push(format!("{}:after", self.name));
        result
    }
}

/// Error returned by [`ShortCircuitBehavior`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("short-circuited by '{behavior}'")]
pub struct ShortCircuited {
    pub behavior: String,
}

/// Fails with [`ShortCircuited`] and never runs the rest of the chain.
#[derive(Debug, Clone)]
pub struct ShortCircuitBehavior {
    name: String,
    log: ExecutionLog,
}

impl ShortCircuitBehavior {
    pub fn new(name: impl Into<String>, log: ExecutionLog) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for ShortCircuitBehavior {
    async fn handle(
        &self,
        _request: &R,
        _next: Next<'_, R>,
        _cancel: &CancellationToken,
    ) -> HandlerResult<R::Response> {
        self.log.push(format!("{}:stop", self.name));
        Err(ShortCircuited {
            behavior: self.name.clone(),
        }
        .into())
    }
}

/// Runs the rest of the chain `times` times and returns the last result.
///
/// Stops at the first failure.
#[derive(Debug, Clone, Copy)]
pub struct RepeatBehavior {
    times: usize,
}

impl RepeatBehavior {
    /// `times` is clamped to at least one run.
    pub fn new(times: usize) -> Self {
        Self {
            times: times.max(1),
        }
    }
}

#[async_trait]
impl<R: Request> PipelineBehavior<R> for RepeatBehavior {
    async fn handle(
        &self,
        _request: &R,
        next: Next<'_, R>,
        _cancel: &CancellationToken,
    ) -> HandlerResult<R::Response> {
        let mut response = next.run().await?;
        for _ in 1..self.times {
            response = next.run().await?;
        }
        Ok(response)
    }
}

/// Forwards to another resolver and counts the queries by capability kind.
#[derive(Debug)]
pub struct CountingResolver<T> {
    inner: T,
    handler_queries: AtomicUsize,
    behavior_queries: AtomicUsize,
}

impl<T: Resolver> CountingResolver<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            handler_queries: AtomicUsize::new(0),
            behavior_queries: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn handler_queries(&self) -> usize {
        self.handler_queries.load(Ordering::SeqCst)
    }

    pub fn behavior_queries(&self) -> usize {
        self.behavior_queries.load(Ordering::SeqCst)
    }

    fn count(&self, capability: &Capability) {
        let counter = match capability.kind() {
            CapabilityKind::Handler => &self.handler_queries,
            CapabilityKind::Behavior => &self.behavior_queries,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: Resolver> Resolver for CountingResolver<T> {
    fn resolve_one(&self, capability: &Capability) -> Option<Instance> {
        self.count(capability);
        self.inner.resolve_one(capability)
    }

    fn resolve_all(&self, capability: &Capability) -> Vec<Instance> {
        self.count(capability);
        self.inner.resolve_all(capability)
    }
}

/// [`Dispatch`] double that answers from canned responses.
///
/// Each response is handed out once. A request type with no response left
/// fails with [`ErrandError::HandlerNotFound`]. Every send is recorded by
/// request type name, in order.
#[derive(Debug, Default)]
pub struct StubDispatcher {
    responses: Mutex<HashMap<TypeId, Vec<Box<dyn Any + Send>>>>,
    sent: ExecutionLog,
}

impl StubDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `response` for the next send of `R`.
    pub fn respond<R: Request>(self, response: R::Response) -> Self {
        self.responses
            .lock()
            .entry(TypeId::of::<R>())
            .or_default()
            .push(Box::new(response));
        self
    }

    /// Type names of the requests sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.entries()
    }
}

#[async_trait]
impl Dispatch for StubDispatcher {
    async fn send<R: Request>(
        &self,
        _request: R,
        _cancel: &CancellationToken,
    ) -> HandlerResult<R::Response> {
        self.sent.push(type_name::<R>());
        let response = self
            .responses
            .lock()
            .get_mut(&TypeId::of::<R>())
            .and_then(|queued| (!queued.is_empty()).then(|| queued.remove(0)));
        match response.and_then(|boxed| boxed.downcast::<R::Response>().ok()) {
            Some(response) => Ok(*response),
            None => Err(ErrandError::handler_not_found(&HandlerKey::of::<R>()).into()),
        }
    }
}
