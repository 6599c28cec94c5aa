//! Request handler types.
//!
//! A handler performs the work for one request type and produces its
//! response. Exactly one handler is resolved per request type; cross-cutting
//! logic belongs in [`PipelineBehavior`](crate::PipelineBehavior)s instead.
//!
//! # Core Types
//!
//! - [`RequestHandler`]: The response-bearing handler capability
//! - [`VoidRequestHandler`]: Handler form for requests answering [`Unit`]
//! - [`VoidHandler`]: Adapts a void handler into a [`RequestHandler`]
//! - [`FnHandler`]: Adapts a closure into a [`RequestHandler`]
//! - [`HandlerResult`]: The result type for handlers (`Result<T, anyhow::Error>`)
//!
//! # Failures
//!
//! Handlers fail with `anyhow::Error`. The dispatcher returns that error to the
//! caller untouched, so the concrete error type stays reachable through
//! `downcast_ref` and the source chain is preserved.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::{Request, Unit};

/// Result type for handlers and pipeline behaviors.
pub type HandlerResult<T> = Result<T, anyhow::Error>;

/// Boxed future returned by type-erased handler calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handles requests of type `R`.
///
/// # Example
///
/// ```rust
/// use errand::{async_trait, HandlerResult, Request, RequestHandler};
/// use tokio_util::sync::CancellationToken;
///
/// struct Ping { value: i32 }
/// struct Pong { value: i32 }
///
/// impl Request for Ping {
///     type Response = Pong;
/// }
///
/// struct PingHandler;
///
/// #[async_trait]
/// impl RequestHandler<Ping> for PingHandler {
///     async fn handle(&self, request: &Ping, _cancel: &CancellationToken) -> HandlerResult<Pong> {
///         Ok(Pong { value: request.value })
///     }
/// }
/// ```
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync + 'static {
    /// Handles the request, observing `cancel` if the work can be aborted.
    async fn handle(&self, request: &R, cancel: &CancellationToken)
        -> HandlerResult<R::Response>;
}

/// Handler form for requests that produce no value.
///
/// Register it through [`ServiceRegistry::add_void_handler`] or wrap it in
/// [`VoidHandler`]; either way the dispatcher sees a regular
/// [`RequestHandler`] answering [`Unit`].
///
/// [`ServiceRegistry::add_void_handler`]: crate::ServiceRegistry::add_void_handler
#[async_trait]
pub trait VoidRequestHandler<R>: Send + Sync + 'static
where
    R: Request<Response = Unit>,
{
    /// Handles the request.
    async fn handle(&self, request: &R, cancel: &CancellationToken) -> HandlerResult<()>;
}

/// Adapts a [`VoidRequestHandler`] into a [`RequestHandler`] returning [`Unit`].
pub struct VoidHandler<H>(pub H);

impl<H> VoidHandler<H> {
    /// Wraps a void handler.
    pub fn new(handler: H) -> Self {
        Self(handler)
    }

    /// Returns the wrapped handler.
    pub fn into_inner(self) -> H {
        self.0
    }
}

#[async_trait]
impl<R, H> RequestHandler<R> for VoidHandler<H>
where
    R: Request<Response = Unit>,
    H: VoidRequestHandler<R>,
{
    async fn handle(&self, request: &R, cancel: &CancellationToken) -> HandlerResult<Unit> {
        <H as VoidRequestHandler<R>>::handle(&self.0, request, cancel).await?;
        Ok(Unit)
    }
}

impl<H> fmt::Debug for VoidHandler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VoidHandler")
            .field(&std::any::type_name::<H>())
            .finish()
    }
}

/// A wrapper that implements [`RequestHandler`] for closures.
///
/// The closure receives the request and the cancellation token by reference
/// and returns a future. The future cannot borrow from its arguments, so copy
/// what it needs out of the request first.
///
/// # Example
///
/// ```rust
/// use errand::{handler_fn, Request};
/// use tokio_util::sync::CancellationToken;
///
/// struct Double(i64);
///
/// impl Request for Double {
///     type Response = i64;
/// }
///
/// let handler = handler_fn(|request: &Double, _cancel: &CancellationToken| {
///     let value = request.0;
///     async move { Ok(value * 2) }
/// });
/// # let _ = handler;
/// ```
pub struct FnHandler<F, R, Fut> {
    f: F,
    _phantom: PhantomData<fn(&R) -> Fut>,
}

impl<F, R, Fut> FnHandler<F, R, Fut>
where
    R: Request,
    F: Fn(&R, &CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<R::Response>> + Send + 'static,
{
    /// Creates a new FnHandler wrapping the given closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, R, Fut> RequestHandler<R> for FnHandler<F, R, Fut>
where
    R: Request,
    F: Fn(&R, &CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<R::Response>> + Send + 'static,
{
    async fn handle(&self, request: &R, cancel: &CancellationToken) -> HandlerResult<R::Response> {
        (self.f)(request, cancel).await
    }
}

/// Creates a [`FnHandler`] from a closure.
pub fn handler_fn<F, R, Fut>(f: F) -> FnHandler<F, R, Fut>
where
    R: Request,
    F: Fn(&R, &CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<R::Response>> + Send + 'static,
{
    FnHandler::new(f)
}
