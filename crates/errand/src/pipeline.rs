//! Pipeline behaviors and the continuation that chains them.
//!
//! Behaviors wrap the handler invocation for one request type. They enable
//! cross-cutting concerns (logging, validation, timing) without polluting
//! handler logic.
//!
//! # Nesting Order
//!
//! Behaviors nest in registration order, the first registered being the
//! outermost:
//!
//! ```text
//! send(request)
//!   → b1 before
//!     → b2 before
//!       → ...
//!         → handler
//!       ← ...
//!     ← b2 after
//!   ← b1 after
//! ```
//!
//! # Continuations
//!
//! Each behavior receives a [`Next`] pointing at the rest of the chain. The
//! behavior decides what to do with it:
//!
//! - Run it once: the common case.
//! - Never run it: short-circuits the handler and every inner behavior. The
//!   behavior's own result becomes the result of the call.
//! - Run it several times: allowed. Retry-style behaviors are responsible for
//!   their own discipline.
//!
//! `Next` is a cursor over the resolved behavior slice rather than a stack of
//! nested closures, so building a chain costs nothing per behavior.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::handler::{BoxFuture, HandlerResult, RequestHandler};
use crate::Request;

/// Middleware wrapping the handler for requests of type `R`.
///
/// # Example
///
/// ```rust
/// use errand::{async_trait, HandlerResult, Next, PipelineBehavior, Request};
/// use tokio_util::sync::CancellationToken;
///
/// struct Audit;
///
/// #[async_trait]
/// impl<R: Request> PipelineBehavior<R> for Audit {
///     async fn handle(
///         &self,
///         _request: &R,
///         next: Next<'_, R>,
///         _cancel: &CancellationToken,
///     ) -> HandlerResult<R::Response> {
///         println!("before {}", std::any::type_name::<R>());
///         let response = next.run().await;
///         println!("after {}", std::any::type_name::<R>());
///         response
///     }
/// }
/// ```
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync + 'static {
    /// Runs this behavior around the remainder of the chain.
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, R>,
        cancel: &CancellationToken,
    ) -> HandlerResult<R::Response>;
}

/// The remainder of a pipeline, from one behavior's point of view.
///
/// Running it invokes the next behavior with a cursor over the ones after it,
/// or the handler once no behaviors remain. `Next` is `Copy`; running it more
/// than once re-executes everything inside it.
pub struct Next<'a, R: Request> {
    request: &'a R,
    behaviors: &'a [Arc<dyn PipelineBehavior<R>>],
    handler: &'a dyn RequestHandler<R>,
    cancel: &'a CancellationToken,
}

impl<'a, R: Request> Next<'a, R> {
    pub(crate) fn new(
        behaviors: &'a [Arc<dyn PipelineBehavior<R>>],
        handler: &'a dyn RequestHandler<R>,
        request: &'a R,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            request,
            behaviors,
            handler,
            cancel,
        }
    }

    /// Runs the remainder of the chain.
    pub fn run(self) -> BoxFuture<'a, HandlerResult<R::Response>> {
        match self.behaviors.split_first() {
            Some((behavior, rest)) => {
                let next = Next {
                    behaviors: rest,
                    ..self
                };
                behavior.handle(self.request, next, self.cancel)
            }
            None => self.handler.handle(self.request, self.cancel),
        }
    }

    /// Number of behaviors still ahead of the handler.
    pub fn remaining(&self) -> usize {
        self.behaviors.len()
    }
}

impl<R: Request> Clone for Next<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Request> Copy for Next<'_, R> {}

impl<R: Request> fmt::Debug for Next<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("request", &std::any::type_name::<R>())
            .field("remaining", &self.behaviors.len())
            .finish()
    }
}
