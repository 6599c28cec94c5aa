//! The request dispatcher.
//!
//! [`Errand`] routes each request to the one handler registered for its type,
//! running the registered pipeline behaviors around it.
//!
//! # Dispatch Flow
//!
//! ```text
//! send(request)
//!   → wrapper cache lookup by (request type, response type)
//!     miss → resolve handler (none: HandlerNotFound, nothing cached)
//!          → build wrapper, insert if absent
//!   → wrapper: resolve current behaviors, run pipeline
//!   → response or the participant's own error
//! ```
//!
//! The cache is the only shared mutable state. Clones of an `Errand` share it.
//!
//! Code that only sends requests can depend on [`Dispatch`] instead of the
//! concrete dispatcher, and take a test double in its place.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::ErrandError;
use crate::key::HandlerKey;
use crate::resolver::{resolve_handler, Resolver};
use crate::wrapper::{HandlerWrapper, WrapperCache};
use crate::Request;

/// Anything that can send typed requests.
///
/// [`Errand`] is the real implementation. Only [`send`](Dispatch::send) is
/// required; the default [`send_opt`](Dispatch::send_opt) rejects `None`
/// without calling it.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn send<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> anyhow::Result<R::Response>;

    async fn send_opt<R: Request>(
        &self,
        request: Option<R>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<R::Response> {
        let request = request.ok_or_else(absent_request)?;
        self.send(request, cancel).await
    }
}

fn absent_request() -> ErrandError {
    ErrandError::invalid_argument("request", "value cannot be absent")
}

/// Typed in-process request dispatcher.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use errand::{handler_fn, Errand, Lifetime, Request, ServiceRegistry};
/// use tokio_util::sync::CancellationToken;
///
/// struct Ping { value: i32 }
///
/// impl Request for Ping {
///     type Response = i32;
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let registry = Arc::new(ServiceRegistry::new());
/// registry.add_handler::<Ping, _>(Lifetime::Transient, || {
///     handler_fn(|request: &Ping, _cancel: &CancellationToken| {
///         let value = request.value;
///         async move { Ok(value) }
///     })
/// });
///
/// let errand = Errand::new(registry);
/// let value = errand.send(Ping { value: 42 }, &CancellationToken::new()).await?;
/// assert_eq!(value, 42);
/// # Ok::<(), anyhow::Error>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct Errand {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: Arc<dyn Resolver>,
    cache: WrapperCache,
}

impl Errand {
    /// Creates a dispatcher resolving handlers and behaviors from `resolver`.
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver,
                cache: WrapperCache::new(),
            }),
        }
    }

    /// Sends a request to its handler and returns the response.
    ///
    /// `cancel` is handed to every behavior and to the handler; the dispatcher
    /// itself never triggers it.
    ///
    /// # Errors
    ///
    /// - [`ErrandError::HandlerNotFound`] when no handler is registered for `R`
    /// - [`ErrandError::InstanceMismatch`] when the resolver returns a foreign instance
    /// - any error returned by a behavior or the handler, unchanged
    pub async fn send<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> anyhow::Result<R::Response> {
        let wrapper = self.wrapper::<R>()?;
        wrapper.handle(request, cancel).await
    }

    /// Sends a request that may be absent.
    ///
    /// `None` fails with [`ErrandError::InvalidArgument`] naming the `request`
    /// parameter, before the resolver is consulted.
    pub async fn send_opt<R: Request>(
        &self,
        request: Option<R>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<R::Response> {
        let request = request.ok_or_else(absent_request)?;
        self.send(request, cancel).await
    }

    /// Number of request types with a cached wrapper.
    pub fn cached_handlers(&self) -> usize {
        self.inner.cache.len()
    }

    fn wrapper<R: Request>(&self) -> Result<Arc<HandlerWrapper<R>>, ErrandError> {
        if let Some(wrapper) = self.inner.cache.get::<R>() {
            trace!(request = std::any::type_name::<R>(), "handler wrapper cache hit");
            return Ok(wrapper);
        }

        let key = HandlerKey::of::<R>();
        let handler = resolve_handler::<R>(self.inner.resolver.as_ref())?
            .ok_or_else(|| ErrandError::handler_not_found(&key))?;

        debug!(
            request = key.request_name(),
            response = key.response_name(),
            "created handler wrapper"
        );
        let wrapper = HandlerWrapper::new(handler, Arc::clone(&self.inner.resolver));
        Ok(self.inner.cache.get_or_insert(wrapper))
    }
}

#[async_trait]
impl Dispatch for Errand {
    async fn send<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> anyhow::Result<R::Response> {
        Errand::send(self, request, cancel).await
    }

    async fn send_opt<R: Request>(
        &self,
        request: Option<R>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<R::Response> {
        Errand::send_opt(self, request, cancel).await
    }
}

impl std::fmt::Debug for Errand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Errand")
            .field("cached_handlers", &self.cached_handlers())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, HandlerResult, RequestHandler};
    use crate::resolver::{Capability, Instance};
    use crate::Unit;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Ping {
        value: i32,
    }

    impl Request for Ping {
        type Response = i32;
    }

    struct Flush;

    impl Request for Flush {
        type Response = Unit;
    }

    /// Resolver that only knows the Ping handler and counts queries.
    #[derive(Default)]
    struct PingOnly {
        queries: AtomicUsize,
    }

    impl Resolver for PingOnly {
        fn resolve_one(&self, capability: &Capability) -> Option<Instance> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if capability == &Capability::handler::<Ping>() {
                let handler: Arc<dyn RequestHandler<Ping>> =
                    Arc::new(handler_fn(|request: &Ping, _cancel: &CancellationToken| {
                        let value = request.value;
                        async move { Ok(value + 1) }
                    }));
                Some(Instance::handler(handler))
            } else {
                None
            }
        }

        fn resolve_all(&self, _capability: &Capability) -> Vec<Instance> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_send_dispatches_and_caches() {
        let resolver = Arc::new(PingOnly::default());
        let errand = Errand::new(resolver.clone());
        let cancel = CancellationToken::new();

        assert_eq!(errand.send(Ping { value: 1 }, &cancel).await.unwrap(), 2);
        assert_eq!(errand.send(Ping { value: 2 }, &cancel).await.unwrap(), 3);

        assert_eq!(errand.cached_handlers(), 1);
        // One handler lookup, then one behavior lookup per call.
        assert_eq!(resolver.queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_handler_is_not_cached() {
        let errand = Errand::new(Arc::new(PingOnly::default()));
        let cancel = CancellationToken::new();

        let err = errand.send(Flush, &cancel).await.unwrap_err();
        let err = err.downcast_ref::<ErrandError>().unwrap();

        assert!(err.is_handler_not_found());
        assert!(err.to_string().contains("Flush"));
        assert_eq!(errand.cached_handlers(), 0);
    }

    #[tokio::test]
    async fn test_send_opt_none_skips_resolver() {
        let resolver = Arc::new(PingOnly::default());
        let errand = Errand::new(resolver.clone());
        let cancel = CancellationToken::new();

        let err = errand.send_opt::<Ping>(None, &cancel).await.unwrap_err();
        let err = err.downcast_ref::<ErrandError>().unwrap();

        assert_eq!(err.parameter(), Some("request"));
        assert_eq!(resolver.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_opt_some_dispatches() {
        let errand = Errand::new(Arc::new(PingOnly::default()));
        let cancel = CancellationToken::new();

        let value = errand.send_opt(Some(Ping { value: 9 }), &cancel).await.unwrap();
        assert_eq!(value, 10);
    }

    #[tokio::test]
    async fn test_clones_share_cache() {
        let errand = Errand::new(Arc::new(PingOnly::default()));
        let clone = errand.clone();
        let cancel = CancellationToken::new();

        clone.send(Ping { value: 0 }, &cancel).await.unwrap();
        assert_eq!(errand.cached_handlers(), 1);
        assert!(format!("{:?}", errand).contains("cached_handlers: 1"));
    }

    async fn send_twice(dispatcher: &impl Dispatch, value: i32) -> anyhow::Result<i32> {
        let cancel = CancellationToken::new();
        let first = dispatcher.send(Ping { value }, &cancel).await?;
        dispatcher.send_opt(Some(Ping { value: first }), &cancel).await
    }

    #[tokio::test]
    async fn test_errand_dispatches_through_trait() {
        let resolver = Arc::new(PingOnly::default());
        let errand = Errand::new(resolver.clone());

        assert_eq!(send_twice(&errand, 1).await.unwrap(), 3);
        assert_eq!(errand.cached_handlers(), 1);

        let err = Dispatch::send_opt::<Ping>(&errand, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<ErrandError>().unwrap().parameter(), Some("request"));
    }

    #[tokio::test]
    async fn test_handler_error_is_returned_unchanged() {
        #[derive(Debug, thiserror::Error)]
        #[error("boom {0}")]
        struct Boom(i32);

        struct Exploding;

        #[async_trait]
        impl RequestHandler<Ping> for Exploding {
            async fn handle(&self, request: &Ping, _c: &CancellationToken) -> HandlerResult<i32> {
                Err(Boom(request.value).into())
            }
        }

        struct Fixed;

        impl Resolver for Fixed {
            fn resolve_one(&self, _capability: &Capability) -> Option<Instance> {
                let handler: Arc<dyn RequestHandler<Ping>> = Arc::new(Exploding);
                Some(Instance::handler(handler))
            }

            fn resolve_all(&self, _capability: &Capability) -> Vec<Instance> {
                Vec::new()
            }
        }

        let errand = Errand::new(Arc::new(Fixed));
        let err = errand
            .send(Ping { value: 5 }, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<ErrandError>().is_none());
        assert_eq!(err.downcast_ref::<Boom>().unwrap().0, 5);
        assert_eq!(err.to_string(), "boom 5");
    }
}
