//! Per-pair handler wrappers and the cache that keeps them.

use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::handler::{HandlerResult, RequestHandler};
use crate::key::HandlerKey;
use crate::pipeline::Next;
use crate::resolver::{resolve_behaviors, Resolver};
use crate::Request;

/// Long-lived adapter for one request type.
///
/// Holds the resolved handler for the dispatcher's lifetime. Behaviors are
/// resolved again on every call because their lifetime belongs to the
/// resolver, not to the dispatcher.
pub(crate) struct HandlerWrapper<R: Request> {
    handler: Arc<dyn RequestHandler<R>>,
    resolver: Arc<dyn Resolver>,
}

impl<R: Request> HandlerWrapper<R> {
    pub(crate) fn new(handler: Arc<dyn RequestHandler<R>>, resolver: Arc<dyn Resolver>) -> Self {
        Self { handler, resolver }
    }

    /// Runs the request through the current behaviors and the handler.
    pub(crate) async fn handle(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> HandlerResult<R::Response> {
        let behaviors = resolve_behaviors::<R>(self.resolver.as_ref())?;
        if behaviors.is_empty() {
            return self.handler.handle(&request, cancel).await;
        }

        Next::new(&behaviors, self.handler.as_ref(), &request, cancel)
            .run()
            .await
    }
}

/// Concurrent map from [`HandlerKey`] to the wrapper built for it.
///
/// Values are stored type-erased; the key's `TypeId`s guarantee that the
/// entry under `HandlerKey::of::<R>()` is a `HandlerWrapper<R>`.
#[derive(Default)]
pub(crate) struct WrapperCache {
    entries: DashMap<HandlerKey, Arc<dyn Any + Send + Sync>>,
}

impl WrapperCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached wrapper for `R`. The shard guard is released
    /// before returning.
    pub(crate) fn get<R: Request>(&self) -> Option<Arc<HandlerWrapper<R>>> {
        let entry = self.entries.get(&HandlerKey::of::<R>())?;
        let erased = Arc::clone(entry.value());
        drop(entry);
        erased.downcast::<HandlerWrapper<R>>().ok()
    }

    /// Inserts `wrapper` unless another caller got there first, and returns
    /// whichever wrapper the cache retained.
    pub(crate) fn get_or_insert<R: Request>(
        &self,
        wrapper: HandlerWrapper<R>,
    ) -> Arc<HandlerWrapper<R>> {
        let candidate = Arc::new(wrapper);
        let retained = Arc::clone(
            self.entries
                .entry(HandlerKey::of::<R>())
                .or_insert_with(|| Arc::clone(&candidate) as Arc<dyn Any + Send + Sync>)
                .value(),
        );
        retained.downcast::<HandlerWrapper<R>>().unwrap_or(candidate)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::resolver::{Capability, Instance};

    struct Echo(String);

    impl Request for Echo {
        type Response = String;
    }

    struct Empty;

    impl Resolver for Empty {
        fn resolve_one(&self, _capability: &Capability) -> Option<Instance> {
            None
        }

        fn resolve_all(&self, _capability: &Capability) -> Vec<Instance> {
            Vec::new()
        }
    }

    fn wrapper(suffix: &'static str) -> HandlerWrapper<Echo> {
        let handler = handler_fn(move |request: &Echo, _cancel: &CancellationToken| {
            let text = format!("{}{}", request.0, suffix);
            async move { Ok(text) }
        });
        HandlerWrapper::new(Arc::new(handler), Arc::new(Empty))
    }

    #[tokio::test]
    async fn test_wrapper_without_behaviors_calls_handler() {
        let cancel = CancellationToken::new();
        let response = wrapper("!").handle(Echo("hi".into()), &cancel).await.unwrap();
        assert_eq!(response, "hi!");
    }

    #[tokio::test]
    async fn test_cache_keeps_first_inserted_wrapper() {
        let cache = WrapperCache::new();
        assert!(cache.get::<Echo>().is_none());

        let first = cache.get_or_insert(wrapper("-first"));
        let second = cache.get_or_insert(wrapper("-second"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let cancel = CancellationToken::new();
        let cached = cache.get::<Echo>().unwrap();
        let response = cached.handle(Echo("a".into()), &cancel).await.unwrap();
        assert_eq!(response, "a-first");
    }
}
