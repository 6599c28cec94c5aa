//! The dependency-resolution boundary.
//!
//! The dispatcher never constructs handlers or behaviors itself. It asks a
//! [`Resolver`] for instances of a [`Capability`], and the resolver decides
//! how they are created and how long they live. [`ServiceRegistry`] is the
//! bundled implementation; anything else that can answer the two queries can
//! stand in for it.
//!
//! Instances cross the boundary type-erased ([`Instance`]). The typed helpers
//! in this module turn them back into `Arc<dyn RequestHandler<R>>` and
//! `Arc<dyn PipelineBehavior<R>>`.
//!
//! [`ServiceRegistry`]: crate::ServiceRegistry

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::error::{ErrandError, Result};
use crate::handler::RequestHandler;
use crate::key::HandlerKey;
use crate::pipeline::PipelineBehavior;
use crate::Request;

/// Which capability is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    /// The single mandatory handler for a pair.
    Handler,
    /// The ordered pipeline behaviors for a pair.
    Behavior,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::Handler => write!(f, "handler"),
            CapabilityKind::Behavior => write!(f, "behavior"),
        }
    }
}

/// Descriptor of a capability for one (request, response) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    kind: CapabilityKind,
    key: HandlerKey,
}

impl Capability {
    /// The handler capability for request type `R`.
    pub fn handler<R: Request>() -> Self {
        Self {
            kind: CapabilityKind::Handler,
            key: HandlerKey::of::<R>(),
        }
    }

    /// The pipeline behavior capability for request type `R`.
    pub fn behavior<R: Request>() -> Self {
        Self {
            kind: CapabilityKind::Behavior,
            key: HandlerKey::of::<R>(),
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn key(&self) -> &HandlerKey {
        &self.key
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.kind, self.key)
    }
}

/// A type-erased handler or behavior instance.
///
/// Cloning is cheap; the wrapped capability is reference counted.
#[derive(Clone)]
pub struct Instance(Arc<dyn Any + Send + Sync>);

impl Instance {
    /// Wraps a handler for request type `R`.
    pub fn handler<R: Request>(handler: Arc<dyn RequestHandler<R>>) -> Self {
        Self(Arc::new(handler))
    }

    /// Wraps a pipeline behavior for request type `R`.
    pub fn behavior<R: Request>(behavior: Arc<dyn PipelineBehavior<R>>) -> Self {
        Self(Arc::new(behavior))
    }

    /// Returns the wrapped value if it is a `T`.
    pub fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.0.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").finish_non_exhaustive()
    }
}

/// Maps capability descriptors to instances.
///
/// Implementations must be safe to query concurrently. The dispatcher calls
/// them without holding any lock of its own.
pub trait Resolver: Send + Sync {
    /// Looks up at most one instance. Absence is not an error.
    fn resolve_one(&self, capability: &Capability) -> Option<Instance>;

    /// Looks up every registered instance, in registration order.
    fn resolve_all(&self, capability: &Capability) -> Vec<Instance>;
}

impl<T: Resolver + ?Sized> Resolver for Arc<T> {
    fn resolve_one(&self, capability: &Capability) -> Option<Instance> {
        (**self).resolve_one(capability)
    }

    fn resolve_all(&self, capability: &Capability) -> Vec<Instance> {
        (**self).resolve_all(capability)
    }
}

/// Resolves the handler for request type `R`, if one is registered.
pub fn resolve_handler<R: Request>(
    resolver: &dyn Resolver,
) -> Result<Option<Arc<dyn RequestHandler<R>>>> {
    let capability = Capability::handler::<R>();
    match resolver.resolve_one(&capability) {
        None => Ok(None),
        Some(instance) => instance
            .downcast::<Arc<dyn RequestHandler<R>>>()
            .map(Some)
            .ok_or_else(|| mismatch::<Arc<dyn RequestHandler<R>>>(&capability)),
    }
}

/// Resolves every pipeline behavior for request type `R`, in registration order.
pub fn resolve_behaviors<R: Request>(
    resolver: &dyn Resolver,
) -> Result<Vec<Arc<dyn PipelineBehavior<R>>>> {
    let capability = Capability::behavior::<R>();
    resolver
        .resolve_all(&capability)
        .iter()
        .map(|instance| {
            instance
                .downcast::<Arc<dyn PipelineBehavior<R>>>()
                .ok_or_else(|| mismatch::<Arc<dyn PipelineBehavior<R>>>(&capability))
        })
        .collect()
}

fn mismatch<T>(capability: &Capability) -> ErrandError {
    ErrandError::InstanceMismatch {
        capability: capability.to_string(),
        expected: type_name::<T>(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, HandlerResult};
    use crate::pipeline::Next;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct Ping(i32);

    impl Request for Ping {
        type Response = i32;
    }

    struct Passthrough;

    #[async_trait]
    impl PipelineBehavior<Ping> for Passthrough {
        async fn handle(
            &self,
            _request: &Ping,
            next: Next<'_, Ping>,
            _cancel: &CancellationToken,
        ) -> HandlerResult<i32> {
            next.run().await
        }
    }

    /// Resolver answering every query with a fixed set of instances.
    struct Fixed {
        handler: Option<Instance>,
        behaviors: Vec<Instance>,
    }

    impl Resolver for Fixed {
        fn resolve_one(&self, _capability: &Capability) -> Option<Instance> {
            self.handler.clone()
        }

        fn resolve_all(&self, _capability: &Capability) -> Vec<Instance> {
            self.behaviors.clone()
        }
    }

    fn ping_handler() -> Arc<dyn RequestHandler<Ping>> {
        Arc::new(handler_fn(|request: &Ping, _cancel: &CancellationToken| {
            let value = request.0;
            async move { Ok(value) }
        }))
    }

    #[test]
    fn test_capability_display() {
        let capability = Capability::handler::<Ping>();
        assert_eq!(capability.kind(), CapabilityKind::Handler);
        assert!(capability.to_string().starts_with("handler for "));
        assert!(capability.to_string().contains("Ping"));

        let behavior = Capability::behavior::<Ping>();
        assert_eq!(behavior.key(), capability.key());
        assert_ne!(behavior, capability);
    }

    #[tokio::test]
    async fn test_resolve_handler_round_trips_through_instance() {
        let resolver = Fixed {
            handler: Some(Instance::handler(ping_handler())),
            behaviors: Vec::new(),
        };

        let handler = resolve_handler::<Ping>(&resolver).unwrap().unwrap();
        let cancel = CancellationToken::new();
        assert_eq!(handler.handle(&Ping(12), &cancel).await.unwrap(), 12);
    }

    #[test]
    fn test_resolve_handler_absent_is_none() {
        let resolver = Fixed {
            handler: None,
            behaviors: Vec::new(),
        };
        assert!(resolve_handler::<Ping>(&resolver).unwrap().is_none());
    }

    #[test]
    fn test_resolve_handler_wrong_instance_is_mismatch() {
        let resolver = Fixed {
            handler: Some(Instance::behavior::<Ping>(Arc::new(Passthrough))),
            behaviors: Vec::new(),
        };

        let err = resolve_handler::<Ping>(&resolver).err().unwrap();
        assert!(matches!(err, ErrandError::InstanceMismatch { .. }));
        assert!(err.to_string().contains("handler for"));
    }

    #[test]
    fn test_resolve_behaviors_keeps_order_and_rejects_strangers() {
        let first: Arc<dyn PipelineBehavior<Ping>> = Arc::new(Passthrough);
        let second: Arc<dyn PipelineBehavior<Ping>> = Arc::new(Passthrough);
        let resolver = Fixed {
            handler: None,
            behaviors: vec![
                Instance::behavior(first.clone()),
                Instance::behavior(second.clone()),
            ],
        };

        let behaviors = resolve_behaviors::<Ping>(&resolver).unwrap();
        assert_eq!(behaviors.len(), 2);
        assert!(Arc::ptr_eq(&behaviors[0], &first));
        assert!(Arc::ptr_eq(&behaviors[1], &second));

        let polluted = Fixed {
            handler: None,
            behaviors: vec![Instance::behavior(first), Instance::handler(ping_handler())],
        };
        assert!(resolve_behaviors::<Ping>(&polluted).is_err());
    }
}
