//! Handler and behavior registration.
//!
//! [`ServiceRegistry`] is the bundled [`Resolver`]: a concurrent table of
//! factories keyed by [`Capability`]. It is used through `&self`, so it can be
//! shared behind an `Arc` with the dispatcher and still accept registrations
//! afterwards.
//!
//! # Modules
//!
//! Handlers are usually grouped into [`HandlerModule`]s, registered together
//! with [`ServiceRegistry::add_errand`]. The module decides *what* gets
//! registered; the caller's [`ErrandOptions`] decide the lifetimes.
//!
//! ```rust
//! use errand::{
//!     async_trait, ErrandOptions, HandlerModule, HandlerResult, Lifetime, Registrar,
//!     Request, RequestHandler, ServiceRegistry,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct ListUsers;
//!
//! impl Request for ListUsers {
//!     type Response = Vec<String>;
//! }
//!
//! struct ListUsersHandler;
//!
//! #[async_trait]
//! impl RequestHandler<ListUsers> for ListUsersHandler {
//!     async fn handle(
//!         &self,
//!         _request: &ListUsers,
//!         _cancel: &CancellationToken,
//!     ) -> HandlerResult<Vec<String>> {
//!         Ok(vec!["Alice".into(), "Bob".into()])
//!     }
//! }
//!
//! struct Users;
//!
//! impl HandlerModule for Users {
//!     fn register(&self, registrar: &mut Registrar<'_>) {
//!         registrar.handler::<ListUsers, _>(|| ListUsersHandler);
//!     }
//! }
//!
//! let registry = ServiceRegistry::new();
//! registry.add_errand(&ErrandOptions::new().handler_lifetime(Lifetime::Singleton), &[&Users])?;
//! assert_eq!(registry.len(), 1);
//! # Ok::<(), errand::ErrandError>(())
//! ```

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{ErrandError, Result};
use crate::handler::{RequestHandler, VoidHandler, VoidRequestHandler};
use crate::options::ErrandOptions;
use crate::pipeline::PipelineBehavior;
use crate::resolver::{Capability, Instance, Resolver};
use crate::{Request, Unit};

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// A new instance on every resolution.
    #[default]
    Transient,
    /// One instance per registration, created on first resolution.
    Singleton,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Transient => write!(f, "transient"),
            Lifetime::Singleton => write!(f, "singleton"),
        }
    }
}

type Factory = Box<dyn Fn() -> Instance + Send + Sync>;

struct Registration {
    lifetime: Lifetime,
    factory: Factory,
    shared: OnceCell<Instance>,
}

impl Registration {
    fn instance(&self) -> Instance {
        match self.lifetime {
            Lifetime::Transient => (self.factory)(),
            Lifetime::Singleton => self.shared.get_or_init(|| (self.factory)()).clone(),
        }
    }
}

/// Concurrent registry of handler and behavior factories.
#[derive(Default)]
pub struct ServiceRegistry {
    registrations: DashMap<Capability, Vec<Arc<Registration>>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for request type `R`.
    ///
    /// Registering a second handler for the same request replaces the first
    /// for resolution purposes: the most recent registration wins.
    pub fn add_handler<R, H>(
        &self,
        lifetime: Lifetime,
        factory: impl Fn() -> H + Send + Sync + 'static,
    ) -> &Self
    where
        R: Request,
        H: RequestHandler<R>,
    {
        self.register(Capability::handler::<R>(), lifetime, move || {
            let handler: Arc<dyn RequestHandler<R>> = Arc::new(factory());
            Instance::handler(handler)
        })
    }

    /// Registers a [`VoidRequestHandler`] as the handler for `R`.
    pub fn add_void_handler<R, H>(
        &self,
        lifetime: Lifetime,
        factory: impl Fn() -> H + Send + Sync + 'static,
    ) -> &Self
    where
        R: Request<Response = Unit>,
        H: VoidRequestHandler<R>,
    {
        self.add_handler::<R, VoidHandler<H>>(lifetime, move || VoidHandler(factory()))
    }

    /// Appends a pipeline behavior for request type `R`.
    ///
    /// Behaviors run in the order they were added, the first one outermost.
    pub fn add_behavior<R, B>(
        &self,
        lifetime: Lifetime,
        factory: impl Fn() -> B + Send + Sync + 'static,
    ) -> &Self
    where
        R: Request,
        B: PipelineBehavior<R>,
    {
        self.register(Capability::behavior::<R>(), lifetime, move || {
            let behavior: Arc<dyn PipelineBehavior<R>> = Arc::new(factory());
            Instance::behavior(behavior)
        })
    }

    /// Registers every handler and behavior declared by `modules`.
    ///
    /// # Errors
    ///
    /// [`ErrandError::InvalidArgument`] naming `modules` when the slice is empty.
    pub fn add_errand(
        &self,
        options: &ErrandOptions,
        modules: &[&dyn HandlerModule],
    ) -> Result<&Self> {
        if modules.is_empty() {
            return Err(ErrandError::invalid_argument(
                "modules",
                "At least one handler module must be provided.",
            ));
        }

        for module in modules {
            let mut registrar = Registrar {
                registry: self,
                options: *options,
                handlers: 0,
                behaviors: 0,
            };
            module.register(&mut registrar);
            debug!(
                module = module.name(),
                handlers = registrar.handlers,
                behaviors = registrar.behaviors,
                "registered errand module"
            );
        }

        Ok(self)
    }

    /// Lifetimes of every registration for `capability`, in registration order.
    pub fn lifetimes(&self, capability: &Capability) -> Vec<Lifetime> {
        self.registrations
            .get(capability)
            .map(|entry| entry.iter().map(|r| r.lifetime).collect())
            .unwrap_or_default()
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.iter().map(|entry| entry.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register<F>(&self, capability: Capability, lifetime: Lifetime, factory: F) -> &Self
    where
        F: Fn() -> Instance + Send + Sync + 'static,
    {
        trace!(%capability, %lifetime, "registering");
        let registration = Arc::new(Registration {
            lifetime,
            factory: Box::new(factory),
            shared: OnceCell::new(),
        });
        self.registrations
            .entry(capability)
            .or_default()
            .push(registration);
        self
    }
}

impl Resolver for ServiceRegistry {
    fn resolve_one(&self, capability: &Capability) -> Option<Instance> {
        let registration = self
            .registrations
            .get(capability)
            .and_then(|entry| entry.last().cloned())?;
        Some(registration.instance())
    }

    fn resolve_all(&self, capability: &Capability) -> Vec<Instance> {
        let registrations = self
            .registrations
            .get(capability)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        registrations.iter().map(|r| r.instance()).collect()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("capabilities", &self.registrations.len())
            .field("registrations", &self.len())
            .finish()
    }
}

/// A group of handlers and behaviors registered together.
pub trait HandlerModule: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Declares this module's handlers and behaviors.
    fn register(&self, registrar: &mut Registrar<'_>);
}

/// Registration handle passed to [`HandlerModule::register`].
///
/// Applies the lifetimes from the caller's [`ErrandOptions`].
pub struct Registrar<'a> {
    registry: &'a ServiceRegistry,
    options: ErrandOptions,
    handlers: usize,
    behaviors: usize,
}

impl Registrar<'_> {
    /// Registers the handler for `R` with the configured handler lifetime.
    pub fn handler<R, H>(&mut self, factory: impl Fn() -> H + Send + Sync + 'static) -> &mut Self
    where
        R: Request,
        H: RequestHandler<R>,
    {
        self.registry
            .add_handler::<R, H>(self.options.handlers(), factory);
        self.handlers += 1;
        self
    }

    /// Registers a void handler for `R` with the configured handler lifetime.
    pub fn void_handler<R, H>(
        &mut self,
        factory: impl Fn() -> H + Send + Sync + 'static,
    ) -> &mut Self
    where
        R: Request<Response = Unit>,
        H: VoidRequestHandler<R>,
    {
        self.registry
            .add_void_handler::<R, H>(self.options.handlers(), factory);
        self.handlers += 1;
        self
    }

    /// Appends a behavior for `R` with the configured behavior lifetime.
    pub fn behavior<R, B>(&mut self, factory: impl Fn() -> B + Send + Sync + 'static) -> &mut Self
    where
        R: Request,
        B: PipelineBehavior<R>,
    {
        self.registry
            .add_behavior::<R, B>(self.options.behaviors(), factory);
        self.behaviors += 1;
        self
    }

    /// The options this module is registered under.
    pub fn options(&self) -> &ErrandOptions {
        &self.options
    }
}
