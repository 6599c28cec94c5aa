//! In-process typed request dispatch.
//!
//! `errand` routes a request value to the single handler registered for its
//! type and returns the handler's response. Optional pipeline behaviors wrap
//! the handler for cross-cutting concerns.
//!
//! # Features
//!
//! - **Typed requests**: A request declares its response type; the compiler
//!   checks every send site
//! - **Pipeline behaviors**: Ordered middleware that can run, skip or repeat
//!   the rest of the chain
//! - **Wrapper cache**: Handler lookup happens once per request type
//! - **Pluggable resolution**: Handlers and behaviors come from a [`Resolver`];
//!   [`ServiceRegistry`] is the bundled one
//! - **Cancellation**: A [`CancellationToken`](tokio_util::sync::CancellationToken)
//!   travels with every call
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use errand::{
//!     async_trait, Errand, HandlerResult, Lifetime, Request, RequestHandler, ServiceRegistry,
//!     TracingBehavior,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct GetUserQuery;
//!
//! impl Request for GetUserQuery {
//!     type Response = Vec<String>;
//! }
//!
//! struct GetUserQueryHandler;
//!
//! #[async_trait]
//! impl RequestHandler<GetUserQuery> for GetUserQueryHandler {
//!     async fn handle(
//!         &self,
//!         _request: &GetUserQuery,
//!         _cancel: &CancellationToken,
//!     ) -> HandlerResult<Vec<String>> {
//!         Ok(vec!["Alice".into(), "Bob".into(), "Charlie".into()])
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let registry = Arc::new(ServiceRegistry::new());
//! registry
//!     .add_handler::<GetUserQuery, _>(Lifetime::Singleton, || GetUserQueryHandler)
//!     .add_behavior::<GetUserQuery, _>(Lifetime::Transient, || TracingBehavior);
//!
//! let errand = Errand::new(registry);
//! let users = errand.send(GetUserQuery, &CancellationToken::new()).await?;
//! assert_eq!(users, ["Alice", "Bob", "Charlie"]);
//! # Ok::<(), anyhow::Error>(())
//! # }).unwrap();
//! ```
//!
//! # Errors
//!
//! Failures raised by the dispatcher itself are [`ErrandError`]s. Failures
//! raised by a behavior or handler reach the caller unchanged. Both travel as
//! `anyhow::Error`; use `downcast_ref` to tell them apart.

mod behaviors;
mod dispatcher;
mod error;
mod handler;
mod key;
mod options;
mod pipeline;
mod request;
mod resolver;
mod services;
mod unit;
mod wrapper;

pub use behaviors::{
    Cancelled, CancellationBehavior, TracingBehavior, Validate, ValidationBehavior,
    ValidationError,
};
pub use dispatcher::{Dispatch, Errand};
pub use error::{ErrandError, Result};
pub use handler::{
    handler_fn, BoxFuture, FnHandler, HandlerResult, RequestHandler, VoidHandler,
    VoidRequestHandler,
};
pub use key::HandlerKey;
pub use options::ErrandOptions;
pub use pipeline::{Next, PipelineBehavior};
pub use request::Request;
pub use resolver::{
    resolve_behaviors, resolve_handler, Capability, CapabilityKind, Instance, Resolver,
};
pub use services::{HandlerModule, Lifetime, Registrar, ServiceRegistry};
pub use unit::Unit;

#[cfg(feature = "derive")]
pub use errand_macros::Request;

pub use async_trait::async_trait;
