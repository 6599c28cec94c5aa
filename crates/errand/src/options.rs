//! Registration options.

use crate::services::Lifetime;

/// Options applied by [`ServiceRegistry::add_errand`].
///
/// ```rust
/// use errand::{ErrandOptions, Lifetime};
///
/// let options = ErrandOptions::new().handler_lifetime(Lifetime::Singleton);
/// assert_eq!(options.handlers(), Lifetime::Singleton);
/// assert_eq!(options.behaviors(), Lifetime::Transient);
/// ```
///
/// [`ServiceRegistry::add_errand`]: crate::ServiceRegistry::add_errand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrandOptions {
    handler_lifetime: Lifetime,
    behavior_lifetime: Lifetime,
}

impl ErrandOptions {
    /// Creates options with transient handlers and behaviors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lifetime used for handlers registered by modules.
    pub fn handler_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.handler_lifetime = lifetime;
        self
    }

    /// Sets the lifetime used for behaviors registered by modules.
    pub fn behavior_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.behavior_lifetime = lifetime;
        self
    }

    pub fn handlers(&self) -> Lifetime {
        self.handler_lifetime
    }

    pub fn behaviors(&self) -> Lifetime {
        self.behavior_lifetime
    }
}
