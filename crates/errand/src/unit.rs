//! The `Unit` response type.
//!
//! Requests that produce nothing still go through the same response-bearing
//! contract as every other request. They declare `Unit` as their response,
//! and void handlers return it implicitly (see [`VoidHandler`]).
//!
//! [`VoidHandler`]: crate::VoidHandler

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Sentinel response for requests without a meaningful result.
///
/// There is exactly one `Unit` value: every instance compares equal, orders
/// as `Equal`, hashes identically and renders as `()`.
///
/// ```rust
/// use errand::Unit;
///
/// assert_eq!(Unit, Unit::default());
/// assert_eq!(Unit.to_string(), "()");
/// ```
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct Unit;

impl Unit {
    /// The only `Unit` value.
    pub const VALUE: Unit = Unit;
}

impl PartialEq for Unit {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Unit {}

impl PartialOrd for Unit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Unit {
    fn cmp(&self, _other: &Self) -> Ordering {
        Ordering::Equal
    }
}

impl Hash for Unit {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("()")
    }
}

impl From<()> for Unit {
    fn from(_: ()) -> Self {
        Unit
    }
}

impl From<Unit> for () {
    fn from(_: Unit) -> Self {}
}
