//! Cache keys for the (request, response) pair.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::Request;

/// Identity of a (request type, response type) pair.
///
/// Equality and hashing use both `TypeId`s. The type names are carried only
/// for diagnostics and error messages.
#[derive(Clone, Copy)]
pub struct HandlerKey {
    request: TypeId,
    response: TypeId,
    request_name: &'static str,
    response_name: &'static str,
}

impl HandlerKey {
    /// Derives the key for request type `R`.
    pub fn of<R: Request>() -> Self {
        Self {
            request: TypeId::of::<R>(),
            response: TypeId::of::<R::Response>(),
            request_name: type_name::<R>(),
            response_name: type_name::<R::Response>(),
        }
    }

    pub fn request_type(&self) -> TypeId {
        self.request
    }

    pub fn response_type(&self) -> TypeId {
        self.response
    }

    /// Fully qualified name of the request type.
    pub fn request_name(&self) -> &'static str {
        self.request_name
    }

    /// Fully qualified name of the response type.
    pub fn response_name(&self) -> &'static str {
        self.response_name
    }
}

impl PartialEq for HandlerKey {
    fn eq(&self, other: &Self) -> bool {
        self.request == other.request && self.response == other.response
    }
}

impl Eq for HandlerKey {}

impl Hash for HandlerKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.request.hash(state);
        self.response.hash(state);
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.request_name, self.response_name)
    }
}

impl fmt::Debug for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerKey")
            .field("request", &self.request_name)
            .field("response", &self.response_name)
            .finish()
    }
}
