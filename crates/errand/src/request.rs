//! The request contract.

/// A value that can be dispatched to exactly one handler.
///
/// The associated `Response` type declares what the request produces. Because
/// it is an associated type, a request type is tied to a single response type
/// for the whole program, which is what keeps the dispatcher's handler cache
/// keyed consistently.
///
/// Requests without a meaningful result use [`Unit`](crate::Unit):
///
/// ```rust
/// use errand::{Request, Unit};
///
/// struct Ping { value: i32 }
/// struct Pong { value: i32 }
///
/// impl Request for Ping {
///     type Response = Pong;
/// }
///
/// struct Flush;
///
/// impl Request for Flush {
///     type Response = Unit;
/// }
/// ```
///
/// With the `derive` feature the impl can be generated:
///
/// ```rust
/// # #[cfg(feature = "derive")] {
/// use errand::Request;
///
/// struct Pong { value: i32 }
///
/// #[derive(Request)]
/// #[request(response = Pong)]
/// struct Ping { value: i32 }
/// # }
/// ```
pub trait Request: Send + Sync + 'static {
    /// The type produced by this request's handler.
    type Response: Send + 'static;
}
