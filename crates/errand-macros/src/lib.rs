//! Proc macros for errand.
//!
//! # Derive Macros
//!
//! - [`Request`] - Implement `errand::Request` and declare the response type

mod request;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `errand::Request`.
///
/// The response type is given with `#[request(response = Type)]`. Without the
/// attribute the request answers `errand::Unit`.
///
/// ```rust,ignore
/// use errand::Request;
///
/// #[derive(Request)]
/// #[request(response = Vec<String>)]
/// struct ListUsers;
///
/// #[derive(Request)]
/// struct Flush;
/// ```
///
/// Generic requests get the `Send + Sync + 'static` bounds the trait needs on
/// each type parameter.
///
/// # Compile-Time Errors
///
/// - Unknown keys inside `#[request(...)]`
/// - `response` given more than once
#[proc_macro_derive(Request, attributes(request))]
pub fn request_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    request::request_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
