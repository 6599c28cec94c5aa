//! `#[derive(Request)]` implementation.
//!
//! # Container Attributes
//!
//! | Attribute | Description | Default |
//! |-----------|-------------|---------|
//! | `response = Type` | The request's response type | `::errand::Unit` |

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_quote,
    spanned::Spanned,
    DeriveInput, Error, GenericParam, Ident, Result, Token, Type,
};

/// Container-level attributes: `#[request(response = Type)]`
#[derive(Default)]
struct RequestAttrs {
    response: Option<Type>,
}

impl Parse for RequestAttrs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attrs = RequestAttrs::default();

        while !input.is_empty() {
            let key: Ident = input.parse()?;
            if key != "response" {
                return Err(Error::new(
                    key.span(),
                    "unknown attribute, expected `response = Type`",
                ));
            }
            input.parse::<Token![=]>()?;
            let ty: Type = input.parse()?;
            if attrs.response.is_some() {
                return Err(Error::new(ty.span(), "duplicate `response` attribute"));
            }
            attrs.response = Some(ty);

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        Ok(attrs)
    }
}

pub fn request_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let mut attrs = RequestAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("request") {
            continue;
        }
        let parsed: RequestAttrs = attr.parse_args()?;
        if let Some(response) = parsed.response {
            if attrs.response.is_some() {
                return Err(Error::new(response.span(), "duplicate `response` attribute"));
            }
            attrs.response = Some(response);
        }
    }

    let response = attrs
        .response
        .unwrap_or_else(|| parse_quote!(::errand::Unit));

    let mut generics = input.generics.clone();
    for param in &mut generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(::core::marker::Send));
            ty.bounds.push(parse_quote!(::core::marker::Sync));
            ty.bounds.push(parse_quote!('static));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let name = &input.ident;

    Ok(quote! {
        impl #impl_generics ::errand::Request for #name #ty_generics #where_clause {
            type Response = #response;
        }
    })
}
