//! Marker attribute for svcwrap service traits.
//!
//! `#[remote_service]` leaves the trait untouched. The svcwrap generator finds
//! marked traits by reading source, so the attribute only has to exist and
//! sit on a trait.

use proc_macro::TokenStream;
use quote::ToTokens;
use syn::{parse_macro_input, Item};

/// Mark a trait as a remote service.
///
/// The trait is emitted unchanged. Applying the attribute to anything other
/// than a trait, or passing arguments, is a compile error.
#[proc_macro_attribute]
pub fn remote_service(attr: TokenStream, input: TokenStream) -> TokenStream {
    let attr = proc_macro2::TokenStream::from(attr);
    if !attr.is_empty() {
        return syn::Error::new_spanned(attr, "#[remote_service] takes no arguments")
            .to_compile_error()
            .into();
    }

    match parse_macro_input!(input as Item) {
        Item::Trait(item) => item.into_token_stream().into(),
        other => syn::Error::new_spanned(other, "#[remote_service] can only be applied to a trait")
            .to_compile_error()
            .into(),
    }
}
