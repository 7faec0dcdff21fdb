//! Code emission: one extension-trait unit per service trait.
//!
//! Wrappers are built as `quote!` token trees, parsed back into a `syn::File`
//! to catch malformed output, and pretty-printed with `prettyplease`.

use crate::classifier::BLOCK_PARAM;
use crate::config::GeneratorConfig;
use crate::errors::{GenError, Result};
use crate::model::{InterfaceDescriptor, OperationDescriptor, ResultShape};
use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};
use std::path::PathBuf;
use tracing::debug;

/// Rendered source for one service trait, ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub qualified_name: String,
    pub package_name: String,
    pub unit_name: String,
    pub origin: PathBuf,
    pub source: String,
}

pub struct Emitter<'a> {
    runtime: syn::Path,
    config: &'a GeneratorConfig,
}

impl<'a> Emitter<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            runtime: config.runtime_path(),
            config,
        }
    }

    /// Render the unit for `descriptor`. Nothing is returned on failure, so a
    /// partially rendered unit can never be written.
    pub fn emit(&self, descriptor: &InterfaceDescriptor) -> Result<GeneratedUnit> {
        let unit_name = self.config.unit_name(&descriptor.simple_name);
        let tokens = self.render(descriptor, &unit_name);

        let file = syn::parse2::<syn::File>(tokens).map_err(|e| {
            GenError::aborted(
                &descriptor.qualified_name,
                format!("rendered unit does not parse: {}", e),
            )
        })?;

        let source = format!(
            "{}\n\n{}",
            header(descriptor),
            prettyplease::unparse(&file)
        );
        debug!(
            interface = %descriptor.qualified_name,
            unit = %unit_name,
            operations = descriptor.operations.len(),
            "Rendered unit"
        );

        Ok(GeneratedUnit {
            qualified_name: descriptor.qualified_name.clone(),
            package_name: descriptor.package_name.clone(),
            unit_name,
            origin: descriptor.origin.clone(),
            source,
        })
    }

    fn render(&self, descriptor: &InterfaceDescriptor, unit_name: &str) -> TokenStream {
        let rt = &self.runtime;
        let vis = &descriptor.visibility;
        let unit = Ident::new(unit_name, Span::call_site());
        let service = Ident::new(&descriptor.simple_name, Span::call_site());

        let signatures: Vec<_> = descriptor
            .operations
            .iter()
            .map(|op| self.signature(op))
            .collect();
        let bodies: Vec<_> = descriptor
            .operations
            .iter()
            .map(|op| self.body(&service, op))
            .collect();
        let doc = format!(
            " Callback-style wrappers for [`{}`] on the service DSL.",
            descriptor.simple_name
        );

        quote! {
            #[doc = #doc]
            #vis trait #unit {
                #( #signatures; )*
            }

            impl #unit for #rt::ServiceDsl {
                #( #signatures #bodies )*
            }
        }
    }

    fn signature(&self, op: &OperationDescriptor) -> TokenStream {
        let rt = &self.runtime;
        let name = &op.name;
        let payload = &op.payload_type;
        let block = format_ident!("{}", BLOCK_PARAM);
        let params = op.parameters.iter().map(|p| {
            let (name, ty) = (&p.name, &p.ty);
            quote!(#name: #ty)
        });

        quote! {
            fn #name(&self, #( #params, )* #block: impl FnOnce(&mut #rt::Continuation<#payload>))
        }
    }

    fn body(&self, service: &Ident, op: &OperationDescriptor) -> TokenStream {
        let rt = &self.runtime;
        let block = format_ident!("{}", BLOCK_PARAM);
        let dispatch = self.dispatch(op);
        let settle = self.settle(op);

        // `block` and `settle` stay outside the boundary so their panics reach
        // the caller; `__busy` is dropped on unwind either way.
        quote! {
            {
                let __busy = self.busy();
                let mut __continuation = #rt::Continuation::new();
                #block(&mut __continuation);
                let __continuation = __continuation.shared();
                let __outcome = #rt::runtime::attempt(|| {
                    let __service = self.service_handle::<dyn #service>()?;
                    #dispatch
                });
                #settle
            }
        }
    }

    /// The shape-specific call, evaluating to the boundary's `Result`
    fn dispatch(&self, op: &OperationDescriptor) -> TokenStream {
        let name = &op.name;
        let args = op.parameters.iter().map(|p| &p.name);
        let call = quote!(__service.#name(#( #args ),*));

        match op.result_shape {
            ResultShape::AsyncCallWrapper => {
                let completion = format_ident!("__completion");
                let deliver = self.deliver(&completion);
                quote! {
                    let __call = #call;
                    let #completion = __continuation.clone();
                    __call.enqueue(move |__result| match __result {
                        Ok(__response) => #deliver,
                        Err(__cause) => {
                            #completion.fail(__cause);
                        }
                    });
                    Ok(())
                }
            }
            ResultShape::DeferredValue => quote! {
                self.spawn_deferred(async move { #call.await }, __continuation.clone())
            },
            ResultShape::SyncResponseWrapper | ResultShape::BareValue => quote! {
                Ok(#call)
            },
        }
    }

    /// Route `__outcome` once the boundary has returned
    fn settle(&self, op: &OperationDescriptor) -> TokenStream {
        match op.result_shape {
            ResultShape::AsyncCallWrapper | ResultShape::DeferredValue => quote! {
                if let Err(__error) = __outcome {
                    __continuation.fail_dispatch(__error);
                }
            },
            ResultShape::SyncResponseWrapper => {
                let deliver = self.deliver(&format_ident!("__continuation"));
                quote! {
                    match __outcome {
                        Ok(__response) => #deliver,
                        Err(__error) => {
                            __continuation.fail(__error);
                        }
                    }
                }
            }
            ResultShape::BareValue => quote! {
                __continuation.complete(__outcome);
            },
        }
    }

    /// Route a completed `__response` to `target`: body on success, an HTTP
    /// failure otherwise.
    fn deliver(&self, target: &Ident) -> TokenStream {
        let rt = &self.runtime;
        quote! {
            if __response.is_successful() {
                match __response.into_body() {
                    Some(__value) => {
                        #target.succeed(__value);
                    }
                    None => {
                        #target.fail(#rt::CallError::EmptyBody);
                    }
                }
            } else {
                #target.fail(#rt::CallError::http(__response.code(), __response.message()));
            }
        }
    }
}

fn header(descriptor: &InterfaceDescriptor) -> String {
    format!(
        "// @generated by svcwrap from {} ({}). Do not edit.",
        descriptor.origin.display(),
        descriptor.qualified_name
    )
}
