//! Shape classification of service operations.
//!
//! Each qualifying method is reduced to a [`ResultShape`] and the payload type
//! its success handler receives. Anything the generated wrapper could not
//! express aborts the whole interface rather than emitting a partial unit.

use crate::config::{GeneratorConfig, OperationFilter, ShapesConfig};
use crate::errors::{GenError, Result};
use crate::model::{InterfaceDescriptor, OperationDescriptor, ParamDescriptor, ResultShape};
use crate::resolver::{ResolvedType, Resolver, Scope};
use crate::scanner::DeclaredInterface;
use syn::{
    Attribute, FnArg, ItemTrait, Pat, ReturnType, Signature, TraitBoundModifier, TraitItem,
    TraitItemFn, Type, TypeParamBound, WherePredicate,
};
use tracing::{debug, debug_span};

/// Name of the trailing callback parameter in generated wrappers
pub const BLOCK_PARAM: &str = "block";

/// Methods of `item` that become operations, in declaration order
pub fn qualifying_methods<'a>(
    item: &'a syn::ItemTrait,
    config: &'a GeneratorConfig,
) -> impl Iterator<Item = &'a TraitItemFn> + 'a {
    item.items.iter().filter_map(move |member| match member {
        TraitItem::Fn(method) if is_qualifying(method, config) => Some(method),
        _ => None,
    })
}

fn is_qualifying(method: &TraitItemFn, config: &GeneratorConfig) -> bool {
    if method.sig.receiver().is_none() {
        return false;
    }
    match config.operations.filter {
        OperationFilter::Required => method.default.is_none(),
        OperationFilter::HttpVerb => method.attrs.iter().any(|attr| {
            attr.path()
                .segments
                .last()
                .is_some_and(|segment| config.is_http_verb(&segment.ident.to_string()))
        }),
    }
}

/// Derive the shape and payload of a return type.
///
/// Rules apply in order: `async fn`, call wrapper, response wrapper, bare.
/// A wrapper applied to anything but exactly one type argument is its own
/// payload.
pub fn classify_return<R: Resolver + ?Sized>(
    is_async: bool,
    return_type: &Type,
    scope: &Scope<'_>,
    resolver: &R,
    shapes: &ShapesConfig,
) -> (ResultShape, Type) {
    if is_async {
        return (ResultShape::DeferredValue, return_type.clone());
    }

    let resolved = resolver.resolve(scope, return_type);
    let shape = match &resolved {
        ResolvedType::Nominal { path, .. } if shapes.call_wrappers.contains(path) => {
            ResultShape::AsyncCallWrapper
        }
        ResolvedType::Nominal { path, .. } if shapes.response_wrappers.contains(path) => {
            ResultShape::SyncResponseWrapper
        }
        _ => return (ResultShape::BareValue, return_type.clone()),
    };

    let payload = match resolved.arguments() {
        [single] => single.clone(),
        _ => return_type.clone(),
    };
    (shape, payload)
}

/// Classify one operation. `Err` carries the reason the interface is aborted.
pub fn classify_operation<R: Resolver + ?Sized>(
    method: &TraitItemFn,
    scope: &Scope<'_>,
    resolver: &R,
    shapes: &ShapesConfig,
) -> std::result::Result<OperationDescriptor, String> {
    let sig = &method.sig;
    let name = &sig.ident;

    if !sig.generics.params.is_empty() {
        return Err(format!("`{}` declares generic parameters", name));
    }

    match sig.receiver() {
        Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => return Err(format!("`{}` must take `&self`", name)),
    }

    let return_type = match &sig.output {
        ReturnType::Type(_, ty) => ty.as_ref(),
        ReturnType::Default => return Err(format!("`{}` has no return type", name)),
    };
    if matches!(return_type, Type::ImplTrait(_)) {
        return Err(format!("`{}` returns `impl Trait`", name));
    }

    let is_async = sig.asyncness.is_some();
    let parameters = collect_parameters(method, is_async)?;
    let (result_shape, payload_type) =
        classify_return(is_async, return_type, scope, resolver, shapes);

    Ok(OperationDescriptor {
        name: name.clone(),
        parameters,
        result_shape,
        payload_type,
        is_deferred: is_async,
    })
}

fn collect_parameters(
    method: &TraitItemFn,
    is_async: bool,
) -> std::result::Result<Vec<ParamDescriptor>, String> {
    let name = &method.sig.ident;
    let mut parameters = Vec::new();

    for (index, arg) in method.sig.inputs.iter().filter_map(typed_arg).enumerate() {
        let ident = match arg.pat.as_ref() {
            Pat::Ident(pat) if pat.subpat.is_none() => pat.ident.clone(),
            _ => quote::format_ident!("arg{}", index),
        };
        if ident == BLOCK_PARAM {
            return Err(format!(
                "`{}` has a parameter named `{}`, which wrappers reserve for the callback",
                name, BLOCK_PARAM
            ));
        }
        let ty = arg.ty.as_ref();
        if matches!(ty, Type::ImplTrait(_)) {
            return Err(format!("`{}` takes an `impl Trait` parameter", name));
        }
        if is_async && borrows(ty) {
            return Err(format!(
                "async `{}` borrows parameter `{}`; deferred calls need owned arguments",
                name, ident
            ));
        }
        parameters.push(ParamDescriptor {
            name: ident,
            ty: ty.clone(),
        });
    }

    Ok(parameters)
}

fn typed_arg(arg: &FnArg) -> Option<&syn::PatType> {
    match arg {
        FnArg::Typed(pat_type) => Some(pat_type),
        FnArg::Receiver(_) => None,
    }
}

fn borrows(ty: &Type) -> bool {
    match ty {
        Type::Reference(_) => true,
        Type::Group(group) => borrows(&group.elem),
        Type::Paren(paren) => borrows(&paren.elem),
        Type::Tuple(tuple) => tuple.elems.iter().any(borrows),
        _ => false,
    }
}

/// Why `Arc<dyn Trait>` cannot be stored in a service client, if it cannot.
///
/// Wrappers fetch the handle as a shared trait object, so the trait must name
/// `Send` and `Sync` itself (as supertraits or `where Self:` bounds) and every
/// member not guarded by `where Self: Sized` must be dyn compatible. Bounds
/// inherited through another supertrait are not followed.
pub fn handle_problem(item: &ItemTrait) -> Option<String> {
    let missing: Vec<&str> = ["Send", "Sync"]
        .into_iter()
        .filter(|marker| !requires_bound(item, marker))
        .collect();
    if !missing.is_empty() {
        return Some(format!(
            "service traits must require `{}` to be shared through a service handle",
            missing.join(" + ")
        ));
    }

    let boxes_futures = has_attribute(&item.attrs, "async_trait");
    for member in &item.items {
        match member {
            TraitItem::Const(constant) => {
                return Some(format!(
                    "associated const `{}` makes the trait not dyn compatible",
                    constant.ident
                ));
            }
            TraitItem::Fn(method) if !sized_only(&method.sig) => {
                let sig = &method.sig;
                if sig.asyncness.is_some() && !boxes_futures {
                    return Some(format!(
                        "async `{}` needs `#[async_trait]` on the trait to be dyn compatible",
                        sig.ident
                    ));
                }
                if sig.receiver().is_none() {
                    return Some(format!(
                        "`{}` has no receiver; add `where Self: Sized` to keep the trait dyn compatible",
                        sig.ident
                    ));
                }
                if sig.generics.type_params().next().is_some()
                    || sig.generics.const_params().next().is_some()
                {
                    return Some(format!("`{}` declares generic parameters", sig.ident));
                }
                if matches!(&sig.output, ReturnType::Type(_, ty) if matches!(**ty, Type::ImplTrait(_)))
                {
                    return Some(format!("`{}` returns `impl Trait`", sig.ident));
                }
            }
            _ => {}
        }
    }
    None
}

fn is_named(path: &syn::Path, name: &str) -> bool {
    path.segments.last().is_some_and(|segment| segment.ident == name)
}

fn names_bound<'a>(bounds: impl IntoIterator<Item = &'a TypeParamBound>, name: &str) -> bool {
    bounds
        .into_iter()
        .any(|bound| matches!(
            bound,
            TypeParamBound::Trait(t)
                if matches!(t.modifier, TraitBoundModifier::None) && is_named(&t.path, name)
        ))
}

/// `Self` predicates of a where clause
fn self_bounds<'a>(
    clause: Option<&'a syn::WhereClause>,
) -> impl Iterator<Item = &'a TypeParamBound> + 'a {
    clause
        .into_iter()
        .flat_map(|clause| clause.predicates.iter())
        .filter_map(|predicate| match predicate {
            WherePredicate::Type(p) => match &p.bounded_ty {
                Type::Path(ty) if ty.qself.is_none() && ty.path.is_ident("Self") => Some(&p.bounds),
                _ => None,
            },
            _ => None,
        })
        .flatten()
}

fn requires_bound(item: &ItemTrait, name: &str) -> bool {
    names_bound(&item.supertraits, name)
        || names_bound(self_bounds(item.generics.where_clause.as_ref()), name)
}

fn sized_only(sig: &Signature) -> bool {
    names_bound(self_bounds(sig.generics.where_clause.as_ref()), "Sized")
}

fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| is_named(attr.path(), name))
}

/// Classify every qualifying operation of a declared trait
pub fn classify_interface<R: Resolver + ?Sized>(
    declaration: &DeclaredInterface,
    resolver: &R,
    config: &GeneratorConfig,
) -> Result<InterfaceDescriptor> {
    let _span = debug_span!("classify", interface = %declaration.qualified_name).entered();

    if !declaration.item.generics.params.is_empty() {
        return Err(GenError::aborted(
            &declaration.qualified_name,
            "generic service traits cannot be reached through a service handle",
        ));
    }

    if let Some(reason) = handle_problem(&declaration.item) {
        return Err(GenError::aborted(&declaration.qualified_name, reason));
    }

    let scope = Scope::new(&declaration.package_name);
    let mut operations = Vec::new();
    for method in qualifying_methods(&declaration.item, config) {
        let operation = classify_operation(method, &scope, resolver, &config.shapes)
            .map_err(|reason| GenError::aborted(&declaration.qualified_name, reason))?;
        debug!(
            operation = %operation.name,
            shape = %operation.result_shape,
            "Classified operation"
        );
        operations.push(operation);
    }

    Ok(InterfaceDescriptor {
        qualified_name: declaration.qualified_name.clone(),
        package_name: declaration.package_name.clone(),
        simple_name: declaration.simple_name.clone(),
        visibility: declaration.item.vis.clone(),
        origin: declaration.origin.clone(),
        operations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tokens_to_string;
    use crate::resolver::UniverseResolver;
    use crate::scanner::scan;
    use crate::universe::Universe;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn classify(source: &str) -> Result<InterfaceDescriptor> {
        classify_with(source, &GeneratorConfig::default())
    }

    fn classify_with(source: &str, config: &GeneratorConfig) -> Result<InterfaceDescriptor> {
        let universe = Universe::from_sources([("api.rs", source)]).unwrap();
        let resolver = UniverseResolver::new(&universe);
        let declaration = scan(&universe, "remote_service").remove(0);
        classify_interface(&declaration, &resolver, config)
    }

    fn summary(descriptor: &InterfaceDescriptor) -> Vec<(String, ResultShape, String)> {
        descriptor
            .operations
            .iter()
            .map(|op| {
                (
                    op.name.to_string(),
                    op.result_shape,
                    tokens_to_string(&op.payload_type),
                )
            })
            .collect()
    }

    #[test]
    fn test_all_four_shapes() {
        let descriptor = classify(indoc! {r#"
            use svcwrap::{Call, Response};

            pub struct Item;

            #[remote_service]
            #[async_trait::async_trait]
            pub trait Example: Send + Sync {
                fn fetch(&self, id: String) -> Call<Item>;
                fn fetch_now(&self) -> Response<Vec<Item>>;
                async fn fetch_later(&self, id: u32) -> Item;
                fn fetch_bare(&self) -> Item;
            }
        "#})
        .unwrap();

        assert_eq!(
            summary(&descriptor),
            vec![
                ("fetch".into(), ResultShape::AsyncCallWrapper, "Item".into()),
                ("fetch_now".into(), ResultShape::SyncResponseWrapper, "Vec<Item>".into()),
                ("fetch_later".into(), ResultShape::DeferredValue, "Item".into()),
                ("fetch_bare".into(), ResultShape::BareValue, "Item".into()),
            ]
        );
        assert!(descriptor.operation("fetch_later").unwrap().is_deferred);
        assert!(!descriptor.operation("fetch").unwrap().is_deferred);
    }

    #[test]
    fn test_wrapper_without_single_argument_is_its_own_payload() {
        let descriptor = classify(indoc! {r#"
            #[remote_service]
            pub trait Example: Send + Sync {
                fn raw(&self) -> svcwrap::runtime::Call;
            }
        "#})
        .unwrap();
        assert_eq!(
            summary(&descriptor),
            vec![(
                "raw".into(),
                ResultShape::AsyncCallWrapper,
                "svcwrap::runtime::Call".into()
            )]
        );
    }

    #[test]
    fn test_local_type_named_call_is_bare() {
        let descriptor = classify(indoc! {r#"
            pub struct Call<T>(T);

            #[remote_service]
            pub trait Example: Send + Sync {
                fn fetch(&self) -> Call<u8>;
            }
        "#})
        .unwrap();
        assert_eq!(
            descriptor.operations[0].result_shape,
            ResultShape::BareValue
        );
    }

    #[test]
    fn test_missing_return_type_aborts_interface() {
        let err = classify(indoc! {r#"
            #[remote_service]
            pub trait Example: Send + Sync {
                fn ok(&self) -> u8;
                fn fire(&self, id: u32);
            }
        "#})
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "generation aborted for crate::api::Example: `fire` has no return type"
        );
    }

    #[test]
    fn test_unsupported_signatures_abort() {
        let cases = [
            "fn a<T>(&self, t: T) -> u8;",
            "fn a(&mut self) -> u8;",
            "fn a(self: std::sync::Arc<Self>) -> u8;",
            "fn a(&self) -> impl Iterator<Item = u8>;",
            "fn a(&self, block: u8) -> u8;",
            "async fn a(&self, id: &str) -> u8;",
        ];
        for case in cases {
            let source = format!(
                "#[remote_service] #[async_trait] pub trait Example: Send + Sync {{ {} }}",
                case
            );
            let err = classify(&source).unwrap_err();
            assert!(
                matches!(err, GenError::GenerationAborted { .. }),
                "expected abort for {}",
                case
            );
        }
    }

    #[test]
    fn test_borrowed_params_allowed_for_non_deferred() {
        let descriptor = classify(indoc! {r#"
            #[remote_service]
            pub trait Example: Send + Sync {
                fn lookup(&self, key: &str) -> u8;
            }
        "#})
        .unwrap();
        assert_eq!(descriptor.operations[0].parameters[0].name, "key");
    }

    #[test]
    fn test_non_ident_patterns_are_named_positionally() {
        let descriptor = classify(indoc! {r#"
            #[remote_service]
            pub trait Example: Send + Sync {
                fn pair(&self, id: u8, (a, b): (u8, u8), _: bool) -> u8;
            }
        "#})
        .unwrap();
        let names: Vec<_> = descriptor.operations[0]
            .parameters
            .iter()
            .map(|p| p.name.to_string())
            .collect();
        assert_eq!(names, vec!["id", "arg1", "arg2"]);
    }

    #[test]
    fn test_default_methods_and_associated_fns_are_skipped() {
        let descriptor = classify(indoc! {r#"
            #[remote_service]
            pub trait Example: Send + Sync {
                fn build() -> Self where Self: Sized;
                fn helper(&self) -> u8 { 0 }
                fn real(&self) -> u8;
            }
        "#})
        .unwrap();
        assert_eq!(descriptor.operations.len(), 1);
        assert_eq!(descriptor.operations[0].name, "real");
    }

    #[test]
    fn test_http_verb_filter() {
        let mut config = GeneratorConfig::default();
        config.operations.filter = OperationFilter::HttpVerb;
        let descriptor = classify_with(
            indoc! {r#"
                #[remote_service]
                pub trait Example: Send + Sync {
                    #[get("/items")]
                    fn list(&self) -> u8;
                    #[http::post("/items")]
                    fn create(&self) -> u8;
                    fn plain(&self) -> u8;
                }
            "#},
            &config,
        )
        .unwrap();
        let names: Vec<_> = descriptor
            .operations
            .iter()
            .map(|op| op.name.to_string())
            .collect();
        assert_eq!(names, vec!["list", "create"]);
    }

    #[test]
    fn test_trait_without_send_sync_aborts() {
        let err = classify(indoc! {r#"
            use svcwrap::Call;

            pub struct Item;

            #[remote_service]
            pub trait Example {
                fn fetch(&self, id: String) -> Call<Item>;
            }
        "#})
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "generation aborted for crate::api::Example: service traits must require \
             `Send + Sync` to be shared through a service handle"
        );

        let err = classify("#[remote_service] pub trait Example: Send { fn a(&self) -> u8; }")
            .unwrap_err();
        assert!(err.to_string().contains("must require `Sync`"));
    }

    #[test]
    fn test_send_sync_accepted_from_where_clause_or_paths() {
        let cases = [
            "pub trait Example where Self: Send + Sync { fn a(&self) -> u8; }",
            "pub trait Example: std::marker::Send + core::marker::Sync + 'static { fn a(&self) -> u8; }",
            "pub trait Example: Send where Self: Sync { fn a(&self) -> u8; }",
        ];
        for case in cases {
            let source = format!("#[remote_service] {}", case);
            assert!(classify(&source).is_ok(), "expected {} to classify", case);
        }
    }

    #[test]
    fn test_native_async_fn_aborts_without_async_trait() {
        let err = classify(indoc! {r#"
            #[remote_service]
            pub trait Example: Send + Sync {
                fn fetch(&self) -> u8;
                async fn fetch_later(&self, id: u32) -> u8;
            }
        "#})
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "generation aborted for crate::api::Example: async `fetch_later` needs \
             `#[async_trait]` on the trait to be dyn compatible"
        );

        // Either attribute order works once the futures are boxed
        let descriptor = classify(indoc! {r#"
            #[async_trait]
            #[remote_service]
            pub trait Example: Send + Sync {
                async fn fetch_later(&self, id: u32) -> u8;
            }
        "#})
        .unwrap();
        assert!(descriptor.operations[0].is_deferred);
    }

    #[test]
    fn test_members_that_break_trait_objects_abort() {
        let cases = [
            "const LIMIT: u32; fn a(&self) -> u8;",
            "fn a(&self) -> u8; fn make() -> u8;",
            "fn a(&self) -> u8; fn map<T>(&self, t: T) -> T { t }",
            "fn a(&self) -> u8; fn iter(&self) -> impl Iterator<Item = u8> { 0..1 }",
        ];
        for case in cases {
            let source = format!("#[remote_service] pub trait Example: Send + Sync {{ {} }}", case);
            let err = classify(&source).unwrap_err();
            assert!(
                err.to_string().contains("generation aborted"),
                "expected abort for {}",
                case
            );
        }

        // The same members are fine when excluded from the vtable
        let descriptor = classify(indoc! {r#"
            #[remote_service]
            pub trait Example: Send + Sync {
                fn a(&self) -> u8;
                fn make() -> u8 where Self: Sized;
                fn map<T>(&self, t: T) -> T where Self: Sized { t }
                async fn later(&self) -> u8 where Self: Sized { 0 }
            }
        "#})
        .unwrap();
        assert_eq!(descriptor.operations.len(), 1);
    }

    #[test]
    fn test_generic_trait_aborts() {
        let err = classify("#[remote_service] pub trait Example<T> { fn a(&self) -> T; }")
            .unwrap_err();
        assert!(err.to_string().contains("generic service traits"));
    }
}
