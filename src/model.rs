//! Signature model: value types describing discovered service traits.
//!
//! Descriptors are rebuilt from the symbol universe on every round and never
//! persisted. Syntax nodes are kept as `syn` values so the emitter can splice
//! them back verbatim; serialization renders them as token strings.

use quote::ToTokens;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// How an operation delivers its result, which selects the emission template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    /// Returns a non-blocking call wrapper that is enqueued with a callback
    AsyncCallWrapper,
    /// Returns an already-completed response wrapper carrying a status
    SyncResponseWrapper,
    /// `async fn`: resolves to its value later
    DeferredValue,
    /// Returns the value directly with no status of its own
    BareValue,
}

impl ResultShape {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AsyncCallWrapper => "async-call",
            Self::SyncResponseWrapper => "sync-response",
            Self::DeferredValue => "deferred",
            Self::BareValue => "bare",
        }
    }
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One forwarded parameter of an operation
#[derive(Debug, Clone, Serialize)]
pub struct ParamDescriptor {
    #[serde(serialize_with = "serialize_tokens")]
    pub name: syn::Ident,
    #[serde(rename = "type", serialize_with = "serialize_tokens")]
    pub ty: syn::Type,
}

/// One remote-call operation of a service trait
#[derive(Debug, Clone, Serialize)]
pub struct OperationDescriptor {
    #[serde(serialize_with = "serialize_tokens")]
    pub name: syn::Ident,
    pub parameters: Vec<ParamDescriptor>,
    pub result_shape: ResultShape,
    /// Type handed to the success handler
    #[serde(serialize_with = "serialize_tokens")]
    pub payload_type: syn::Type,
    pub is_deferred: bool,
}

/// A marked service trait with its classified operations
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceDescriptor {
    pub qualified_name: String,
    pub package_name: String,
    pub simple_name: String,
    #[serde(serialize_with = "serialize_tokens")]
    pub visibility: syn::Visibility,
    /// Source file that declared the trait
    pub origin: PathBuf,
    pub operations: Vec<OperationDescriptor>,
}

impl PartialEq for InterfaceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.qualified_name == other.qualified_name
    }
}

impl Eq for InterfaceDescriptor {}

impl InterfaceDescriptor {
    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }
}

/// Render any syntax node the way it would appear in source
pub fn tokens_to_string<T: ToTokens>(node: &T) -> String {
    node.to_token_stream()
        .to_string()
        .replace(" < ", "<")
        .replace(" >", ">")
        .replace("< ", "<")
        .replace(" ,", ",")
        .replace(" :: ", "::")
        .replace("& ", "&")
}

fn serialize_tokens<T: ToTokens, S: Serializer>(node: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&tokens_to_string(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn sample() -> InterfaceDescriptor {
        InterfaceDescriptor {
            qualified_name: "crate::api::Example".into(),
            package_name: "crate::api".into(),
            simple_name: "Example".into(),
            visibility: parse_quote!(pub),
            origin: PathBuf::from("src/api.rs"),
            operations: vec![OperationDescriptor {
                name: parse_quote!(fetch),
                parameters: vec![ParamDescriptor {
                    name: parse_quote!(id),
                    ty: parse_quote!(String),
                }],
                result_shape: ResultShape::AsyncCallWrapper,
                payload_type: parse_quote!(Vec<Item>),
                is_deferred: false,
            }],
        }
    }

    #[test]
    fn test_identity_is_qualified_name() {
        let a = sample();
        let mut b = sample();
        b.operations.clear();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tokens_to_string_compacts_generics() {
        let ty: syn::Type = parse_quote!(std::collections::HashMap<String, Vec<u8> >);
        assert_eq!(
            tokens_to_string(&ty),
            "std::collections::HashMap<String, Vec<u8>>"
        );
    }

    #[test]
    fn test_serializes_types_as_strings() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["operations"][0]["payload_type"], "Vec<Item>");
        assert_eq!(json["operations"][0]["parameters"][0]["type"], "String");
        assert_eq!(json["operations"][0]["result_shape"], "async_call_wrapper");
        assert_eq!(json["visibility"], "pub");
    }

    #[test]
    fn test_operation_lookup() {
        let descriptor = sample();
        assert!(descriptor.operation("fetch").is_some());
        assert!(descriptor.operation("missing").is_none());
    }
}
