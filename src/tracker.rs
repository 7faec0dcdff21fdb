//! Incremental state: which interfaces were already generated, and which must
//! wait for a later round.

use crate::classifier::qualifying_methods;
use crate::config::GeneratorConfig;
use crate::resolver::{unresolved_names, Resolver, Scope};
use crate::scanner::DeclaredInterface;
use std::collections::HashSet;
use syn::{FnArg, ReturnType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    /// Some signature type is not resolvable yet
    Deferred { unresolved: Vec<String> },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Set of qualified names already emitted. Grows monotonically for the
/// lifetime of the generator.
#[derive(Debug, Default)]
pub struct StateTracker {
    processed: HashSet<String>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `qualified_name`; false when it was already present
    pub fn admit(&mut self, qualified_name: &str) -> bool {
        if self.processed.contains(qualified_name) {
            return false;
        }
        self.processed.insert(qualified_name.to_string())
    }

    pub fn is_processed(&self, qualified_name: &str) -> bool {
        self.processed.contains(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    /// Check that every type named by a qualifying operation resolves.
    pub fn validate<R: Resolver + ?Sized>(
        &self,
        declaration: &DeclaredInterface,
        resolver: &R,
        config: &GeneratorConfig,
    ) -> ValidationResult {
        let trait_scope =
            Scope::new(&declaration.package_name).with_generics(&declaration.item.generics);
        let mut unresolved = Vec::new();

        for method in qualifying_methods(&declaration.item, config) {
            let scope = trait_scope.clone().with_generics(&method.sig.generics);
            let params = method.sig.inputs.iter().filter_map(|arg| match arg {
                FnArg::Typed(pat_type) => Some(pat_type.ty.as_ref()),
                FnArg::Receiver(_) => None,
            });
            let output = match &method.sig.output {
                ReturnType::Type(_, ty) => Some(ty.as_ref()),
                ReturnType::Default => None,
            };

            for ty in params.chain(output) {
                for name in unresolved_names(resolver, &scope, ty) {
                    if !unresolved.contains(&name) {
                        unresolved.push(name);
                    }
                }
            }
        }

        if unresolved.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Deferred { unresolved }
        }
    }
}
