//! Type resolution against the symbol universe.
//!
//! Rust has no resolver available outside the compiler, so this module
//! approximates name lookup for the handful of questions the generator asks:
//! which declaration a return type names (to recognize call wrappers), and
//! whether every type in a signature exists yet (to defer traits that depend
//! on code another generator has not produced). Lookup follows `use` imports,
//! the declaring module, the prelude, glob imports and the declarations found
//! in the universe. Paths into other crates are trusted as written.

use crate::universe::Universe;
use std::collections::{HashMap, HashSet};
use syn::visit::{self, Visit};
use syn::{GenericArgument, Item, PathArguments, Type, TypePath, UseTree};

const PRELUDE: &[(&str, &str)] = &[
    ("Option", "std::option::Option"),
    ("Result", "std::result::Result"),
    ("Vec", "std::vec::Vec"),
    ("String", "std::string::String"),
    ("Box", "std::boxed::Box"),
];

const PRIMITIVES: &[&str] = &[
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64",
    "i128", "isize", "f32", "f64",
];

/// Where a type is being named from
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    pub module_path: &'a str,
    /// Generic parameters in scope (trait and method)
    pub generics: Vec<String>,
}

impl<'a> Scope<'a> {
    pub fn new(module_path: &'a str) -> Self {
        Self {
            module_path,
            generics: Vec::new(),
        }
    }

    pub fn with_generics(mut self, generics: &syn::Generics) -> Self {
        self.generics
            .extend(generics.type_params().map(|p| p.ident.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedType {
    /// A named declaration and the type arguments it was applied to
    Nominal {
        path: String,
        arguments: Vec<Type>,
    },
    /// A generic parameter or `Self`
    Generic(String),
    /// References, tuples, slices and other types without a declaration
    Structural,
    /// Nothing visible declares this name
    Unresolved(String),
}

impl ResolvedType {
    pub fn declaration(&self) -> Option<&str> {
        match self {
            Self::Nominal { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn arguments(&self) -> &[Type] {
        match self {
            Self::Nominal { arguments, .. } => arguments,
            _ => &[],
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved(_))
    }
}

/// Host interface for type resolution
pub trait Resolver {
    fn resolve(&self, scope: &Scope<'_>, ty: &Type) -> ResolvedType;
}

/// Every path named in `ty` that the resolver cannot find
pub fn unresolved_names<R: Resolver + ?Sized>(
    resolver: &R,
    scope: &Scope<'_>,
    ty: &Type,
) -> Vec<String> {
    let mut collector = UnresolvedCollector {
        resolver,
        scope,
        unresolved: Vec::new(),
    };
    collector.visit_type(ty);
    collector.unresolved
}

struct UnresolvedCollector<'r, 's, R: ?Sized> {
    resolver: &'r R,
    scope: &'r Scope<'s>,
    unresolved: Vec<String>,
}

impl<'ast, R: Resolver + ?Sized> Visit<'ast> for UnresolvedCollector<'_, '_, R> {
    fn visit_type_path(&mut self, node: &'ast TypePath) {
        let ty = Type::Path(node.clone());
        if let ResolvedType::Unresolved(name) = self.resolver.resolve(self.scope, &ty) {
            if !self.unresolved.contains(&name) {
                self.unresolved.push(name);
            }
        }
        visit::visit_type_path(self, node);
    }
}

#[derive(Debug, Default)]
struct ImportTable {
    /// Local name to canonical path
    aliases: HashMap<String, String>,
    /// Canonical prefixes of `use prefix::*`
    globs: Vec<String>,
}

/// Resolver backed by the declarations and imports of a [`Universe`]
#[derive(Debug, Default)]
pub struct UniverseResolver {
    imports: HashMap<String, ImportTable>,
    declared: HashSet<String>,
    modules: HashSet<String>,
}

impl UniverseResolver {
    pub fn new(universe: &Universe) -> Self {
        let mut resolver = Self::default();
        let mut uses = Vec::new();

        for file in universe.files() {
            resolver.modules.insert(file.module_path.clone());
            resolver.collect(&file.syntax.items, &file.module_path, &mut uses);
        }

        // Imports are resolved after every module is known so `use child::X`
        // can be told apart from `use external_crate::X`.
        for (module, tree) in uses {
            let mut flattened = Vec::new();
            flatten_use(&tree, Vec::new(), &mut flattened);
            for entry in flattened {
                let canonical = resolver.absolutize(&module, &entry.segments);
                let table = resolver.imports.entry(module.clone()).or_default();
                match entry.alias {
                    Some(alias) => {
                        table.aliases.insert(alias, canonical);
                    }
                    None => table.globs.push(canonical),
                }
            }
        }

        resolver
    }

    pub fn is_declared(&self, path: &str) -> bool {
        self.declared.contains(path)
    }

    fn collect(&mut self, items: &[Item], module: &str, uses: &mut Vec<(String, UseTree)>) {
        for item in items {
            let declared = match item {
                Item::Struct(i) => Some(&i.ident),
                Item::Enum(i) => Some(&i.ident),
                Item::Union(i) => Some(&i.ident),
                Item::Type(i) => Some(&i.ident),
                Item::Trait(i) => Some(&i.ident),
                Item::TraitAlias(i) => Some(&i.ident),
                Item::Use(i) => {
                    uses.push((module.to_string(), i.tree.clone()));
                    None
                }
                Item::Mod(i) => {
                    let nested = format!("{}::{}", module, i.ident);
                    self.modules.insert(nested.clone());
                    if let Some((_, content)) = &i.content {
                        self.collect(content, &nested, uses);
                    }
                    None
                }
                _ => None,
            };
            if let Some(ident) = declared {
                self.declared.insert(format!("{}::{}", module, ident));
            }
        }
    }

    /// Turn a written path into a canonical one. Crate-internal paths start
    /// with `crate`; anything else is taken as an external crate path.
    fn absolutize(&self, module: &str, segments: &[String]) -> String {
        let Some(first) = segments.first() else {
            return module.to_string();
        };
        let rest = &segments[1..];

        match first.as_str() {
            "crate" => join(segments),
            "self" => join_onto(module, rest),
            "super" => {
                let mut base: Vec<&str> = module.split("::").collect();
                let mut remaining = segments;
                while remaining.first().is_some_and(|s| s == "super") {
                    if base.len() > 1 {
                        base.pop();
                    }
                    remaining = &remaining[1..];
                }
                join_onto(&base.join("::"), remaining)
            }
            _ => {
                if let Some(target) = self
                    .imports
                    .get(module)
                    .and_then(|t| t.aliases.get(first.as_str()))
                {
                    return join_onto(target, rest);
                }
                let child = format!("{}::{}", module, first);
                if self.modules.contains(&child) {
                    join_onto(&child, rest)
                } else {
                    join(segments)
                }
            }
        }
    }

    fn resolve_internal(&self, canonical: String, arguments: Vec<Type>) -> ResolvedType {
        if self.declared.contains(&canonical) {
            return ResolvedType::Nominal {
                path: canonical,
                arguments,
            };
        }

        // One level of re-export: `pub use inner::Item;` inside the parent
        if let Some((parent, name)) = canonical.rsplit_once("::") {
            if let Some(target) = self.imports.get(parent).and_then(|t| t.aliases.get(name)) {
                if !is_internal(target) || self.declared.contains(target) {
                    return ResolvedType::Nominal {
                        path: target.clone(),
                        arguments,
                    };
                }
            }
        }

        ResolvedType::Unresolved(canonical)
    }

    fn resolve_single(&self, scope: &Scope<'_>, name: &str, arguments: Vec<Type>) -> ResolvedType {
        if name == "Self" || scope.generics.iter().any(|g| g == name) {
            return ResolvedType::Generic(name.to_string());
        }

        let table = self.imports.get(scope.module_path);
        if let Some(target) = table.and_then(|t| t.aliases.get(name)) {
            return if is_internal(target) {
                self.resolve_internal(target.clone(), arguments)
            } else {
                ResolvedType::Nominal {
                    path: target.clone(),
                    arguments,
                }
            };
        }

        let local = format!("{}::{}", scope.module_path, name);
        if self.declared.contains(&local) {
            return ResolvedType::Nominal {
                path: local,
                arguments,
            };
        }

        if let Some((_, path)) = PRELUDE.iter().find(|(short, _)| *short == name) {
            return ResolvedType::Nominal {
                path: (*path).to_string(),
                arguments,
            };
        }
        if PRIMITIVES.contains(&name) {
            return ResolvedType::Nominal {
                path: name.to_string(),
                arguments,
            };
        }

        if let Some(table) = table {
            for glob in &table.globs {
                let candidate = format!("{}::{}", glob, name);
                if is_internal(glob) {
                    if self.declared.contains(&candidate) {
                        return ResolvedType::Nominal {
                            path: candidate,
                            arguments,
                        };
                    }
                } else {
                    // Cannot look inside other crates; trust the glob
                    return ResolvedType::Nominal {
                        path: candidate,
                        arguments,
                    };
                }
            }
        }

        ResolvedType::Unresolved(name.to_string())
    }
}

impl Resolver for UniverseResolver {
    fn resolve(&self, scope: &Scope<'_>, ty: &Type) -> ResolvedType {
        match ty {
            Type::Group(group) => self.resolve(scope, &group.elem),
            Type::Paren(paren) => self.resolve(scope, &paren.elem),
            Type::Path(type_path) if type_path.qself.is_none() => {
                let path = &type_path.path;
                let segments: Vec<String> =
                    path.segments.iter().map(|s| s.ident.to_string()).collect();
                let arguments = path
                    .segments
                    .last()
                    .map(|s| type_arguments(&s.arguments))
                    .unwrap_or_default();

                if path.leading_colon.is_some() {
                    return ResolvedType::Nominal {
                        path: join(&segments),
                        arguments,
                    };
                }
                if segments.len() == 1 {
                    return self.resolve_single(scope, &segments[0], arguments);
                }
                if segments[0] == "Self" || scope.generics.contains(&segments[0]) {
                    return ResolvedType::Generic(join(&segments));
                }

                let canonical = self.absolutize(scope.module_path, &segments);
                if is_internal(&canonical) {
                    self.resolve_internal(canonical, arguments)
                } else {
                    // std and other crates are trusted as written
                    ResolvedType::Nominal {
                        path: canonical,
                        arguments,
                    }
                }
            }
            _ => ResolvedType::Structural,
        }
    }
}

fn type_arguments(arguments: &PathArguments) -> Vec<Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn is_internal(path: &str) -> bool {
    path == "crate" || path.starts_with("crate::")
}

fn join(segments: &[String]) -> String {
    segments.join("::")
}

fn join_onto(base: &str, rest: &[String]) -> String {
    if rest.is_empty() {
        base.to_string()
    } else {
        format!("{}::{}", base, rest.join("::"))
    }
}

struct FlatUse {
    segments: Vec<String>,
    /// `None` for glob imports
    alias: Option<String>,
}

fn flatten_use(tree: &UseTree, mut prefix: Vec<String>, out: &mut Vec<FlatUse>) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            flatten_use(&path.tree, prefix, out);
        }
        UseTree::Name(name) => {
            if name.ident == "self" {
                if let Some(last) = prefix.last().cloned() {
                    out.push(FlatUse {
                        segments: prefix,
                        alias: Some(last),
                    });
                }
            } else {
                let alias = name.ident.to_string();
                prefix.push(alias.clone());
                out.push(FlatUse {
                    segments: prefix,
                    alias: Some(alias),
                });
            }
        }
        UseTree::Rename(rename) => {
            if rename.ident != "self" {
                prefix.push(rename.ident.to_string());
            }
            if rename.rename != "_" {
                out.push(FlatUse {
                    segments: prefix,
                    alias: Some(rename.rename.to_string()),
                });
            }
        }
        UseTree::Glob(_) => out.push(FlatUse {
            segments: prefix,
            alias: None,
        }),
        UseTree::Group(group) => {
            for item in &group.items {
                flatten_use(item, prefix.clone(), out);
            }
        }
    }
}
