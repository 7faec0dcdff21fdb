//! Symbol scanner: finds trait declarations carrying the service marker.
//!
//! Scanning is a pure query over the universe. It can run any number of
//! times, and each call reflects the files present at that moment.

use crate::universe::Universe;
use std::path::PathBuf;
use syn::{Attribute, Item, ItemTrait};
use tracing::debug;

/// A marked trait as found in source, before classification
#[derive(Debug, Clone)]
pub struct DeclaredInterface {
    pub qualified_name: String,
    pub package_name: String,
    pub simple_name: String,
    pub origin: PathBuf,
    pub line: usize,
    pub item: ItemTrait,
}

/// Whether `attrs` carries the marker, matched on the last path segment so
/// both `#[remote_service]` and `#[svcwrap::remote_service]` qualify.
pub fn has_marker(attrs: &[Attribute], marker: &str) -> bool {
    attrs.iter().any(|attr| {
        attr.path()
            .segments
            .last()
            .is_some_and(|segment| segment.ident == marker)
    })
}

/// Return every marked trait in declaration order, file by file
pub fn scan(universe: &Universe, marker: &str) -> Vec<DeclaredInterface> {
    let mut found = Vec::new();
    for file in universe.files() {
        let mut scanner = ItemScanner {
            marker,
            origin: &file.path,
            found: &mut found,
        };
        scanner.scan_items(&file.syntax.items, &file.module_path);
    }
    found
}

struct ItemScanner<'a> {
    marker: &'a str,
    origin: &'a PathBuf,
    found: &'a mut Vec<DeclaredInterface>,
}

impl ItemScanner<'_> {
    fn scan_items(&mut self, items: &[Item], module_path: &str) {
        for item in items {
            match item {
                Item::Trait(item_trait) if has_marker(&item_trait.attrs, self.marker) => {
                    self.record(item_trait, module_path);
                }
                Item::Mod(item_mod) => {
                    if let Some((_, nested)) = &item_mod.content {
                        let nested_path = format!("{}::{}", module_path, item_mod.ident);
                        self.scan_items(nested, &nested_path);
                    }
                }
                Item::Struct(s) if has_marker(&s.attrs, self.marker) => {
                    self.ignore("struct", &s.ident, module_path)
                }
                Item::Enum(e) if has_marker(&e.attrs, self.marker) => {
                    self.ignore("enum", &e.ident, module_path)
                }
                Item::Union(u) if has_marker(&u.attrs, self.marker) => {
                    self.ignore("union", &u.ident, module_path)
                }
                _ => {}
            }
        }
    }

    fn record(&mut self, item_trait: &ItemTrait, module_path: &str) {
        let simple_name = item_trait.ident.to_string();
        self.found.push(DeclaredInterface {
            qualified_name: format!("{}::{}", module_path, simple_name),
            package_name: module_path.to_string(),
            simple_name,
            origin: self.origin.clone(),
            line: item_trait.ident.span().start().line,
            item: item_trait.clone(),
        });
    }

    fn ignore(&self, kind: &str, ident: &syn::Ident, module_path: &str) {
        debug!(
            kind,
            name = %format!("{}::{}", module_path, ident),
            "Marker on non-trait declaration ignored"
        );
    }
}
