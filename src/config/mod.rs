//! Generator configuration (`svcwrap.toml`).

mod core;
mod loader;
pub mod validation;

pub use self::core::{
    GeneratorConfig, GeneratorSection, OperationFilter, OperationsConfig, ShapesConfig,
    SourcesConfig, DEFAULT_CONFIG_TOML,
};
pub use loader::{
    directory_ancestors, load_config, load_config_file, load_config_from, locate_config_from,
    parse_and_validate_config, CONFIG_FILE_NAME,
};

impl GeneratorConfig {
    /// Name of the generated unit for a trait
    pub fn unit_name(&self, simple_name: &str) -> String {
        format!("{}{}", simple_name, self.generator.unit_suffix)
    }

    /// The runtime path as a `syn::Path`, falling back to `::svcwrap`
    pub fn runtime_path(&self) -> syn::Path {
        syn::parse_str(&self.generator.runtime_path)
            .unwrap_or_else(|_| syn::parse_quote!(::svcwrap))
    }

    pub fn is_http_verb(&self, name: &str) -> bool {
        self.operations.http_verbs.iter().any(|v| v == name)
    }
}
