use serde::{Deserialize, Serialize};

/// Root configuration, read from `svcwrap.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Marker, runtime path and unit naming
    pub generator: GeneratorSection,

    /// Wrapper types recognized by the shape classifier
    pub shapes: ShapesConfig,

    /// Which trait methods count as operations
    pub operations: OperationsConfig,

    /// Source discovery
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorSection {
    /// Attribute name marking service traits (last path segment)
    pub marker: String,
    /// Path generated code uses to reach the runtime
    pub runtime_path: String,
    /// Appended to the trait name to form the unit name
    pub unit_suffix: String,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            marker: "remote_service".to_string(),
            runtime_path: "::svcwrap".to_string(),
            unit_suffix: "DslExtensions".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShapesConfig {
    /// Canonical paths of the non-blocking call wrapper
    pub call_wrappers: Vec<String>,
    /// Canonical paths of the completed response wrapper
    pub response_wrappers: Vec<String>,
}

impl Default for ShapesConfig {
    fn default() -> Self {
        Self {
            call_wrappers: vec!["svcwrap::Call".into(), "svcwrap::runtime::Call".into()],
            response_wrappers: vec![
                "svcwrap::Response".into(),
                "svcwrap::runtime::Response".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OperationFilter {
    /// Every method without a default body
    #[default]
    Required,
    /// Only methods carrying an HTTP verb attribute
    HttpVerb,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OperationsConfig {
    pub filter: OperationFilter,
    pub http_verbs: Vec<String>,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            filter: OperationFilter::Required,
            http_verbs: ["get", "post", "put", "delete", "patch", "head", "options"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    /// Globs, relative to the source root, that are never scanned
    pub exclude: Vec<String>,
}

pub const DEFAULT_CONFIG_TOML: &str = r#"# svcwrap configuration

[generator]
marker = "remote_service"
runtime_path = "::svcwrap"
unit_suffix = "DslExtensions"

[shapes]
call_wrappers = ["svcwrap::Call", "svcwrap::runtime::Call"]
response_wrappers = ["svcwrap::Response", "svcwrap::runtime::Response"]

[operations]
# "required": every method without a default body
# "http-verb": only methods with one of the verbs below as an attribute
filter = "required"
http_verbs = ["get", "post", "put", "delete", "patch", "head", "options"]

[sources]
exclude = []
"#;
