//! Validation with error accumulation for configuration.
//!
//! Every check runs, and all failures are returned together so a broken
//! `svcwrap.toml` can be fixed in one pass.

use std::fmt;

use super::core::{GeneratorConfig, OperationFilter};

/// A validation failure at a dotted field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub actual: Option<String>,
}

impl ValidationError {
    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual: None,
        }
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)?;
        if let Some(actual) = &self.actual {
            write!(f, " (got: {:?})", actual)?;
        }
        Ok(())
    }
}

/// Validate the entire config, accumulating all errors
pub fn validate_config(config: &GeneratorConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_ident(&mut errors, "generator.marker", &config.generator.marker);
    validate_ident(&mut errors, "generator.unit_suffix", &config.generator.unit_suffix);
    validate_path(&mut errors, "generator.runtime_path", &config.generator.runtime_path);

    validate_path_list(&mut errors, "shapes.call_wrappers", &config.shapes.call_wrappers);
    validate_path_list(
        &mut errors,
        "shapes.response_wrappers",
        &config.shapes.response_wrappers,
    );
    for overlap in config
        .shapes
        .call_wrappers
        .iter()
        .filter(|path| config.shapes.response_wrappers.contains(path))
    {
        errors.push(
            ValidationError::for_field(
                "shapes",
                "a wrapper cannot be both a call and a response wrapper",
            )
            .with_actual(overlap.clone()),
        );
    }

    if config.operations.filter == OperationFilter::HttpVerb
        && config.operations.http_verbs.is_empty()
    {
        errors.push(ValidationError::for_field(
            "operations.http_verbs",
            "must not be empty when filter is \"http-verb\"",
        ));
    }
    for (index, verb) in config.operations.http_verbs.iter().enumerate() {
        validate_ident(&mut errors, &format!("operations.http_verbs[{}]", index), verb);
    }

    for (index, pattern) in config.sources.exclude.iter().enumerate() {
        if let Err(e) = glob::Pattern::new(pattern) {
            errors.push(
                ValidationError::for_field(
                    format!("sources.exclude[{}]", index),
                    format!("invalid glob: {}", e.msg),
                )
                .with_actual(pattern.clone()),
            );
        }
    }

    errors
}

/// Backwards-compatible wrapper returning the first error as an `anyhow` error
pub fn validate_config_result(config: &GeneratorConfig) -> anyhow::Result<()> {
    match validate_config(config).into_iter().next() {
        Some(first) => Err(anyhow::anyhow!("{}", first)),
        None => Ok(()),
    }
}

fn validate_ident(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.is_empty() {
        errors.push(ValidationError::for_field(field, "must not be empty"));
    } else if syn::parse_str::<syn::Ident>(value).is_err() {
        errors.push(
            ValidationError::for_field(field, "must be a Rust identifier")
                .with_actual(value),
        );
    }
}

fn validate_path(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.is_empty() {
        errors.push(ValidationError::for_field(field, "must not be empty"));
    } else if syn::parse_str::<syn::Path>(value).is_err() {
        errors.push(
            ValidationError::for_field(field, "must be a Rust path").with_actual(value),
        );
    }
}

fn validate_path_list(errors: &mut Vec<ValidationError>, field: &str, values: &[String]) {
    if values.is_empty() {
        errors.push(ValidationError::for_field(field, "must list at least one path"));
    }
    for (index, value) in values.iter().enumerate() {
        validate_path(errors, &format!("{}[{}]", field, index), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GeneratorConfig::default()).is_empty());
        assert!(validate_config_result(&GeneratorConfig::default()).is_ok());
    }

    #[test]
    fn test_accumulates_all_errors() {
        let mut config = GeneratorConfig::default();
        config.generator.marker = String::new();
        config.generator.runtime_path = "not a path".into();
        config.sources.exclude = vec!["[".into()];

        let fields: Vec<_> = validate_config(&config)
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "generator.marker".to_string(),
                "generator.runtime_path".to_string(),
                "sources.exclude[0]".to_string(),
            ]
        );
    }

    #[test]
    fn test_http_verb_filter_requires_verbs() {
        let mut config = GeneratorConfig::default();
        config.operations.filter = OperationFilter::HttpVerb;
        config.operations.http_verbs.clear();
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "operations.http_verbs");
    }

    #[test]
    fn test_wrapper_cannot_be_both_shapes() {
        let mut config = GeneratorConfig::default();
        config.shapes.response_wrappers.push("svcwrap::Call".into());
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "shapes: a wrapper cannot be both a call and a response wrapper (got: \"svcwrap::Call\")"
        );
    }
}
