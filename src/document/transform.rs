//! Transform collaborator: named transforms applied to primary documents
//!
//! Transforms are looked up by name in a registry rather than instantiated
//! from stored type names, so the set of available transforms is explicit at
//! pipeline construction time.

use super::first_element_text;
use crate::ingest::IngestError;
use quick_xml::escape::escape;
use std::collections::HashMap;
use tracing::warn;

/// Applies a named transform definition to a primary document
pub trait DocumentTransformer: Send + Sync {
    /// Transform `input` using the definition named by `transform_ref`.
    ///
    /// Returns `Ok(None)` when the transform produces no output or the
    /// reference is unknown; both mean "derived document absent", not failure.
    fn transform(&self, transform_ref: &str, input: &str) -> Result<Option<String>, IngestError>;
}

type TransformFn = Box<dyn Fn(&str) -> Result<Option<String>, IngestError> + Send + Sync>;

/// Registry mapping transform names to transform functions
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl TransformRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the built-in transforms
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("simplify", simplify);
        registry
    }

    /// Register a transform under a name, replacing any previous entry
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&str) -> Result<Option<String>, IngestError> + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Box::new(f));
    }

    /// Names of all registered transforms
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl DocumentTransformer for TransformRegistry {
    fn transform(&self, transform_ref: &str, input: &str) -> Result<Option<String>, IngestError> {
        match self.transforms.get(transform_ref) {
            Some(f) => f(input)
                .map_err(|e| IngestError::Transform(format!("'{}': {}", transform_ref, e))),
            None => {
                warn!("Unknown transform '{}', derived document skipped", transform_ref);
                Ok(None)
            }
        }
    }
}

/// Built-in transform: flatten a primary document into a `<derived>` record
///
/// Picks the first title, identifier, creator and date elements out of the
/// input and emits them as flat children of a `<derived>` root.
fn simplify(input: &str) -> Result<Option<String>, IngestError> {
    const FIELDS: [&str; 4] = ["title", "identifier", "creator", "date"];

    let mut out = String::from("<derived>");
    let mut matched = false;

    for field in FIELDS {
        if let Some(value) = first_element_text(input, field) {
            out.push_str(&format!("<{}>{}</{}>", field, escape(&value), field));
            matched = true;
        }
    }
    out.push_str("</derived>");

    if matched {
        Ok(Some(out))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_flattens_fields() {
        let input = r#"<record>
            <title>Sample &amp; Title</title>
            <creator>Doe, Jane</creator>
            <identifier>oai:repo:1</identifier>
        </record>"#;

        let registry = TransformRegistry::with_builtins();
        let out = registry.transform("simplify", input).unwrap().unwrap();

        assert!(out.starts_with("<derived>"));
        assert!(out.contains("<title>Sample &amp; Title</title>"));
        assert!(out.contains("<identifier>oai:repo:1</identifier>"));
        assert!(out.contains("<creator>Doe, Jane</creator>"));
    }

    #[test]
    fn test_simplify_empty_input_yields_none() {
        let registry = TransformRegistry::with_builtins();
        let out = registry.transform("simplify", "<record/>").unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_unknown_transform_yields_none() {
        let registry = TransformRegistry::with_builtins();
        let out = registry.transform("nope", "<record/>").unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_transform_failure_names_the_transform() {
        let mut registry = TransformRegistry::new();
        registry.register("broken", |_| Err(IngestError::XmlParse("bad input".to_string())));

        let err = registry.transform("broken", "<a/>").unwrap_err();
        assert!(matches!(err, IngestError::Transform(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_custom_transform_registration() {
        let mut registry = TransformRegistry::new();
        registry.register("upper", |input| Ok(Some(input.to_uppercase())));

        let out = registry.transform("upper", "<a/>").unwrap();
        assert_eq!(out.as_deref(), Some("<A/>"));
    }
}
