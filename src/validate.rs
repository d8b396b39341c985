//! Structural validation of the final IR document.
//!
//! The schema is compiled once and reused; validation itself never mutates
//! the document and never panics. An invalid document is the *expected*
//! failure mode here — it comes back as a non-ok [`ValidationReport`], not an
//! error. The only hard failures are a schema file that cannot be read or
//! compiled, which callers must treat as fatal at startup.

use std::path::Path;
use std::sync::OnceLock;

use jsonschema::Draft;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::IrError;
use crate::types::IrDocument;

/// Schema shipped with the crate, matching the documents this crate produces.
const BUNDLED_SCHEMA: &str = include_str!("../schema/ui-ir-schema.json");

/// One schema violation: a JSON-pointer path into the document plus a
/// human-readable message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Outcome of a validation run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<ValidationIssue>,
}

/// A compiled structural schema.
pub struct Validator {
    compiled: jsonschema::Validator,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

impl Validator {
    /// Compile a schema value (Draft 2020-12).
    pub fn from_value(schema: &JsonValue) -> Result<Self, IrError> {
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|err| IrError::SchemaCompile(err.to_string()))?;
        Ok(Validator { compiled })
    }

    /// Read and compile a schema from a caller-supplied path. A missing or
    /// corrupt file is an error — there is no meaningful default schema to
    /// degrade to, so callers should fail startup on `Err`.
    pub fn from_path(path: &Path) -> Result<Self, IrError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| IrError::SchemaRead(format!("{}: {err}", path.display())))?;
        let schema: JsonValue = serde_json::from_str(&text)
            .map_err(|err| IrError::SchemaRead(format!("{}: {err}", path.display())))?;
        Self::from_value(&schema)
    }

    /// Process-wide validator over the bundled schema, compiled lazily once.
    /// The bundled schema is part of the crate, so compilation cannot fail
    /// outside of a build defect.
    pub fn shared() -> &'static Validator {
        static VALIDATOR: OnceLock<Validator> = OnceLock::new();
        VALIDATOR.get_or_init(|| {
            let schema: JsonValue =
                serde_json::from_str(BUNDLED_SCHEMA).expect("bundled schema is valid JSON");
            Validator::from_value(&schema).expect("bundled schema compiles")
        })
    }

    /// Validate a document against the compiled schema.
    pub fn validate(&self, doc: &IrDocument) -> ValidationReport {
        let instance = match serde_json::to_value(doc) {
            Ok(value) => value,
            Err(err) => {
                return ValidationReport {
                    ok: false,
                    errors: vec![ValidationIssue {
                        path: String::new(),
                        message: format!("document serialization failed: {err}"),
                    }],
                }
            }
        };

        let errors: Vec<ValidationIssue> = self
            .compiled
            .iter_errors(&instance)
            .map(|err| ValidationIssue {
                path: err.instance_path.to_string(),
                message: err.to_string(),
            })
            .collect();

        if !errors.is_empty() {
            debug!(
                screen_id = %doc.screen_id,
                error_count = errors.len(),
                "document_failed_validation"
            );
        }

        ValidationReport {
            ok: errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IrDocument, SourceTag, WidgetNode, WidgetType};
    use std::collections::BTreeMap;

    fn valid_doc() -> IrDocument {
        let mut doc = IrDocument::empty("screen_main");
        doc.widgets.push(WidgetNode {
            id: "root".into(),
            source: SourceTag::Structural,
            widget_type: WidgetType::Container,
            text: String::new(),
            asset_ref: None,
            layout: None,
            style: BTreeMap::new(),
            derived_classes: String::new(),
            events: Vec::new(),
            children: Vec::new(),
        });
        doc
    }

    #[test]
    fn bundled_schema_accepts_produced_documents() {
        let report = Validator::shared().validate(&valid_doc());
        assert!(report.ok, "errors: {:?}", report.errors);
    }

    #[test]
    fn empty_screen_id_fails_with_pointer_path() {
        let mut doc = valid_doc();
        doc.screen_id = String::new();
        let report = Validator::shared().validate(&doc);
        assert!(!report.ok);
        assert!(
            report.errors.iter().any(|e| e.path == "/screenId"),
            "errors: {:?}",
            report.errors
        );
    }

    #[test]
    fn empty_widget_id_fails() {
        let mut doc = valid_doc();
        doc.widgets[0].id = String::new();
        let report = Validator::shared().validate(&doc);
        assert!(!report.ok);
        assert!(report.errors.iter().any(|e| e.path.starts_with("/widgets/0")));
    }

    #[test]
    fn missing_schema_path_is_an_error() {
        let result = Validator::from_path(Path::new("/nonexistent/schema.json"));
        assert!(matches!(result, Err(IrError::SchemaRead(_))));
    }

    #[test]
    fn corrupt_schema_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("schema.json");
        std::fs::write(&path, "{ not json").expect("write");
        let result = Validator::from_path(&path);
        assert!(matches!(result, Err(IrError::SchemaRead(_))));
    }

    #[test]
    fn validator_is_debug_printable() {
        let rendered = format!("{:?}", Validator::shared());
        assert!(rendered.contains("Validator"));
    }

    #[test]
    fn validation_does_not_mutate_the_document() {
        let doc = valid_doc();
        let before = doc.clone();
        let _ = Validator::shared().validate(&doc);
        assert_eq!(doc, before);
    }
}
