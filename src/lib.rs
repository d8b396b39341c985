//! Screen IR core.
//!
//! Three format-specific extractors (an embedded-GUI C scanner, a component
//! markup AST walker, a vector-design-tool JSON reader) each produce a flat
//! list of raw widget records for one screen. This crate reconciles those
//! lists into a single canonical, schema-valid widget tree that code
//! generators and the preview renderer consume.
//!
//! ## What we do
//!
//! - **Normalize** raw records into [`WidgetNode`]s through the
//!   [`MappingRuleTable`] (widget types, style keys, event names)
//! - **Collapse** same-source duplicate ids into one node per id
//! - **Reconcile** the structurally authoritative base tree with the
//!   free-form design overlay tree using text and geometry heuristics
//! - **Allocate** identifiers deterministically, renaming on collision
//! - **Validate** the final document against a JSON Schema
//!
//! ## Never-fail guarantee
//!
//! The core never errors on bad input. Malformed records degrade to
//! defaults, a missing mapping table degrades to passthrough, structural
//! violations are repaired during reconciliation, and an invalid document
//! comes back as a non-ok [`ValidationReport`]. The only `Err`s are
//! configuration problems: an unreadable schema or nonsensical reconcile
//! knobs.
//!
//! ## Determinism
//!
//! No I/O, no clocks, no randomness inside a conversion. The same records,
//! table, and config produce the same document on any machine.

mod error;
mod mapping;
mod merge;
mod normalize;
mod reconcile;
mod types;
mod validate;

pub use crate::error::IrError;
pub use crate::mapping::{ClassRule, DeriveFn, EventRule, MappingRuleTable, StyleRule, WidgetRule};
pub use crate::merge::{build_document, merge_by_id};
pub use crate::normalize::{normalize_record, normalize_text};
pub use crate::reconcile::{reconcile, ReconcileConfig};
pub use crate::types::{
    DocumentMeta, IrDocument, RawWidgetRecord, Rect, SourceTag, WidgetEvent, WidgetNode,
    WidgetType, IR_VERSION,
};
pub use crate::validate::{ValidationIssue, ValidationReport, Validator};

use tracing::{info, Level};

/// Run the full conversion: build per-source documents, reconcile them, and
/// validate the result.
///
/// `base_records` come from the structurally authoritative source,
/// `overlay_records` from the design export; either side may be empty. The
/// only error is an invalid [`ReconcileConfig`].
pub fn convert(
    screen_id: &str,
    base_records: &[RawWidgetRecord],
    overlay_records: &[RawWidgetRecord],
    table: &MappingRuleTable,
    cfg: &ReconcileConfig,
    validator: &Validator,
) -> Result<(IrDocument, ValidationReport), IrError> {
    cfg.validate()?;

    let span = tracing::span!(
        Level::INFO,
        "screen_ir.convert",
        screen_id = %screen_id,
        base_records = base_records.len(),
        overlay_records = overlay_records.len()
    );
    let _guard = span.enter();

    let base = (!base_records.is_empty()).then(|| build_document(screen_id, base_records, table));
    let overlay =
        (!overlay_records.is_empty()).then(|| build_document(screen_id, overlay_records, table));

    let mut doc = reconcile(base, overlay, cfg);
    // The degenerate no-input path falls back to a placeholder screen id;
    // the caller's name wins either way.
    doc.screen_id = screen_id.to_string();
    let report = validator.validate(&doc);

    info!(
        widget_count = doc.widgets.len(),
        valid = report.ok,
        "convert_complete"
    );

    Ok((doc, report))
}

/// [`convert`] with the default reconcile knobs and the bundled schema.
pub fn convert_with_defaults(
    screen_id: &str,
    base_records: &[RawWidgetRecord],
    overlay_records: &[RawWidgetRecord],
    table: &MappingRuleTable,
) -> (IrDocument, ValidationReport) {
    let cfg = ReconcileConfig::default();
    // The default config always validates; convert cannot fail here.
    match convert(
        screen_id,
        base_records,
        overlay_records,
        table,
        &cfg,
        Validator::shared(),
    ) {
        Ok(outcome) => outcome,
        Err(_) => unreachable!("default reconcile config is valid"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, widget_type: &str, text: &str, source: SourceTag) -> RawWidgetRecord {
        RawWidgetRecord {
            id: id.into(),
            widget_type: widget_type.into(),
            text: text.into(),
            source,
            ..Default::default()
        }
    }

    #[test]
    fn convert_produces_a_valid_document() {
        let base = vec![
            RawWidgetRecord {
                children: vec!["title".into()],
                ..record("root", "Container", "", SourceTag::Structural)
            },
            record("title", "Label", "Settings", SourceTag::Structural),
        ];
        let overlay = vec![record("text_1", "Label", "Settings", SourceTag::Overlay)];

        let (doc, report) =
            convert_with_defaults("screen_settings", &base, &overlay, &MappingRuleTable::empty());

        assert!(report.ok, "errors: {:?}", report.errors);
        assert_eq!(doc.screen_id, "screen_settings");
        // The overlay label coalesced onto the base label.
        assert_eq!(doc.widgets.len(), 2);
        assert_eq!(
            doc.meta.sources,
            vec![SourceTag::Structural, SourceTag::Overlay]
        );
    }

    #[test]
    fn convert_rejects_invalid_config() {
        let cfg = ReconcileConfig {
            score_threshold: -1.0,
            ..ReconcileConfig::default()
        };
        let result = convert(
            "s",
            &[],
            &[],
            &MappingRuleTable::empty(),
            &cfg,
            Validator::shared(),
        );
        assert!(matches!(result, Err(IrError::InvalidConfig(_))));
    }

    #[test]
    fn convert_with_no_records_yields_empty_document() {
        let (doc, report) =
            convert_with_defaults("screen_empty", &[], &[], &MappingRuleTable::empty());
        assert!(doc.is_empty());
        assert!(report.ok);
    }
}
