//! Error-surface tests: configuration failures are typed errors, input
//! failures are not errors at all.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::json;
use screen_ir::{
    convert, IrError, MappingRuleTable, RawWidgetRecord, ReconcileConfig, SourceTag, Validator,
};

#[test]
fn missing_mapping_table_degrades_to_passthrough() {
    let table = MappingRuleTable::load_from_path(Path::new("/nonexistent/mapping-rules.json"));
    assert!(table.widget_map.is_empty());
    assert!(table.style_map.is_empty());
    assert!(table.event_map.is_empty());

    // Conversion still works; types and events pass through untranslated.
    let records = vec![RawWidgetRecord {
        id: "b1".into(),
        widget_type: "btn".into(),
        text: "Go".into(),
        source: SourceTag::Structural,
        ..Default::default()
    }];
    let (doc, report) = screen_ir::convert_with_defaults("screen", &records, &[], &table);
    assert!(report.ok, "errors: {:?}", report.errors);
    assert_eq!(doc.widgets[0].widget_type.as_str(), "btn");
}

#[test]
fn corrupt_mapping_table_degrades_to_passthrough() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("mapping-rules.json");
    std::fs::write(&path, "{{ definitely not json").expect("write");

    let table = MappingRuleTable::load_from_path(&path);
    assert!(table.widget_map.is_empty());
}

#[test]
fn bundled_mapping_rules_document_loads() {
    let table = MappingRuleTable::load_from_path(Path::new("config/mapping-rules.json"));
    assert!(!table.widget_map.is_empty());
    assert!(!table.style_map.is_empty());
    assert!(!table.event_map.is_empty());
    assert_eq!(
        table.translate_widget("btn", SourceTag::Structural),
        "Button"
    );
    assert_eq!(
        table.translate_event("clicked", SourceTag::Structural),
        "onClick"
    );
}

#[test]
fn missing_schema_is_fatal() {
    let result = Validator::from_path(Path::new("/nonexistent/schema.json"));
    match result {
        Err(IrError::SchemaRead(msg)) => assert!(msg.contains("/nonexistent/schema.json")),
        other => panic!("expected SchemaRead error, got {other:?}"),
    }
}

#[test]
fn bundled_schema_loads_from_disk_too() {
    let validator = Validator::from_path(Path::new("schema/ui-ir-schema.json"))
        .expect("shipped schema compiles");
    let doc = screen_ir::IrDocument::empty("screen");
    assert!(validator.validate(&doc).ok);
}

#[test]
fn uncompilable_schema_is_fatal() {
    let bad_schema = json!({ "type": 42 });
    let result = Validator::from_value(&bad_schema);
    assert!(matches!(result, Err(IrError::SchemaCompile(_))));
}

#[test]
fn invalid_document_reports_errors_without_panicking() {
    let validator = Validator::shared();
    let mut doc = screen_ir::IrDocument::empty("screen");
    doc.screen_id = String::new();
    doc.widgets.push(screen_ir::WidgetNode {
        id: String::new(),
        source: SourceTag::Unknown,
        widget_type: screen_ir::WidgetType::Label,
        text: String::new(),
        asset_ref: None,
        layout: None,
        style: BTreeMap::new(),
        derived_classes: String::new(),
        events: Vec::new(),
        children: Vec::new(),
    });

    let report = validator.validate(&doc);
    assert!(!report.ok);
    assert!(report.errors.len() >= 2, "errors: {:?}", report.errors);
    for issue in &report.errors {
        assert!(!issue.message.is_empty());
    }
}

#[test]
fn invalid_reconcile_config_is_a_typed_error() {
    let cfg = ReconcileConfig {
        text_weight: 7.0,
        ..ReconcileConfig::default()
    };
    let result = convert(
        "screen",
        &[],
        &[],
        &MappingRuleTable::empty(),
        &cfg,
        Validator::shared(),
    );
    match result {
        Err(IrError::InvalidConfig(msg)) => assert!(msg.contains("text_weight")),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[test]
fn malformed_raw_records_deserialize_with_defaults() {
    // A record missing almost everything still deserializes and converts.
    let raw: RawWidgetRecord =
        serde_json::from_value(json!({ "id": "mystery", "type": "Widget9000", "source": "figma" }))
            .expect("lenient deserialization");
    assert_eq!(raw.source, SourceTag::Unknown);

    let (doc, report) =
        screen_ir::convert_with_defaults("screen", &[raw], &[], &MappingRuleTable::empty());
    assert!(report.ok, "errors: {:?}", report.errors);
    assert_eq!(doc.widgets.len(), 1);
}
