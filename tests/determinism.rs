//! The same records, table, and config must produce byte-identical output on
//! every run. Downstream generators diff serialized documents, so even map
//! ordering counts.

use std::collections::BTreeMap;

use serde_json::json;
use screen_ir::{
    convert_with_defaults, MappingRuleTable, RawWidgetRecord, Rect, SourceTag, WidgetEvent,
};

fn records(source: SourceTag, prefix: &str) -> Vec<RawWidgetRecord> {
    let mut style = BTreeMap::new();
    style.insert("bgColor".to_string(), json!("0x010203"));
    style.insert("borderWidth".to_string(), json!(1));

    (0..8)
        .map(|i| RawWidgetRecord {
            id: format!("{prefix}_{i}"),
            widget_type: if i % 2 == 0 { "Button" } else { "Label" }.into(),
            text: format!("item {i}"),
            layout: Some(Rect {
                x: Some(i as f64 * 10.0),
                y: Some(i as f64 * 20.0),
                w: Some(50.0),
                h: Some(18.0),
            }),
            style: style.clone(),
            events: vec![WidgetEvent {
                name: "clicked".into(),
                source: None,
            }],
            source,
            ..Default::default()
        })
        .collect()
}

fn table() -> MappingRuleTable {
    MappingRuleTable::from_value(&json!({
        "styleMap": {
            "bgColor": { "deriveFn": "bgColor" },
            "borderWidth": { "derivedClass": "border" }
        },
        "eventMap": { "clicked": { "markup": "onClick" } }
    }))
}

#[test]
fn repeated_conversion_is_byte_identical() {
    let base = records(SourceTag::Structural, "widget");
    let overlay = records(SourceTag::Overlay, "layer");
    let table = table();

    let (first, _) = convert_with_defaults("screen_a", &base, &overlay, &table);
    let (second, _) = convert_with_defaults("screen_a", &base, &overlay, &table);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("serialize first"),
        serde_json::to_string(&second).expect("serialize second")
    );
}

#[test]
fn collision_renames_are_deterministic() {
    // Overlay ids deliberately collide with base ids and carry types the
    // matcher will not pair (Vector vs Button/Label), forcing the rename path.
    let base = records(SourceTag::Structural, "widget");
    let overlay: Vec<RawWidgetRecord> = (0..4)
        .map(|i| RawWidgetRecord {
            id: format!("widget_{i}"),
            widget_type: "Vector".into(),
            source: SourceTag::Overlay,
            ..Default::default()
        })
        .collect();
    let table = table();

    let (first, _) = convert_with_defaults("screen_a", &base, &overlay, &table);
    let (second, _) = convert_with_defaults("screen_a", &base, &overlay, &table);

    assert_eq!(first, second);
    // Every renamed id is derived from the colliding id, not a counter of
    // global state.
    for i in 0..4 {
        assert!(
            first
                .widgets
                .iter()
                .any(|w| w.id.starts_with(&format!("widget_{i}_ovl"))),
            "expected a rename for widget_{i}"
        );
    }
}

#[test]
fn identity_merge_is_idempotent_over_raw_streams() {
    let table = table();
    let mut doubled = records(SourceTag::Structural, "widget");
    doubled.extend(records(SourceTag::Structural, "widget"));

    let (once, _) = convert_with_defaults(
        "screen_a",
        &records(SourceTag::Structural, "widget"),
        &[],
        &table,
    );
    let (twice, _) = convert_with_defaults("screen_a", &doubled, &[], &table);

    assert_eq!(once, twice);
}
