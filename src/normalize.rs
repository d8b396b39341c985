//! Normalizer: one raw extractor record in, one canonical [`WidgetNode`] out.
//!
//! Pure transform, no I/O, never fails. Missing or malformed fields degrade
//! to safe defaults; a style derivation that errors is skipped. The mapping
//! direction for type and event translation comes from the record's declared
//! origin (or, for events, the event's own origin when present).

use crate::mapping::MappingRuleTable;
use crate::types::{RawWidgetRecord, WidgetEvent, WidgetNode, WidgetType};

/// Trim and normalize newlines (`\r\n` / `\r` -> `\n`) in display text.
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

/// Normalize one raw widget record using the mapping-rule table.
pub fn normalize_record(raw: &RawWidgetRecord, table: &MappingRuleTable) -> WidgetNode {
    let type_name = table.translate_widget(&raw.widget_type, raw.source);
    let widget_type = WidgetType::from_name(type_name);

    let mut style = raw.style.clone();
    let mut classes: Vec<String> = Vec::new();
    for (key, value) in &raw.style {
        let Some(rule) = table.style_rule(key) else {
            continue;
        };
        classes.extend(rule.classes_for(value, raw));
        for (extra_key, extra_value) in &rule.extra_style {
            style
                .entry(extra_key.clone())
                .or_insert_with(|| extra_value.clone());
        }
    }

    let events = raw
        .events
        .iter()
        .map(|ev| {
            let origin = ev.source.unwrap_or(raw.source);
            WidgetEvent {
                name: table.translate_event(&ev.name, origin).to_string(),
                source: ev.source,
            }
        })
        .collect();

    let mut children: Vec<String> = Vec::new();
    for child in &raw.children {
        if child == &raw.id || children.iter().any(|c| c == child) {
            continue;
        }
        children.push(child.clone());
    }

    WidgetNode {
        id: raw.id.clone(),
        source: raw.source,
        widget_type,
        text: normalize_text(&raw.text),
        asset_ref: raw.asset_ref.clone(),
        layout: raw.layout,
        style,
        derived_classes: classes.join(" "),
        events,
        children,
    }
}
