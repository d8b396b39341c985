//! Identity merger: collapse repeated ids from the same source into one node.
//!
//! A widget discovered by two extraction passes over the same source shows up
//! twice in the normalized stream. This module folds those into a single node
//! per id, first-seen order preserved, with later records overriding earlier
//! scalars. The fold is idempotent: merging an already-merged set with itself
//! yields the same set.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::mapping::MappingRuleTable;
use crate::normalize::normalize_record;
use crate::types::{DocumentMeta, IrDocument, RawWidgetRecord, WidgetNode, IR_VERSION};

/// Collapse a normalized node sequence to one node per distinct id.
pub fn merge_by_id(nodes: Vec<WidgetNode>) -> Vec<WidgetNode> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, WidgetNode> = HashMap::new();

    for node in nodes {
        match by_id.entry(node.id.clone()) {
            Entry::Vacant(slot) => {
                order.push(node.id.clone());
                slot.insert(node);
            }
            Entry::Occupied(mut slot) => {
                debug!(id = %node.id, "identity_merge_collapse");
                merge_into(slot.get_mut(), node);
            }
        }
    }

    order
        .into_iter()
        .map(|id| by_id.remove(&id).expect("id recorded in order"))
        .collect()
}

/// Fold `later` into `earlier` under the same id. Scalars (`type`, `text`,
/// `assetRef`, `layout`) take the later record's value unconditionally, even
/// when it is empty; only `style`, classes, events, and children accumulate.
fn merge_into(earlier: &mut WidgetNode, later: WidgetNode) {
    if earlier.source != later.source {
        earlier.source = crate::types::SourceTag::Merged;
    }
    earlier.widget_type = later.widget_type;
    earlier.text = later.text;
    earlier.asset_ref = later.asset_ref;
    earlier.layout = later.layout;
    for (key, value) in later.style {
        earlier.style.insert(key, value);
    }
    if !later.derived_classes.is_empty() {
        let joined = [earlier.derived_classes.as_str(), later.derived_classes.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        earlier.derived_classes = dedup_classes(&joined);
    }
    for event in later.events {
        if !earlier.events.contains(&event) {
            earlier.events.push(event);
        }
    }
    for child in later.children {
        if child != earlier.id && !earlier.children.contains(&child) {
            earlier.children.push(child);
        }
    }
}

/// Whitespace-join with duplicates removed, first occurrence wins. Keeps the
/// class string stable when the same record is merged twice.
pub(crate) fn dedup_classes(classes: &str) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for class in classes.split_whitespace() {
        if !seen.contains(&class) {
            seen.push(class);
        }
    }
    seen.join(" ")
}

/// Build one per-source IR document: normalize every raw record, collapse
/// same-id duplicates, and stamp provenance metadata.
pub fn build_document(
    screen_id: &str,
    records: &[RawWidgetRecord],
    table: &MappingRuleTable,
) -> IrDocument {
    let normalized: Vec<WidgetNode> = records
        .iter()
        .map(|raw| normalize_record(raw, table))
        .collect();

    let mut sources = Vec::new();
    for node in &normalized {
        if !sources.contains(&node.source) {
            sources.push(node.source);
        }
    }

    IrDocument {
        version: IR_VERSION.to_string(),
        screen_id: screen_id.to_string(),
        widgets: merge_by_id(normalized),
        meta: DocumentMeta {
            sources,
            mapping_applied: true,
        },
    }
}
