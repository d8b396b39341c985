//! Mapping-rule table: static translation rules for widget types, style keys,
//! and event names.
//!
//! The table is loaded once from a JSON configuration document, cached for
//! the process lifetime, and never mutated after load. Every lookup miss
//! returns the input unchanged, and a load failure degrades to three empty
//! maps — this component never aborts a conversion.
//!
//! Style rules are a closed tagged set: a literal class string, a literal
//! class list, or a named pure derivation resolved against the built-in
//! registry. A derivation that errors (or panics) contributes nothing; the
//! rest of normalization proceeds.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::types::{RawWidgetRecord, SourceTag};

/// Per-type translation entry: the type's name in each target dialect.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct WidgetRule {
    #[serde(default)]
    pub structural: Option<String>,
    #[serde(default)]
    pub markup: Option<String>,
}

/// Per-event translation entry, same shape as [`WidgetRule`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct EventRule {
    #[serde(default)]
    pub structural: Option<String>,
    #[serde(default)]
    pub markup: Option<String>,
}

/// Signature of a built-in style derivation. Pure: the same value and record
/// always produce the same classes. An `Err` is swallowed by the caller.
pub type DeriveFn = fn(&JsonValue, &RawWidgetRecord) -> Result<Vec<String>, String>;

/// How a style key contributes to `derived_classes`.
#[derive(Debug, Clone)]
pub enum ClassRule {
    Literal(String),
    List(Vec<String>),
    Derive(DeriveFn),
}

/// One style-map entry: class contribution plus optional extra style keys
/// folded into the node when the node does not already carry them.
#[derive(Debug, Clone, Default)]
pub struct StyleRule {
    pub class: Option<ClassRule>,
    pub extra_style: BTreeMap<String, JsonValue>,
}

/// Wire shape of a style-map entry as it appears in the rules document.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawStyleRule {
    #[serde(default)]
    derived_class: Option<JsonValue>,
    #[serde(default)]
    derive_fn: Option<String>,
    #[serde(default)]
    extra_style: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawTable {
    #[serde(default)]
    widget_map: BTreeMap<String, WidgetRule>,
    #[serde(default)]
    style_map: BTreeMap<String, RawStyleRule>,
    #[serde(default)]
    event_map: BTreeMap<String, EventRule>,
}

/// The loaded, immutable translation table.
#[derive(Debug, Clone, Default)]
pub struct MappingRuleTable {
    pub widget_map: BTreeMap<String, WidgetRule>,
    pub style_map: BTreeMap<String, StyleRule>,
    pub event_map: BTreeMap<String, EventRule>,
}

impl MappingRuleTable {
    /// Three empty maps: every lookup passes its input through.
    pub fn empty() -> Self {
        MappingRuleTable::default()
    }

    /// Decode a rules document. Lenient: a malformed document degrades to an
    /// empty table, and an unknown `deriveFn` name degrades to no class
    /// contribution for that key.
    pub fn from_value(value: &JsonValue) -> Self {
        let raw: RawTable = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "mapping_table_decode_failed");
                return MappingRuleTable::empty();
            }
        };

        let mut style_map = BTreeMap::new();
        for (key, rule) in raw.style_map {
            style_map.insert(key, StyleRule::from_raw(rule));
        }

        MappingRuleTable {
            widget_map: raw.widget_map,
            style_map,
            event_map: raw.event_map,
        }
    }

    /// Read and decode a rules document from disk. Any failure degrades to
    /// an empty table; the conversion proceeds without translation.
    pub fn load_from_path(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "mapping_table_read_failed");
                return MappingRuleTable::empty();
            }
        };
        let value: JsonValue = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "mapping_table_parse_failed");
                return MappingRuleTable::empty();
            }
        };
        MappingRuleTable::from_value(&value)
    }

    /// Process-wide cached table. The first caller's path wins; subsequent
    /// calls return the cached table without touching the filesystem.
    pub fn shared(path: &Path) -> &'static MappingRuleTable {
        static TABLE: OnceLock<MappingRuleTable> = OnceLock::new();
        TABLE.get_or_init(|| MappingRuleTable::load_from_path(path))
    }

    /// Translate a widget type name using the record's origin as direction.
    /// Only structural names move, toward the markup vocabulary; markup type
    /// names are already canonical and stay untouched, as do all other
    /// origins and lookup misses.
    pub fn translate_widget<'a>(&'a self, name: &'a str, origin: SourceTag) -> &'a str {
        let Some(rule) = self.widget_map.get(name) else {
            return name;
        };
        let target = match origin {
            SourceTag::Structural => rule.markup.as_deref(),
            _ => None,
        };
        target.unwrap_or(name)
    }

    /// Translate an event name using the given origin as direction.
    pub fn translate_event<'a>(&'a self, name: &'a str, origin: SourceTag) -> &'a str {
        let Some(rule) = self.event_map.get(name) else {
            return name;
        };
        let target = match origin {
            SourceTag::Structural => rule.markup.as_deref(),
            SourceTag::Markup => rule.structural.as_deref(),
            _ => None,
        };
        target.unwrap_or(name)
    }

    /// Style rule for one key, if any.
    pub fn style_rule(&self, key: &str) -> Option<&StyleRule> {
        self.style_map.get(key)
    }
}

impl StyleRule {
    fn from_raw(raw: RawStyleRule) -> Self {
        let class = if let Some(name) = raw.derive_fn.as_deref() {
            match builtin_derive(name) {
                Some(derive) => Some(ClassRule::Derive(derive)),
                None => {
                    warn!(derive_fn = name, "unknown_style_derivation");
                    None
                }
            }
        } else {
            match raw.derived_class {
                Some(JsonValue::String(s)) => Some(ClassRule::Literal(s)),
                Some(JsonValue::Array(items)) => Some(ClassRule::List(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            JsonValue::String(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                )),
                _ => None,
            }
        };
        StyleRule {
            class,
            extra_style: raw.extra_style,
        }
    }

    /// Classes contributed by this rule for one style value. Derivation
    /// errors and panics degrade to an empty contribution.
    pub fn classes_for(&self, value: &JsonValue, record: &RawWidgetRecord) -> Vec<String> {
        match &self.class {
            None => Vec::new(),
            Some(ClassRule::Literal(s)) => vec![s.clone()],
            Some(ClassRule::List(items)) => items.clone(),
            Some(ClassRule::Derive(derive)) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| derive(value, record)));
                match outcome {
                    Ok(Ok(classes)) => classes,
                    Ok(Err(err)) => {
                        debug!(error = %err, "style_derivation_failed");
                        Vec::new()
                    }
                    Err(_) => {
                        debug!("style_derivation_panicked");
                        Vec::new()
                    }
                }
            }
        }
    }
}

/// Resolve a derivation name from the rules document to a built-in.
fn builtin_derive(name: &str) -> Option<DeriveFn> {
    match name {
        "bgColor" => Some(derive_bg_color),
        "textColor" => Some(derive_text_color),
        "borderColor" => Some(derive_border_color),
        "opacity" => Some(derive_opacity),
        _ => None,
    }
}

/// Normalize `0xRRGGBB` / `#hex` / named colors to a CSS color token.
fn css_color(value: &JsonValue) -> Result<String, String> {
    let raw = value
        .as_str()
        .ok_or_else(|| format!("expected color string, got {value}"))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty color value".to_string());
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return Ok(format!("#{}", hex.to_ascii_lowercase()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

fn derive_bg_color(value: &JsonValue, _record: &RawWidgetRecord) -> Result<Vec<String>, String> {
    Ok(vec![format!("bg-[{}]", css_color(value)?)])
}

fn derive_text_color(value: &JsonValue, _record: &RawWidgetRecord) -> Result<Vec<String>, String> {
    Ok(vec![format!("text-[{}]", css_color(value)?)])
}

fn derive_border_color(value: &JsonValue, _record: &RawWidgetRecord) -> Result<Vec<String>, String> {
    Ok(vec![format!("border-[{}]", css_color(value)?)])
}

fn derive_opacity(value: &JsonValue, _record: &RawWidgetRecord) -> Result<Vec<String>, String> {
    let n = value
        .as_f64()
        .ok_or_else(|| format!("expected numeric opacity, got {value}"))?;
    // Sources disagree on scale: design exports use 0..1, embedded styles 0..255.
    let percent = if n <= 1.0 { n * 100.0 } else { n / 255.0 * 100.0 };
    let percent = percent.clamp(0.0, 100.0).round() as u32;
    Ok(vec![format!("opacity-{percent}")])
}
