//! Wire and document types for the screen IR pipeline.
//!
//! Everything here is serde-friendly and deliberately lenient on the way in:
//! extractors run over partial or malformed sources, so every optional field
//! defaults to an empty container instead of failing deserialization. The
//! strictness lives in the [`Validator`](crate::Validator), not in the types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Origin tag for a widget record or document.
///
/// `Structural` is the authoritative tree (embedded-GUI C scanner), `Markup`
/// the component-markup AST walker, `Overlay` the free-form design-tool
/// export. `Merged` marks nodes produced by a cross-source merge; anything we
/// do not recognize deserializes to `Unknown` rather than erroring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Structural,
    Markup,
    Overlay,
    Merged,
    #[serde(other)]
    #[default]
    Unknown,
}

impl SourceTag {
    /// Stable lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Structural => "structural",
            SourceTag::Markup => "markup",
            SourceTag::Overlay => "overlay",
            SourceTag::Merged => "merged",
            SourceTag::Unknown => "unknown",
        }
    }
}

/// Widget kind. The four well-known kinds get variants; everything else
/// passes through untouched as `Other` so design-tool types like `Group`
/// or `Symbol` survive normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WidgetType {
    Container,
    Button,
    Label,
    Image,
    Other(String),
}

impl WidgetType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Container" => WidgetType::Container,
            "Button" => WidgetType::Button,
            "Label" => WidgetType::Label,
            "Image" => WidgetType::Image,
            other => WidgetType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WidgetType::Container => "Container",
            WidgetType::Button => "Button",
            WidgetType::Label => "Label",
            WidgetType::Image => "Image",
            WidgetType::Other(name) => name.as_str(),
        }
    }
}

impl From<String> for WidgetType {
    fn from(value: String) -> Self {
        WidgetType::from_name(&value)
    }
}

impl From<WidgetType> for String {
    fn from(value: WidgetType) -> Self {
        value.as_str().to_string()
    }
}

impl Default for WidgetType {
    fn default() -> Self {
        WidgetType::Other(String::new())
    }
}

/// Layout rectangle in the coordinate space of the source that produced it.
/// Extractors rarely know every edge, so all four components are optional.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
}

impl Rect {
    /// Center point, treating missing components as zero.
    pub fn center(&self) -> (f64, f64) {
        let x = self.x.unwrap_or(0.0);
        let y = self.y.unwrap_or(0.0);
        let w = self.w.unwrap_or(0.0);
        let h = self.h.unwrap_or(0.0);
        (x + w / 2.0, y + h / 2.0)
    }

    /// Area, treating missing components as zero.
    pub fn area(&self) -> f64 {
        self.w.unwrap_or(0.0) * self.h.unwrap_or(0.0)
    }

    /// Diagonal of the bounding box that covers both rectangles. Used as the
    /// normalization length for center-distance scoring.
    pub fn union_diagonal(&self, other: &Rect) -> f64 {
        let x0 = self.x.unwrap_or(0.0).min(other.x.unwrap_or(0.0));
        let y0 = self.y.unwrap_or(0.0).min(other.y.unwrap_or(0.0));
        let x1 = (self.x.unwrap_or(0.0) + self.w.unwrap_or(0.0))
            .max(other.x.unwrap_or(0.0) + other.w.unwrap_or(0.0));
        let y1 = (self.y.unwrap_or(0.0) + self.h.unwrap_or(0.0))
            .max(other.y.unwrap_or(0.0) + other.h.unwrap_or(0.0));
        let dx = x1 - x0;
        let dy = y1 - y0;
        (dx * dx + dy * dy).sqrt()
    }

    /// Shallow union: `other` wins wherever it carries a value.
    pub fn overlaid_with(&self, other: &Rect) -> Rect {
        Rect {
            x: other.x.or(self.x),
            y: other.y.or(self.y),
            w: other.w.or(self.w),
            h: other.h.or(self.h),
        }
    }
}

/// One interaction hook on a widget. Duplicate events (same name and same
/// source) are collapsed during merging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WidgetEvent {
    pub name: String,
    /// Origin of the event declaration. Falls back to the owning record's
    /// source when the extractor did not tag the event itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceTag>,
}

/// Unnormalized output of one format-specific extractor.
///
/// This is the input contract of the core: a flat list of these per source.
/// Only `id`, `type`, and `source` carry meaning on their own; everything
/// else degrades to an empty default when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawWidgetRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub widget_type: String,
    #[serde(default)]
    pub text: String,
    /// Reference to an image resource. Accepts the legacy `src` key.
    #[serde(default, alias = "src", skip_serializing_if = "Option::is_none")]
    pub asset_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Rect>,
    #[serde(default)]
    pub style: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub events: Vec<WidgetEvent>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub source: SourceTag,
}

/// One canonical screen element inside an [`IrDocument`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetNode {
    /// Unique within a document. Stable across normalization; renamed only
    /// on cross-source collision during reconciliation.
    pub id: String,
    #[serde(default)]
    pub source: SourceTag,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    /// Trimmed, newline-normalized display text; possibly empty.
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Rect>,
    /// Open key/value map of visual properties.
    #[serde(default)]
    pub style: BTreeMap<String, JsonValue>,
    /// Presentation string derived from `style` + mapping rules. Pure
    /// function of the node; recomputable, never hand-set.
    #[serde(default)]
    pub derived_classes: String,
    #[serde(default)]
    pub events: Vec<WidgetEvent>,
    /// Ordered child ids, declaration order, no duplicates.
    #[serde(default)]
    pub children: Vec<String>,
}

impl WidgetNode {
    /// Trimmed text used for all text-equality heuristics.
    pub fn normalized_text(&self) -> &str {
        self.text.trim()
    }
}

/// Provenance block carried by every document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    /// Which origins contributed nodes, first-seen order, deduplicated.
    #[serde(default)]
    pub sources: Vec<SourceTag>,
    #[serde(default)]
    pub mapping_applied: bool,
}

/// The canonical widget tree handed to code generators and the preview.
///
/// Constructed fresh per conversion request and immutable once returned;
/// nothing in this crate shares a document across calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IrDocument {
    pub version: String,
    pub screen_id: String,
    pub widgets: Vec<WidgetNode>,
    #[serde(default)]
    pub meta: DocumentMeta,
}

/// Document format version stamped on every produced document.
pub const IR_VERSION: &str = "1.0";

impl IrDocument {
    /// Empty document for the degenerate no-input path.
    pub fn empty(screen_id: &str) -> Self {
        IrDocument {
            version: IR_VERSION.to_string(),
            screen_id: screen_id.to_string(),
            widgets: Vec::new(),
            meta: DocumentMeta::default(),
        }
    }

    /// Whether the document carries no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Find a node by id.
    pub fn widget(&self, id: &str) -> Option<&WidgetNode> {
        self.widgets.iter().find(|w| w.id == id)
    }
}
