//! Cross-source reconciler: merge a structurally authoritative base document
//! with a free-form design-tool overlay document.
//!
//! The two trees share no identifiers a priori, so this is a best-effort
//! matcher, not an exact join. The pass order is fixed:
//!
//! 1. coalesce overlay labels onto base labels by trimmed text
//! 2. drop purely decorative overlay nodes
//! 3. greedy best-match scoring over the remaining pairs
//! 4. merge accepted pairs (base keeps identity, overlay wins presentation)
//! 5. insert residual overlay nodes, renaming on id collision
//! 6. drop full-screen overlay containers when the base already has a root
//! 7. sanitize child references
//!
//! Matching is greedy O(n·m) with first-encountered tie-breaking; a globally
//! optimal assignment is not required. The threshold and weights are tuned
//! heuristics, exposed on [`ReconcileConfig`] rather than hard-coded.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IrError;
use crate::merge::merge_by_id;
use crate::types::{DocumentMeta, IrDocument, Rect, SourceTag, WidgetNode, WidgetType};


/// Overlay node types that carry no product meaning on their own.
const DECORATIVE_TYPES: [&str; 4] = ["Group", "Rectangle", "Shape", "Frame"];

/// Text markers design tools attach to purely presentational layers.
const DECORATIVE_TEXTS: [&str; 5] = [
    "Group",
    "Rectangle",
    "Button area",
    "Contents area",
    "Button group",
];

/// Id prefixes that mark a generated decorative container in design exports.
const DECORATIVE_ID_PREFIXES: [&str; 3] = ["group_", "shape_", "symbol_"];

/// Tuning knobs for the matching heuristic.
///
/// The defaults (threshold 0.45, weights 0.6 / 0.2 / 0.25 / 0.15) are tuned
/// constants with no derivation beyond working well on real screens. Treat
/// them as configuration, not law.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcileConfig {
    /// Minimum combined score for a base/overlay pair to merge. Exact text
    /// equality overrides this regardless of score.
    #[serde(default = "ReconcileConfig::default_score_threshold")]
    pub score_threshold: f64,
    /// Contribution when both sides carry equal non-empty text.
    #[serde(default = "ReconcileConfig::default_text_weight")]
    pub text_weight: f64,
    /// Contribution when only the overlay side carries text.
    #[serde(default = "ReconcileConfig::default_overlay_text_weight")]
    pub overlay_text_weight: f64,
    /// Weight of the center-proximity geometry term.
    #[serde(default = "ReconcileConfig::default_proximity_weight")]
    pub proximity_weight: f64,
    /// Weight of the area-ratio geometry term.
    #[serde(default = "ReconcileConfig::default_area_weight")]
    pub area_weight: f64,
}

impl ReconcileConfig {
    pub(crate) fn default_score_threshold() -> f64 {
        0.45
    }

    pub(crate) fn default_text_weight() -> f64 {
        0.6
    }

    pub(crate) fn default_overlay_text_weight() -> f64 {
        0.2
    }

    pub(crate) fn default_proximity_weight() -> f64 {
        0.25
    }

    pub(crate) fn default_area_weight() -> f64 {
        0.15
    }

    /// Validate the knob ranges.
    pub fn validate(&self) -> Result<(), IrError> {
        if !(self.score_threshold > 0.0 && self.score_threshold <= 1.0) {
            return Err(IrError::InvalidConfig(
                "score_threshold must be in (0.0, 1.0]".into(),
            ));
        }
        for (name, weight) in [
            ("text_weight", self.text_weight),
            ("overlay_text_weight", self.overlay_text_weight),
            ("proximity_weight", self.proximity_weight),
            ("area_weight", self.area_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(IrError::InvalidConfig(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            score_threshold: Self::default_score_threshold(),
            text_weight: Self::default_text_weight(),
            overlay_text_weight: Self::default_overlay_text_weight(),
            proximity_weight: Self::default_proximity_weight(),
            area_weight: Self::default_area_weight(),
        }
    }
}

/// Reconcile a base document with an overlay document.
///
/// Degenerate inputs never fail: an absent or empty side returns the other
/// side with id uniqueness enforced on its own node set; two absent sides
/// return an empty document.
pub fn reconcile(
    base: Option<IrDocument>,
    overlay: Option<IrDocument>,
    cfg: &ReconcileConfig,
) -> IrDocument {
    let base = base.filter(|doc| !doc.is_empty());
    let overlay = overlay.filter(|doc| !doc.is_empty());

    let (base, overlay) = match (base, overlay) {
        (None, None) => return IrDocument::empty("screen_auto"),
        (Some(doc), None) | (None, Some(doc)) => return enforce_unique_ids(doc),
        (Some(base), Some(overlay)) => (base, overlay),
    };

    let mut widgets = base.widgets;
    let overlay_nodes = overlay.widgets;
    // Overlay nodes leave the pool once coalesced, filtered, or matched.
    let mut consumed = vec![false; overlay_nodes.len()];

    // Pass 1: coalesce overlay labels onto the first base label with the
    // same trimmed text. Prevents the same string rendering twice.
    let mut label_by_text: HashMap<String, usize> = HashMap::new();
    for (i, w) in widgets.iter().enumerate() {
        if w.widget_type == WidgetType::Label && !w.normalized_text().is_empty() {
            label_by_text
                .entry(w.normalized_text().to_string())
                .or_insert(i);
        }
    }
    let mut base_resolved: HashSet<usize> = HashSet::new();
    for (j, ov) in overlay_nodes.iter().enumerate() {
        if ov.widget_type != WidgetType::Label || ov.normalized_text().is_empty() {
            continue;
        }
        if let Some(&i) = label_by_text.get(ov.normalized_text()) {
            let node = &mut widgets[i];
            if let Some(layout) = ov.layout {
                node.layout = Some(match node.layout {
                    Some(existing) => existing.overlaid_with(&layout),
                    None => layout,
                });
            }
            for (key, value) in &ov.style {
                node.style.insert(key.clone(), value.clone());
            }
            node.derived_classes = concat_classes(&node.derived_classes, &ov.derived_classes);
            consumed[j] = true;
            base_resolved.insert(i);
            debug!(base_id = %node.id, overlay_id = %ov.id, "label_text_coalesced");
        }
    }

    // Pass 2: decorative overlay nodes carry no product meaning.
    for (j, ov) in overlay_nodes.iter().enumerate() {
        if !consumed[j] && is_decorative(ov) {
            consumed[j] = true;
            debug!(overlay_id = %ov.id, "decorative_overlay_dropped");
        }
    }

    // Pass 3: greedy best-match assignment, base order first, overlay order
    // breaking ties. Accepted overlay nodes are never reused.
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for i in 0..widgets.len() {
        if base_resolved.contains(&i) {
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for (j, ov) in overlay_nodes.iter().enumerate() {
            if consumed[j] {
                continue;
            }
            let score = match_score(&widgets[i], ov, cfg);
            if best.map_or(true, |(_, prev)| score > prev) {
                best = Some((j, score));
            }
        }
        if let Some((j, score)) = best {
            let texts_equal = {
                let bt = widgets[i].normalized_text();
                !bt.is_empty() && bt == overlay_nodes[j].normalized_text()
            };
            if score >= cfg.score_threshold || texts_equal {
                consumed[j] = true;
                pairs.push((i, j));
                debug!(
                    base_id = %widgets[i].id,
                    overlay_id = %overlay_nodes[j].id,
                    score,
                    texts_equal,
                    "overlay_pair_accepted"
                );
            }
        }
    }

    // Pass 4: merge the accepted pairs in place.
    for &(i, j) in &pairs {
        merge_pair(&mut widgets[i], &overlay_nodes[j]);
    }

    // Pass 5: residual overlay nodes become new nodes, renamed on collision.
    // One rename map rewrites every child reference afterwards, so references
    // never chase mutated id strings.
    let mut used: HashSet<String> = widgets.iter().map(|w| w.id.clone()).collect();
    let mut rename: HashMap<String, String> = HashMap::new();
    let mut inserted: Vec<WidgetNode> = Vec::new();
    for (j, ov) in overlay_nodes.iter().enumerate() {
        if consumed[j] {
            continue;
        }
        let mut node = ov.clone();
        if used.contains(&node.id) {
            let mut counter = inserted.len();
            let mut candidate = format!("{}_ovl{}", node.id, counter);
            while used.contains(&candidate) {
                counter += 1;
                candidate = format!("{}_ovl{}", node.id, counter);
            }
            debug!(old_id = %node.id, new_id = %candidate, "overlay_id_renamed");
            rename.insert(node.id.clone(), candidate.clone());
            node.id = candidate;
        }
        used.insert(node.id.clone());
        inserted.push(node);
    }
    if !rename.is_empty() {
        for node in widgets.iter_mut().chain(inserted.iter_mut()) {
            for child in &mut node.children {
                if let Some(renamed) = rename.get(child) {
                    *child = renamed.clone();
                }
            }
        }
    }

    // Pass 6: the base root wins. A surviving overlay container with both a
    // width and a height is a full-screen background layer.
    let base_has_root = widgets
        .iter()
        .any(|w| w.widget_type == WidgetType::Container && !w.children.is_empty());
    if base_has_root {
        inserted.retain(|w| {
            let full_screen = w.widget_type == WidgetType::Container
                && w.layout
                    .map_or(false, |l| l.w.is_some() && l.h.is_some());
            if full_screen {
                debug!(overlay_id = %w.id, "overlay_root_collapsed");
            }
            !full_screen
        });
    }
    widgets.extend(inserted);

    // Pass 7: children must resolve. One fallback strips a generated suffix;
    // anything still dangling is dropped silently (rejected matches are
    // expected to leave a few of these behind).
    sanitize_children(&mut widgets);

    let mut sources = base.meta.sources;
    for source in overlay.meta.sources {
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    IrDocument {
        version: base.version,
        screen_id: base.screen_id,
        widgets,
        meta: DocumentMeta {
            sources,
            mapping_applied: true,
        },
    }
}

/// Match score for one base/overlay pair, in [0, 1].
fn match_score(base: &WidgetNode, overlay: &WidgetNode, cfg: &ReconcileConfig) -> f64 {
    if !type_gate(&base.widget_type, &overlay.widget_type) {
        return 0.0;
    }

    let mut score = 0.0;
    let base_text = base.normalized_text();
    let overlay_text = overlay.normalized_text();
    if !base_text.is_empty() && base_text == overlay_text {
        score += cfg.text_weight;
    } else if base_text.is_empty() && !overlay_text.is_empty() {
        score += cfg.overlay_text_weight;
    }

    let base_rect = base.layout.unwrap_or_default();
    let overlay_rect = overlay.layout.unwrap_or_default();
    score += cfg.proximity_weight * proximity_score(&base_rect, &overlay_rect);
    score += cfg.area_weight * area_score(&base_rect, &overlay_rect);
    score
}

/// Exact type equality passes; otherwise only a text-bearing base kind
/// matched against an overlay kind that can represent it visually.
fn type_gate(base: &WidgetType, overlay: &WidgetType) -> bool {
    if base == overlay {
        return true;
    }
    let base_allowed = matches!(base, WidgetType::Label | WidgetType::Button);
    let overlay_allowed = matches!(overlay, WidgetType::Image | WidgetType::Container)
        || matches!(overlay, WidgetType::Other(name) if name == "Symbol");
    base_allowed && overlay_allowed
}

/// `1 - min(1, centerDistance / unionDiagonal)`; coincident degenerate
/// rectangles score 1.0.
fn proximity_score(a: &Rect, b: &Rect) -> f64 {
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    let distance = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt();
    let diagonal = a.union_diagonal(b);
    if diagonal > 0.0 {
        1.0 - (distance / diagonal).min(1.0)
    } else {
        1.0
    }
}

/// `min(area) / max(area)`; two zero-area rectangles count as a perfect match.
fn area_score(a: &Rect, b: &Rect) -> f64 {
    let (area_a, area_b) = (a.area(), b.area());
    let max = area_a.max(area_b);
    if max == 0.0 {
        1.0
    } else {
        area_a.min(area_b) / max
    }
}

fn is_decorative(node: &WidgetNode) -> bool {
    let type_name = node.widget_type.as_str();
    if DECORATIVE_TYPES.contains(&type_name) {
        return true;
    }
    let text = node.normalized_text();
    if !text.is_empty() && DECORATIVE_TEXTS.contains(&text) {
        return true;
    }
    if node.source == SourceTag::Overlay
        && node.widget_type == WidgetType::Container
        && DECORATIVE_ID_PREFIXES
            .iter()
            .any(|prefix| node.id.starts_with(prefix))
    {
        return true;
    }
    node.text.to_lowercase().contains("background")
}

/// Merge one accepted pair: the base node keeps id and type, the overlay
/// wins presentation wherever it carries a value.
fn merge_pair(base: &mut WidgetNode, overlay: &WidgetNode) {
    if !overlay.normalized_text().is_empty() {
        base.text = overlay.normalized_text().to_string();
    }
    if overlay.asset_ref.is_some() {
        base.asset_ref = overlay.asset_ref.clone();
    }
    if let Some(layout) = overlay.layout {
        base.layout = Some(match base.layout {
            Some(existing) => existing.overlaid_with(&layout),
            None => layout,
        });
    }
    for (key, value) in &overlay.style {
        base.style.insert(key.clone(), value.clone());
    }
    base.derived_classes = concat_classes(&base.derived_classes, &overlay.derived_classes);
    for event in &overlay.events {
        if !base.events.contains(event) {
            base.events.push(event.clone());
        }
    }
    for child in &overlay.children {
        if child != &base.id && !base.children.contains(child) {
            base.children.push(child.clone());
        }
    }
    base.source = SourceTag::Merged;
}

/// Base-then-overlay, whitespace-joined, trimmed.
fn concat_classes(base: &str, overlay: &str) -> String {
    [base, overlay]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Filter every children list down to resolvable ids.
fn sanitize_children(widgets: &mut [WidgetNode]) {
    let ids: HashSet<String> = widgets.iter().map(|w| w.id.clone()).collect();
    for node in widgets.iter_mut() {
        let own_id = node.id.clone();
        let mut seen: HashSet<String> = HashSet::new();
        node.children.retain_mut(|child| {
            if *child == own_id {
                return false;
            }
            if ids.contains(child.as_str()) {
                return seen.insert(child.clone());
            }
            if let Some(stripped) = strip_generated_suffix(child) {
                if stripped != own_id && ids.contains(stripped.as_str()) {
                    debug!(dangling = %child, resolved = %stripped, "child_ref_suffix_fallback");
                    *child = stripped;
                    return seen.insert(child.clone());
                }
            }
            debug!(parent = %own_id, dangling = %child, "child_ref_dropped");
            false
        });
    }
}

/// Strip a generated rename suffix (`_ovl<n>`) or a plain numeric suffix
/// (`_<n>`) so references written against pre-rename ids can still resolve.
fn strip_generated_suffix(id: &str) -> Option<String> {
    if let Some(pos) = id.rfind("_ovl") {
        let tail = &id[pos + 4..];
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            return Some(id[..pos].to_string());
        }
    }
    if let Some(pos) = id.rfind('_') {
        let tail = &id[pos + 1..];
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            return Some(id[..pos].to_string());
        }
    }
    None
}

/// Collapse any repeated ids inside a single document. Used on the
/// degenerate one-sided path before handing the document back.
fn enforce_unique_ids(mut doc: IrDocument) -> IrDocument {
    doc.widgets = merge_by_id(doc.widgets);
    doc
}
