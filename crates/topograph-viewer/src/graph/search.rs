use std::collections::HashSet;
use topograph_core::{Node, NodeKind};

use crate::graph::model::GraphModel;
use crate::graph::visibility::Visibility;
use crate::render::{Emphasis, ViewportCommand};

/// Attributes searched besides the label.
const ALT_NAME_KEYS: [&str; 2] = ["name", "compose_service"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub dim_opacity: f32,
    /// Largest match count the viewport still fits to.
    pub fit_max: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            dim_opacity: 0.2,
            fit_max: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    /// Sorted by label, then id.
    pub matches: Vec<Node>,
    pub emphasis: Emphasis,
    pub viewport: Option<ViewportCommand>,
}

pub fn node_matches(node: &Node, needle_lower: &str) -> bool {
    if node.kind != NodeKind::Container {
        return false;
    }
    if node.label.to_lowercase().contains(needle_lower) {
        return true;
    }
    ALT_NAME_KEYS
        .iter()
        .filter_map(|k| node.attr_str(k))
        .any(|v| v.to_lowercase().contains(needle_lower))
}

/// Emphasis and viewport for `query` over the current model.
///
/// A blank query or one without any match clears emphasis. Hidden matches
/// are reported and highlighted but never take part in the viewport move.
pub fn run(
    model: &GraphModel,
    visibility: &Visibility,
    query: &str,
    params: &SearchParams,
) -> SearchOutcome {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return SearchOutcome::default();
    }

    let mut matches: Vec<Node> = model
        .nodes
        .values()
        .filter(|n| node_matches(n, &needle))
        .cloned()
        .collect();
    if matches.is_empty() {
        return SearchOutcome::default();
    }
    matches.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));

    let highlighted: HashSet<_> = matches.iter().map(|n| n.id.clone()).collect();
    let on_screen: Vec<_> = matches
        .iter()
        .filter(|n| visibility.node_visible(&n.id))
        .map(|n| n.id.clone())
        .collect();

    let viewport = match on_screen.len() {
        0 => None,
        1 => on_screen.into_iter().next().map(ViewportCommand::Center),
        n if n <= params.fit_max => Some(ViewportCommand::Fit(on_screen)),
        _ => None,
    };

    SearchOutcome {
        matches,
        emphasis: Emphasis::Search {
            highlighted,
            dim_opacity: params.dim_opacity,
        },
        viewport,
    }
}
