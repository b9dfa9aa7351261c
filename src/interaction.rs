//! Hover and selection state for the renderer
//!
//! Owned by the host next to the simulation, never by it. Nothing here is
//! read by the force integrator: emphasis changes how nodes are drawn, not
//! where they are.

use std::collections::HashSet;

use crate::layout::SkillNode;
use crate::model::{Category, GraphModel};

/// How a renderer should emphasize a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEmphasis {
    Normal,
    Hovered,
    /// Linked to the hovered node
    Related,
    Dimmed,
}

impl NodeEmphasis {
    pub fn opacity(self) -> f32 {
        match self {
            NodeEmphasis::Dimmed => 0.3,
            _ => 1.0,
        }
    }

    pub fn scale(self) -> f32 {
        match self {
            NodeEmphasis::Hovered => 1.2,
            _ => 1.0,
        }
    }
}

/// How a renderer should emphasize a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEmphasis {
    Normal,
    /// Touches the hovered node
    Highlighted,
    Dimmed,
}

impl LinkEmphasis {
    pub fn opacity(self) -> f32 {
        match self {
            LinkEmphasis::Normal => 0.4,
            LinkEmphasis::Highlighted => 0.8,
            LinkEmphasis::Dimmed => 0.1,
        }
    }

    pub fn stroke_width(self) -> f32 {
        match self {
            LinkEmphasis::Highlighted => 2.0,
            _ => 1.0,
        }
    }
}

/// Hover, selection and filter state
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    hovered: Option<String>,
    related: HashSet<String>,
    selected: Option<String>,
    active_category: Option<Category>,
    query: String,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the node under the pointer (`None` when it leaves)
    ///
    /// Returns whether the hover target changed.
    pub fn on_hover(&mut self, node: Option<&str>, model: &GraphModel) -> bool {
        if self.hovered.as_deref() == node {
            return false;
        }

        self.hovered = node.map(str::to_string);
        self.related = node
            .map(|name| {
                model
                    .neighbors(name)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        true
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Pin a node (e.g. for a tooltip that survives pointer exit)
    pub fn select(&mut self, node: Option<&str>) {
        self.selected = node.map(str::to_string);
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn set_active_category(&mut self, category: Option<Category>) {
        self.active_category = category;
    }

    pub fn active_category(&self) -> Option<Category> {
        self.active_category
    }

    /// Case-insensitive name filter; empty clears it
    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_lowercase();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Emphasis for a node
    ///
    /// Hover wins over the category and search filters.
    pub fn node_emphasis(&self, node: &SkillNode) -> NodeEmphasis {
        if let Some(hovered) = &self.hovered {
            return if *hovered == node.name {
                NodeEmphasis::Hovered
            } else if self.related.contains(&node.name) {
                NodeEmphasis::Related
            } else {
                NodeEmphasis::Dimmed
            };
        }

        let outside_category = self
            .active_category
            .is_some_and(|category| category != node.category);
        let missed_query =
            !self.query.is_empty() && !node.name.to_lowercase().contains(&self.query);

        if outside_category || missed_query {
            NodeEmphasis::Dimmed
        } else {
            NodeEmphasis::Normal
        }
    }

    /// Emphasis for the link between two named nodes
    pub fn link_emphasis(&self, source: &str, target: &str) -> LinkEmphasis {
        match self.hovered.as_deref() {
            Some(hovered) if hovered == source || hovered == target => LinkEmphasis::Highlighted,
            Some(_) => LinkEmphasis::Dimmed,
            None => LinkEmphasis::Normal,
        }
    }

    /// Tooltip header for the hovered node, or the selected one
    pub fn tooltip(&self, nodes: &[SkillNode]) -> Option<String> {
        let name = self.hovered.as_deref().or(self.selected.as_deref())?;
        let node = nodes.iter().find(|n| n.name == name)?;
        let level = (node.proficiency * 100.0).floor() as u32;
        Some(format!("{} LVL: {level}%", node.name.to_uppercase()))
    }
}

/// Topmost node containing the point
///
/// Later nodes are drawn over earlier ones, so the search runs back to front.
pub fn hit_test(nodes: &[SkillNode], x: f32, y: f32) -> Option<&SkillNode> {
    nodes.iter().rev().find(|n| n.contains(x, y))
}
