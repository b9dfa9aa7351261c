//! Layout state for the skill graph
//!
//! Holds the mutable physical state of every node (position, velocity,
//! radius) and the containment bounds the integrator keeps nodes within.
//! Renderers read the state through [`LayoutState::nodes`] or take a copied
//! [`Frame`]; they never mutate it.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Category, GraphModel};

/// Fallback viewport width when the host reports an unusable size
pub const DEFAULT_WIDTH: f32 = 800.0;

/// Fallback viewport height when the host reports an unusable size
pub const DEFAULT_HEIGHT: f32 = 600.0;

/// A skill node with its simulated physical state
#[derive(Debug, Clone, PartialEq)]
pub struct SkillNode {
    /// Unique skill name (identity for the life of the simulation)
    pub name: String,
    pub category: Category,
    /// Proficiency in [0, 1], display data only
    pub proficiency: f32,
    /// Position in 2D space
    pub x: f32,
    pub y: f32,
    /// Velocity
    pub vx: f32,
    pub vy: f32,
    /// Radius for collision and hit-testing
    pub radius: f32,
    pub description: String,
}

impl SkillNode {
    /// Create a node at rest at the given position
    pub fn new(name: impl Into<String>, category: Category, x: f32, y: f32, radius: f32) -> Self {
        Self {
            name: name.into(),
            category,
            proficiency: 1.0,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius,
            description: String::new(),
        }
    }

    /// Set the proficiency
    pub fn with_proficiency(mut self, proficiency: f32) -> Self {
        self.proficiency = proficiency;
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Speed (velocity magnitude)
    pub fn speed(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    /// Distance between this node's center and another's
    pub fn distance_to(&self, other: &SkillNode) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Whether the point lies inside the node's radius
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }

    /// Whether position and velocity are all finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.vx.is_finite() && self.vy.is_finite()
    }
}

/// Rectangular region nodes are contained in
///
/// Nodes are kept within `[margin, dimension - margin]` on both axes. When a
/// dimension is smaller than twice the margin the region collapses onto the
/// center line of that axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    width: f32,
    height: f32,
    margin: f32,
}

impl Bounds {
    /// Create bounds for a viewport, falling back to the default size for
    /// non-positive or non-finite dimensions
    pub fn new(width: f32, height: f32, margin: f32) -> Self {
        Self {
            width: sanitize_dimension(width, DEFAULT_WIDTH),
            height: sanitize_dimension(height, DEFAULT_HEIGHT),
            margin: if margin.is_finite() {
                margin.max(0.0)
            } else {
                0.0
            },
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Center of the drawing area
    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Allowed range on the x axis
    pub fn x_range(&self) -> (f32, f32) {
        let inset = self.margin.min(self.width / 2.0);
        (inset, self.width - inset)
    }

    /// Allowed range on the y axis
    pub fn y_range(&self) -> (f32, f32) {
        let inset = self.margin.min(self.height / 2.0);
        (inset, self.height - inset)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        let (min_x, max_x) = self.x_range();
        let (min_y, max_y) = self.y_range();
        (min_x..=max_x).contains(&x) && (min_y..=max_y).contains(&y)
    }

    /// Clamp a point into the allowed region
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        let (min_x, max_x) = self.x_range();
        let (min_y, max_y) = self.y_range();
        (x.clamp(min_x, max_x), y.clamp(min_y, max_y))
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(
            DEFAULT_WIDTH,
            DEFAULT_HEIGHT,
            crate::forces::DEFAULT_MARGIN,
        )
    }
}

fn sanitize_dimension(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// The working set of node records owned by one simulation instance
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    nodes: Vec<SkillNode>,
    name_to_index: HashMap<String, usize>,
}

impl LayoutState {
    /// Build a layout from already placed nodes
    ///
    /// Later nodes with a duplicate name are not reachable through
    /// [`LayoutState::get`]; models validate uniqueness before this point.
    pub fn from_nodes(nodes: Vec<SkillNode>) -> Self {
        let mut name_to_index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            name_to_index.entry(node.name.clone()).or_insert(i);
        }
        Self {
            nodes,
            name_to_index,
        }
    }

    pub fn nodes(&self) -> &[SkillNode] {
        &self.nodes
    }

    /// Mutable access for the integrator; names are not renamable through it
    pub(crate) fn nodes_mut(&mut self) -> &mut [SkillNode] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&SkillNode> {
        self.index_of(name).map(|i| &self.nodes[i])
    }

    /// Center-to-center distance between two named nodes
    pub fn distance(&self, a: &str, b: &str) -> Option<f32> {
        Some(self.get(a)?.distance_to(self.get(b)?))
    }

    /// Total kinetic energy, treating every node as unit mass
    pub fn kinetic_energy(&self) -> f32 {
        self.nodes
            .iter()
            .map(|n| 0.5 * (n.vx * n.vx + n.vy * n.vy))
            .sum()
    }

    /// Sum of node speeds
    pub fn total_speed(&self) -> f32 {
        self.nodes.iter().map(SkillNode::speed).sum()
    }

    pub fn is_finite(&self) -> bool {
        self.nodes.iter().all(SkillNode::is_finite)
    }
}

/// What a renderer needs to draw one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub name: String,
    pub category: Category,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// What a renderer needs to draw one link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkView {
    pub source: String,
    pub target: String,
    pub strength: f32,
}

/// A copied snapshot of the layout, safe to keep across frames
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    pub nodes: Vec<NodeView>,
    pub links: Vec<LinkView>,
}

impl Frame {
    /// Copy the current positions out of a layout built from `model`
    pub fn capture(layout: &LayoutState, model: &GraphModel) -> Self {
        let nodes = layout
            .nodes()
            .iter()
            .map(|n| NodeView {
                name: n.name.clone(),
                category: n.category,
                x: n.x,
                y: n.y,
                radius: n.radius,
            })
            .collect();

        let links = model
            .links()
            .iter()
            .filter_map(|link| {
                let (source, target) = model.link_names(link)?;
                Some(LinkView {
                    source: source.to_string(),
                    target: target.to_string(),
                    strength: link.strength,
                })
            })
            .collect();

        Self { nodes, links }
    }

    pub fn node(&self, name: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
