//! Force integrator for the skill graph layout
//!
//! One call to [`ForceIntegrator::step`] advances a [`LayoutState`] by
//! exactly one simulation step:
//!
//! 1. **Repulsion**: overlapping pairs (closer than the sum of their radii
//!    plus a separation margin) push apart in proportion to the overlap.
//! 2. **Link springs**: Hooke's law toward each link's rest length, scaled by
//!    link strength.
//! 3. **Centering**: a weak pull toward the middle of the drawing area.
//! 4. **Damping**: accumulated velocity is multiplied by `friction < 1`.
//! 5. **Integration**: `position += velocity`.
//! 6. **Containment**: positions are clamped into the bounds and the clamped
//!    velocity component bounces back attenuated.
//!
//! All forces are computed from the positions at the start of the step
//! before any node moves. Repulsion is brute-force O(n²); skill graphs hold
//! tens of nodes.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::layout::{Bounds, LayoutState, SkillNode};
use crate::model::Link;

// =============================================================================
// Default Constants
// =============================================================================

/// Default gap kept between node rims before repulsion starts
///
/// Zero keeps an unlinked node able to rest between two linked nodes a rest
/// length apart for every radius in the default range.
pub const DEFAULT_SEPARATION_MARGIN: f32 = 0.0;

/// Default repulsion per unit of overlap
pub const DEFAULT_REPULSION: f32 = 0.1;

/// Default link rest length
pub const DEFAULT_REST_LENGTH: f32 = 150.0;

/// Default spring constant (multiplied by link strength)
pub const DEFAULT_SPRING_CONSTANT: f32 = 0.05;

/// Default pull toward the center per unit of displacement
pub const DEFAULT_CENTER_STRENGTH: f32 = 0.001;

/// Default velocity retained per step
pub const DEFAULT_FRICTION: f32 = 0.95;

/// Default velocity factor applied when a node hits the bounds
pub const DEFAULT_BOUNCE: f32 = -0.5;

/// Default distance kept from the viewport edges
pub const DEFAULT_MARGIN: f32 = 50.0;

/// Distances below this are treated as this (avoids division by zero)
pub const MIN_DISTANCE: f32 = 1.0;

/// Largest friction accepted; 1.0 would never dissipate
const MAX_FRICTION: f32 = 0.999;

/// Below this the center-to-center vector has no usable direction
const DIRECTION_EPSILON: f32 = 1e-4;

/// Tuning constants for the integrator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForceConfig {
    /// Gap between node rims below which repulsion applies
    pub separation_margin: f32,
    /// Repulsion per unit of overlap
    pub repulsion: f32,
    /// Link rest length
    pub rest_length: f32,
    /// Spring constant
    pub spring_constant: f32,
    /// Center pull per unit of displacement
    pub center_strength: f32,
    /// Velocity decay (fraction kept each step)
    pub friction: f32,
    /// Velocity factor on boundary contact (negative = reverse)
    pub bounce: f32,
    /// Containment margin from each viewport edge
    pub margin: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            separation_margin: DEFAULT_SEPARATION_MARGIN,
            repulsion: DEFAULT_REPULSION,
            rest_length: DEFAULT_REST_LENGTH,
            spring_constant: DEFAULT_SPRING_CONSTANT,
            center_strength: DEFAULT_CENTER_STRENGTH,
            friction: DEFAULT_FRICTION,
            bounce: DEFAULT_BOUNCE,
            margin: DEFAULT_MARGIN,
        }
    }
}

impl ForceConfig {
    /// Bring every constant into a range that keeps the step dissipative
    ///
    /// Non-finite values take their default; negative strengths become zero.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let non_negative = |value: f32, default: f32| {
            if value.is_finite() {
                value.max(0.0)
            } else {
                default
            }
        };
        let friction = if self.friction.is_finite() {
            self.friction.clamp(0.0, MAX_FRICTION)
        } else {
            defaults.friction
        };
        let bounce = if self.bounce.is_finite() {
            self.bounce.clamp(-1.0, 0.0)
        } else {
            defaults.bounce
        };

        Self {
            separation_margin: non_negative(self.separation_margin, defaults.separation_margin),
            repulsion: non_negative(self.repulsion, defaults.repulsion),
            rest_length: non_negative(self.rest_length, defaults.rest_length),
            spring_constant: non_negative(self.spring_constant, defaults.spring_constant),
            center_strength: non_negative(self.center_strength, defaults.center_strength),
            friction,
            bounce,
            margin: non_negative(self.margin, defaults.margin),
        }
    }
}

/// What happened during one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Axis clamps applied by containment
    pub clamped: usize,
    /// Nodes whose state went non-finite and was restored
    pub recovered: usize,
}

/// Advances a layout one step at a time
///
/// Keeps its scratch buffers between steps so per-frame stepping does not
/// allocate.
#[derive(Debug, Clone, Default)]
pub struct ForceIntegrator {
    config: ForceConfig,
    forces: Vec<(f32, f32)>,
}

impl ForceIntegrator {
    pub fn new(config: ForceConfig) -> Self {
        Self {
            config: config.sanitized(),
            forces: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForceConfig {
        &self.config
    }

    /// Advance `state` by one step within `bounds`
    ///
    /// Links whose indices fall outside the layout are skipped.
    pub fn step(&mut self, state: &mut LayoutState, links: &[Link], bounds: &Bounds) -> StepStats {
        let nodes = state.nodes_mut();
        if nodes.is_empty() {
            return StepStats::default();
        }

        self.forces.clear();
        self.forces.resize(nodes.len(), (0.0, 0.0));

        self.apply_repulsion(nodes);
        self.apply_link_springs(nodes, links);
        self.apply_centering(nodes, bounds);
        let stats = self.integrate(nodes, bounds);

        if stats.recovered > 0 {
            warn!(
                recovered = stats.recovered,
                "non-finite node state restored to last finite values"
            );
        }
        stats
    }

    /// Push apart every pair closer than their radii plus the margin
    fn apply_repulsion(&mut self, nodes: &[SkillNode]) {
        let n = nodes.len();

        for i in 0..n {
            for j in (i + 1)..n {
                let dx = nodes[j].x - nodes[i].x;
                let dy = nodes[j].y - nodes[i].y;
                let raw = (dx * dx + dy * dy).sqrt();

                let min_dist = nodes[i].radius + nodes[j].radius + self.config.separation_margin;
                if !(raw < min_dist) {
                    continue;
                }

                let push = (min_dist - raw.max(MIN_DISTANCE)) * self.config.repulsion;
                if push <= 0.0 {
                    continue;
                }

                let (ux, uy) = unit_direction(dx, dy, raw, i, j);
                self.forces[i].0 -= ux * push;
                self.forces[i].1 -= uy * push;
                self.forces[j].0 += ux * push;
                self.forces[j].1 += uy * push;
            }
        }
    }

    /// Spring force toward the rest length of each link
    fn apply_link_springs(&mut self, nodes: &[SkillNode], links: &[Link]) {
        let n = nodes.len();

        for link in links {
            let (source, target) = (link.source, link.target);
            if source >= n || target >= n || source == target {
                continue;
            }

            let dx = nodes[target].x - nodes[source].x;
            let dy = nodes[target].y - nodes[source].y;
            let raw = (dx * dx + dy * dy).sqrt();
            let dist = raw.max(MIN_DISTANCE);

            // Hooke's law: stretched links pull together, compressed ones push
            let force = (dist - self.config.rest_length)
                * self.config.spring_constant
                * link.strength;
            let (ux, uy) = unit_direction(dx, dy, raw, source, target);

            self.forces[source].0 += ux * force;
            self.forces[source].1 += uy * force;
            self.forces[target].0 -= ux * force;
            self.forces[target].1 -= uy * force;
        }
    }

    /// Pull every node toward the center of the drawing area
    fn apply_centering(&mut self, nodes: &[SkillNode], bounds: &Bounds) {
        let (cx, cy) = bounds.center();
        for (node, force) in nodes.iter().zip(self.forces.iter_mut()) {
            force.0 += (cx - node.x) * self.config.center_strength;
            force.1 += (cy - node.y) * self.config.center_strength;
        }
    }

    /// Damp, integrate, guard against divergence and contain
    fn integrate(&self, nodes: &mut [SkillNode], bounds: &Bounds) -> StepStats {
        let mut stats = StepStats::default();
        let (min_x, max_x) = bounds.x_range();
        let (min_y, max_y) = bounds.y_range();

        for (node, &(fx, fy)) in nodes.iter_mut().zip(self.forces.iter()) {
            let previous = (node.x, node.y, node.vx, node.vy);

            node.vx = (node.vx + fx) * self.config.friction;
            node.vy = (node.vy + fy) * self.config.friction;
            node.x += node.vx;
            node.y += node.vy;

            if !node.is_finite() {
                restore_finite(node, previous, bounds);
                stats.recovered += 1;
            }

            if node.x < min_x {
                node.x = min_x;
                node.vx *= self.config.bounce;
                stats.clamped += 1;
            } else if node.x > max_x {
                node.x = max_x;
                node.vx *= self.config.bounce;
                stats.clamped += 1;
            }
            if node.y < min_y {
                node.y = min_y;
                node.vy *= self.config.bounce;
                stats.clamped += 1;
            } else if node.y > max_y {
                node.y = max_y;
                node.vy *= self.config.bounce;
                stats.clamped += 1;
            }
        }

        stats
    }
}

/// Run a single step with a throwaway integrator
pub fn step(state: &mut LayoutState, links: &[Link], bounds: &Bounds, config: ForceConfig) -> StepStats {
    ForceIntegrator::new(config).step(state, links, bounds)
}

/// Unit vector from node `i` toward node `j`
///
/// Coincident centers get a fixed direction derived from the pair indices so
/// stacked nodes still separate, and do so the same way on every run.
fn unit_direction(dx: f32, dy: f32, dist: f32, i: usize, j: usize) -> (f32, f32) {
    if dist > DIRECTION_EPSILON {
        (dx / dist, dy / dist)
    } else {
        let angle = ((i as f32) * 0.618_034 + (j as f32) * 0.414_214) * TAU;
        (angle.cos(), angle.sin())
    }
}

/// Put back the last finite position and stop the node
fn restore_finite(node: &mut SkillNode, previous: (f32, f32, f32, f32), bounds: &Bounds) {
    let (x, y, _, _) = previous;
    let (x, y) = if x.is_finite() && y.is_finite() {
        (x, y)
    } else {
        bounds.center()
    };
    node.x = x;
    node.y = y;
    node.vx = 0.0;
    node.vy = 0.0;
}
