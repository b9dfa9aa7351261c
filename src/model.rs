//! Skill graph model
//!
//! Static description of the skills (grouped by category) and the weighted
//! links between them. A [`GraphSpec`] is what graph files contain; resolving
//! it against a [`ModelConfig`] validates it, samples any missing radius or
//! proficiency from a seeded RNG and yields an immutable [`GraphModel`].
//!
//! Initial placement is deterministic: every category has a fixed anchor
//! offset from the drawing-area center, and the skills of a category are
//! spread evenly on a circle around that anchor.

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::forces::DEFAULT_MARGIN;
use crate::layout::{Bounds, LayoutState, SkillNode};

// =============================================================================
// Default Constants
// =============================================================================

/// Default seed for radius/proficiency sampling
pub const DEFAULT_SEED: u64 = 0x5eed_5ca1;

/// Default distance of a node from its category anchor
pub const DEFAULT_PLACEMENT_RADIUS: f32 = 150.0;

/// Default range radii are sampled from when a skill does not set one
pub const DEFAULT_RADIUS_RANGE: [f32; 2] = [30.0, 50.0];

/// Default range proficiency is sampled from when a skill does not set one
pub const DEFAULT_PROFICIENCY_RANGE: [f32; 2] = [0.7, 1.0];

/// Skill category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Frontend,
    Backend,
    Tools,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Frontend, Category::Backend, Category::Tools];

    /// Offset of this category's anchor from the drawing-area center
    pub fn anchor_offset(self) -> (f32, f32) {
        match self {
            Category::Frontend => (-200.0, 0.0),
            Category::Backend => (200.0, 0.0),
            Category::Tools => (0.0, 150.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Frontend => "frontend",
            Category::Backend => "backend",
            Category::Tools => "tools",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors found while resolving a graph specification
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("skill name must not be empty")]
    EmptyName,

    #[error("duplicate skill: {0}")]
    DuplicateSkill(String),

    #[error("link {from} -> {to} references unknown skill: {missing}")]
    UnknownEndpoint {
        from: String,
        to: String,
        missing: String,
    },

    #[error("link {0} -> {0} connects a skill to itself")]
    SelfLink(String),

    #[error("link {from} -> {to} has strength {strength}, expected (0, 1]")]
    InvalidStrength {
        from: String,
        to: String,
        strength: f32,
    },

    #[error("skill {name} has proficiency {value}, expected [0, 1]")]
    InvalidProficiency { name: String, value: f32 },

    #[error("skill {name} has radius {value}, expected a positive number")]
    InvalidRadius { name: String, value: f32 },

    #[error("{field} range [{min}, {max}] is invalid")]
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
}

/// A skill as written in a graph file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillSpec {
    pub name: String,

    pub category: Category,

    /// Sampled from the configured range when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiency: Option<f32>,

    /// Sampled from the configured range when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SkillSpec {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            proficiency: None,
            radius: None,
            description: None,
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_proficiency(mut self, proficiency: f32) -> Self {
        self.proficiency = Some(proficiency);
        self
    }
}

/// A weighted link as written in a graph file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSpec {
    pub source: String,
    pub target: String,
    /// Spring stiffness multiplier in (0, 1]
    pub strength: f32,
}

impl LinkSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>, strength: f32) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            strength,
        }
    }
}

/// Unresolved graph description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphSpec {
    pub skills: Vec<SkillSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl GraphSpec {
    /// The portfolio skill network: fifteen skills in three categories
    pub fn portfolio() -> Self {
        let groups = [
            (
                Category::Frontend,
                ["React", "Next.js", "TypeScript", "Tailwind CSS", "JavaScript"],
            ),
            (
                Category::Backend,
                ["Node.js", "Express", "Python", "MongoDB", "PostgreSQL"],
            ),
            (Category::Tools, ["Git", "Docker", "AWS", "Figma", "VS Code"]),
        ];
        let skills = groups
            .iter()
            .flat_map(|(category, names)| names.iter().map(move |n| SkillSpec::new(*n, *category)))
            .collect();

        let links = [
            // Frontend
            ("React", "Next.js", 0.5),
            ("React", "TypeScript", 0.5),
            ("React", "Tailwind CSS", 0.5),
            ("React", "JavaScript", 0.8),
            ("Next.js", "TypeScript", 0.4),
            // Backend
            ("Node.js", "Express", 0.7),
            ("Node.js", "JavaScript", 0.6),
            ("Express", "MongoDB", 0.5),
            ("Express", "PostgreSQL", 0.5),
            ("Python", "PostgreSQL", 0.4),
            ("Python", "MongoDB", 0.4),
            // Tools
            ("Docker", "AWS", 0.6),
            ("Docker", "Node.js", 0.4),
            ("Git", "React", 0.3),
            ("Git", "Node.js", 0.3),
            ("Git", "Python", 0.3),
            ("Figma", "React", 0.5),
            ("Figma", "Tailwind CSS", 0.5),
        ]
        .into_iter()
        .map(|(s, t, strength)| LinkSpec::new(s, t, strength))
        .collect();

        Self { skills, links }
    }

    /// Validate the specification and resolve it into a [`GraphModel`]
    pub fn resolve(&self, config: &ModelConfig) -> Result<GraphModel, ModelError> {
        let radius_range = checked_range("radius", config.radius_range, |min| min > 0.0)?;
        let proficiency_range =
            checked_range("proficiency", config.proficiency_range, |min| min >= 0.0)?;
        if proficiency_range[1] > 1.0 {
            return Err(ModelError::InvalidRange {
                field: "proficiency",
                min: proficiency_range[0],
                max: proficiency_range[1],
            });
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut seen = HashSet::with_capacity(self.skills.len());
        let mut skills = Vec::with_capacity(self.skills.len());

        for spec in &self.skills {
            if spec.name.trim().is_empty() {
                return Err(ModelError::EmptyName);
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ModelError::DuplicateSkill(spec.name.clone()));
            }

            // Sample both values for every skill so one explicit value does
            // not shift the draws of the skills after it.
            let sampled_proficiency = sample(&mut rng, proficiency_range);
            let sampled_radius = sample(&mut rng, radius_range);

            let proficiency = match spec.proficiency {
                Some(value) if !(0.0..=1.0).contains(&value) => {
                    return Err(ModelError::InvalidProficiency {
                        name: spec.name.clone(),
                        value,
                    });
                }
                Some(value) => value,
                None => sampled_proficiency,
            };
            let radius = match spec.radius {
                Some(value) if !(value.is_finite() && value > 0.0) => {
                    return Err(ModelError::InvalidRadius {
                        name: spec.name.clone(),
                        value,
                    });
                }
                Some(value) => value,
                None => sampled_radius,
            };

            skills.push(Skill {
                name: spec.name.clone(),
                category: spec.category,
                proficiency,
                radius,
                description: spec.description.clone().unwrap_or_else(|| {
                    format!(
                        "Expert in {} with hands-on experience in building complex applications.",
                        spec.name
                    )
                }),
            });
        }

        let name_to_index: HashMap<String, usize> = skills
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        let mut links = Vec::with_capacity(self.links.len());
        for spec in &self.links {
            let lookup = |name: &String| {
                name_to_index
                    .get(name)
                    .copied()
                    .ok_or_else(|| ModelError::UnknownEndpoint {
                        from: spec.source.clone(),
                        to: spec.target.clone(),
                        missing: name.clone(),
                    })
            };
            let source = lookup(&spec.source)?;
            let target = lookup(&spec.target)?;
            if source == target {
                return Err(ModelError::SelfLink(spec.source.clone()));
            }
            if !(spec.strength > 0.0 && spec.strength <= 1.0) {
                return Err(ModelError::InvalidStrength {
                    from: spec.source.clone(),
                    to: spec.target.clone(),
                    strength: spec.strength,
                });
            }
            links.push(Link {
                source,
                target,
                strength: spec.strength,
            });
        }

        debug!(
            skills = skills.len(),
            links = links.len(),
            seed = config.seed,
            "resolved skill graph"
        );

        Ok(GraphModel {
            skills,
            links,
            name_to_index,
            placement_radius: sanitize_placement_radius(config.placement_radius),
        })
    }
}

fn checked_range(
    field: &'static str,
    range: [f32; 2],
    min_ok: impl Fn(f32) -> bool,
) -> Result<[f32; 2], ModelError> {
    let [min, max] = range;
    if min.is_finite() && max.is_finite() && min <= max && min_ok(min) {
        Ok(range)
    } else {
        Err(ModelError::InvalidRange { field, min, max })
    }
}

fn sample(rng: &mut StdRng, [min, max]: [f32; 2]) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

fn sanitize_placement_radius(radius: f32) -> f32 {
    if radius.is_finite() && radius >= 0.0 {
        radius
    } else {
        DEFAULT_PLACEMENT_RADIUS
    }
}

/// Settings used when resolving a [`GraphSpec`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Seed for radius/proficiency sampling
    pub seed: u64,
    /// `[min, max)` for sampled radii
    pub radius_range: [f32; 2],
    /// `[min, max)` for sampled proficiency
    pub proficiency_range: [f32; 2],
    /// Distance of each node from its category anchor
    pub placement_radius: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            radius_range: DEFAULT_RADIUS_RANGE,
            proficiency_range: DEFAULT_PROFICIENCY_RANGE,
            placement_radius: DEFAULT_PLACEMENT_RADIUS,
        }
    }
}

/// A resolved skill (configuration data, never mutated by physics)
#[derive(Debug, Clone, PartialEq)]
pub struct Skill {
    pub name: String,
    pub category: Category,
    pub proficiency: f32,
    pub radius: f32,
    pub description: String,
}

/// A resolved link (indices into the skill list)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    pub strength: f32,
}

impl Link {
    pub fn new(source: usize, target: usize, strength: f32) -> Self {
        Self {
            source,
            target,
            strength,
        }
    }

    /// Whether this link touches the given node index
    pub fn touches(&self, index: usize) -> bool {
        self.source == index || self.target == index
    }
}

/// Validated, immutable skill graph
#[derive(Debug, Clone)]
pub struct GraphModel {
    skills: Vec<Skill>,
    links: Vec<Link>,
    name_to_index: HashMap<String, usize>,
    placement_radius: f32,
}

impl GraphModel {
    /// The portfolio graph resolved with default settings
    pub fn portfolio() -> Self {
        GraphSpec::portfolio()
            .resolve(&ModelConfig::default())
            .unwrap_or_else(|e| unreachable!("built-in portfolio graph is invalid: {e}"))
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn skill(&self, name: &str) -> Option<&Skill> {
        self.index_of(name).map(|i| &self.skills[i])
    }

    /// Source and target names of a link, in display order
    pub fn link_names(&self, link: &Link) -> Option<(&str, &str)> {
        let source = self.skills.get(link.source)?;
        let target = self.skills.get(link.target)?;
        Some((&source.name, &target.name))
    }

    /// Whether a link joins the two named skills (in either direction)
    pub fn are_linked(&self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self
                .links
                .iter()
                .any(|l| (l.source == a && l.target == b) || (l.source == b && l.target == a)),
            _ => false,
        }
    }

    /// Names of the skills linked to `name`
    pub fn neighbors(&self, name: &str) -> Vec<&str> {
        let Some(index) = self.index_of(name) else {
            return Vec::new();
        };
        self.links
            .iter()
            .filter(|l| l.touches(index))
            .map(|l| {
                let other = if l.source == index { l.target } else { l.source };
                self.skills[other].name.as_str()
            })
            .collect()
    }

    /// Place every skill for a viewport of the given size
    ///
    /// Non-positive sizes fall back to the default viewport. Positions are
    /// kept inside the default containment margin.
    pub fn build_initial_layout(&self, width: f32, height: f32) -> LayoutState {
        self.build_initial_layout_within(&Bounds::new(width, height, DEFAULT_MARGIN))
    }

    /// Place every skill within the given bounds, at rest
    pub fn build_initial_layout_within(&self, bounds: &Bounds) -> LayoutState {
        let mut totals: HashMap<Category, usize> = HashMap::new();
        for skill in &self.skills {
            *totals.entry(skill.category).or_default() += 1;
        }

        let (cx, cy) = bounds.center();
        let mut placed: HashMap<Category, usize> = HashMap::new();
        let nodes = self
            .skills
            .iter()
            .map(|skill| {
                let slot = placed.entry(skill.category).or_default();
                let index = *slot;
                *slot += 1;

                let total = totals[&skill.category];
                let angle = TAU * (index as f32) / (total as f32);
                let (ox, oy) = skill.category.anchor_offset();
                let (x, y) = bounds.clamp(
                    cx + ox + self.placement_radius * angle.cos(),
                    cy + oy + self.placement_radius * angle.sin(),
                );

                SkillNode::new(skill.name.clone(), skill.category, x, y, skill.radius)
                    .with_proficiency(skill.proficiency)
                    .with_description(skill.description.clone())
            })
            .collect();

        LayoutState::from_nodes(nodes)
    }
}
