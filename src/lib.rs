//! skillgraph - Force-directed layout engine for interactive skill network graphs.
//!
//! A [`GraphModel`] describes skills and the weighted links between them. A
//! [`SimulationController`] places the nodes, then advances the layout with
//! the [`ForceIntegrator`] once per host frame while the graph is visible.
//! Hover and filter state lives in [`InteractionState`] and never feeds back
//! into the physics.

pub mod config;
pub mod controller;
pub mod forces;
pub mod interaction;
pub mod io;
pub mod layout;
pub mod model;

pub use config::{Settings, Viewport};
pub use controller::{FrameConfig, LoopState, SharedSimulation, SimulationController};
pub use forces::{ForceConfig, ForceIntegrator, StepStats};
pub use interaction::{InteractionState, LinkEmphasis, NodeEmphasis, hit_test};
pub use io::{FormatRegistry, IoError, IoResult};
pub use layout::{Bounds, Frame, LayoutState, LinkView, NodeView, SkillNode};
pub use model::{Category, GraphModel, GraphSpec, LinkSpec, ModelConfig, ModelError, SkillSpec};
