//! Simulation loop controller
//!
//! Drives the [`ForceIntegrator`] once per host frame while the graph is
//! visible and leaves the layout untouched while it is not. The controller
//! knows nothing about how frames are scheduled: the host calls
//! [`SimulationController::on_frame`] (or
//! [`SimulationController::on_frame_elapsed`]) from whatever per-frame
//! callback it has.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Settings;
use crate::forces::{ForceConfig, ForceIntegrator};
use crate::layout::{Bounds, Frame, LayoutState, SkillNode};
use crate::model::GraphModel;

// =============================================================================
// Default Constants
// =============================================================================

/// Default fixed step rate for elapsed-time pacing
pub const DEFAULT_STEP_HZ: f32 = 60.0;

/// Step rates outside this range are clamped into it
pub const STEP_HZ_RANGE: (f32, f32) = (1.0, 1000.0);

/// Default cap on catch-up steps per frame
pub const DEFAULT_MAX_STEPS_PER_FRAME: u32 = 4;

/// Default total speed under which the layout counts as quiet
pub const DEFAULT_SETTLE_THRESHOLD: f32 = 0.05;

/// Default number of consecutive quiet steps before the layout is settled
pub const DEFAULT_SETTLE_FRAMES: u32 = 30;

/// Lifecycle of one simulation instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// No layout yet (or torn down)
    Idle,
    /// Nodes placed, never stepped
    Initialized,
    /// Stepped on every frame
    Running,
    /// Layout frozen until resumed
    Paused,
}

/// Frame pacing and settle detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    /// Fixed steps per second when pacing by elapsed time
    pub step_hz: f32,
    /// Most steps one frame may run to catch up
    pub max_steps_per_frame: u32,
    /// Total speed under which a step counts as quiet
    pub settle_threshold: f32,
    /// Consecutive quiet steps before the layout is settled
    pub settle_frames: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            step_hz: DEFAULT_STEP_HZ,
            max_steps_per_frame: DEFAULT_MAX_STEPS_PER_FRAME,
            settle_threshold: DEFAULT_SETTLE_THRESHOLD,
            settle_frames: DEFAULT_SETTLE_FRAMES,
        }
    }
}

impl FrameConfig {
    /// Duration of one fixed step
    ///
    /// Non-finite or non-positive rates use the default; others are clamped
    /// into [`STEP_HZ_RANGE`].
    pub fn step_interval(&self) -> Duration {
        let hz = if self.step_hz.is_finite() && self.step_hz > 0.0 {
            self.step_hz.clamp(STEP_HZ_RANGE.0, STEP_HZ_RANGE.1)
        } else {
            DEFAULT_STEP_HZ
        };
        Duration::from_secs_f64(1.0 / f64::from(hz))
    }
}

/// Owns the layout of one graph and steps it while running
#[derive(Debug)]
pub struct SimulationController {
    model: GraphModel,
    integrator: ForceIntegrator,
    frame_config: FrameConfig,
    bounds: Bounds,
    layout: Option<LayoutState>,
    state: LoopState,
    steps: u64,
    backlog: Duration,
    quiet_steps: u32,
}

impl SimulationController {
    pub fn new(model: GraphModel, forces: ForceConfig, frame_config: FrameConfig) -> Self {
        let integrator = ForceIntegrator::new(forces);
        let margin = integrator.config().margin;
        Self {
            model,
            integrator,
            frame_config,
            bounds: Bounds::new(0.0, 0.0, margin),
            layout: None,
            state: LoopState::Idle,
            steps: 0,
            backlog: Duration::ZERO,
            quiet_steps: 0,
        }
    }

    /// Build a controller from loaded settings
    pub fn from_settings(model: GraphModel, settings: &Settings) -> Self {
        Self::new(model, settings.forces, settings.frame)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Steps taken since the layout was built
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Place the nodes for a viewport and wait for activation
    ///
    /// Calling this again rebuilds the layout from scratch and stops stepping.
    pub fn initialize(&mut self, width: f32, height: f32) {
        self.bounds = Bounds::new(width, height, self.integrator.config().margin);
        let layout = self.model.build_initial_layout_within(&self.bounds);
        info!(
            nodes = layout.len(),
            links = self.model.links().len(),
            width = self.bounds.width(),
            height = self.bounds.height(),
            "skill graph layout initialized"
        );
        self.layout = Some(layout);
        self.state = LoopState::Initialized;
        self.steps = 0;
        self.backlog = Duration::ZERO;
        self.quiet_steps = 0;
    }

    /// Begin stepping on every frame
    ///
    /// Returns whether the controller is running afterwards. Starting while
    /// running is a no-op; starting before initialization does nothing.
    pub fn start(&mut self) -> bool {
        match self.state {
            LoopState::Initialized | LoopState::Paused => {
                debug!(from = ?self.state, "simulation started");
                self.state = LoopState::Running;
                true
            }
            LoopState::Running => true,
            LoopState::Idle => {
                debug!("start ignored: layout not initialized");
                false
            }
        }
    }

    /// Stop stepping; the layout stays as the last completed step left it
    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            debug!(steps = self.steps, "simulation paused");
            self.state = LoopState::Paused;
            self.backlog = Duration::ZERO;
        }
    }

    /// Apply the host visibility signal
    pub fn set_active(&mut self, active: bool) {
        if active {
            self.start();
        } else {
            self.stop();
        }
    }

    /// Track a new viewport size without moving any node
    ///
    /// Nodes outside the new bounds are pulled back in by the next step.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.bounds = Bounds::new(width, height, self.integrator.config().margin);
        debug!(
            width = self.bounds.width(),
            height = self.bounds.height(),
            "containment bounds resized"
        );
    }

    /// Discard the layout and return to idle
    pub fn teardown(&mut self) {
        self.layout = None;
        self.state = LoopState::Idle;
        self.steps = 0;
        self.backlog = Duration::ZERO;
        self.quiet_steps = 0;
        debug!("simulation torn down");
    }

    /// Frame callback: one step if running
    ///
    /// Returns whether a step was taken.
    pub fn on_frame(&mut self) -> bool {
        if self.state != LoopState::Running {
            return false;
        }
        let Some(layout) = self.layout.as_mut() else {
            return false;
        };

        self.integrator
            .step(layout, self.model.links(), &self.bounds);
        self.steps += 1;

        if layout.total_speed() < self.frame_config.settle_threshold {
            self.quiet_steps = self.quiet_steps.saturating_add(1);
        } else {
            self.quiet_steps = 0;
        }
        true
    }

    /// Frame callback with the time since the previous frame
    ///
    /// Runs as many fixed-interval steps as the elapsed time covers, at most
    /// `max_steps_per_frame`; backlog beyond the cap is dropped so a long
    /// stall does not fast-forward the layout. Returns the steps taken.
    pub fn on_frame_elapsed(&mut self, elapsed: Duration) -> u32 {
        if self.state != LoopState::Running {
            return 0;
        }

        let interval = self.frame_config.step_interval();
        let cap = self.frame_config.max_steps_per_frame.max(1);
        self.backlog = self.backlog.saturating_add(elapsed);

        let mut taken = 0;
        while self.backlog >= interval && taken < cap {
            self.backlog -= interval;
            if !self.on_frame() {
                break;
            }
            taken += 1;
        }

        if self.backlog >= interval {
            debug!(
                dropped_ms = self.backlog.as_millis() as u64,
                "frame backlog dropped"
            );
            self.backlog = Duration::ZERO;
        }
        taken
    }

    /// Whether the layout has been quiet for `settle_frames` steps
    pub fn is_settled(&self) -> bool {
        self.layout.is_some() && self.quiet_steps >= self.frame_config.settle_frames
    }

    pub fn layout(&self) -> Option<&LayoutState> {
        self.layout.as_ref()
    }

    /// Current nodes, or none before initialization
    pub fn nodes(&self) -> &[SkillNode] {
        self.layout.as_ref().map(LayoutState::nodes).unwrap_or(&[])
    }

    /// Copy of the current layout for a renderer
    ///
    /// Empty before initialization.
    pub fn frame(&self) -> Frame {
        self.layout
            .as_ref()
            .map(|layout| Frame::capture(layout, &self.model))
            .unwrap_or_default()
    }
}

/// Controller handle shared between host callbacks
///
/// Frame, resize and visibility callbacks each hold a clone. A frame that
/// arrives while another callback still holds the controller is skipped, so
/// at most one step is ever in flight.
#[derive(Debug, Clone)]
pub struct SharedSimulation {
    inner: Rc<RefCell<SimulationController>>,
}

impl SharedSimulation {
    pub fn new(controller: SimulationController) -> Self {
        Self {
            inner: Rc::new(RefCell::new(controller)),
        }
    }

    /// Frame callback; false when no step ran (not running or busy)
    pub fn frame(&self) -> bool {
        match self.inner.try_borrow_mut() {
            Ok(mut controller) => controller.on_frame(),
            Err(_) => {
                debug!("frame skipped: controller busy");
                false
            }
        }
    }

    /// Elapsed-time frame callback; busy frames take no steps
    pub fn frame_elapsed(&self, elapsed: Duration) -> u32 {
        match self.inner.try_borrow_mut() {
            Ok(mut controller) => controller.on_frame_elapsed(elapsed),
            Err(_) => {
                debug!("frame skipped: controller busy");
                0
            }
        }
    }

    /// Read the controller, unless it is being mutated
    pub fn with<R>(&self, f: impl FnOnce(&SimulationController) -> R) -> Option<R> {
        self.inner.try_borrow().ok().map(|controller| f(&controller))
    }

    /// Mutate the controller, unless it is already borrowed
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut SimulationController) -> R) -> Option<R> {
        self.inner
            .try_borrow_mut()
            .ok()
            .map(|mut controller| f(&mut controller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, GraphSpec, LinkSpec, ModelConfig, SkillSpec};

    fn controller() -> SimulationController {
        SimulationController::new(
            GraphModel::portfolio(),
            ForceConfig::default(),
            FrameConfig::default(),
        )
    }

    fn positions(controller: &SimulationController) -> Vec<(f32, f32)> {
        controller.nodes().iter().map(|n| (n.x, n.y)).collect()
    }

    #[test]
    fn starts_idle_with_no_nodes() {
        let controller = controller();

        assert_eq!(controller.state(), LoopState::Idle);
        assert!(controller.nodes().is_empty());
        assert_eq!(controller.frame(), Frame::default());
        assert!(!controller.is_settled());
    }

    #[test]
    fn start_before_initialize_is_ignored() {
        let mut controller = controller();

        assert!(!controller.start());
        assert_eq!(controller.state(), LoopState::Idle);
        assert!(!controller.on_frame());
    }

    #[test]
    fn lifecycle_transitions() {
        let mut controller = controller();
        controller.initialize(800.0, 600.0);
        assert_eq!(controller.state(), LoopState::Initialized);

        assert!(controller.start());
        assert_eq!(controller.state(), LoopState::Running);
        assert!(controller.start(), "re-entrant start is a no-op");
        assert_eq!(controller.state(), LoopState::Running);

        controller.stop();
        assert_eq!(controller.state(), LoopState::Paused);
        controller.set_active(true);
        assert_eq!(controller.state(), LoopState::Running);
        controller.set_active(false);
        assert_eq!(controller.state(), LoopState::Paused);

        controller.teardown();
        assert_eq!(controller.state(), LoopState::Idle);
        assert!(controller.nodes().is_empty());
    }

    #[test]
    fn initialized_layout_does_not_step_until_started() {
        let mut controller = controller();
        controller.initialize(800.0, 600.0);
        let before = positions(&controller);

        assert!(!controller.on_frame());
        assert_eq!(positions(&controller), before);
        assert_eq!(controller.steps(), 0);
    }

    #[test]
    fn stop_freezes_layout_until_restarted() {
        let mut controller = controller();
        controller.initialize(800.0, 600.0);
        controller.start();
        for _ in 0..10 {
            controller.on_frame();
        }

        controller.stop();
        let frozen = positions(&controller);
        for _ in 0..10 {
            assert!(!controller.on_frame());
        }
        assert_eq!(positions(&controller), frozen);
        assert_eq!(controller.steps(), 10);

        controller.start();
        assert!(controller.on_frame());
        assert_ne!(positions(&controller), frozen);
    }

    #[test]
    fn resize_keeps_positions() {
        let mut controller = controller();
        controller.initialize(800.0, 600.0);
        let before = positions(&controller);

        controller.resize(1200.0, 900.0);

        assert_eq!(positions(&controller), before);
        assert_eq!(controller.bounds().width(), 1200.0);
        assert_eq!(controller.state(), LoopState::Initialized);
    }

    #[test]
    fn shrinking_viewport_contains_nodes_on_next_step() {
        let mut controller = controller();
        controller.initialize(1200.0, 900.0);
        controller.start();
        controller.resize(400.0, 300.0);
        controller.on_frame();

        let bounds = *controller.bounds();
        assert!(controller.nodes().iter().all(|n| bounds.contains(n.x, n.y)));
    }

    fn paced_controller() -> (SimulationController, Duration) {
        // 50 Hz keeps the interval a whole number of nanoseconds
        let frame_config = FrameConfig {
            step_hz: 50.0,
            ..FrameConfig::default()
        };
        let mut controller =
            SimulationController::new(GraphModel::portfolio(), ForceConfig::default(), frame_config);
        controller.initialize(800.0, 600.0);
        controller.start();
        (controller, frame_config.step_interval())
    }

    #[test]
    fn elapsed_pacing_runs_fixed_steps() {
        let (mut controller, interval) = paced_controller();
        assert_eq!(interval, Duration::from_millis(20));

        assert_eq!(controller.on_frame_elapsed(interval * 2), 2);
        assert_eq!(controller.on_frame_elapsed(interval / 2), 0);
        assert_eq!(controller.on_frame_elapsed(interval / 2), 1);
        assert_eq!(controller.steps(), 3);
    }

    #[test]
    fn elapsed_pacing_caps_and_drops_backlog() {
        let (mut controller, interval) = paced_controller();

        let taken = controller.on_frame_elapsed(Duration::from_secs(5));
        assert_eq!(taken, DEFAULT_MAX_STEPS_PER_FRAME);
        assert_eq!(controller.on_frame_elapsed(interval / 2), 0);
    }

    #[test]
    fn extreme_step_rates_are_clamped() {
        let interval = |step_hz| {
            FrameConfig {
                step_hz,
                ..FrameConfig::default()
            }
            .step_interval()
        };

        assert_eq!(interval(1e-30), Duration::from_secs(1));
        assert_eq!(interval(1e9), Duration::from_millis(1));
        assert_eq!(interval(0.0), interval(DEFAULT_STEP_HZ));
        assert_eq!(interval(f32::NAN), interval(DEFAULT_STEP_HZ));
    }

    #[test]
    fn tiny_step_rate_paces_without_panicking() {
        let frame_config = FrameConfig {
            step_hz: 1e-30,
            ..FrameConfig::default()
        };
        let mut controller =
            SimulationController::new(GraphModel::portfolio(), ForceConfig::default(), frame_config);
        controller.initialize(800.0, 600.0);
        controller.start();

        assert_eq!(controller.on_frame_elapsed(Duration::from_millis(16)), 0);
        assert_eq!(controller.on_frame_elapsed(Duration::from_secs(1)), 1);
    }

    #[test]
    fn huge_elapsed_time_saturates_backlog() {
        let (mut controller, _) = paced_controller();

        assert_eq!(
            controller.on_frame_elapsed(Duration::MAX),
            DEFAULT_MAX_STEPS_PER_FRAME
        );
        assert_eq!(
            controller.on_frame_elapsed(Duration::MAX),
            DEFAULT_MAX_STEPS_PER_FRAME
        );
    }

    #[test]
    fn elapsed_time_ignored_while_paused() {
        let mut controller = controller();
        controller.initialize(800.0, 600.0);

        assert_eq!(controller.on_frame_elapsed(Duration::from_secs(1)), 0);
        controller.start();
        assert_eq!(controller.on_frame_elapsed(Duration::ZERO), 0);
    }

    #[test]
    fn lone_skill_settles() {
        let model = GraphSpec {
            skills: vec![SkillSpec::new("solo", Category::Tools)],
            links: vec![],
        }
        .resolve(&ModelConfig::default())
        .unwrap();
        let mut controller =
            SimulationController::new(model, ForceConfig::default(), FrameConfig::default());
        controller.initialize(800.0, 600.0);
        controller.start();

        for _ in 0..3000 {
            controller.on_frame();
        }
        assert!(controller.is_settled());
    }

    #[test]
    fn frame_carries_link_names() {
        let model = GraphSpec {
            skills: vec![
                SkillSpec::new("a", Category::Frontend),
                SkillSpec::new("b", Category::Backend),
            ],
            links: vec![LinkSpec::new("b", "a", 0.5)],
        }
        .resolve(&ModelConfig::default())
        .unwrap();
        let mut controller =
            SimulationController::new(model, ForceConfig::default(), FrameConfig::default());
        controller.initialize(800.0, 600.0);

        let frame = controller.frame();
        assert_eq!(frame.nodes.len(), 2);
        assert_eq!(frame.links[0].source, "b");
        assert_eq!(frame.links[0].target, "a");
    }

    #[test]
    fn shared_handle_skips_reentrant_frames() {
        let shared = SharedSimulation::new(controller());
        shared.with_mut(|c| {
            c.initialize(800.0, 600.0);
            c.start();
        });

        assert!(shared.frame());
        let nested = shared.with_mut(|_| shared.frame());
        assert_eq!(nested, Some(false));
        assert_eq!(shared.with(|c| c.steps()), Some(1));
    }
}
