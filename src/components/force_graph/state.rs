//! Engine instance: graph, layout and interaction state behind one owner.
//!
//! The engine holds the full graph and its simulation, an optional filtered
//! view with its own simulation, the pan/zoom transform, and the
//! hover/selection state machine:
//!
//! ```text
//! idle --enter(n)--> hovering(n) --leave--> idle
//! idle|hovering --click(n)--> selected(n) --click(n)--> idle
//! selected(m) --click(n)--> selected(n)
//! selected(n) --click background--> idle
//! ```
//!
//! Host-facing notifications are queued as [`EngineEvent`]s and drained by the
//! host after each call.

use std::collections::{HashMap, HashSet};

use super::config::EngineConfig;
use super::model::{Graph, NodeFilter, assign_radii, build, compute_degrees, filter};
use super::scale::{ScaleConfig, ScaledValues};
use super::simulation::{Layout, Simulation};
use super::theme::Theme;
use super::types::RawRecord;
use super::view_model::{RenderModel, compute_render_state, display_radius};

/// Pointer travel (screen pixels) beyond which a press becomes a drag or pan.
const CLICK_SLOP: f64 = 3.0;

/// Pan and zoom transform: `screen = graph * k + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal translation in screen pixels.
	pub x: f64,
	/// Vertical translation in screen pixels.
	pub y: f64,
	/// Scale factor.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	/// Graph coordinates to screen coordinates.
	pub fn apply(&self, gx: f64, gy: f64) -> (f64, f64) {
		(gx * self.k + self.x, gy * self.k + self.y)
	}

	/// Screen coordinates to graph coordinates.
	pub fn invert(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	fn lerp(self, to: ViewTransform, t: f64) -> Self {
		Self {
			x: self.x + (to.x - self.x) * t,
			y: self.y + (to.y - self.y) * t,
			k: self.k + (to.k - self.k) * t,
		}
	}
}

/// Hover/selection state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Interaction {
	/// Nothing is focused.
	#[default]
	Idle,
	/// The pointer rests on this node.
	Hovering(String),
	/// This node was clicked and stays focused.
	Selected(String),
}

impl Interaction {
	/// Id of the node whose neighborhood is highlighted, if any.
	pub fn focus_id(&self) -> Option<&str> {
		match self {
			Interaction::Idle => None,
			Interaction::Hovering(id) | Interaction::Selected(id) => Some(id),
		}
	}
}

/// Notifications for the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
	/// A node was clicked.
	NodeClick(String),
	/// The pointer entered a node (`Some`) or left all nodes (`None`).
	NodeHover(Option<String>),
	/// The active filter changed; carries its label.
	FilterChange(Option<String>),
}

/// In-progress node drag.
#[derive(Clone, Debug, Default)]
struct DragState {
	active: bool,
	node_idx: Option<usize>,
	start_x: f64,
	start_y: f64,
	node_start_x: f64,
	node_start_y: f64,
	moved: bool,
}

/// In-progress background pan.
#[derive(Clone, Debug, Default)]
struct PanState {
	active: bool,
	start_x: f64,
	start_y: f64,
	transform_start_x: f64,
	transform_start_y: f64,
	moved: bool,
}

#[derive(Clone, Copy, Debug)]
struct ZoomAnimation {
	from: ViewTransform,
	to: ViewTransform,
	elapsed: f64,
	duration: f64,
}

fn ease_cubic_in_out(t: f64) -> f64 {
	let t = t.clamp(0.0, 1.0) * 2.0;
	if t <= 1.0 {
		t * t * t / 2.0
	} else {
		let t = t - 2.0;
		(t * t * t + 2.0) / 2.0
	}
}

/// Minimum time (seconds) a highlight is held before it starts fading out.
const MIN_HOLD_TIME: f64 = 0.12;

/// Smoothed highlight intensities.
///
/// Each node has its own intensity in [0, 1] that eases towards 1 while the
/// node is in the target set (focus plus neighbors) and back to 0 once it
/// leaves it, after [`MIN_HOLD_TIME`].
#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	focus: Option<usize>,
	target_set: HashSet<usize>,
	node_intensity: HashMap<usize, f64>,
	focus_intensity: HashMap<usize, f64>,
	hold_timer: HashMap<usize, f64>,
	cached_max: f64,
}

impl HighlightState {
	/// Retarget on `focus` and its `neighbors`.
	pub fn set_target(&mut self, focus: Option<usize>, neighbors: &HashSet<usize>) {
		self.focus = focus;
		self.target_set.clear();
		if let Some(idx) = focus {
			self.target_set.insert(idx);
			self.target_set.extend(neighbors.iter().copied());
			for &idx in &self.target_set {
				self.hold_timer.insert(idx, MIN_HOLD_TIME);
			}
		}
	}

	/// Ease intensities towards their targets with exponential smoothing.
	pub fn tick(&mut self, dt: f64) {
		const FADE_IN_SPEED: f64 = 6.0;
		const FADE_OUT_SPEED: f64 = 4.0;

		let fade_in_factor = 1.0 - (-FADE_IN_SPEED * dt).exp();
		let fade_out_decay = (-FADE_OUT_SPEED * dt).exp();

		for &idx in &self.target_set {
			let intensity = self.node_intensity.entry(idx).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in_factor;
		}
		if let Some(idx) = self.focus {
			let intensity = self.focus_intensity.entry(idx).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in_factor;
		}

		let target_set = &self.target_set;
		self.hold_timer.retain(|idx, timer| {
			if target_set.contains(idx) {
				true
			} else {
				*timer -= dt;
				*timer > 0.0
			}
		});

		let hold_timer = &self.hold_timer;
		let mut new_max: f64 = 0.0;
		self.node_intensity.retain(|idx, intensity| {
			if !target_set.contains(idx) && hold_timer.get(idx).copied().unwrap_or(0.0) <= 0.0 {
				*intensity *= fade_out_decay;
			}
			new_max = new_max.max(*intensity);
			target_set.contains(idx) || *intensity > 0.005
		});

		let focus = self.focus;
		self.focus_intensity.retain(|idx, intensity| {
			if focus == Some(*idx) {
				return true;
			}
			if hold_timer.get(idx).copied().unwrap_or(0.0) <= 0.0 {
				*intensity *= fade_out_decay;
			}
			*intensity > 0.005
		});

		self.cached_max = new_max;
	}

	/// Jump straight to the target intensities.
	pub fn snap(&mut self) {
		self.node_intensity = self.target_set.iter().map(|&i| (i, 1.0)).collect();
		self.focus_intensity = self.focus.iter().map(|&i| (i, 1.0)).collect();
		self.hold_timer.clear();
		self.cached_max = if self.target_set.is_empty() { 0.0 } else { 1.0 };
	}

	/// Forget everything, e.g. after node indices changed.
	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Highlight intensity of node `idx`.
	pub fn node_intensity(&self, idx: usize) -> f64 {
		self.node_intensity.get(&idx).copied().unwrap_or(0.0)
	}

	/// Intensity of the focus emphasis on `idx` (only the focused node has one).
	pub fn focus_intensity(&self, idx: usize) -> f64 {
		self.focus_intensity.get(&idx).copied().unwrap_or(0.0)
	}

	/// How strongly everything outside the highlight set should be dimmed.
	pub fn max_intensity(&self) -> f64 {
		self.cached_max
	}

	/// Whether any intensity is still easing.
	pub fn is_animating(&self) -> bool {
		let settled = |map: &HashMap<usize, f64>, target: &dyn Fn(usize) -> bool| {
			map.iter().all(|(&i, &v)| target(i) && v > 0.995)
		};
		let in_set = |i: usize| self.target_set.contains(&i);
		let is_focus = |i: usize| self.focus == Some(i);
		!(settled(&self.node_intensity, &in_set)
			&& settled(&self.focus_intensity, &is_focus)
			&& self.node_intensity.len() == self.target_set.len())
	}
}

/// Everything the renderer needs to know about interaction, by value.
#[derive(Clone, Debug, Default)]
pub struct InteractionState {
	/// Hover/selection mode.
	pub mode: Interaction,
	/// Index (in the active graph) of the focused node.
	pub focus: Option<usize>,
	/// Neighbors of `focus`, recomputed on every state entry.
	pub neighbors: HashSet<usize>,
	/// Current search text, as typed.
	pub search_term: String,
	/// Indices of search matches, in node order.
	pub search_matches: Vec<usize>,
	/// Pan and zoom.
	pub transform: ViewTransform,
	/// Smoothed highlight intensities.
	pub highlight: HighlightState,
	/// Hovered node id, tracked separately so selection can persist under it.
	pub hovered: Option<String>,
	/// Viewport width in pixels.
	pub width: f64,
	/// Viewport height in pixels.
	pub height: f64,
}

struct FilteredView {
	filter: NodeFilter,
	graph: Graph,
	simulation: Simulation,
	full_was_running: bool,
}

/// A single graph visualization: model, solver and controller.
pub struct GraphEngine {
	config: EngineConfig,
	scale: ScaleConfig,
	graph: Graph,
	simulation: Simulation,
	filtered: Option<FilteredView>,
	interaction: InteractionState,
	drag: DragState,
	pan: PanState,
	zoom_animation: Option<ZoomAnimation>,
	events: Vec<EngineEvent>,
}

impl GraphEngine {
	/// Build the graph from `records`, seed the solver and, when
	/// `settle_ticks > 0`, settle it before returning.
	pub fn new(records: &[RawRecord], config: EngineConfig) -> Self {
		let config = config.sanitized();
		let graph = assign_radii(compute_degrees(build(records)), config.min_radius, config.max_radius);
		let mut simulation = Simulation::new(&graph, &config, None);
		if config.settle_ticks > 0 {
			simulation.settle(config.settle_ticks);
		}

		let k = config.initial_zoom.clamp(config.zoom_min, config.zoom_max);
		let transform = ViewTransform {
			x: config.width / 2.0 * (1.0 - k),
			y: config.height / 2.0 * (1.0 - k),
			k,
		};

		Self {
			interaction: InteractionState {
				transform,
				width: config.width,
				height: config.height,
				..InteractionState::default()
			},
			scale: ScaleConfig::default(),
			graph,
			simulation,
			filtered: None,
			drag: DragState::default(),
			pan: PanState::default(),
			zoom_animation: None,
			events: Vec::new(),
			config,
		}
	}

	/// Replace the zoom-dependent scale behavior.
	pub fn with_scale(mut self, scale: ScaleConfig) -> Self {
		self.scale = scale;
		self
	}

	/// Sanitized configuration in effect.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Zoom-dependent scale behavior.
	pub fn scale_config(&self) -> &ScaleConfig {
		&self.scale
	}

	/// The unfiltered graph.
	pub fn full_graph(&self) -> &Graph {
		&self.graph
	}

	/// The graph currently shown: the filtered view if one is active.
	pub fn graph(&self) -> &Graph {
		self.filtered.as_ref().map_or(&self.graph, |f| &f.graph)
	}

	/// Layout of [`Self::graph`].
	pub fn layout(&self) -> &Layout {
		self.active_simulation().layout()
	}

	/// Simulation of [`Self::graph`].
	pub fn simulation(&self) -> &Simulation {
		self.active_simulation()
	}

	/// Interaction state as seen by the renderer.
	pub fn interaction(&self) -> &InteractionState {
		&self.interaction
	}

	/// Current hover/selection mode.
	pub fn mode(&self) -> &Interaction {
		&self.interaction.mode
	}

	/// Current pan and zoom.
	pub fn transform(&self) -> ViewTransform {
		self.interaction.transform
	}

	/// Filter of the current view, if any.
	pub fn active_filter(&self) -> Option<&NodeFilter> {
		self.filtered.as_ref().map(|f| &f.filter)
	}

	/// Take all queued host notifications.
	pub fn drain_events(&mut self) -> Vec<EngineEvent> {
		std::mem::take(&mut self.events)
	}

	/// Render model of the current frame.
	pub fn render_state(&self, theme: &Theme) -> RenderModel {
		compute_render_state(self.graph(), self.layout(), &self.interaction, theme, &self.scale)
	}

	fn active_simulation(&self) -> &Simulation {
		self.filtered.as_ref().map_or(&self.simulation, |f| &f.simulation)
	}

	fn active_simulation_mut(&mut self) -> &mut Simulation {
		match self.filtered.as_mut() {
			Some(f) => &mut f.simulation,
			None => &mut self.simulation,
		}
	}

	// --- frame loop ---------------------------------------------------------

	/// Advance one frame: a solver tick if live, highlight fades, and any zoom
	/// animation. Returns whether another frame is needed.
	pub fn tick(&mut self, dt: f64) -> bool {
		self.active_simulation_mut().step();
		self.interaction.highlight.tick(dt);

		if let Some(mut anim) = self.zoom_animation.take() {
			anim.elapsed += dt;
			if anim.elapsed >= anim.duration {
				self.interaction.transform = anim.to;
			} else {
				let t = ease_cubic_in_out(anim.elapsed / anim.duration);
				self.interaction.transform = anim.from.lerp(anim.to, t);
				self.zoom_animation = Some(anim);
			}
		}
		self.is_animating()
	}

	/// Whether another frame would change anything.
	pub fn is_animating(&self) -> bool {
		self.active_simulation().is_running()
			|| self.zoom_animation.is_some()
			|| self.interaction.highlight.is_animating()
	}

	/// Complete highlight fades and zoom animations immediately.
	pub fn finish_transitions(&mut self) {
		self.interaction.highlight.snap();
		if let Some(anim) = self.zoom_animation.take() {
			self.interaction.transform = anim.to;
		}
	}

	/// Stop every running loop; used on teardown.
	pub fn stop(&mut self) {
		self.simulation.stop();
		if let Some(f) = self.filtered.as_mut() {
			f.simulation.stop();
		}
		self.zoom_animation = None;
		self.drag = DragState::default();
		self.pan = PanState::default();
		log::debug!("term-graph: engine stopped");
	}

	/// Adapt to a new viewport size; non-positive sizes are ignored.
	pub fn resize(&mut self, width: f64, height: f64) {
		if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
			return;
		}
		self.interaction.width = width;
		self.interaction.height = height;
		self.config.width = width;
		self.config.height = height;
		self.simulation.resize(width, height);
		if let Some(f) = self.filtered.as_mut() {
			f.simulation.resize(width, height);
		}
	}

	// --- viewport -----------------------------------------------------------

	/// Convert a screen point to graph space.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		self.interaction.transform.invert(sx, sy)
	}

	/// Convert a graph point to screen space.
	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		self.interaction.transform.apply(gx, gy)
	}

	fn clamp_scale(&self, k: f64) -> f64 {
		if k.is_nan() {
			return self.interaction.transform.k;
		}
		k.clamp(self.config.zoom_min, self.config.zoom_max)
	}

	/// Apply a transform, clamping its scale to `[zoom_min, zoom_max]`.
	pub fn set_zoom(&mut self, transform: ViewTransform) {
		self.zoom_animation = None;
		let current = self.interaction.transform;
		self.interaction.transform = ViewTransform {
			x: if transform.x.is_finite() { transform.x } else { current.x },
			y: if transform.y.is_finite() { transform.y } else { current.y },
			k: self.clamp_scale(transform.k),
		};
	}

	/// Scale by `factor` around screen point `(sx, sy)`, which stays put.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let t = self.interaction.transform;
		let k = self.clamp_scale(t.k * factor);
		let ratio = k / t.k;
		self.set_zoom(ViewTransform {
			x: sx - (sx - t.x) * ratio,
			y: sy - (sy - t.y) * ratio,
			k,
		});
	}

	/// Wheel zoom: one notch in or out around the cursor.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.zoom_at(sx, sy, factor);
	}

	/// Animate the viewport so node `id` sits in the center at scale `k`.
	/// Returns false if the node is not in the active graph.
	pub fn zoom_to_node(&mut self, id: &str, k: f64) -> bool {
		let Some(idx) = self.graph().index_of(id) else {
			return false;
		};
		let Some((gx, gy)) = self.layout().position(idx) else {
			return false;
		};
		let k = self.clamp_scale(k);
		let to = ViewTransform {
			x: self.interaction.width / 2.0 - gx * k,
			y: self.interaction.height / 2.0 - gy * k,
			k,
		};
		if self.config.zoom_duration > 0.0 {
			self.zoom_animation = Some(ZoomAnimation {
				from: self.interaction.transform,
				to,
				elapsed: 0.0,
				duration: self.config.zoom_duration,
			});
		} else {
			self.set_zoom(to);
		}
		true
	}

	/// Topmost node under screen point `(sx, sy)`: the nearest one whose hit
	/// area contains the point.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let scaled = ScaledValues::new(&self.scale, self.interaction.transform.k);
		let matches: HashSet<usize> = self.interaction.search_matches.iter().copied().collect();
		let mut best: Option<(usize, f64)> = None;
		for (idx, (node, body)) in self.graph().nodes().iter().zip(self.layout().bodies()).enumerate() {
			let radius = display_radius(node, matches.contains(&idx), &self.scale);
			let hit = scaled.hit_radius(&self.scale, radius);
			let dist = ((body.x - gx).powi(2) + (body.y - gy).powi(2)).sqrt();
			if dist < hit && best.is_none_or(|(_, d)| dist < d) {
				best = Some((idx, dist));
			}
		}
		best.map(|(idx, _)| idx)
	}

	// --- state machine ------------------------------------------------------

	/// Pointer entered node `id` (`Some`) or left all nodes (`None`).
	pub fn hover(&mut self, id: Option<&str>) {
		let id = id.filter(|id| self.graph().index_of(id).is_some());
		if self.interaction.hovered.as_deref() == id {
			return;
		}
		self.interaction.hovered = id.map(str::to_string);
		self.events.push(EngineEvent::NodeHover(self.interaction.hovered.clone()));

		if matches!(self.interaction.mode, Interaction::Selected(_)) {
			return;
		}
		self.interaction.mode = match id {
			Some(id) => Interaction::Hovering(id.to_string()),
			None => Interaction::Idle,
		};
		self.refresh_focus();
	}

	/// Click on node `id`: select it, or deselect if already selected.
	pub fn click_node(&mut self, id: &str) {
		if self.graph().index_of(id).is_none() {
			return;
		}
		self.events.push(EngineEvent::NodeClick(id.to_string()));
		self.interaction.mode = match &self.interaction.mode {
			Interaction::Selected(current) if current == id => match &self.interaction.hovered {
				Some(hovered) => Interaction::Hovering(hovered.clone()),
				None => Interaction::Idle,
			},
			_ => Interaction::Selected(id.to_string()),
		};
		self.refresh_focus();
	}

	/// Click on empty canvas.
	pub fn click_background(&mut self) {
		if self.interaction.mode != Interaction::Idle {
			self.interaction.mode = Interaction::Idle;
			self.refresh_focus();
		}
	}

	/// Recompute the focus index and its neighbor set from the current mode.
	fn refresh_focus(&mut self) {
		let focus = self.interaction.mode.focus_id().and_then(|id| self.graph().index_of(id));
		if focus.is_none() && self.interaction.mode != Interaction::Idle {
			self.interaction.mode = Interaction::Idle;
		}
		let neighbors = focus.map(|idx| self.graph().neighbors(idx)).unwrap_or_default();
		self.interaction.focus = focus;
		self.interaction.highlight.set_target(focus, &neighbors);
		self.interaction.neighbors = neighbors;
	}

	// --- pointer gestures ---------------------------------------------------

	/// Press at screen point `(sx, sy)`: starts a node drag or a pan.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		if let Some(idx) = self.node_at(sx, sy) {
			let (x, y) = self.layout().position(idx).unwrap_or_default();
			self.drag = DragState {
				active: true,
				node_idx: Some(idx),
				start_x: sx,
				start_y: sy,
				node_start_x: x,
				node_start_y: y,
				moved: false,
			};
		} else {
			let t = self.interaction.transform;
			self.pan = PanState {
				active: true,
				start_x: sx,
				start_y: sy,
				transform_start_x: t.x,
				transform_start_y: t.y,
				moved: false,
			};
		}
	}

	/// Pointer moved: drags, pans or updates hover.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if self.drag.active {
			let Some(idx) = self.drag.node_idx else {
				return;
			};
			let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
			if !self.drag.moved && dx.hypot(dy) > CLICK_SLOP {
				self.drag.moved = true;
				let target = self.config.drag_alpha_target;
				self.active_simulation_mut().set_alpha_target(target);
			}
			if self.drag.moved {
				let k = self.interaction.transform.k;
				let (nx, ny) = (self.drag.node_start_x + dx / k, self.drag.node_start_y + dy / k);
				self.active_simulation_mut().pin(idx, nx, ny);
			}
		} else if self.pan.active {
			let (dx, dy) = (sx - self.pan.start_x, sy - self.pan.start_y);
			if !self.pan.moved && dx.hypot(dy) > CLICK_SLOP {
				self.pan.moved = true;
			}
			if self.pan.moved {
				self.zoom_animation = None;
				self.interaction.transform.x = self.pan.transform_start_x + dx;
				self.interaction.transform.y = self.pan.transform_start_y + dy;
			}
		} else {
			let hovered = self.node_at(sx, sy).map(|idx| self.graph().nodes()[idx].id.clone());
			self.hover(hovered.as_deref());
		}
	}

	/// Release: a press that did not travel is a click.
	pub fn pointer_up(&mut self, _sx: f64, _sy: f64) {
		let drag = std::mem::take(&mut self.drag);
		let pan = std::mem::take(&mut self.pan);
		if drag.active {
			let Some(idx) = drag.node_idx else {
				return;
			};
			if drag.moved {
				self.end_drag(idx);
			} else if let Some(node) = self.graph().nodes().get(idx) {
				let id = node.id.clone();
				self.click_node(&id);
			}
		} else if pan.active && !pan.moved {
			self.click_background();
		}
	}

	/// Pointer left the canvas.
	pub fn pointer_leave(&mut self) {
		self.cancel_gestures();
		self.hover(None);
	}

	/// Abandon any press in progress, finishing a drag that already moved.
	fn cancel_gestures(&mut self) {
		let drag = std::mem::take(&mut self.drag);
		self.pan = PanState::default();
		if let (true, true, Some(idx)) = (drag.active, drag.moved, drag.node_idx) {
			self.end_drag(idx);
		}
	}

	fn end_drag(&mut self, idx: usize) {
		let release = self.config.release_on_drag_end;
		let sim = self.active_simulation_mut();
		sim.set_alpha_target(0.0);
		if release {
			sim.unpin(idx);
		}
	}

	// --- filtering and search -----------------------------------------------

	/// Show only nodes matching `filter`, re-laid out from scratch; `None`
	/// restores the full graph and its layout.
	pub fn apply_filter(&mut self, node_filter: Option<NodeFilter>) {
		let previous_label = self.active_filter().map(NodeFilter::label);
		self.cancel_gestures();

		match node_filter {
			Some(node_filter) => {
				let seed = self.layout().positions_by_id(self.graph());
				let full_was_running = match self.filtered.take() {
					Some(old) => old.full_was_running,
					None => self.simulation.is_running(),
				};
				self.simulation.stop();

				let graph = filter(&self.graph, |n| node_filter.matches(n));
				let mut simulation =
					Simulation::new(&graph, &self.config, Some(&seed)).with_alpha(self.config.relayout_alpha);
				if self.config.settle_ticks > 0 {
					simulation.settle(self.config.settle_ticks);
				}
				log::debug!(
					"term-graph: filter {:?} keeps {} of {} nodes",
					node_filter,
					graph.node_count(),
					self.graph.node_count()
				);
				self.filtered = Some(FilteredView {
					filter: node_filter,
					graph,
					simulation,
					full_was_running,
				});
			}
			None => {
				if let Some(old) = self.filtered.take() {
					if old.full_was_running {
						self.simulation.restart();
					}
					log::debug!("term-graph: filter cleared");
				}
			}
		}

		self.reindex_interaction();
		let label = self.active_filter().map(NodeFilter::label);
		if label != previous_label {
			self.events.push(EngineEvent::FilterChange(label));
		}
	}

	/// Legend behavior: filter by `category`, or clear if it is already active.
	pub fn toggle_category(&mut self, category: &str) {
		let active = matches!(self.active_filter(), Some(NodeFilter::Category(c)) if c == category);
		if active {
			self.apply_filter(None);
		} else {
			self.apply_filter(Some(NodeFilter::Category(category.to_string())));
		}
	}

	/// Node indices changed: carry the interaction state over by id.
	fn reindex_interaction(&mut self) {
		self.interaction.highlight.reset();
		let hovered_gone = self
			.interaction
			.hovered
			.as_deref()
			.is_some_and(|id| self.graph().index_of(id).is_none());
		if hovered_gone {
			self.interaction.hovered = None;
		}
		self.refresh_focus();
		let term = std::mem::take(&mut self.interaction.search_term);
		self.interaction.search_matches = self.find_matches(&term);
		self.interaction.search_term = term;
	}

	fn find_matches(&self, term: &str) -> Vec<usize> {
		if term.trim().is_empty() {
			return Vec::new();
		}
		let needle = term.to_lowercase();
		self.graph()
			.nodes()
			.iter()
			.enumerate()
			.filter(|(_, n)| n.title.to_lowercase().contains(&needle))
			.map(|(i, _)| i)
			.collect()
	}

	/// Emphasize nodes whose title contains `term` (case-insensitive) and
	/// bring the first match into view. Returns the number of matches.
	pub fn search(&mut self, term: &str) -> usize {
		self.interaction.search_matches = self.find_matches(term);
		self.interaction.search_term = term.to_string();
		if let Some(&first) = self.interaction.search_matches.first() {
			let id = self.graph().nodes()[first].id.clone();
			self.zoom_to_node(&id, self.config.search_zoom);
		}
		self.interaction.search_matches.len()
	}

	/// Run a synchronous settle pass on the active simulation.
	pub fn settle(&mut self, ticks: usize) {
		self.active_simulation_mut().settle(ticks);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn records() -> Vec<RawRecord> {
		vec![
			RawRecord::new("a", "Attention").with_categories(["CORE"]).with_child("b", Some(0.9)),
			RawRecord::new("b", "Backprop").with_categories(["MATH"]).with_child("c", Some(0.4)),
			RawRecord::new("c", "Convolution").with_categories(["ARCH", "CORE"]),
			RawRecord::new("d", "Dropout").with_categories(["IMPL"]),
		]
	}

	fn engine() -> GraphEngine {
		GraphEngine::new(&records(), EngineConfig::default())
	}

	fn screen_of(engine: &GraphEngine, id: &str) -> (f64, f64) {
		let idx = engine.graph().index_of(id).unwrap();
		let (x, y) = engine.layout().position(idx).unwrap();
		engine.graph_to_screen(x, y)
	}

	#[test]
	fn hover_enters_and_leaves() {
		let mut engine = engine();
		engine.hover(Some("b"));
		assert_eq!(engine.mode(), &Interaction::Hovering("b".into()));
		let a = engine.graph().index_of("a").unwrap();
		let c = engine.graph().index_of("c").unwrap();
		assert_eq!(engine.interaction().neighbors, HashSet::from([a, c]));
		engine.hover(None);
		assert_eq!(engine.mode(), &Interaction::Idle);
		assert!(engine.interaction().neighbors.is_empty());
		assert_eq!(
			engine.drain_events(),
			vec![EngineEvent::NodeHover(Some("b".into())), EngineEvent::NodeHover(None)]
		);
	}

	#[test]
	fn selection_survives_hover() {
		let mut engine = engine();
		engine.click_node("a");
		engine.hover(Some("d"));
		assert_eq!(engine.mode(), &Interaction::Selected("a".into()));
		engine.hover(None);
		assert_eq!(engine.mode(), &Interaction::Selected("a".into()));
	}

	#[test]
	fn click_switches_selection() {
		let mut engine = engine();
		engine.click_node("a");
		engine.click_node("c");
		assert_eq!(engine.mode(), &Interaction::Selected("c".into()));
		assert_eq!(engine.interaction().focus, engine.graph().index_of("c"));
		engine.click_background();
		assert_eq!(engine.mode(), &Interaction::Idle);
	}

	#[test]
	fn pointer_click_on_node_selects_it() {
		let mut engine = engine();
		let (sx, sy) = screen_of(&engine, "b");
		engine.pointer_down(sx, sy);
		engine.pointer_up(sx, sy);
		assert_eq!(engine.mode(), &Interaction::Selected("b".into()));
		assert!(engine.drain_events().contains(&EngineEvent::NodeClick("b".into())));
	}

	#[test]
	fn pointer_drag_pins_without_clicking() {
		let mut engine = engine();
		let (sx, sy) = screen_of(&engine, "d");
		engine.pointer_down(sx, sy);
		engine.pointer_move(sx + 40.0, sy + 10.0);
		engine.pointer_up(sx + 40.0, sy + 10.0);
		assert_eq!(engine.mode(), &Interaction::Idle);
		let idx = engine.graph().index_of("d").unwrap();
		let body = *engine.layout().get(idx).unwrap();
		assert!(body.is_pinned());
		let (gx, gy) = engine.screen_to_graph(sx + 40.0, sy + 10.0);
		assert!((body.x - gx).abs() < 1e-9 && (body.y - gy).abs() < 1e-9);
		assert_eq!(engine.simulation().alpha_target(), 0.0);
	}

	#[test]
	fn background_press_pans_or_clicks() {
		let mut engine = engine();
		engine.click_node("a");
		engine.pointer_down(-500.0, -500.0);
		engine.pointer_move(-450.0, -500.0);
		engine.pointer_up(-450.0, -500.0);
		assert_eq!(engine.transform().x, 50.0);
		assert_eq!(engine.mode(), &Interaction::Selected("a".into()));

		engine.pointer_down(-500.0, -500.0);
		engine.pointer_up(-500.0, -500.0);
		assert_eq!(engine.mode(), &Interaction::Idle);
	}

	#[test]
	fn wheel_zoom_keeps_cursor_point_fixed() {
		let mut engine = engine();
		let before = engine.screen_to_graph(300.0, 200.0);
		engine.wheel(300.0, 200.0, -1.0);
		let after = engine.screen_to_graph(300.0, 200.0);
		assert!((engine.transform().k - 1.1).abs() < 1e-12);
		assert!((before.0 - after.0).abs() < 1e-9 && (before.1 - after.1).abs() < 1e-9);
	}

	#[test]
	fn search_zooms_to_first_match() {
		let mut engine = engine();
		assert_eq!(engine.search("CON"), 1);
		engine.finish_transitions();
		let (sx, sy) = screen_of(&engine, "c");
		assert!((sx - 400.0).abs() < 1e-9 && (sy - 300.0).abs() < 1e-9);
		assert_eq!(engine.transform().k, 2.0);
		assert_eq!(engine.mode(), &Interaction::Idle);
		assert_eq!(engine.search("  "), 0);
	}

	#[test]
	fn zoom_animation_eases_to_target() {
		let mut engine = engine();
		assert!(engine.zoom_to_node("a", 3.0));
		engine.tick(0.3);
		let k = engine.transform().k;
		assert!(k > 1.0 && k < 3.0);
		engine.tick(1.0);
		assert_eq!(engine.transform().k, 3.0);
		assert!(!engine.zoom_to_node("missing", 3.0));
	}

	#[test]
	fn filter_resets_dangling_selection_and_reports_changes() {
		let mut engine = engine();
		engine.click_node("d");
		engine.drain_events();
		engine.toggle_category("CORE");
		assert_eq!(engine.graph().node_count(), 2);
		assert_eq!(engine.mode(), &Interaction::Idle);
		engine.toggle_category("CORE");
		assert_eq!(engine.graph().node_count(), 4);
		assert_eq!(
			engine.drain_events(),
			vec![
				EngineEvent::FilterChange(Some("CORE".into())),
				EngineEvent::FilterChange(None)
			]
		);
	}

	#[test]
	fn clearing_filter_restores_full_layout() {
		let mut engine = engine();
		let before = engine.layout().clone();
		engine.apply_filter(Some(NodeFilter::Category("CORE".into())));
		engine.apply_filter(None);
		assert_eq!(engine.layout(), &before);
	}

	#[test]
	fn selection_carries_over_into_filter_by_id() {
		let mut engine = engine();
		engine.click_node("c");
		engine.apply_filter(Some(NodeFilter::Category("CORE".into())));
		assert_eq!(engine.mode(), &Interaction::Selected("c".into()));
		assert_eq!(engine.interaction().focus, engine.graph().index_of("c"));
	}

	#[test]
	fn highlight_fades_in_and_out() {
		let mut engine = engine();
		engine.hover(Some("a"));
		let a = engine.graph().index_of("a").unwrap();
		engine.tick(0.05);
		let partial = engine.interaction().highlight.node_intensity(a);
		assert!(partial > 0.0 && partial < 1.0);
		for _ in 0..60 {
			engine.tick(0.016);
		}
		assert!(engine.interaction().highlight.node_intensity(a) > 0.99);
		engine.hover(None);
		for _ in 0..200 {
			engine.tick(0.016);
		}
		assert_eq!(engine.interaction().highlight.max_intensity(), 0.0);
	}

	#[test]
	fn deselecting_under_the_pointer_returns_to_hover() {
		let mut engine = engine();
		let (sx, sy) = screen_of(&engine, "a");
		engine.pointer_move(sx, sy);
		assert_eq!(engine.mode(), &Interaction::Hovering("a".into()));
		for _ in 0..2 {
			engine.pointer_down(sx, sy);
			engine.pointer_up(sx, sy);
		}
		assert_eq!(engine.mode(), &Interaction::Hovering("a".into()));
		assert_eq!(engine.interaction().focus, engine.graph().index_of("a"));
		engine.pointer_move(sx, sy);
		assert_eq!(engine.mode(), &Interaction::Hovering("a".into()));
	}

	#[test]
	fn search_matches_the_term_as_typed() {
		let mut engine = engine();
		assert_eq!(engine.search("tion"), 2);
		assert_eq!(engine.search(" tion"), 0);
		assert_eq!(engine.search("TION"), 2);
	}

	#[test]
	fn filter_change_mid_drag_still_converges() {
		let mut engine = engine();
		let (sx, sy) = screen_of(&engine, "c");
		engine.pointer_down(sx, sy);
		engine.pointer_move(sx + 30.0, sy);
		assert!(engine.simulation().alpha_target() > 0.0);

		engine.apply_filter(Some(NodeFilter::Category("CORE".into())));
		engine.pointer_up(sx + 30.0, sy);
		engine.apply_filter(None);
		assert_eq!(engine.simulation().alpha_target(), 0.0);

		let mut frames = 0;
		while engine.simulation().is_running() && frames < 5000 {
			engine.tick(0.016);
			frames += 1;
		}
		assert!(!engine.simulation().is_running());
	}

	#[test]
	fn stop_halts_everything() {
		let mut engine = GraphEngine::new(
			&records(),
			EngineConfig {
				settle_ticks: 0,
				..EngineConfig::default()
			},
		);
		assert!(engine.simulation().is_running());
		engine.zoom_to_node("a", 2.0);
		engine.stop();
		assert!(!engine.is_animating());
	}
}
