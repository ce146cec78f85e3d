//! Engine configuration.
//!
//! Every option has a default, so hosts can pass any subset as JSON. Values go
//! through [`EngineConfig::sanitized`] before they reach the solver.

use serde::Deserialize;

use super::seed::SeedStrategy;

/// Tunable options for layout, sizing and interaction.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
	/// Viewport width in pixels.
	pub width: f64,
	/// Viewport height in pixels.
	pub height: f64,
	/// Radius of the least connected node.
	pub min_radius: f64,
	/// Radius of the most connected node.
	pub max_radius: f64,
	/// Smallest allowed zoom scale.
	pub zoom_min: f64,
	/// Largest allowed zoom scale.
	pub zoom_max: f64,
	/// Synchronous ticks run before first render; 0 means live decay only.
	pub settle_ticks: usize,
	/// Rest length of every edge spring.
	pub link_distance: f64,
	/// Spring stiffness in [0, 1]; 0 disables the link force.
	pub link_strength: f64,
	/// Many-body strength; negative values repel.
	pub charge_strength: f64,
	/// Fraction of an overlap resolved per collision pass, in (0, 1].
	pub collide_strength: f64,
	/// Extra clearance added to each node's radius for collision.
	pub collide_padding: f64,
	/// Fraction of velocity lost every tick.
	pub velocity_decay: f64,
	/// Fraction of the remaining distance to `alpha_target` that alpha covers each tick.
	pub alpha_decay: f64,
	/// Live simulation stops once alpha drops below this.
	pub alpha_min: f64,
	/// Keep the center of mass at the viewport center.
	pub center_force: bool,
	/// Keep nodes inside the viewport, minus their radius.
	pub clamp_to_bounds: bool,
	/// Pin every node once live simulation converges.
	pub freeze_on_settle: bool,
	/// Node count above which repulsion uses the Barnes-Hut approximation.
	pub barnes_hut_threshold: usize,
	/// Barnes-Hut opening angle.
	pub theta: f64,
	/// Starting alpha for a re-layout after a filter change.
	pub relayout_alpha: f64,
	/// Alpha target held while a node is being dragged.
	pub drag_alpha_target: f64,
	/// Unpin a dragged node when the drag ends.
	pub release_on_drag_end: bool,
	/// Scale used when zooming to a search match.
	pub search_zoom: f64,
	/// Duration of programmatic zoom animations, in seconds.
	pub zoom_duration: f64,
	/// Scale applied around the viewport center at startup.
	pub initial_zoom: f64,
	/// How initial positions are chosen.
	pub seed: SeedStrategy,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			width: 800.0,
			height: 600.0,
			min_radius: 5.0,
			max_radius: 30.0,
			zoom_min: 0.1,
			zoom_max: 10.0,
			settle_ticks: 300,
			link_distance: 50.0,
			link_strength: 0.1,
			charge_strength: -300.0,
			collide_strength: 1.0,
			collide_padding: 4.0,
			velocity_decay: 0.4,
			// Reaches alpha_min after ~300 ticks.
			alpha_decay: 1.0 - 0.001f64.powf(1.0 / 300.0),
			alpha_min: 0.001,
			center_force: true,
			clamp_to_bounds: false,
			freeze_on_settle: false,
			barnes_hut_threshold: 200,
			theta: 0.9,
			relayout_alpha: 0.3,
			drag_alpha_target: 0.3,
			release_on_drag_end: false,
			search_zoom: 2.0,
			zoom_duration: 0.75,
			initial_zoom: 1.0,
			seed: SeedStrategy::default(),
		}
	}
}

/// Replace `value` with `default` unless it is finite and accepted by `valid`.
fn repair(name: &str, value: f64, default: f64, valid: impl Fn(f64) -> bool) -> f64 {
	if value.is_finite() && valid(value) {
		value
	} else {
		log::warn!(
			"term-graph: config {} = {} is invalid, using {}",
			name,
			value,
			default
		);
		default
	}
}

impl EngineConfig {
	/// Parse a JSON config object; missing keys take their defaults.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str::<Self>(json).map(Self::sanitized)
	}

	/// Return a copy in which every numeric option is finite and in range.
	pub fn sanitized(self) -> Self {
		let d = Self::default();
		let positive = |v: f64| v > 0.0;
		let non_negative = |v: f64| v >= 0.0;
		let unit = |v: f64| (0.0..=1.0).contains(&v);

		let mut min_radius = repair("minRadius", self.min_radius, d.min_radius, positive);
		let mut max_radius = repair("maxRadius", self.max_radius, d.max_radius, positive);
		if min_radius > max_radius {
			std::mem::swap(&mut min_radius, &mut max_radius);
		}
		let mut zoom_min = repair("zoomMin", self.zoom_min, d.zoom_min, positive);
		let mut zoom_max = repair("zoomMax", self.zoom_max, d.zoom_max, positive);
		if zoom_min > zoom_max {
			std::mem::swap(&mut zoom_min, &mut zoom_max);
		}

		Self {
			width: repair("width", self.width, d.width, positive),
			height: repair("height", self.height, d.height, positive),
			min_radius,
			max_radius,
			zoom_min,
			zoom_max,
			settle_ticks: self.settle_ticks,
			link_distance: repair("linkDistance", self.link_distance, d.link_distance, non_negative),
			link_strength: repair("linkStrength", self.link_strength, d.link_strength, unit),
			charge_strength: repair("chargeStrength", self.charge_strength, d.charge_strength, |_| true),
			collide_strength: repair("collideStrength", self.collide_strength, d.collide_strength, |v| {
				v > 0.0 && v <= 1.0
			}),
			collide_padding: repair("collidePadding", self.collide_padding, d.collide_padding, non_negative),
			velocity_decay: repair("velocityDecay", self.velocity_decay, d.velocity_decay, unit),
			alpha_decay: repair("alphaDecay", self.alpha_decay, d.alpha_decay, |v| v > 0.0 && v < 1.0),
			alpha_min: repair("alphaMin", self.alpha_min, d.alpha_min, |v| v > 0.0 && v < 1.0),
			center_force: self.center_force,
			clamp_to_bounds: self.clamp_to_bounds,
			freeze_on_settle: self.freeze_on_settle,
			barnes_hut_threshold: self.barnes_hut_threshold,
			theta: repair("theta", self.theta, d.theta, positive),
			relayout_alpha: repair("relayoutAlpha", self.relayout_alpha, d.relayout_alpha, unit),
			drag_alpha_target: repair("dragAlphaTarget", self.drag_alpha_target, d.drag_alpha_target, unit),
			release_on_drag_end: self.release_on_drag_end,
			search_zoom: repair("searchZoom", self.search_zoom, d.search_zoom, positive),
			zoom_duration: repair("zoomDuration", self.zoom_duration, d.zoom_duration, non_negative),
			initial_zoom: repair("initialZoom", self.initial_zoom, d.initial_zoom, positive),
			seed: self.seed,
		}
	}
}
