//! Zoom-dependent sizing for the rendered map.
//!
//! Node radii live in world units (they come from the model and feed the
//! collision force), so zooming scales them naturally. Strokes, label fonts and
//! hit slop are specified in screen pixels and converted here.

/// How a length reacts to the zoom factor `k`.
#[derive(Clone, Debug, PartialEq)]
pub enum ScaleBehavior {
	/// Constant world-space size.
	World,
	/// Constant screen-space size.
	Screen,
	/// World-space size whose on-screen size stays within `[min_screen, max_screen]`.
	Clamped {
		/// Smallest on-screen size in pixels.
		min_screen: f64,
		/// Largest on-screen size in pixels.
		max_screen: f64,
	},
}

impl ScaleBehavior {
	/// World-space length for `base` at zoom `k`.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::World => base,
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// How an opacity reacts to zoom.
#[derive(Clone, Debug, PartialEq)]
pub enum AlphaBehavior {
	/// Always fully opaque.
	Constant,
	/// Invisible at or below `zero_alpha_k`, fully visible from `full_alpha_k`.
	Fade {
		/// Zoom at and below which the opacity is 0.
		zero_alpha_k: f64,
		/// Zoom from which the opacity is 1.
		full_alpha_k: f64,
	},
}

impl AlphaBehavior {
	/// Opacity at zoom `k`.
	pub fn apply(&self, k: f64) -> f64 {
		match self {
			AlphaBehavior::Constant => 1.0,
			AlphaBehavior::Fade {
				zero_alpha_k,
				full_alpha_k,
			} => {
				if zero_alpha_k >= full_alpha_k {
					return 1.0;
				}
				((k - zero_alpha_k) / (full_alpha_k - zero_alpha_k)).clamp(0.0, 1.0)
			}
		}
	}
}

/// Node and label sizing.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeScaleConfig {
	/// Radius multiplier for search matches.
	pub match_radius: f64,
	/// Hit area around a node; never smaller than the node itself.
	pub hit_behavior: ScaleBehavior,
	/// Label font size in screen pixels.
	pub label_size: f64,
	/// Label font size for search matches, in screen pixels.
	pub match_label_size: f64,
	/// Below this zoom, label fonts stop shrinking.
	pub label_min_k: f64,
	/// Gap between a node's edge and its label, in screen pixels.
	pub label_gap: f64,
	/// Label opacity as a function of zoom.
	pub label_alpha: AlphaBehavior,
	/// Outline width for secondary categories, in screen pixels.
	pub outline_width: f64,
}

/// Edge stroke sizing.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeScaleConfig {
	/// Base stroke width in screen pixels.
	pub line_width: f64,
	/// Width multipliers for the lowest and highest weight in the graph.
	pub weight_range: (f64, f64),
	/// Width multiplier for edges touching the focused node.
	pub incident_width: f64,
}

/// Complete scale configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleConfig {
	/// Node and label settings.
	pub node: NodeScaleConfig,
	/// Edge settings.
	pub edge: EdgeScaleConfig,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node: NodeScaleConfig {
				match_radius: 1.5,
				hit_behavior: ScaleBehavior::Clamped {
					min_screen: 8.0,
					max_screen: f64::INFINITY,
				},
				label_size: 10.0,
				match_label_size: 12.0,
				label_min_k: 0.5,
				label_gap: 12.0,
				label_alpha: AlphaBehavior::Fade {
					zero_alpha_k: 0.25,
					full_alpha_k: 0.6,
				},
				outline_width: 3.0,
			},
			edge: EdgeScaleConfig {
				line_width: 1.5,
				weight_range: (0.6, 1.6),
				incident_width: 2.0,
			},
		}
	}
}

/// Scale values resolved for one zoom level, all in world units.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaledValues {
	/// Zoom the values were resolved for.
	pub k: f64,
	/// Label font size.
	pub label_size: f64,
	/// Label font size for search matches.
	pub match_label_size: f64,
	/// Gap between a node and its label.
	pub label_gap: f64,
	/// Label opacity multiplier.
	pub label_alpha: f64,
	/// Base edge stroke width.
	pub edge_line_width: f64,
	/// Secondary-category outline width.
	pub outline_width: f64,
}

impl ScaledValues {
	/// Resolve `config` at zoom `k`.
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let font_k = k.max(config.node.label_min_k);
		Self {
			k,
			label_size: config.node.label_size / font_k,
			match_label_size: config.node.match_label_size / font_k,
			label_gap: config.node.label_gap / k,
			label_alpha: config.node.label_alpha.apply(k),
			edge_line_width: config.edge.line_width / k,
			outline_width: config.node.outline_width / k,
		}
	}

	/// World-space hit radius for a node of visual radius `radius`.
	pub fn hit_radius(&self, config: &ScaleConfig, radius: f64) -> f64 {
		config.node.hit_behavior.apply(radius, self.k)
	}
}

/// Linear map from edge weight to a stroke width multiplier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightScale {
	domain: Option<(f64, f64)>,
	range: (f64, f64),
}

impl WeightScale {
	/// Map weights in `domain` onto `range`.
	pub fn new(domain: Option<(f64, f64)>, range: (f64, f64)) -> Self {
		Self { domain, range }
	}

	/// Unweighted edges and single-valued domains map to the midpoint.
	pub fn factor(&self, weight: Option<f64>) -> f64 {
		let mid = (self.range.0 + self.range.1) / 2.0;
		match (self.domain, weight) {
			(Some((lo, hi)), Some(w)) if hi > lo => {
				let t = ((w - lo) / (hi - lo)).clamp(0.0, 1.0);
				self.range.0 + t * (self.range.1 - self.range.0)
			}
			_ => mid,
		}
	}
}
