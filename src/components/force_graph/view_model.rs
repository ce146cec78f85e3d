//! Renderer-agnostic description of one frame.
//!
//! [`compute_render_state`] turns graph, layout and interaction state into
//! plain positioned shapes with resolved colors and opacities. Renderers only
//! draw what they are given.

use std::collections::HashSet;

use super::model::{Graph, Node};
use super::scale::{ScaleConfig, ScaledValues, WeightScale};
use super::simulation::Layout;
use super::state::{InteractionState, ViewTransform};
use super::theme::{Color, Theme};

/// Gap between a node's bottom edge and its tooltip, in screen pixels.
const TOOLTIP_OFFSET: f64 = 10.0;

/// One node, ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeVisual {
	/// Index in the active graph.
	pub index: usize,
	/// Node id.
	pub id: String,
	/// Center x in graph space.
	pub x: f64,
	/// Center y in graph space.
	pub y: f64,
	/// Drawn radius.
	pub radius: f64,
	/// Fill color.
	pub fill: Color,
	/// Outline color, if any.
	pub outline: Option<Color>,
	/// Node opacity after dimming.
	pub opacity: f64,
	/// Title split into at most two lines.
	pub label_lines: Vec<String>,
	/// Baseline of the first label line.
	pub label_y: f64,
	/// Label font size.
	pub label_size: f64,
	/// Label opacity.
	pub label_alpha: f64,
	/// Whether the label is bold.
	pub label_bold: bool,
	/// This is the focused node.
	pub is_focus: bool,
	/// This node neighbors the focused node.
	pub is_neighbor: bool,
	/// This node matches the search.
	pub is_match: bool,
}

/// One edge, ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeVisual {
	/// Source node index.
	pub source: usize,
	/// Target node index.
	pub target: usize,
	/// Source x.
	pub x1: f64,
	/// Source y.
	pub y1: f64,
	/// Target x.
	pub x2: f64,
	/// Target y.
	pub y2: f64,
	/// Stroke color.
	pub color: Color,
	/// Stroke width.
	pub width: f64,
	/// Stroke opacity.
	pub opacity: f64,
	/// Touches the focused node.
	pub incident: bool,
}

/// Details of the focused node, anchored in screen space below it.
#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
	/// Node title.
	pub title: String,
	/// Node summary.
	pub summary: Option<String>,
	/// Total connection count.
	pub connections: usize,
	/// Titles of the connected nodes.
	pub connected: Vec<String>,
	/// Anchor x in screen space.
	pub x: f64,
	/// Anchor y in screen space.
	pub y: f64,
}

/// Everything needed to draw one frame. Node and edge coordinates are in
/// graph space; apply `transform` to get screen space.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderModel {
	/// Viewport width.
	pub width: f64,
	/// Viewport height.
	pub height: f64,
	/// Transform to apply to graph coordinates.
	pub transform: ViewTransform,
	/// Canvas fill.
	pub background: Color,
	/// Zoom-dependent sizes.
	pub scaled: ScaledValues,
	/// Edges to draw.
	pub edges: Vec<EdgeVisual>,
	/// In draw order: emphasized nodes last.
	pub nodes: Vec<NodeVisual>,
	/// Details of the focused node.
	pub tooltip: Option<Tooltip>,
	/// "Nodes: N | Connections: M".
	pub stats: String,
}

/// Radius a node is drawn (and hit-tested) with.
pub fn display_radius(node: &Node, is_match: bool, scale: &ScaleConfig) -> f64 {
	if is_match {
		node.radius * scale.node.match_radius
	} else {
		node.radius
	}
}

/// Split a title into two lines of similar length at a word boundary.
/// Single words stay on one line.
pub fn split_label(title: &str) -> Vec<String> {
	let words: Vec<&str> = title.split_whitespace().collect();
	if words.len() < 2 {
		return vec![title.trim().to_string()];
	}
	let total: usize = words.iter().map(|w| w.chars().count()).sum::<usize>() + words.len() - 1;
	let mut best = (usize::MAX, 1);
	let mut left = 0;
	for split in 1..words.len() {
		left += words[split - 1].chars().count() + usize::from(split > 1);
		let right = total - left - 1;
		let diff = left.abs_diff(right);
		if diff < best.0 {
			best = (diff, split);
		}
	}
	vec![words[..best.1].join(" "), words[best.1..].join(" ")]
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
	a + (b - a) * t
}

/// Pure projection of the current state into drawable shapes.
pub fn compute_render_state(
	graph: &Graph,
	layout: &Layout,
	interaction: &InteractionState,
	theme: &Theme,
	scale: &ScaleConfig,
) -> RenderModel {
	let transform = interaction.transform;
	let scaled = ScaledValues::new(scale, transform.k);
	let highlight = &interaction.highlight;
	let dim = highlight.max_intensity();
	let matches: HashSet<usize> = interaction.search_matches.iter().copied().collect();
	let weights = WeightScale::new(graph.weight_domain(), scale.edge.weight_range);

	let edges = graph
		.edges()
		.iter()
		.filter_map(|edge| {
			let (x1, y1) = layout.position(edge.source)?;
			let (x2, y2) = layout.position(edge.target)?;
			let emphasis = highlight
				.focus_intensity(edge.source)
				.max(highlight.focus_intensity(edge.target));
			let resting = lerp(theme.edge_opacity, theme.faded_edge_opacity, dim);
			let incident = interaction.focus.is_some_and(|f| f == edge.source || f == edge.target);
			Some(EdgeVisual {
				source: edge.source,
				target: edge.target,
				x1,
				y1,
				x2,
				y2,
				color: theme.edge_color(edge.kind),
				width: scaled.edge_line_width
					* weights.factor(edge.weight)
					* lerp(1.0, scale.edge.incident_width, emphasis),
				opacity: lerp(resting, theme.incident_edge_opacity, emphasis),
				incident,
			})
		})
		.collect();

	let mut nodes: Vec<NodeVisual> = graph
		.nodes()
		.iter()
		.zip(layout.bodies())
		.enumerate()
		.map(|(index, (node, body))| {
			let is_match = matches.contains(&index);
			let is_focus = interaction.focus == Some(index);
			let is_neighbor = interaction.neighbors.contains(&index);
			let radius = display_radius(node, is_match, scale);
			let opacity = 1.0 - (1.0 - theme.dimmed_opacity) * dim * (1.0 - highlight.node_intensity(index));

			let mut fill = theme.fill_for(node.primary_category());
			if is_match {
				fill = fill.lighten(theme.match_brighten);
			}
			let outline = if is_neighbor {
				Some(theme.neighbor_outline)
			} else {
				node.secondary_category().map(|c| theme.category_color(c))
			};

			let emphasized = is_focus || is_neighbor || is_match;
			NodeVisual {
				index,
				id: node.id.clone(),
				x: body.x,
				y: body.y,
				radius,
				fill,
				outline,
				opacity,
				label_lines: split_label(&node.title),
				label_y: body.y + radius + scaled.label_gap,
				label_size: if is_match {
					scaled.match_label_size
				} else {
					scaled.label_size
				},
				label_alpha: if emphasized {
					opacity
				} else {
					opacity * scaled.label_alpha
				},
				label_bold: emphasized,
				is_focus,
				is_neighbor,
				is_match,
			}
		})
		.collect();
	nodes.sort_by_key(|n| (n.is_focus || n.is_neighbor || n.is_match, n.is_focus));

	let tooltip = interaction.focus.and_then(|idx| {
		let node = graph.nodes().get(idx)?;
		let (x, y) = layout.position(idx)?;
		let mut neighbors: Vec<usize> = interaction.neighbors.iter().copied().collect();
		neighbors.sort_unstable();
		let (sx, sy) = transform.apply(x, y + display_radius(node, matches.contains(&idx), scale));
		Some(Tooltip {
			title: node.title.clone(),
			summary: node.summary.clone(),
			connections: node.total_connections,
			connected: neighbors
				.into_iter()
				.filter_map(|n| graph.nodes().get(n).map(|n| n.title.clone()))
				.collect(),
			x: sx,
			y: sy + TOOLTIP_OFFSET,
		})
	});

	RenderModel {
		width: interaction.width,
		height: interaction.height,
		transform,
		background: theme.background,
		scaled,
		edges,
		nodes,
		tooltip,
		stats: format!("Nodes: {} | Connections: {}", graph.node_count(), graph.edge_count()),
	}
}
