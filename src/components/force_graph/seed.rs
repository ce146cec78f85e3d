//! Initial node placement fed into the solver.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::Deserialize;

use super::model::Graph;

/// How nodes are placed before the first tick.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeedStrategy {
	/// Sunflower spiral around the viewport center.
	#[default]
	Phyllotaxis,
	/// Evenly spaced on a single circle.
	Circle,
	/// Concentric rings by generality: general terms in the middle.
	Radial,
	/// Golden-angle spiral ordered by generality, each node pushed outward
	/// until it no longer overlaps the ones already placed.
	Spiral,
}

const PHYLLOTAXIS_RADIUS: f64 = 10.0;
const RADIAL_LEVELS: usize = 10;
const SPIRAL_PADDING: f64 = 5.0;
const GOLDEN_ANGLE: f64 = 2.4;

/// Compute seed positions for every node of `graph`, in node order.
///
/// Positions found in `previous` (keyed by node id) win over the strategy.
pub fn seed_positions(
	strategy: SeedStrategy,
	graph: &Graph,
	width: f64,
	height: f64,
	previous: Option<&HashMap<String, (f64, f64)>>,
) -> Vec<(f64, f64)> {
	let (cx, cy) = (width / 2.0, height / 2.0);
	let mut positions = match strategy {
		SeedStrategy::Phyllotaxis => phyllotaxis(graph.node_count(), cx, cy),
		SeedStrategy::Circle => circle(graph.node_count(), cx, cy),
		SeedStrategy::Radial => radial(graph, cx, cy, width.min(height) * 0.45),
		SeedStrategy::Spiral => spiral(graph, cx, cy),
	};

	if let Some(previous) = previous {
		for (node, pos) in graph.nodes().iter().zip(positions.iter_mut()) {
			if let Some(&(x, y)) = previous.get(&node.id) {
				if x.is_finite() && y.is_finite() {
					*pos = (x, y);
				}
			}
		}
	}
	positions
}

fn phyllotaxis(n: usize, cx: f64, cy: f64) -> Vec<(f64, f64)> {
	let angle_step = PI * (3.0 - 5f64.sqrt());
	(0..n)
		.map(|i| {
			let radius = PHYLLOTAXIS_RADIUS * (0.5 + i as f64).sqrt();
			let angle = i as f64 * angle_step;
			(cx + radius * angle.cos(), cy + radius * angle.sin())
		})
		.collect()
}

fn circle(n: usize, cx: f64, cy: f64) -> Vec<(f64, f64)> {
	(0..n)
		.map(|i| {
			let angle = (i as f64) * 2.0 * PI / n as f64;
			(cx + 100.0 * angle.cos(), cy + 100.0 * angle.sin())
		})
		.collect()
}

fn radial(graph: &Graph, cx: f64, cy: f64, max_radius: f64) -> Vec<(f64, f64)> {
	let mut levels: Vec<Vec<usize>> = vec![Vec::new(); RADIAL_LEVELS];
	for (i, node) in graph.nodes().iter().enumerate() {
		let generality = node.generality.unwrap_or(0.0);
		let level = (generality * (RADIAL_LEVELS - 1) as f64).floor() as usize;
		levels[level.min(RADIAL_LEVELS - 1)].push(i);
	}

	let mut positions = vec![(cx, cy); graph.node_count()];
	for (level, members) in levels.iter().enumerate() {
		let radius = (level as f64 / (RADIAL_LEVELS - 1) as f64) * max_radius;
		let step = 2.0 * PI / members.len().max(1) as f64;
		for (k, &i) in members.iter().enumerate() {
			let angle = k as f64 * step;
			positions[i] = (cx + radius * angle.cos(), cy + radius * angle.sin());
		}
	}
	positions
}

fn spiral(graph: &Graph, cx: f64, cy: f64) -> Vec<(f64, f64)> {
	let nodes = graph.nodes();
	let mut order: Vec<usize> = (0..nodes.len()).collect();
	order.sort_by(|&a, &b| {
		let ga = nodes[a].generality.unwrap_or(0.0);
		let gb = nodes[b].generality.unwrap_or(0.0);
		gb.total_cmp(&ga)
	});

	let mut positions = vec![(cx, cy); nodes.len()];
	let mut placed: Vec<usize> = Vec::with_capacity(nodes.len());
	for (rank, &i) in order.iter().enumerate() {
		if rank > 0 {
			let angle = rank as f64 * GOLDEN_ANGLE;
			let mut radius = 0.0;
			loop {
				radius += 1.0;
				let candidate = (cx + radius * angle.cos(), cy + radius * angle.sin());
				let clear = placed.iter().all(|&j| {
					let (dx, dy) = (candidate.0 - positions[j].0, candidate.1 - positions[j].1);
					let min = nodes[i].radius + nodes[j].radius + SPIRAL_PADDING;
					dx * dx + dy * dy >= min * min
				});
				if clear {
					positions[i] = candidate;
					break;
				}
			}
		}
		placed.push(i);
	}
	positions
}
