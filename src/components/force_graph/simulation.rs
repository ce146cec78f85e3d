//! Iterative force layout.
//!
//! Each tick nudges velocities with spring (per edge), many-body (per node
//! pair, Barnes-Hut above a size threshold) and centering forces, integrates
//! with velocity decay, then resolves overlaps as a positional constraint.
//! Pinned bodies (`fx`/`fy` set) are never integrated or pushed, but still
//! exert forces on everyone else.
//!
//! Two termination modes share the same tick:
//! - [`Simulation::settle`] runs a fixed number of ticks synchronously.
//! - [`Simulation::step`] runs one tick per frame until alpha decays below
//!   `alpha_min`.

use std::collections::HashMap;

use super::config::EngineConfig;
use super::model::Graph;
use super::quadtree::{Aabb, QuadTree};
use super::seed::seed_positions;

/// Squared distance below which many-body forces stop growing.
const MIN_CHARGE_DIST_SQ: f64 = 1.0;
/// Upper bound on constraint passes when relaxing collisions at rest.
const MAX_RELAX_PASSES: usize = 200;

/// Runtime state of one node inside the solver.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Body {
	/// Current x position.
	pub x: f64,
	/// Current y position.
	pub y: f64,
	/// Velocity along x.
	pub vx: f64,
	/// Velocity along y.
	pub vy: f64,
	/// Pinned x coordinate.
	pub fx: Option<f64>,
	/// Pinned y coordinate.
	pub fy: Option<f64>,
}

impl Body {
	/// Free body at rest at `(x, y)`.
	pub fn at(x: f64, y: f64) -> Self {
		Self {
			x,
			y,
			..Self::default()
		}
	}

	/// Current position.
	pub fn position(&self) -> (f64, f64) {
		(self.x, self.y)
	}

	/// Whether either coordinate is pinned.
	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}
}

/// Positions for every node of a graph, in the graph's node order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
	bodies: Vec<Body>,
}

impl Layout {
	/// All bodies, in node order.
	pub fn bodies(&self) -> &[Body] {
		&self.bodies
	}

	/// Number of bodies.
	pub fn len(&self) -> usize {
		self.bodies.len()
	}

	/// True when there are no bodies.
	pub fn is_empty(&self) -> bool {
		self.bodies.is_empty()
	}

	/// Body of node `idx`.
	pub fn get(&self, idx: usize) -> Option<&Body> {
		self.bodies.get(idx)
	}

	/// Position of node `idx`.
	pub fn position(&self, idx: usize) -> Option<(f64, f64)> {
		self.bodies.get(idx).map(Body::position)
	}

	/// Positions keyed by node id, for seeding another simulation.
	pub fn positions_by_id(&self, graph: &Graph) -> HashMap<String, (f64, f64)> {
		graph
			.nodes()
			.iter()
			.zip(&self.bodies)
			.map(|(node, body)| (node.id.clone(), body.position()))
			.collect()
	}
}

/// Linear congruential generator; keeps layouts reproducible run to run.
#[derive(Clone, Debug)]
struct Lcg(u64);

impl Lcg {
	fn next(&mut self) -> f64 {
		self.0 = (1_664_525 * self.0 + 1_013_904_223) % 4_294_967_296;
		self.0 as f64 / 4_294_967_296.0
	}

	/// Tiny random offset used to break exact ties.
	fn jiggle(&mut self) -> f64 {
		(self.next() - 0.5) * 1e-6
	}

	fn unit_vector(&mut self) -> (f64, f64) {
		let angle = self.next() * std::f64::consts::TAU;
		(angle.cos(), angle.sin())
	}
}

#[derive(Clone, Copy, Debug)]
struct Link {
	source: usize,
	target: usize,
	/// Share of the correction applied to the target.
	bias: f64,
}

/// Force simulation over one graph.
pub struct Simulation {
	layout: Layout,
	links: Vec<Link>,
	/// Collision radius per node (visual radius plus padding).
	radii: Vec<f64>,
	config: EngineConfig,
	width: f64,
	height: f64,
	alpha: f64,
	alpha_target: f64,
	running: bool,
	ticks: usize,
	rng: Lcg,
}

impl Simulation {
	/// Seed a simulation for `graph`. Positions in `previous` are reused for
	/// the nodes they cover.
	pub fn new(
		graph: &Graph,
		config: &EngineConfig,
		previous: Option<&HashMap<String, (f64, f64)>>,
	) -> Self {
		let config = config.clone().sanitized();
		let mut rng = Lcg(1);
		let bodies = seed_positions(config.seed, graph, config.width, config.height, previous)
			.into_iter()
			.map(|(x, y)| {
				if x.is_finite() && y.is_finite() {
					Body::at(x, y)
				} else {
					Body::at(config.width / 2.0 + rng.jiggle(), config.height / 2.0 + rng.jiggle())
				}
			})
			.collect();

		let mut counts = vec![0usize; graph.node_count()];
		for edge in graph.edges() {
			counts[edge.source] += 1;
			counts[edge.target] += 1;
		}
		let links = graph
			.edges()
			.iter()
			.map(|e| Link {
				source: e.source,
				target: e.target,
				bias: counts[e.source] as f64 / (counts[e.source] + counts[e.target]) as f64,
			})
			.collect();

		let radii = graph
			.nodes()
			.iter()
			.map(|n| {
				let r = if n.radius.is_finite() && n.radius > 0.0 {
					n.radius
				} else {
					config.min_radius
				};
				r + config.collide_padding
			})
			.collect();

		log::debug!(
			"term-graph: simulation seeded with {} bodies, {} links",
			graph.node_count(),
			graph.edge_count()
		);

		Self {
			layout: Layout { bodies },
			links,
			radii,
			width: config.width,
			height: config.height,
			config,
			alpha: 1.0,
			alpha_target: 0.0,
			running: true,
			ticks: 0,
			rng,
		}
	}

	/// Start from a lower energy, as when re-laying out a filtered view.
	pub fn with_alpha(mut self, alpha: f64) -> Self {
		self.alpha = alpha.clamp(0.0, 1.0);
		self
	}

	/// Current positions.
	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	/// Current temperature.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Value alpha is pulled towards.
	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	/// Ticks run so far.
	pub fn ticks(&self) -> usize {
		self.ticks
	}

	/// Whether live stepping should continue.
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Collision radius of a node, padding included.
	pub fn collision_radius(&self, idx: usize) -> f64 {
		self.radii.get(idx).copied().unwrap_or(0.0)
	}

	/// Run `ticks` iterations synchronously, resolve remaining overlaps and stop.
	pub fn settle(&mut self, ticks: usize) {
		for _ in 0..ticks {
			self.tick();
		}
		self.relax();
		self.running = false;
		if self.config.freeze_on_settle {
			self.pin_all();
		}
		log::debug!(
			"term-graph: settled after {} ticks (alpha {:.4})",
			self.ticks,
			self.alpha
		);
	}

	/// Advance one frame of live simulation. Returns whether it is still running.
	pub fn step(&mut self) -> bool {
		if !self.running {
			return false;
		}
		self.tick();
		if self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min {
			self.relax();
			self.running = false;
			if self.config.freeze_on_settle {
				self.pin_all();
			}
			log::debug!("term-graph: simulation converged after {} ticks", self.ticks);
		}
		self.running
	}

	/// Halt live stepping; positions are kept.
	pub fn stop(&mut self) {
		self.running = false;
	}

	/// Resume live stepping at the current alpha.
	pub fn restart(&mut self) {
		self.running = true;
	}

	/// Raise alpha (never lower it) and resume.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha.clamp(0.0, 1.0));
		self.running = true;
	}

	/// Alpha is pulled towards this value every tick; keep it above
	/// `alpha_min` to hold the simulation warm (e.g. while dragging).
	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target.clamp(0.0, 1.0);
		if self.alpha_target > 0.0 {
			self.running = true;
		}
	}

	/// Fix a node at `(x, y)`; it stays there until unpinned.
	pub fn pin(&mut self, idx: usize, x: f64, y: f64) {
		if !(x.is_finite() && y.is_finite()) {
			return;
		}
		if let Some(body) = self.layout.bodies.get_mut(idx) {
			body.fx = Some(x);
			body.fy = Some(y);
			body.x = x;
			body.y = y;
			body.vx = 0.0;
			body.vy = 0.0;
		}
	}

	/// Release a pinned node.
	pub fn unpin(&mut self, idx: usize) {
		if let Some(body) = self.layout.bodies.get_mut(idx) {
			body.fx = None;
			body.fy = None;
		}
	}

	/// Pin every node where it is.
	pub fn pin_all(&mut self) {
		for body in &mut self.layout.bodies {
			body.fx = Some(body.x);
			body.fy = Some(body.y);
			body.vx = 0.0;
			body.vy = 0.0;
		}
	}

	/// Follow a viewport resize: the center force and bounds move with it.
	pub fn resize(&mut self, width: f64, height: f64) {
		if width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0 {
			self.width = width;
			self.height = height;
		}
	}

	/// One iteration: forces, integration, then constraints.
	pub fn tick(&mut self) {
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		let alpha = self.alpha;

		self.apply_links(alpha);
		self.apply_charge(alpha);
		if self.config.center_force {
			self.apply_center();
		}
		self.integrate();
		self.resolve_collisions();
		if self.config.clamp_to_bounds {
			self.clamp_to_bounds();
		}
		self.sanitize();
		self.ticks += 1;
	}

	fn apply_links(&mut self, alpha: f64) {
		let (distance, strength) = (self.config.link_distance, self.config.link_strength);
		let bodies = &mut self.layout.bodies;
		for link in &self.links {
			let (s, t) = (bodies[link.source], bodies[link.target]);
			let mut x = t.x + t.vx - s.x - s.vx;
			let mut y = t.y + t.vy - s.y - s.vy;
			if x == 0.0 {
				x = self.rng.jiggle();
			}
			if y == 0.0 {
				y = self.rng.jiggle();
			}
			let len = (x * x + y * y).sqrt();
			let k = (len - distance) / len * alpha * strength;
			let (x, y) = (x * k, y * k);

			let target = &mut bodies[link.target];
			target.vx -= x * link.bias;
			target.vy -= y * link.bias;
			let source = &mut bodies[link.source];
			source.vx += x * (1.0 - link.bias);
			source.vy += y * (1.0 - link.bias);
		}
	}

	fn apply_charge(&mut self, alpha: f64) {
		let n = self.layout.bodies.len();
		if n < 2 || self.config.charge_strength == 0.0 {
			return;
		}
		let scale = self.config.charge_strength * alpha;
		let positions: Vec<(f64, f64)> = self.layout.bodies.iter().map(Body::position).collect();

		if n > self.config.barnes_hut_threshold {
			let tree = QuadTree::from_points(&positions);
			for (i, body) in self.layout.bodies.iter_mut().enumerate() {
				let (ax, ay) = tree.accumulate(positions[i], i, self.config.theta, MIN_CHARGE_DIST_SQ);
				body.vx += ax * scale;
				body.vy += ay * scale;
			}
			return;
		}

		for i in 0..n {
			for j in (i + 1)..n {
				let mut dx = positions[j].0 - positions[i].0;
				let mut dy = positions[j].1 - positions[i].1;
				if dx == 0.0 && dy == 0.0 {
					dx = self.rng.jiggle();
					dy = self.rng.jiggle();
				}
				let w = scale / (dx * dx + dy * dy).max(MIN_CHARGE_DIST_SQ);
				let bodies = &mut self.layout.bodies;
				bodies[i].vx += dx * w;
				bodies[i].vy += dy * w;
				bodies[j].vx -= dx * w;
				bodies[j].vy -= dy * w;
			}
		}
	}

	/// Translate free bodies so their center of mass sits at the viewport center.
	fn apply_center(&mut self) {
		let (mut sx, mut sy, mut count) = (0.0, 0.0, 0usize);
		for body in self.layout.bodies.iter().filter(|b| !b.is_pinned()) {
			sx += body.x;
			sy += body.y;
			count += 1;
		}
		if count == 0 {
			return;
		}
		let dx = sx / count as f64 - self.width / 2.0;
		let dy = sy / count as f64 - self.height / 2.0;
		for body in self.layout.bodies.iter_mut().filter(|b| !b.is_pinned()) {
			body.x -= dx;
			body.y -= dy;
		}
	}

	fn integrate(&mut self) {
		let keep = 1.0 - self.config.velocity_decay;
		for body in &mut self.layout.bodies {
			match body.fx {
				Some(fx) => {
					body.x = fx;
					body.vx = 0.0;
				}
				None => {
					body.vx *= keep;
					body.x += body.vx;
				}
			}
			match body.fy {
				Some(fy) => {
					body.y = fy;
					body.vy = 0.0;
				}
				None => {
					body.vy *= keep;
					body.y += body.vy;
				}
			}
		}
	}

	/// One constraint pass. Returns whether any overlap was found.
	fn resolve_collisions(&mut self) -> bool {
		let n = self.layout.bodies.len();
		if n < 2 {
			return false;
		}
		let strength = self.config.collide_strength;
		let mut overlapped = false;

		if n > self.config.barnes_hut_threshold {
			let positions: Vec<(f64, f64)> = self.layout.bodies.iter().map(Body::position).collect();
			let tree = QuadTree::from_points(&positions);
			let max_radius = self.radii.iter().copied().fold(0.0, f64::max);
			for i in 0..n {
				let (x, y) = self.layout.bodies[i].position();
				let reach = self.radii[i] + max_radius;
				let range = Aabb::new((x - reach, y - reach), (x + reach, y + reach));
				for j in tree.query(&range) {
					if j > i {
						overlapped |= self.separate(i, j, strength);
					}
				}
			}
			return overlapped;
		}

		for i in 0..n {
			for j in (i + 1)..n {
				overlapped |= self.separate(i, j, strength);
			}
		}
		overlapped
	}

	/// Push `i` and `j` apart if they overlap, splitting the correction by
	/// area. Pinned bodies do not move.
	fn separate(&mut self, i: usize, j: usize, strength: f64) -> bool {
		let (a, b) = (self.layout.bodies[i], self.layout.bodies[j]);
		let min = self.radii[i] + self.radii[j];
		let (mut dx, mut dy) = (b.x - a.x, b.y - a.y);
		let dist_sq = dx * dx + dy * dy;
		if dist_sq >= min * min {
			return false;
		}
		let (a_fixed, b_fixed) = (a.is_pinned(), b.is_pinned());
		if a_fixed && b_fixed {
			return false;
		}

		let mut dist = dist_sq.sqrt();
		if dist == 0.0 {
			(dx, dy) = self.rng.unit_vector();
			dist = 1.0;
		}
		let overlap = (min - dist) * strength;
		let (ux, uy) = (dx / dist, dy / dist);
		let (ra, rb) = (self.radii[i] * self.radii[i], self.radii[j] * self.radii[j]);
		let share_a = match (a_fixed, b_fixed) {
			(true, _) => 0.0,
			(_, true) => 1.0,
			_ => rb / (ra + rb),
		};

		let bodies = &mut self.layout.bodies;
		bodies[i].x -= ux * overlap * share_a;
		bodies[i].y -= uy * overlap * share_a;
		bodies[j].x += ux * overlap * (1.0 - share_a);
		bodies[j].y += uy * overlap * (1.0 - share_a);
		true
	}

	/// Repeat collision passes until nothing overlaps (or the pass cap hits).
	fn relax(&mut self) {
		for _ in 0..MAX_RELAX_PASSES {
			let overlapped = self.resolve_collisions();
			if self.config.clamp_to_bounds {
				self.clamp_to_bounds();
			}
			if !overlapped {
				break;
			}
		}
		self.sanitize();
	}

	fn clamp_to_bounds(&mut self) {
		for (body, &r) in self.layout.bodies.iter_mut().zip(&self.radii) {
			if body.is_pinned() {
				continue;
			}
			let (w, h) = (self.width, self.height);
			body.x = if 2.0 * r >= w { w / 2.0 } else { body.x.clamp(r, w - r) };
			body.y = if 2.0 * r >= h { h / 2.0 } else { body.y.clamp(r, h - r) };
		}
	}

	/// Reset any body whose state stopped being finite.
	fn sanitize(&mut self) {
		let (cx, cy) = (self.width / 2.0, self.height / 2.0);
		for body in &mut self.layout.bodies {
			let finite = body.x.is_finite() && body.y.is_finite() && body.vx.is_finite() && body.vy.is_finite();
			if !finite {
				log::warn!("term-graph: resetting non-finite body at ({}, {})", body.x, body.y);
				body.x = body.fx.unwrap_or(cx + self.rng.jiggle());
				body.y = body.fy.unwrap_or(cy + self.rng.jiggle());
				body.vx = 0.0;
				body.vy = 0.0;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::model::{assign_radii, build, compute_degrees};
	use crate::components::force_graph::types::RawRecord;

	fn graph(records: &[RawRecord]) -> Graph {
		assign_radii(compute_degrees(build(records)), 5.0, 30.0)
	}

	fn chain(n: usize) -> Graph {
		let records: Vec<RawRecord> = (0..n)
			.map(|i| {
				let record = RawRecord::new(format!("n{}", i), format!("Node {}", i));
				if i + 1 < n {
					record.with_child(format!("n{}", i + 1), Some(0.5))
				} else {
					record
				}
			})
			.collect();
		graph(&records)
	}

	fn assert_no_overlap(graph: &Graph, layout: &Layout) {
		let nodes = graph.nodes();
		for i in 0..nodes.len() {
			for j in (i + 1)..nodes.len() {
				let (a, b) = (layout.position(i).unwrap(), layout.position(j).unwrap());
				let dist = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
				assert!(
					dist >= nodes[i].radius + nodes[j].radius - 1e-6,
					"{} and {} overlap: {} < {}",
					nodes[i].id,
					nodes[j].id,
					dist,
					nodes[i].radius + nodes[j].radius
				);
			}
		}
	}

	#[test]
	fn settle_runs_exactly_the_requested_ticks() {
		let graph = chain(5);
		let mut sim = Simulation::new(&graph, &EngineConfig::default(), None);
		sim.settle(300);
		assert_eq!(sim.ticks(), 300);
		assert!(!sim.is_running());
		assert!(sim.alpha() < 0.0011);
	}

	#[test]
	fn zero_edge_graph_scatters_without_nan() {
		let records: Vec<RawRecord> = (0..20).map(|i| RawRecord::new(format!("n{}", i), "x")).collect();
		let graph = graph(&records);
		let mut sim = Simulation::new(&graph, &EngineConfig::default(), None);
		sim.settle(300);
		for body in sim.layout().bodies() {
			assert!(body.x.is_finite() && body.y.is_finite());
		}
		assert_no_overlap(&graph, sim.layout());
	}

	#[test]
	fn live_mode_converges() {
		let graph = chain(8);
		let mut sim = Simulation::new(&graph, &EngineConfig::default(), None);
		let mut frames = 0;
		while sim.step() {
			frames += 1;
			assert!(frames < 1000, "simulation never converged");
		}
		assert!(sim.alpha() < EngineConfig::default().alpha_min);
		assert_no_overlap(&graph, sim.layout());
	}

	#[test]
	fn pinned_bodies_never_move() {
		let graph = chain(6);
		let mut sim = Simulation::new(&graph, &EngineConfig::default(), None);
		sim.pin(2, 123.0, -45.0);
		for _ in 0..200 {
			sim.tick();
		}
		sim.settle(10);
		let body = sim.layout().get(2).unwrap();
		assert_eq!((body.x, body.y), (123.0, -45.0));
	}

	#[test]
	fn coincident_seeds_are_separated() {
		let graph = chain(4);
		let previous: HashMap<String, (f64, f64)> = graph.ids().map(|id| (id.to_string(), (10.0, 10.0))).collect();
		let mut sim = Simulation::new(&graph, &EngineConfig::default(), Some(&previous));
		sim.settle(50);
		assert_no_overlap(&graph, sim.layout());
	}

	#[test]
	fn links_pull_connected_nodes_closer_than_strangers() {
		let graph = graph(&[
			RawRecord::new("a", "A").with_child("b", None),
			RawRecord::new("b", "B"),
			RawRecord::new("c", "C"),
			RawRecord::new("d", "D").with_child("c", None),
		]);
		let config = EngineConfig {
			link_strength: 1.0,
			..EngineConfig::default()
		};
		let mut sim = Simulation::new(&graph, &config, None);
		sim.settle(300);
		let dist = |i: usize, j: usize| {
			let (a, b) = (sim.layout().position(i).unwrap(), sim.layout().position(j).unwrap());
			((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
		};
		assert!(dist(0, 1) < dist(0, 2));
		assert!(dist(3, 2) < dist(3, 1));
	}

	#[test]
	fn barnes_hut_path_keeps_layout_finite_and_separated() {
		let graph = chain(60);
		let config = EngineConfig {
			barnes_hut_threshold: 10,
			..EngineConfig::default()
		};
		let mut sim = Simulation::new(&graph, &config, None);
		sim.settle(300);
		for body in sim.layout().bodies() {
			assert!(body.x.is_finite() && body.y.is_finite());
		}
		assert_no_overlap(&graph, sim.layout());
	}

	#[test]
	fn bounds_clamp_keeps_nodes_on_screen() {
		let graph = chain(10);
		let config = EngineConfig {
			clamp_to_bounds: true,
			width: 300.0,
			height: 200.0,
			..EngineConfig::default()
		};
		let mut sim = Simulation::new(&graph, &config, None);
		sim.settle(300);
		for (i, body) in sim.layout().bodies().iter().enumerate() {
			let r = sim.collision_radius(i);
			assert!(body.x >= r - 1e-9 && body.x <= 300.0 - r + 1e-9);
			assert!(body.y >= r - 1e-9 && body.y <= 200.0 - r + 1e-9);
		}
	}

	#[test]
	fn freeze_on_settle_pins_everything() {
		let graph = chain(3);
		let config = EngineConfig {
			freeze_on_settle: true,
			..EngineConfig::default()
		};
		let mut sim = Simulation::new(&graph, &config, None);
		sim.settle(100);
		assert!(sim.layout().bodies().iter().all(Body::is_pinned));
	}

	#[test]
	fn alpha_target_keeps_simulation_warm() {
		let graph = chain(3);
		let mut sim = Simulation::new(&graph, &EngineConfig::default(), None);
		sim.settle(300);
		sim.set_alpha_target(0.3);
		for _ in 0..500 {
			assert!(sim.step());
		}
		assert!((sim.alpha() - 0.3).abs() < 0.01);
		sim.set_alpha_target(0.0);
		let mut frames = 0;
		while sim.step() {
			frames += 1;
			assert!(frames < 1000);
		}
	}

	#[test]
	fn empty_graph_is_fine() {
		let graph = Graph::default();
		let mut sim = Simulation::new(&graph, &EngineConfig::default(), None);
		sim.settle(10);
		assert!(sim.layout().is_empty());
	}
}
