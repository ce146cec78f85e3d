//! Point quadtree used for Barnes-Hut repulsion and collision broad-phase.

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
	pub min: (f64, f64),
	pub max: (f64, f64),
}

impl Aabb {
	pub fn new(min: (f64, f64), max: (f64, f64)) -> Self {
		Self { min, max }
	}

	/// Smallest box containing every point, grown by `padding` on each side.
	pub fn around(points: impl Iterator<Item = (f64, f64)>, padding: f64) -> Self {
		let (mut min, mut max) = ((f64::MAX, f64::MAX), (f64::MIN, f64::MIN));
		for (x, y) in points {
			min = (min.0.min(x), min.1.min(y));
			max = (max.0.max(x), max.1.max(y));
		}
		if min.0 > max.0 {
			return Self::new((-padding, -padding), (padding, padding));
		}
		Self::new((min.0 - padding, min.1 - padding), (max.0 + padding, max.1 + padding))
	}

	pub fn contains(&self, p: (f64, f64)) -> bool {
		p.0 >= self.min.0 && p.0 <= self.max.0 && p.1 >= self.min.1 && p.1 <= self.max.1
	}

	pub fn intersects(&self, other: &Aabb) -> bool {
		self.min.0 <= other.max.0
			&& self.max.0 >= other.min.0
			&& self.min.1 <= other.max.1
			&& self.max.1 >= other.min.1
	}

	fn width(&self) -> f64 {
		self.max.0 - self.min.0
	}
}

const LEAF_CAPACITY: usize = 16;
const MAX_DEPTH: u32 = 12;

struct QuadNode {
	bounds: Aabb,
	children: Option<[usize; 4]>,
	points: Vec<((f64, f64), usize)>,
	center_of_mass: (f64, f64),
	total_mass: f64,
}

impl QuadNode {
	fn empty(bounds: Aabb) -> Self {
		Self {
			bounds,
			children: None,
			points: Vec::new(),
			center_of_mass: (0.0, 0.0),
			total_mass: 0.0,
		}
	}
}

/// Arena-backed quadtree over indexed points with unit mass.
pub struct QuadTree {
	nodes: Vec<QuadNode>,
	root: usize,
}

impl QuadTree {
	pub fn new(bounds: Aabb) -> Self {
		Self {
			nodes: vec![QuadNode::empty(bounds)],
			root: 0,
		}
	}

	/// Build a tree over `points`, indexed by their position in the slice.
	pub fn from_points(points: &[(f64, f64)]) -> Self {
		let mut tree = Self::new(Aabb::around(points.iter().copied(), 10.0));
		for (i, &p) in points.iter().enumerate() {
			tree.insert(p, i);
		}
		tree.calculate_mass();
		tree
	}

	pub fn insert(&mut self, point: (f64, f64), data_index: usize) {
		self.insert_recursive(self.root, point, data_index, 0);
	}

	fn insert_recursive(&mut self, node_idx: usize, point: (f64, f64), data_index: usize, depth: u32) {
		if !self.nodes[node_idx].bounds.contains(point) {
			return;
		}

		if self.nodes[node_idx].children.is_none()
			&& self.nodes[node_idx].points.len() >= LEAF_CAPACITY
			&& depth < MAX_DEPTH
		{
			self.subdivide(node_idx, depth);
		}

		if let Some(children) = self.nodes[node_idx].children {
			for &child_idx in &children {
				if self.nodes[child_idx].bounds.contains(point) {
					self.insert_recursive(child_idx, point, data_index, depth + 1);
					return;
				}
			}
		} else {
			self.nodes[node_idx].points.push((point, data_index));
		}
	}

	fn subdivide(&mut self, node_idx: usize, depth: u32) {
		let b = self.nodes[node_idx].bounds;
		let c = ((b.min.0 + b.max.0) * 0.5, (b.min.1 + b.max.1) * 0.5);
		let quads = [
			Aabb::new((b.min.0, c.1), (c.0, b.max.1)),
			Aabb::new(c, b.max),
			Aabb::new(b.min, c),
			Aabb::new((c.0, b.min.1), (b.max.0, c.1)),
		];

		let mut children = [0; 4];
		for (slot, quad) in children.iter_mut().zip(quads) {
			*slot = self.nodes.len();
			self.nodes.push(QuadNode::empty(quad));
		}
		self.nodes[node_idx].children = Some(children);

		let points = std::mem::take(&mut self.nodes[node_idx].points);
		for (pos, data) in points {
			for &child_idx in &children {
				if self.nodes[child_idx].bounds.contains(pos) {
					self.insert_recursive(child_idx, pos, data, depth + 1);
					break;
				}
			}
		}
	}

	/// Aggregate centers of mass bottom-up. Call after the last insert.
	pub fn calculate_mass(&mut self) {
		self.calculate_mass_recursive(self.root);
	}

	fn calculate_mass_recursive(&mut self, node_idx: usize) -> ((f64, f64), f64) {
		let mut sum = (0.0, 0.0);
		let mut mass = 0.0;
		for &((x, y), _) in &self.nodes[node_idx].points {
			sum = (sum.0 + x, sum.1 + y);
			mass += 1.0;
		}

		if let Some(children) = self.nodes[node_idx].children {
			for child_idx in children {
				let ((cx, cy), child_mass) = self.calculate_mass_recursive(child_idx);
				sum = (sum.0 + cx * child_mass, sum.1 + cy * child_mass);
				mass += child_mass;
			}
		}

		let center = if mass > 0.0 {
			(sum.0 / mass, sum.1 / mass)
		} else {
			(0.0, 0.0)
		};
		self.nodes[node_idx].center_of_mass = center;
		self.nodes[node_idx].total_mass = mass;
		(center, mass)
	}

	/// Barnes-Hut estimate of `sum(mass * (other - point) / dist^2)` over every
	/// point except `exclude`.
	///
	/// Cells not containing `point` whose width over distance is below `theta`
	/// are treated as a single body. Squared distances are floored at
	/// `min_dist_sq`; coincident points contribute nothing.
	pub fn accumulate(
		&self,
		point: (f64, f64),
		exclude: usize,
		theta: f64,
		min_dist_sq: f64,
	) -> (f64, f64) {
		let mut acc = (0.0, 0.0);
		let mut stack = vec![self.root];

		while let Some(node_idx) = stack.pop() {
			let node = &self.nodes[node_idx];
			if node.total_mass == 0.0 {
				continue;
			}

			let (dx, dy) = (node.center_of_mass.0 - point.0, node.center_of_mass.1 - point.1);
			let dist_sq = dx * dx + dy * dy;

			if let Some(children) = node.children {
				let far = node.bounds.width() * node.bounds.width() < theta * theta * dist_sq;
				if far && !node.bounds.contains(point) {
					let w = node.total_mass / dist_sq.max(min_dist_sq);
					acc = (acc.0 + dx * w, acc.1 + dy * w);
				} else {
					stack.extend(children);
				}
				continue;
			}

			for &((x, y), data) in &node.points {
				if data == exclude {
					continue;
				}
				let (dx, dy) = (x - point.0, y - point.1);
				let dist_sq = dx * dx + dy * dy;
				if dist_sq == 0.0 {
					continue;
				}
				let w = 1.0 / dist_sq.max(min_dist_sq);
				acc = (acc.0 + dx * w, acc.1 + dy * w);
			}
		}
		acc
	}

	/// Indices of every point inside `range`.
	pub fn query(&self, range: &Aabb) -> Vec<usize> {
		let mut result = Vec::new();
		let mut stack = vec![self.root];

		while let Some(node_idx) = stack.pop() {
			let node = &self.nodes[node_idx];
			if !node.bounds.intersects(range) {
				continue;
			}
			for &(pos, data) in &node.points {
				if range.contains(pos) {
					result.push(data);
				}
			}
			if let Some(children) = node.children {
				stack.extend(children);
			}
		}
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_and_query() {
		let mut qt = QuadTree::new(Aabb::new((0.0, 0.0), (100.0, 100.0)));
		qt.insert((10.0, 10.0), 1);
		qt.insert((90.0, 90.0), 2);
		qt.insert((50.0, 50.0), 3);

		let results = qt.query(&Aabb::new((0.0, 0.0), (20.0, 20.0)));
		assert_eq!(results, vec![1]);
		assert_eq!(qt.query(&Aabb::new((0.0, 0.0), (100.0, 100.0))).len(), 3);
	}

	#[test]
	fn subdivision_keeps_every_point() {
		let points: Vec<(f64, f64)> = (0..40).map(|i| (i as f64, (i * 7 % 40) as f64)).collect();
		let qt = QuadTree::from_points(&points);
		assert!(qt.nodes[qt.root].children.is_some());
		assert_eq!(qt.nodes[qt.root].total_mass, 40.0);
		let mut all = qt.query(&Aabb::around(points.iter().copied(), 1.0));
		all.sort_unstable();
		assert_eq!(all, (0..40).collect::<Vec<_>>());
	}

	#[test]
	fn accumulate_matches_exact_sum_for_small_sets() {
		let points = vec![(0.0, 0.0), (10.0, 0.0), (0.0, 20.0)];
		let qt = QuadTree::from_points(&points);
		let (ax, ay) = qt.accumulate(points[0], 0, 0.9, 1.0);
		// (10,0)/100 + (0,20)/400
		assert!((ax - 0.1).abs() < 1e-12);
		assert!((ay - 0.05).abs() < 1e-12);
	}

	#[test]
	fn barnes_hut_approximates_far_clusters() {
		let mut points: Vec<(f64, f64)> = (0..64)
			.map(|i| (1000.0 + (i % 8) as f64, 1000.0 + (i / 8) as f64))
			.collect();
		points.push((0.0, 0.0));
		let qt = QuadTree::from_points(&points);
		let approx = qt.accumulate((0.0, 0.0), 64, 0.9, 1.0);
		let exact = points[..64].iter().fold((0.0, 0.0), |acc, &(x, y)| {
			let d2 = x * x + y * y;
			(acc.0 + x / d2, acc.1 + y / d2)
		});
		assert!((approx.0 - exact.0).abs() / exact.0 < 0.01);
		assert!((approx.1 - exact.1).abs() / exact.1 < 0.01);
	}
}
