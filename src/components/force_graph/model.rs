//! Canonical graph model built from raw records.
//!
//! Building never fails: duplicate ids keep their first occurrence, relations
//! to unknown ids are dropped, and the result is always a usable graph.

use std::collections::{HashMap, HashSet};

use super::types::RawRecord;

/// Semantics of an edge. Only affects coloring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
	/// Declared by the source record's `children` list.
	Child,
	/// Declared by the target record's `parents` list.
	Parent,
}

/// One concept/article.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	/// Unique identifier from the record.
	pub id: String,
	/// Display label.
	pub title: String,
	/// Short description, if the record had one.
	pub summary: Option<String>,
	/// Category tags in record order.
	pub categories: Vec<String>,
	/// In [0, 1] when present.
	pub generality: Option<f64>,
	/// Relations pointing at this node.
	pub inbound_count: usize,
	/// Relations leaving this node.
	pub outbound_count: usize,
	/// `inbound_count + outbound_count`.
	pub total_connections: usize,
	/// Visual radius, shared by the collision force and the renderer.
	pub radius: f64,
}

impl Node {
	/// Category that drives the fill color.
	pub fn primary_category(&self) -> Option<&str> {
		self.categories.first().map(String::as_str)
	}

	/// Category drawn as the outline.
	pub fn secondary_category(&self) -> Option<&str> {
		self.categories.get(1).map(String::as_str)
	}

	/// Whether the node carries `category`.
	pub fn has_category(&self, category: &str) -> bool {
		self.categories.iter().any(|c| c == category)
	}
}

/// Directed relation between two nodes, stored as indices into [`Graph::nodes`].
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
	/// Index of the parent-side node.
	pub source: usize,
	/// Index of the child-side node.
	pub target: usize,
	/// Similarity score; finite when present.
	pub weight: Option<f64>,
	/// Which relation list declared the edge.
	pub kind: EdgeKind,
}

/// Immutable node and edge set for one input snapshot.
#[derive(Clone, Debug, Default)]
pub struct Graph {
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	index: HashMap<String, usize>,
}

impl Graph {
	/// All nodes, in first-occurrence order.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// All edges, in declaration order.
	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	/// Number of nodes.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of edges.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// True when there are no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Index of the node with `id`.
	pub fn index_of(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	/// Node with `id`.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.index_of(id).map(|i| &self.nodes[i])
	}

	/// Node ids in index order.
	pub fn ids(&self) -> impl Iterator<Item = &str> {
		self.nodes.iter().map(|n| n.id.as_str())
	}

	/// Nodes sharing an edge with `idx`, in either direction. O(E).
	pub fn neighbors(&self, idx: usize) -> HashSet<usize> {
		let mut set = HashSet::new();
		for edge in &self.edges {
			if edge.source == idx && edge.target != idx {
				set.insert(edge.target);
			} else if edge.target == idx && edge.source != idx {
				set.insert(edge.source);
			}
		}
		set
	}

	/// Distinct categories in order of first appearance.
	pub fn categories(&self) -> Vec<String> {
		let mut seen = HashSet::new();
		self.nodes
			.iter()
			.flat_map(|n| n.categories.iter())
			.filter(|c| seen.insert(c.as_str()))
			.cloned()
			.collect()
	}

	/// Smallest and largest edge weight, if any edge has one.
	pub fn weight_domain(&self) -> Option<(f64, f64)> {
		self.edges.iter().filter_map(|e| e.weight).fold(None, |acc, w| match acc {
			None => Some((w, w)),
			Some((lo, hi)) => Some((lo.min(w), hi.max(w))),
		})
	}

	fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
		let index = nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), i))
			.collect();
		Self {
			nodes,
			edges,
			index,
		}
	}
}

/// Build a graph from raw records.
///
/// Emits one node per distinct id (first occurrence wins) and one edge per
/// declared child or parent relation whose endpoints both resolve. Degree
/// counts are left at zero; see [`compute_degrees`].
pub fn build(records: &[RawRecord]) -> Graph {
	let mut nodes = Vec::with_capacity(records.len());
	let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
	let mut kept: Vec<&RawRecord> = Vec::with_capacity(records.len());
	let mut duplicates = 0;
	let mut missing_ids = 0;

	for record in records {
		let Some(id) = record.id.as_deref().filter(|id| !id.is_empty()) else {
			missing_ids += 1;
			continue;
		};
		if index.contains_key(id) {
			log::debug!("term-graph: duplicate id {:?}, keeping first occurrence", id);
			duplicates += 1;
			continue;
		}
		index.insert(id, nodes.len());
		kept.push(record);
		nodes.push(Node {
			id: id.to_string(),
			title: record.title.clone().unwrap_or_else(|| id.to_string()),
			summary: record.summary.clone(),
			categories: record.categories.clone(),
			generality: record.generality.filter(|g| g.is_finite()).map(|g| g.clamp(0.0, 1.0)),
			inbound_count: 0,
			outbound_count: 0,
			total_connections: 0,
			radius: 0.0,
		});
	}

	let mut edges = Vec::new();
	let mut relations = 0;
	let mut resolve = |source: &str, target: &str, weight: Option<f64>, kind: EdgeKind| {
		relations += 1;
		match (index.get(source), index.get(target)) {
			(Some(&s), Some(&t)) if s != t => edges.push(Edge {
				source: s,
				target: t,
				weight: weight.filter(|w| w.is_finite()),
				kind,
			}),
			(Some(_), Some(_)) => {
				log::debug!("term-graph: dropping self relation on {:?}", source);
			}
			_ => {
				log::debug!("term-graph: dropping dangling relation {:?} -> {:?}", source, target);
			}
		}
	};

	for record in &kept {
		let Some(id) = record.id.as_deref() else {
			continue;
		};
		for child in &record.children {
			resolve(id, child.id(), child.similarity(), EdgeKind::Child);
		}
		for parent in &record.parents {
			resolve(parent.id(), id, None, EdgeKind::Parent);
		}
	}

	log::info!(
		"term-graph: built graph with {} nodes, {} edges ({} relations, {} duplicates, {} without id)",
		nodes.len(),
		edges.len(),
		relations,
		duplicates,
		missing_ids
	);
	Graph::from_parts(nodes, edges)
}

/// Annotate each node with inbound, outbound and total edge counts.
pub fn compute_degrees(graph: Graph) -> Graph {
	let Graph {
		mut nodes,
		edges,
		index,
	} = graph;
	for node in &mut nodes {
		node.inbound_count = 0;
		node.outbound_count = 0;
	}
	for edge in &edges {
		nodes[edge.source].outbound_count += 1;
		nodes[edge.target].inbound_count += 1;
	}
	for node in &mut nodes {
		node.total_connections = node.inbound_count + node.outbound_count;
	}
	Graph {
		nodes,
		edges,
		index,
	}
}

/// Clamped linear map from connection count to visual radius.
///
/// Counts are floored at 1 so an isolated node still gets `min_radius`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusScale {
	/// Radius for a single connection.
	pub min_radius: f64,
	/// Radius for the maximum connection count.
	pub max_radius: f64,
	max_connections: usize,
}

impl RadiusScale {
	/// Scale fitted to the largest connection count in `graph`.
	pub fn new(min_radius: f64, max_radius: f64, graph: &Graph) -> Self {
		let max_connections = graph
			.nodes
			.iter()
			.map(|n| n.total_connections.max(1))
			.max()
			.unwrap_or(1);
		Self {
			min_radius,
			max_radius,
			max_connections,
		}
	}

	/// Radius for a node with `connections` relations.
	pub fn radius(&self, connections: usize) -> f64 {
		let c = connections.max(1);
		if self.max_connections <= 1 {
			return self.min_radius;
		}
		let t = (c - 1) as f64 / (self.max_connections - 1) as f64;
		(self.min_radius + t * (self.max_radius - self.min_radius))
			.clamp(self.min_radius, self.max_radius)
	}
}

/// Set every node's radius from its connection count.
pub fn assign_radii(graph: Graph, min_radius: f64, max_radius: f64) -> Graph {
	let scale = RadiusScale::new(min_radius, max_radius, &graph);
	let Graph {
		mut nodes,
		edges,
		index,
	} = graph;
	for node in &mut nodes {
		node.radius = scale.radius(node.total_connections);
	}
	Graph {
		nodes,
		edges,
		index,
	}
}

/// Induced subgraph over nodes matching `predicate`.
///
/// Nodes keep the metrics computed on the parent graph, so sizes stay stable
/// while filtering.
pub fn filter(graph: &Graph, predicate: impl Fn(&Node) -> bool) -> Graph {
	let mut remap = vec![None; graph.nodes.len()];
	let mut nodes = Vec::new();
	for (i, node) in graph.nodes.iter().enumerate() {
		if predicate(node) {
			remap[i] = Some(nodes.len());
			nodes.push(node.clone());
		}
	}
	let edges = graph
		.edges
		.iter()
		.filter_map(|e| {
			Some(Edge {
				source: remap[e.source]?,
				target: remap[e.target]?,
				..e.clone()
			})
		})
		.collect();
	Graph::from_parts(nodes, edges)
}

/// A value-level node predicate, so the active filter can be reported back to
/// the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeFilter {
	/// Nodes tagged with this category.
	Category(String),
	/// Nodes whose title contains this text, case-insensitively.
	TitleContains(String),
	/// Nodes with one of these ids.
	Ids(Vec<String>),
}

impl NodeFilter {
	/// Whether `node` passes this filter.
	pub fn matches(&self, node: &Node) -> bool {
		match self {
			NodeFilter::Category(category) => node.has_category(category),
			NodeFilter::TitleContains(text) => {
				node.title.to_lowercase().contains(&text.to_lowercase())
			}
			NodeFilter::Ids(ids) => ids.iter().any(|id| *id == node.id),
		}
	}

	/// Short value reported to the host on filter changes.
	pub fn label(&self) -> String {
		match self {
			NodeFilter::Category(category) => category.clone(),
			NodeFilter::TitleContains(text) => text.clone(),
			NodeFilter::Ids(ids) => ids.join(","),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Vec<RawRecord> {
		vec![
			RawRecord::new("a", "Alpha")
				.with_categories(["CORE"])
				.with_child("b", Some(0.9))
				.with_child("ghost", Some(0.5)),
			RawRecord::new("b", "Beta").with_categories(["ARCH", "CORE"]).with_parent("a"),
			RawRecord::new("c", "Gamma").with_categories(["MATH"]),
			RawRecord::new("a", "Alpha again").with_child("c", None),
		]
	}

	#[test]
	fn build_dedups_and_drops_dangling() {
		let graph = build(&sample());
		assert_eq!(graph.node_count(), 3);
		assert_eq!(graph.node("a").unwrap().title, "Alpha");
		// a->b (child), a->b (parent); ghost and the duplicate's relation are gone.
		assert_eq!(graph.edge_count(), 2);
		let kinds: Vec<_> = graph.edges().iter().map(|e| e.kind).collect();
		assert_eq!(kinds, vec![EdgeKind::Child, EdgeKind::Parent]);
		assert_eq!(graph.edges()[0].weight, Some(0.9));
	}

	#[test]
	fn degrees_count_parallel_edges_independently() {
		let graph = compute_degrees(build(&sample()));
		let a = graph.node("a").unwrap();
		let b = graph.node("b").unwrap();
		let c = graph.node("c").unwrap();
		assert_eq!((a.outbound_count, a.inbound_count, a.total_connections), (2, 0, 2));
		assert_eq!((b.outbound_count, b.inbound_count, b.total_connections), (0, 2, 2));
		assert_eq!(c.total_connections, 0);
	}

	#[test]
	fn radius_floor_applies_to_isolated_nodes() {
		let graph = assign_radii(compute_degrees(build(&sample())), 5.0, 30.0);
		assert_eq!(graph.node("c").unwrap().radius, 5.0);
		assert_eq!(graph.node("a").unwrap().radius, 30.0);
	}

	#[test]
	fn radius_scale_is_clamped_linear() {
		let graph = compute_degrees(build(&[
			RawRecord::new("hub", "Hub")
				.with_child("x", None)
				.with_child("y", None)
				.with_child("z", None)
				.with_child("w", None),
			RawRecord::new("x", "X"),
			RawRecord::new("y", "Y"),
			RawRecord::new("z", "Z"),
			RawRecord::new("w", "W"),
		]));
		let scale = RadiusScale::new(10.0, 40.0, &graph);
		assert_eq!(scale.radius(0), 10.0);
		assert_eq!(scale.radius(1), 10.0);
		assert_eq!(scale.radius(4), 40.0);
		assert_eq!(scale.radius(99), 40.0);
		assert!((scale.radius(2) - 20.0).abs() < 1e-9);
	}

	#[test]
	fn filter_induces_subgraph() {
		let graph = compute_degrees(build(&sample()));
		let core = filter(&graph, |n| n.has_category("CORE"));
		assert_eq!(core.ids().collect::<Vec<_>>(), vec!["a", "b"]);
		assert_eq!(core.edge_count(), 2);
		assert_eq!(core.node("b").unwrap().total_connections, 2);

		let math = filter(&graph, |n| n.has_category("MATH"));
		assert_eq!(math.node_count(), 1);
		assert_eq!(math.edge_count(), 0);
		assert_eq!(math.index_of("c"), Some(0));
	}

	#[test]
	fn neighbors_are_undirected() {
		let graph = build(&sample());
		let a = graph.index_of("a").unwrap();
		let b = graph.index_of("b").unwrap();
		assert_eq!(graph.neighbors(a), HashSet::from([b]));
		assert_eq!(graph.neighbors(b), HashSet::from([a]));
		assert!(graph.neighbors(graph.index_of("c").unwrap()).is_empty());
	}

	#[test]
	fn non_finite_weights_are_discarded() {
		let graph = build(&[
			RawRecord::new("a", "A").with_child("b", Some(f64::NAN)),
			RawRecord::new("b", "B"),
		]);
		assert_eq!(graph.edges()[0].weight, None);
		assert_eq!(graph.weight_domain(), None);
	}

	#[test]
	fn node_filter_variants() {
		let graph = build(&sample());
		let beta = graph.node("b").unwrap();
		assert!(NodeFilter::Category("CORE".into()).matches(beta));
		assert!(NodeFilter::TitleContains("BET".into()).matches(beta));
		assert!(!NodeFilter::Ids(vec!["a".into()]).matches(beta));
		assert_eq!(graph.categories(), vec!["CORE", "ARCH", "MATH"]);
	}
}
