//! End-to-end behavior of the term graph engine through its public API.

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;
use term_graph::components::force_graph::model::{assign_radii, build, compute_degrees};
use term_graph::components::force_graph::{
	EngineConfig, EngineEvent, Graph, GraphEngine, Interaction, NodeFilter, RawRecord, Simulation,
	ViewTransform, parse_records,
};

fn prepared(records: &[RawRecord], config: &EngineConfig) -> Graph {
	assign_radii(compute_degrees(build(records)), config.min_radius, config.max_radius)
}

fn edge_set(graph: &Graph) -> BTreeSet<(String, String)> {
	graph
		.edges()
		.iter()
		.map(|e| (graph.nodes()[e.source].id.clone(), graph.nodes()[e.target].id.clone()))
		.collect()
}

fn node_set(graph: &Graph) -> BTreeSet<String> {
	graph.ids().map(str::to_string).collect()
}

fn assert_no_overlap(engine: &GraphEngine) {
	let graph = engine.graph();
	let layout = engine.layout();
	for i in 0..graph.node_count() {
		for j in (i + 1)..graph.node_count() {
			let (a, b) = (layout.position(i).unwrap(), layout.position(j).unwrap());
			let dist = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
			let min = graph.nodes()[i].radius + graph.nodes()[j].radius;
			assert!(
				dist >= min - 1e-6,
				"{} and {} overlap: {} < {}",
				graph.nodes()[i].id,
				graph.nodes()[j].id,
				dist,
				min
			);
		}
	}
}

/// Small taxonomy resembling the article site's data.
fn taxonomy() -> Vec<RawRecord> {
	vec![
		RawRecord::new("ml", "Machine Learning")
			.with_categories(["CORE"])
			.with_child("dl", Some(0.9))
			.with_child("rl", Some(0.7)),
		RawRecord::new("dl", "Deep Learning")
			.with_categories(["CORE", "ARCH"])
			.with_child("cnn", Some(0.8))
			.with_child("transformer", Some(0.85)),
		RawRecord::new("cnn", "Convolutional Neural Network").with_categories(["ARCH"]),
		RawRecord::new("transformer", "Transformer")
			.with_categories(["ARCH"])
			.with_child("attention", Some(0.95)),
		RawRecord::new("attention", "Attention Mechanism").with_categories(["ARCH", "MATH"]),
		RawRecord::new("rl", "Reinforcement Learning").with_categories(["CORE"]),
		RawRecord::new("gd", "Gradient Descent")
			.with_categories(["MATH"])
			.with_parent("ml"),
		RawRecord::new("bias", "Algorithmic Bias").with_categories(["GOV"]),
	]
}

#[test]
fn example_scenario() {
	let records = parse_records(
		"example",
		r#"[{"id":"a","title":"A","children":[{"id":"b","similarity":0.9}]},{"id":"b","title":"B"}]"#,
	)
	.unwrap();
	let engine = GraphEngine::new(&records, EngineConfig::default());
	let graph = engine.graph();
	assert_eq!(graph.node_count(), 2);
	assert_eq!(graph.edge_count(), 1);
	let edge = &graph.edges()[0];
	assert_eq!(graph.nodes()[edge.source].id, "a");
	assert_eq!(graph.nodes()[edge.target].id, "b");
	assert_eq!(edge.weight, Some(0.9));

	assert_eq!(engine.simulation().ticks(), 300);
	let a = engine.layout().position(0).unwrap();
	let b = engine.layout().position(1).unwrap();
	assert!(a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite());
	assert_ne!(a, b);
	assert_no_overlap(&engine);
}

#[test]
fn loosely_typed_records_still_become_nodes() {
	let records = parse_records(
		"example",
		r#"[
			{"id":"a","title":"A","children":[{"id":"b","similarity":"high"}]},
			{"id":"b","categories":null},
			{"id":"c","children":[null,"b"]}
		]"#,
	)
	.unwrap();
	let graph = build(&records);
	let nodes: BTreeSet<String> = ["a", "b", "c"].map(String::from).into();
	assert_eq!(node_set(&graph), nodes);
	let edges: BTreeSet<(String, String)> = [("a", "b"), ("c", "b")]
		.map(|(s, t)| (s.to_string(), t.to_string()))
		.into();
	assert_eq!(edge_set(&graph), edges);
	assert_eq!(graph.edges()[0].weight, None);
}

#[test]
fn settled_taxonomy_has_no_overlaps() {
	let engine = GraphEngine::new(&taxonomy(), EngineConfig::default());
	assert!(!engine.simulation().is_running());
	assert_no_overlap(&engine);
}

#[test]
fn live_mode_converges_without_overlaps() {
	let mut engine = GraphEngine::new(
		&taxonomy(),
		EngineConfig {
			settle_ticks: 0,
			..EngineConfig::default()
		},
	);
	let mut frames = 0;
	while engine.simulation().is_running() && frames < 2000 {
		engine.tick(0.016);
		frames += 1;
	}
	assert!(!engine.simulation().is_running());
	assert_no_overlap(&engine);
}

#[test]
fn pinned_node_keeps_its_position() {
	let config = EngineConfig::default();
	let graph = prepared(&taxonomy(), &config);
	let mut sim = Simulation::new(&graph, &config, None);
	let idx = graph.index_of("transformer").unwrap();
	sim.pin(idx, 123.5, 456.25);
	for _ in 0..150 {
		sim.tick();
	}
	sim.settle(10);
	assert_eq!(sim.layout().position(idx), Some((123.5, 456.25)));
}

#[test]
fn filter_is_idempotent() {
	let mut engine = GraphEngine::new(&taxonomy(), EngineConfig::default());
	engine.apply_filter(Some(NodeFilter::Category("ARCH".into())));
	let (nodes, edges) = (node_set(engine.graph()), edge_set(engine.graph()));
	engine.apply_filter(Some(NodeFilter::Category("ARCH".into())));
	assert_eq!(node_set(engine.graph()), nodes);
	assert_eq!(edge_set(engine.graph()), edges);

	let expected: BTreeSet<String> = ["dl", "cnn", "transformer", "attention"].map(String::from).into();
	assert_eq!(nodes, expected);
	assert!(edges.contains(&("transformer".into(), "attention".into())));
	assert!(!edges.iter().any(|(s, t)| s == "ml" || t == "ml"));
}

#[test]
fn filtered_view_keeps_full_graph_metrics() {
	let mut engine = GraphEngine::new(&taxonomy(), EngineConfig::default());
	let full_radius = engine.full_graph().node("dl").unwrap().radius;
	engine.apply_filter(Some(NodeFilter::Category("ARCH".into())));
	let dl = engine.graph().node("dl").unwrap();
	assert_eq!(dl.total_connections, 3);
	assert_eq!(dl.radius, full_radius);
	assert_no_overlap(&engine);
}

#[test]
fn toggle_selection() {
	let mut engine = GraphEngine::new(&taxonomy(), EngineConfig::default());
	engine.click_node("dl");
	assert_eq!(engine.mode(), &Interaction::Selected("dl".into()));
	engine.click_node("dl");
	assert_eq!(engine.mode(), &Interaction::Idle);
	engine.click_node("dl");
	engine.click_background();
	assert_eq!(engine.mode(), &Interaction::Idle);
	assert_eq!(
		engine.drain_events(),
		vec![
			EngineEvent::NodeClick("dl".into()),
			EngineEvent::NodeClick("dl".into()),
			EngineEvent::NodeClick("dl".into()),
		]
	);
}

#[test]
fn focus_dims_non_neighbors_in_render_model() {
	let mut engine = GraphEngine::new(&taxonomy(), EngineConfig::default());
	engine.hover(Some("transformer"));
	engine.finish_transitions();
	let theme = term_graph::Theme::default();
	let model = engine.render_state(&theme);

	let bright: HashSet<&str> = model
		.nodes
		.iter()
		.filter(|n| n.opacity == 1.0)
		.map(|n| n.id.as_str())
		.collect();
	assert_eq!(bright, HashSet::from(["transformer", "dl", "attention"]));
	assert_eq!(model.nodes.last().unwrap().id, "transformer");
	assert_eq!(model.edges.iter().filter(|e| e.incident).count(), 2);
	let tooltip = model.tooltip.unwrap();
	assert_eq!(tooltip.title, "Transformer");
	assert_eq!(tooltip.connections, 2);
	assert_eq!(model.stats, "Nodes: 8 | Connections: 6");
}

#[test]
fn search_highlights_without_changing_selection() {
	let mut engine = GraphEngine::new(&taxonomy(), EngineConfig::default());
	engine.click_node("bias");
	assert_eq!(engine.search("learning"), 3);
	engine.finish_transitions();
	assert_eq!(engine.mode(), &Interaction::Selected("bias".into()));
	let model = engine.render_state(&term_graph::Theme::default());
	assert_eq!(model.nodes.iter().filter(|n| n.is_match).count(), 3);
}

proptest! {
	#[test]
	fn duplicate_ids_keep_first_occurrence(ids in prop::collection::vec(0u8..6, 0..30)) {
		let records: Vec<RawRecord> = ids
			.iter()
			.enumerate()
			.map(|(i, id)| RawRecord::new(format!("n{id}"), format!("title {i}")))
			.collect();
		let graph = build(&records);
		let distinct: BTreeSet<u8> = ids.iter().copied().collect();
		prop_assert_eq!(graph.node_count(), distinct.len());
		for id in distinct {
			let first = ids.iter().position(|&x| x == id).unwrap();
			let node = graph.node(&format!("n{id}")).unwrap();
			prop_assert_eq!(&node.title, &format!("title {first}"));
		}
	}

	#[test]
	fn dangling_relations_are_dropped(
		relations in prop::collection::vec((0u8..5, 0u8..10, prop::bool::ANY), 0..40)
	) {
		let mut records: Vec<RawRecord> = (0..5).map(|i| RawRecord::new(format!("n{i}"), format!("N{i}"))).collect();
		for &(from, to, as_child) in &relations {
			let record = &mut records[from as usize];
			*record = if as_child {
				record.clone().with_child(format!("n{to}"), None)
			} else {
				record.clone().with_parent(format!("n{to}"))
			};
		}
		let graph = build(&records);
		prop_assert!(graph.edge_count() <= relations.len());
		for edge in graph.edges() {
			prop_assert!(edge.source < 5 && edge.target < 5);
			prop_assert_ne!(edge.source, edge.target);
		}
		let resolvable = relations.iter().filter(|&&(from, to, _)| to < 5 && from != to).count();
		prop_assert_eq!(graph.edge_count(), resolvable);
	}

	#[test]
	fn radius_never_below_minimum(
		edges in prop::collection::vec((0u8..12, 0u8..12), 0..50),
		min_radius in 1.0f64..20.0,
		span in 0.0f64..50.0,
	) {
		let mut records: Vec<RawRecord> = (0..12).map(|i| RawRecord::new(format!("n{i}"), format!("N{i}"))).collect();
		for &(s, t) in &edges {
			let record = &mut records[s as usize];
			*record = record.clone().with_child(format!("n{t}"), None);
		}
		let graph = assign_radii(compute_degrees(build(&records)), min_radius, min_radius + span);
		for node in graph.nodes() {
			prop_assert!(node.radius >= min_radius);
			prop_assert!(node.radius <= min_radius + span + 1e-9);
		}
	}

	#[test]
	fn zoom_is_clamped(k in -50.0f64..50.0, zoom_min in 0.05f64..1.0, zoom_max in 1.0f64..20.0) {
		let mut engine = GraphEngine::new(
			&[],
			EngineConfig { zoom_min, zoom_max, settle_ticks: 0, ..EngineConfig::default() },
		);
		engine.set_zoom(ViewTransform { x: 0.0, y: 0.0, k });
		prop_assert_eq!(engine.transform().k, zoom_min.max(zoom_max.min(k)));
	}
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(12))]

	#[test]
	fn settled_layouts_never_overlap(edges in prop::collection::vec((0u8..20, 0u8..20), 0..40)) {
		let mut records: Vec<RawRecord> = (0..20).map(|i| RawRecord::new(format!("n{i}"), format!("N{i}"))).collect();
		for &(s, t) in &edges {
			let record = &mut records[s as usize];
			*record = record.clone().with_child(format!("n{t}"), None);
		}
		let engine = GraphEngine::new(&records, EngineConfig::default());
		assert_no_overlap(&engine);
	}
}
