//! term-graph: interactive force-directed map of AI/ML terms.
//!
//! This crate provides a WASM-based graph visualization component that lays
//! out articles and their relations with a deterministic force solver, and
//! supports hover/selection highlighting, category filtering, search,
//! dragging, pan and zoom.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::HtmlScriptElement;

pub mod components;
pub mod error;

pub use components::force_graph::{
	EngineConfig, EngineEvent, ForceGraphCanvas, Graph, GraphEngine, NodeFilter, RawRecord, RenderModel,
	Theme, parse_records,
};
pub use error::LoadError;

use components::force_graph::theme::{KNOWN_CATEGORIES, category_description};

/// Id of the script element holding the article records.
pub const DATA_ELEMENT_ID: &str = "graph-data";
/// Id of the optional script element holding engine configuration.
pub const CONFIG_ELEMENT_ID: &str = "graph-config";

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("term-graph: logging initialized");
}

fn script_text(id: &str) -> Result<String, LoadError> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or(LoadError::NoDocument)?;
	let element = document
		.get_element_by_id(id)
		.ok_or_else(|| LoadError::MissingElement(id.to_string()))?;
	let script: HtmlScriptElement = element
		.dyn_into()
		.map_err(|_| LoadError::NotScript(id.to_string()))?;
	Ok(script.text().unwrap_or_default())
}

/// Load article records from the `<script id="graph-data">` element.
/// Expected format: a JSON array of records.
pub fn load_graph_data() -> Result<Vec<RawRecord>, LoadError> {
	let records = parse_records(DATA_ELEMENT_ID, &script_text(DATA_ELEMENT_ID)?)?;
	info!("term-graph: loaded {} records", records.len());
	Ok(records)
}

/// Load engine configuration from the `<script id="graph-config">` element.
pub fn load_config() -> Result<EngineConfig, LoadError> {
	let text = script_text(CONFIG_ELEMENT_ID)?;
	EngineConfig::from_json(&text).map_err(|source| LoadError::Parse {
		id: CONFIG_ELEMENT_ID.to_string(),
		source,
	})
}

/// Categories in order of first appearance, known ones first.
fn legend_categories(records: &[RawRecord]) -> Vec<String> {
	let mut seen: Vec<String> = Vec::new();
	for category in records.iter().flat_map(|r| r.categories.iter()) {
		if !seen.contains(category) {
			seen.push(category.clone());
		}
	}
	seen.sort_by_key(|c| {
		KNOWN_CATEGORIES
			.iter()
			.position(|(name, _, _)| *name == c.as_str())
			.unwrap_or(KNOWN_CATEGORIES.len())
	});
	seen
}

/// Main application component.
/// Loads records and configuration from the DOM and renders the term map with
/// a search box and a category legend.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let records = load_graph_data().unwrap_or_else(|e| {
		warn!("term-graph: {}, showing an empty graph", e);
		Vec::new()
	});
	let config = match load_config() {
		Ok(config) => config,
		Err(LoadError::MissingElement(_)) => EngineConfig::default(),
		Err(e) => {
			warn!("term-graph: {}, using default configuration", e);
			EngineConfig::default()
		}
	};
	let categories = legend_categories(&records);
	let data = Signal::stored(records);

	let (search, set_search) = signal(String::new());
	let (filter, set_filter) = signal(None::<NodeFilter>);
	let (selected, set_selected) = signal(None::<String>);

	let toggle = move |category: String| {
		set_filter.update(|f| {
			*f = match f {
				Some(NodeFilter::Category(active)) if *active == category => None,
				_ => Some(NodeFilter::Category(category)),
			};
		});
	};

	let legend = categories
		.into_iter()
		.map(|category| {
			let label = format!("{} ({})", category_description(&category), category);
			let (is_active, on_click) = (category.clone(), category);
			view! {
				<button
					class="legend-item"
					class:active=move || matches!(filter.get(), Some(NodeFilter::Category(c)) if c == is_active)
					on:click=move |_| toggle(on_click.clone())
				>
					{label}
				</button>
			}
		})
		.collect_view();

	view! {
		<Html attr:lang="en" attr:dir="ltr" />
		<Title text="AI Terms Map" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<ForceGraphCanvas
				data=data
				config=config
				filter=filter
				search=search
				on_node_click=Callback::new(move |id: String| set_selected.set(Some(id)))
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"AI Terms Map"</h1>
				<p class="subtitle">"Hover to explore. Click to select. Drag nodes to reposition. Scroll to zoom."</p>
				<input
					type="search"
					placeholder="Search terms"
					prop:value=search
					on:input=move |ev| set_search.set(event_target_value(&ev))
				/>
				<div class="legend">{legend}</div>
				<Show when=move || selected.get().is_some()>
					<p class="selection">"Last clicked: " {move || selected.get().unwrap_or_default()}</p>
				</Show>
			</div>
		</div>
	}
}
