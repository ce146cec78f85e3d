//! Leptos component wrapping the term graph canvas.
//!
//! The component creates an HTML canvas element and wires up mouse/wheel event
//! handlers to the engine's pointer gestures. An animation loop runs via
//! `requestAnimationFrame`, advancing the engine and drawing its render model
//! each frame, and is cancelled when the component is unmounted.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::config::EngineConfig;
use super::model::NodeFilter;
use super::render;
use super::state::{EngineEvent, GraphEngine};
use super::theme::Theme;
use super::types::RawRecord;

/// Longest frame step fed to the engine, in seconds.
const MAX_FRAME_DT: f64 = 0.1;

/// Bundles the engine with the canvas it draws to.
struct GraphContext {
	engine: GraphEngine,
	ctx: CanvasRenderingContext2d,
	theme: Theme,
	last_frame: Option<f64>,
}

/// Host callbacks, fired after the engine call that produced them.
#[derive(Clone, Copy)]
struct Callbacks {
	on_node_click: Option<Callback<String>>,
	on_node_hover: Option<Callback<Option<String>>>,
	on_filter_change: Option<Callback<Option<String>>>,
}

impl Callbacks {
	fn dispatch(&self, events: Vec<EngineEvent>) {
		for event in events {
			match event {
				EngineEvent::NodeClick(id) => {
					if let Some(cb) = self.on_node_click {
						cb.run(id);
					}
				}
				EngineEvent::NodeHover(id) => {
					if let Some(cb) = self.on_node_hover {
						cb.run(id);
					}
				}
				EngineEvent::FilterChange(value) => {
					if let Some(cb) = self.on_filter_change {
						cb.run(value);
					}
				}
			}
		}
	}
}

type SharedContext = Rc<RefCell<Option<GraphContext>>>;
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;
type ResizeCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Browser-side resources of one mounted canvas, released together on unmount.
struct Handles {
	context: SharedContext,
	animate: FrameCallback,
	resize: ResizeCallback,
}

impl Handles {
	/// Unregister the resize listener and drop the frame closure, which breaks
	/// its self-reference and frees the engine.
	fn release(&self, window: Option<&Window>) {
		if let Some(cb) = self.resize.borrow_mut().take() {
			if let Some(window) = window {
				let _ = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		self.animate.borrow_mut().take();
		if let Some(mut c) = self.context.borrow_mut().take() {
			c.engine.stop();
		}
	}
}

/// Run `f` against the engine, then hand its queued events to the host with the
/// engine borrow released.
fn with_engine(context: &SharedContext, callbacks: Callbacks, f: impl FnOnce(&mut GraphEngine)) {
	let events = match context.borrow_mut().as_mut() {
		Some(c) => {
			f(&mut c.engine);
			c.engine.drain_events()
		}
		None => return,
	};
	callbacks.dispatch(events);
}

fn window_size(window: &Window) -> (f64, f64) {
	let dim = |v: Result<JsValue, JsValue>, fallback: f64| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
	(dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0))
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((ev.client_x() as f64 - rect.left(), ev.client_y() as f64 - rect.top()))
}

/// Renders the interactive term graph on a canvas element.
///
/// Records come in through the reactive `data` signal; each change rebuilds
/// the graph and re-runs the layout. `filter` and `search` are applied to the
/// current graph whenever they change. The component sizes itself to its
/// parent container by default; set `fullscreen = true` to fill the viewport
/// and resize automatically with the window.
#[component]
pub fn ForceGraphCanvas(
	/// Article records; every change rebuilds the graph.
	#[prop(into)]
	data: Signal<Vec<RawRecord>>,
	/// Layout and viewport settings.
	#[prop(default = EngineConfig::default())]
	config: EngineConfig,
	/// Colors.
	#[prop(default = Theme::default())]
	theme: Theme,
	/// Restrict the view to matching nodes.
	#[prop(into, default = Signal::stored(None))]
	filter: Signal<Option<NodeFilter>>,
	/// Highlight nodes whose title contains this text.
	#[prop(into, default = Signal::stored(String::new()))]
	search: Signal<String>,
	/// Called with the id of a clicked node.
	#[prop(optional)]
	on_node_click: Option<Callback<String>>,
	/// Called when the hovered node changes.
	#[prop(optional)]
	on_node_hover: Option<Callback<Option<String>>>,
	/// Called with the new filter label when the filter changes.
	#[prop(optional)]
	on_filter_change: Option<Callback<Option<String>>>,
	/// Fill the window and follow its size.
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed width; defaults to the parent's width.
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed height; defaults to the parent's height.
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let callbacks = Callbacks {
		on_node_click,
		on_node_hover,
		on_filter_change,
	};
	let context: SharedContext = Rc::new(RefCell::new(None));
	let animate: FrameCallback = Rc::new(RefCell::new(None));
	let resize_cb: ResizeCallback = Rc::new(RefCell::new(None));
	let handles = StoredValue::new_local(Handles {
		context: context.clone(),
		animate: animate.clone(),
		resize: resize_cb.clone(),
	});
	let alive = Arc::new(AtomicBool::new(true));
	let frame_id = Arc::new(AtomicI32::new(0));

	let (context_init, animate_init, resize_cb_init) = (context.clone(), animate.clone(), resize_cb.clone());
	let (alive_init, frame_init) = (alive.clone(), frame_id.clone());
	Effect::new(move |_| {
		let records = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			let parent = canvas.parent_element();
			(
				width.unwrap_or_else(|| parent.as_ref().map(|p| p.client_width() as f64).unwrap_or(800.0)),
				height.unwrap_or_else(|| parent.as_ref().map(|p| p.client_height() as f64).unwrap_or(600.0)),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			warn!("term-graph: canvas has no 2d context");
			return;
		};

		let mut engine = GraphEngine::new(
			&records,
			EngineConfig {
				width: w,
				height: h,
				..config.clone()
			},
		);
		if let Some(active) = filter.get_untracked() {
			engine.apply_filter(Some(active));
		}
		engine.search(&search.get_untracked());
		engine.drain_events();
		*context_init.borrow_mut() = Some(GraphContext {
			engine,
			ctx,
			theme: theme.clone(),
			last_frame: None,
		});

		if fullscreen && resize_cb_init.borrow().is_none() {
			let (context_resize, canvas_resize, alive_resize) =
				(context_init.clone(), canvas.clone(), alive_init.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				if !alive_resize.load(Ordering::Relaxed) {
					return;
				}
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(c) = context_resize.borrow_mut().as_mut() {
					c.engine.resize(nw, nh);
				}
			}));
			if let Some(cb) = resize_cb_init.borrow().as_ref() {
				let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		if animate_init.borrow().is_some() {
			return;
		}
		let (context_anim, animate_inner, alive_anim, frame_anim) = (
			context_init.clone(),
			animate_init.clone(),
			alive_init.clone(),
			frame_init.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move |now: f64| {
			if !alive_anim.load(Ordering::Relaxed) {
				if let Some(c) = context_anim.borrow_mut().as_mut() {
					c.engine.stop();
				}
				return;
			}
			if let Some(c) = context_anim.borrow_mut().as_mut() {
				let dt = c.last_frame.map_or(0.016, |last| ((now - last) / 1000.0).clamp(0.0, MAX_FRAME_DT));
				c.last_frame = Some(now);
				c.engine.tick(dt);
				render::render(&c.engine.render_state(&c.theme), &c.ctx, &c.theme);
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				if let Ok(id) = win.request_animation_frame(cb.as_ref().unchecked_ref()) {
					frame_anim.store(id, Ordering::Relaxed);
				}
			}
		}));
		if let Some(cb) = animate_init.borrow().as_ref() {
			if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				frame_init.store(id, Ordering::Relaxed);
			}
		}
	});

	let context_filter = context.clone();
	Effect::new(move |_| {
		let active = filter.get();
		with_engine(&context_filter, callbacks, |engine| {
			if engine.active_filter() != active.as_ref() {
				engine.apply_filter(active);
			}
		});
	});

	let context_search = context.clone();
	Effect::new(move |_| {
		let term = search.get();
		with_engine(&context_search, callbacks, |engine| {
			let matches = engine.search(&term);
			debug!("term-graph: search {:?} matched {} nodes", term, matches);
		});
	});

	on_cleanup(move || {
		alive.store(false, Ordering::Relaxed);
		let window = web_sys::window();
		if let Some(window) = window.as_ref() {
			let _ = window.cancel_animation_frame(frame_id.load(Ordering::Relaxed));
		}
		handles.try_with_value(|h| h.release(window.as_ref()));
		debug!("term-graph: canvas unmounted");
	});

	let context_md = context.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		with_engine(&context_md, callbacks, |engine| engine.pointer_down(x, y));
	};

	let context_mm = context.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		with_engine(&context_mm, callbacks, |engine| engine.pointer_move(x, y));
	};

	let context_mu = context.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let (x, y) = local_point(canvas_ref, &ev).unwrap_or_default();
		with_engine(&context_mu, callbacks, |engine| engine.pointer_up(x, y));
	};

	let context_ml = context.clone();
	let on_mouseleave = move |_: MouseEvent| {
		with_engine(&context_ml, callbacks, |engine| engine.pointer_leave());
	};

	let context_wh = context.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		with_engine(&context_wh, callbacks, |engine| engine.wheel(x, y, ev.delta_y()));
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="term-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
