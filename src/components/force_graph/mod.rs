//! Interactive term graph: model, force layout and interaction engine.
//!
//! Data flows one way:
//! - [`types`] ingests raw article records,
//! - [`model`] builds the immutable [`Graph`] with degrees and radii,
//! - [`simulation`] lays it out with a deterministic force solver,
//! - [`state`] owns the engine instance (layout, filter, viewport, hover and
//!   selection) and projects it through [`view_model`] into a [`RenderModel`]
//!   that the canvas renderer draws.
//!
//! # Example
//!
//! ```ignore
//! use term_graph::{ForceGraphCanvas, RawRecord};
//!
//! let records = vec![
//!     RawRecord::new("attention", "Attention").with_child("transformer", Some(0.8)),
//!     RawRecord::new("transformer", "Transformer"),
//! ];
//!
//! view! { <ForceGraphCanvas data=Signal::stored(records) fullscreen=true /> }
//! ```

mod component;
pub mod config;
pub mod model;
mod quadtree;
mod render;
pub mod scale;
pub mod seed;
pub mod simulation;
pub mod state;
pub mod theme;
pub mod types;
pub mod view_model;

pub use component::ForceGraphCanvas;
pub use config::EngineConfig;
pub use model::{Edge, EdgeKind, Graph, Node, NodeFilter};
pub use seed::SeedStrategy;
pub use simulation::{Body, Layout, Simulation};
pub use state::{EngineEvent, GraphEngine, Interaction, ViewTransform};
pub use theme::Theme;
pub use types::{RawRecord, parse_records};
pub use view_model::{RenderModel, compute_render_state};
