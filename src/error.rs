//! Errors raised while loading graph input from the host page.
//!
//! The engine itself never fails; only the boundary that pulls JSON out of the
//! DOM does, and the host falls back to defaults when it does.

/// Failure to obtain or parse an embedded JSON document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
	/// No `window`/`document` is available (e.g. running outside a browser).
	#[error("no document available")]
	NoDocument,
	/// The element with the given id does not exist.
	#[error("element #{0} not found")]
	MissingElement(String),
	/// The element exists but is not a `<script>` element.
	#[error("element #{0} is not a script element")]
	NotScript(String),
	/// The element's text is not valid JSON of the expected shape.
	#[error("failed to parse #{id}: {source}")]
	Parse {
		/// Element id, or another name for where the text came from.
		id: String,
		/// Underlying JSON error.
		#[source]
		source: serde_json::Error,
	},
}
