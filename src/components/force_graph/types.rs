//! Raw input records as they arrive from the content pipeline.
//!
//! Records are deliberately loose: every field except `id` may be missing and
//! relations may point at ids that never show up. The model builder is the one
//! place that turns this into a canonical graph.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::LoadError;

/// A reference to a child term, optionally carrying a similarity score.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChildRef {
	/// Bare id string.
	Id(String),
	/// Object form, `{ "id": "...", "similarity": 0.8 }`.
	Ref {
		/// Target id.
		#[serde(alias = "slug")]
		id: String,
		/// Similarity in `[0, 1]`; anything non-numeric counts as missing.
		#[serde(default, deserialize_with = "lenient")]
		similarity: Option<f64>,
	},
}

impl ChildRef {
	/// Id of the referenced child.
	pub fn id(&self) -> &str {
		match self {
			ChildRef::Id(id) | ChildRef::Ref { id, .. } => id,
		}
	}

	/// Declared similarity, if any.
	pub fn similarity(&self) -> Option<f64> {
		match self {
			ChildRef::Id(_) => None,
			ChildRef::Ref { similarity, .. } => *similarity,
		}
	}
}

/// A reference to a parent term.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParentRef {
	/// Bare id string.
	Id(String),
	/// Object form, `{ "id": "..." }`.
	Ref {
		/// Target id.
		#[serde(alias = "slug")]
		id: String,
	},
}

impl ParentRef {
	/// Id of the referenced parent.
	pub fn id(&self) -> &str {
		match self {
			ParentRef::Id(id) | ParentRef::Ref { id } => id,
		}
	}
}

/// One term/article record. Unknown fields are ignored, and a field of the
/// wrong shape counts as missing rather than rejecting the record.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RawRecord {
	/// Unique identifier. Records without one are dropped by the builder.
	#[serde(default, alias = "slug", deserialize_with = "lenient")]
	pub id: Option<String>,
	/// Display label. Falls back to the id when missing.
	#[serde(default, alias = "name", deserialize_with = "lenient")]
	pub title: Option<String>,
	/// Short description shown in the tooltip.
	#[serde(default, deserialize_with = "lenient")]
	pub summary: Option<String>,
	/// Category tags; the first drives fill color, the second the outline.
	#[serde(default, deserialize_with = "lenient_list")]
	pub categories: Vec<String>,
	/// Position on the specific-to-general axis, used by the radial seed.
	#[serde(default, deserialize_with = "lenient")]
	pub generality: Option<f64>,
	/// Outgoing relations. Malformed entries are skipped one by one.
	#[serde(default, deserialize_with = "lenient_list")]
	pub children: Vec<ChildRef>,
	/// Incoming relations. Malformed entries are skipped one by one.
	#[serde(default, deserialize_with = "lenient_list")]
	pub parents: Vec<ParentRef>,
}

/// `null` or a value of the wrong type reads as `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let value = Value::deserialize(deserializer)?;
	if value.is_null() {
		return Ok(None);
	}
	match serde_json::from_value(value) {
		Ok(v) => Ok(Some(v)),
		Err(e) => {
			log::debug!("term-graph: ignoring malformed field: {}", e);
			Ok(None)
		}
	}
}

/// Keeps the well-formed entries of a list; anything but a list reads as empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let items = match Value::deserialize(deserializer)? {
		Value::Array(items) => items,
		Value::Null => return Ok(Vec::new()),
		other => {
			log::debug!("term-graph: ignoring non-list field: {}", other);
			return Ok(Vec::new());
		}
	};
	Ok(items
		.into_iter()
		.filter_map(|item| match serde_json::from_value(item) {
			Ok(v) => Some(v),
			Err(e) => {
				log::debug!("term-graph: skipping malformed entry: {}", e);
				None
			}
		})
		.collect())
}

impl RawRecord {
	/// Convenience constructor used by hosts building records in code.
	pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			id: Some(id.into()),
			title: Some(title.into()),
			..Self::default()
		}
	}

	/// Add a child relation with an optional similarity.
	pub fn with_child(mut self, id: impl Into<String>, similarity: Option<f64>) -> Self {
		self.children.push(ChildRef::Ref {
			id: id.into(),
			similarity,
		});
		self
	}

	/// Add a parent relation.
	pub fn with_parent(mut self, id: impl Into<String>) -> Self {
		self.parents.push(ParentRef::Id(id.into()));
		self
	}

	/// Replace the category tags.
	pub fn with_categories<I, S>(mut self, categories: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.categories = categories.into_iter().map(Into::into).collect();
		self
	}
}

/// Parse a JSON array of records, dropping individual entries that are not
/// records at all instead of rejecting the whole document.
///
/// `source` names the origin of the text and only shows up in errors.
pub fn parse_records(source: &str, json: &str) -> Result<Vec<RawRecord>, LoadError> {
	let values: Vec<Value> = serde_json::from_str(json).map_err(|e| LoadError::Parse {
		id: source.to_string(),
		source: e,
	})?;

	let total = values.len();
	let records: Vec<RawRecord> = values
		.into_iter()
		.enumerate()
		.filter_map(|(i, value)| match serde_json::from_value::<RawRecord>(value) {
			Ok(record) => Some(record),
			Err(e) => {
				log::debug!("term-graph: dropping malformed record #{}: {}", i, e);
				None
			}
		})
		.collect();

	if records.len() < total {
		log::info!(
			"term-graph: kept {} of {} records from {}",
			records.len(),
			total,
			source
		);
	}
	Ok(records)
}
