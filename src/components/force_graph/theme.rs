//! Colors for categories, edge kinds and emphasis states.

use super::model::EdgeKind;

/// RGBA color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Opacity in [0, 1].
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with opacity `a`.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same color with opacity `a`.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Move towards white by `factor` (0 = unchanged, 1 = white).
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		let up = |c: u8| (c as f64 + (255.0 - c as f64) * f) as u8;
		Self {
			r: up(self.r),
			g: up(self.g),
			b: up(self.b),
			a: self.a,
		}
	}

	/// Move towards black by `factor` (0 = unchanged, 1 = black).
	pub fn darken(self, factor: f64) -> Self {
		let f = 1.0 - factor.clamp(0.0, 1.0);
		let down = |c: u8| (c as f64 * f) as u8;
		Self {
			r: down(self.r),
			g: down(self.g),
			b: down(self.b),
			a: self.a,
		}
	}

	/// CSS color string.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// Parse `#rrggbb`; anything else yields `None`.
	pub fn from_hex(hex: &str) -> Option<Self> {
		let digits = hex.strip_prefix('#')?;
		if digits.len() != 6 {
			return None;
		}
		let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
		Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
	}
}

/// Categories with a fixed color and legend description.
pub const KNOWN_CATEGORIES: [(&str, &str, Color); 7] = [
	("CORE", "Core AI Concepts", Color::rgb(31, 119, 180)),
	("ARCH", "Architecture & Models", Color::rgb(255, 127, 14)),
	("IMPL", "Implementation & Tools", Color::rgb(44, 160, 44)),
	("DATA", "Data Processing", Color::rgb(214, 39, 40)),
	("MATH", "Mathematical Foundations", Color::rgb(148, 103, 189)),
	("BIO", "Biological & Neural", Color::rgb(140, 86, 75)),
	("GOV", "Governance & Ethics", Color::rgb(227, 119, 194)),
];

/// Legend text for a category; unknown categories describe themselves.
pub fn category_description(category: &str) -> &str {
	KNOWN_CATEGORIES
		.iter()
		.find(|(name, _, _)| *name == category)
		.map(|(_, description, _)| *description)
		.unwrap_or(category)
}

/// Complete visual theme.
#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
	/// Canvas fill.
	pub background: Color,
	/// Fill for nodes without categories.
	pub uncategorized: Color,
	/// Fallback colors for categories outside [`KNOWN_CATEGORIES`].
	pub palette: Vec<Color>,
	/// Color of parent edges.
	pub parent_edge: Color,
	/// Color of child edges.
	pub child_edge: Color,
	/// Resting edge opacity.
	pub edge_opacity: f64,
	/// Opacity of edges touching the focused node.
	pub incident_edge_opacity: f64,
	/// Opacity of every other edge while something is focused.
	pub faded_edge_opacity: f64,
	/// Opacity of nodes and labels outside the focused neighborhood.
	pub dimmed_opacity: f64,
	/// Outline for neighbors of the focused node.
	pub neighbor_outline: Color,
	/// How much search matches are brightened.
	pub match_brighten: f64,
	/// Label text color.
	pub label: Color,
	/// Tooltip box fill.
	pub tooltip_background: Color,
	/// Tooltip text color.
	pub tooltip_text: Color,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			background: Color::rgb(249, 250, 251),
			uncategorized: Color::rgb(147, 197, 253),
			palette: vec![
				Color::rgb(127, 127, 127),
				Color::rgb(188, 189, 34),
				Color::rgb(23, 190, 207),
				Color::rgb(174, 199, 232),
				Color::rgb(255, 187, 120),
				Color::rgb(152, 223, 138),
			],
			parent_edge: Color::rgb(59, 130, 246),
			child_edge: Color::rgb(147, 197, 253),
			edge_opacity: 0.3,
			incident_edge_opacity: 0.7,
			faded_edge_opacity: 0.15,
			dimmed_opacity: 0.1,
			neighbor_outline: Color::rgb(255, 153, 0),
			match_brighten: 0.5,
			label: Color::rgb(30, 58, 138),
			tooltip_background: Color::rgba(255, 255, 255, 0.92),
			tooltip_text: Color::rgb(17, 24, 39),
		}
	}
}

impl Theme {
	/// Fixed color for known categories, a hashed palette entry otherwise.
	pub fn category_color(&self, category: &str) -> Color {
		if let Some((_, _, color)) = KNOWN_CATEGORIES.iter().find(|(name, _, _)| *name == category) {
			return *color;
		}
		if self.palette.is_empty() {
			return self.uncategorized;
		}
		let hash = category.bytes().fold(0usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
		self.palette[hash % self.palette.len()]
	}

	/// Fill for a node whose first category is `primary`.
	pub fn fill_for(&self, primary: Option<&str>) -> Color {
		primary.map_or(self.uncategorized, |c| self.category_color(c))
	}

	/// Stroke color for an edge of `kind`.
	pub fn edge_color(&self, kind: EdgeKind) -> Color {
		match kind {
			EdgeKind::Parent => self.parent_edge,
			EdgeKind::Child => self.child_edge,
		}
	}
}
