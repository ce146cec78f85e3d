//! Canvas rendering of a [`RenderModel`].
//!
//! Rendering uses multiple passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Edges, then nodes in model order, then labels (world space)
//! 3. Stats line and tooltip (screen space)

use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::theme::{Color, Theme};
use super::view_model::{NodeVisual, RenderModel, Tooltip};

const TOOLTIP_PADDING: f64 = 8.0;
const TOOLTIP_LINE: f64 = 16.0;
const TOOLTIP_MAX_CONNECTED: usize = 8;

/// Renders the complete frame to the canvas.
pub fn render(model: &RenderModel, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	draw_background(model, ctx);

	ctx.save();
	let _ = ctx.translate(model.transform.x, model.transform.y);
	let _ = ctx.scale(model.transform.k, model.transform.k);

	draw_edges(model, ctx);
	for node in &model.nodes {
		draw_node(ctx, node, model.scaled.outline_width);
	}
	for node in &model.nodes {
		draw_label(ctx, node, theme.label, model.scaled.label_size);
	}

	ctx.restore();

	draw_stats(model, ctx, theme);
	if let Some(tooltip) = &model.tooltip {
		draw_tooltip(ctx, tooltip, model.width, theme);
	}
}

fn draw_background(model: &RenderModel, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(&model.background.to_css());
	ctx.fill_rect(0.0, 0.0, model.width, model.height);
}

fn draw_edges(model: &RenderModel, ctx: &CanvasRenderingContext2d) {
	for edge in &model.edges {
		if edge.opacity < 0.005 {
			continue;
		}
		ctx.set_stroke_style_str(&edge.color.with_alpha(edge.opacity * edge.color.a).to_css());
		ctx.set_line_width(edge.width);
		ctx.begin_path();
		ctx.move_to(edge.x1, edge.y1);
		ctx.line_to(edge.x2, edge.y2);
		ctx.stroke();
	}
}

fn draw_node(ctx: &CanvasRenderingContext2d, node: &NodeVisual, outline_width: f64) {
	let (x, y, radius) = (node.x, node.y, node.radius);
	ctx.set_global_alpha(node.opacity);

	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	match ctx.create_radial_gradient(x - radius * 0.3, y - radius * 0.3, 0.0, x, y, radius) {
		Ok(gradient) => {
			let _ = gradient.add_color_stop(0.0, &node.fill.lighten(0.25).to_css());
			let _ = gradient.add_color_stop(0.8, &node.fill.to_css());
			let _ = gradient.add_color_stop(1.0, &node.fill.darken(0.15).to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		Err(_) => ctx.set_fill_style_str(&node.fill.to_css()),
	}
	ctx.fill();

	if let Some(outline) = node.outline {
		ctx.set_stroke_style_str(&outline.to_css());
		ctx.set_line_width(outline_width);
		ctx.stroke();
	}

	ctx.set_global_alpha(1.0);
}

fn draw_label(ctx: &CanvasRenderingContext2d, node: &NodeVisual, color: Color, base_size: f64) {
	if node.label_alpha < 0.01 || node.label_lines.is_empty() {
		return;
	}
	let weight = if node.label_bold { "bold " } else { "" };
	ctx.set_font(&format!("{weight}{}px sans-serif", node.label_size));
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	ctx.set_fill_style_str(&color.with_alpha(node.label_alpha).to_css());

	let line_height = node.label_size.max(base_size) * 1.2;
	for (i, line) in node.label_lines.iter().enumerate() {
		let _ = ctx.fill_text(line, node.x, node.label_y + i as f64 * line_height);
	}
}

fn draw_stats(model: &RenderModel, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	ctx.set_font("12px sans-serif");
	ctx.set_text_align("left");
	ctx.set_text_baseline("top");
	ctx.set_fill_style_str(&theme.label.with_alpha(0.8).to_css());
	let _ = ctx.fill_text(&model.stats, 10.0, 10.0);
}

fn draw_tooltip(ctx: &CanvasRenderingContext2d, tooltip: &Tooltip, canvas_width: f64, theme: &Theme) {
	let mut lines = vec![(tooltip.title.clone(), true)];
	if let Some(summary) = &tooltip.summary {
		lines.push((summary.clone(), false));
	}
	lines.push((format!("Connections: {}", tooltip.connections), false));
	for title in tooltip.connected.iter().take(TOOLTIP_MAX_CONNECTED) {
		lines.push((format!("• {title}"), false));
	}
	if tooltip.connected.len() > TOOLTIP_MAX_CONNECTED {
		lines.push((format!("… and {} more", tooltip.connected.len() - TOOLTIP_MAX_CONNECTED), false));
	}

	ctx.set_text_align("left");
	ctx.set_text_baseline("top");
	let width = lines
		.iter()
		.map(|(text, bold)| {
			ctx.set_font(if *bold { "bold 13px sans-serif" } else { "12px sans-serif" });
			ctx.measure_text(text).map(|m| m.width()).unwrap_or(0.0)
		})
		.fold(0.0, f64::max)
		+ TOOLTIP_PADDING * 2.0;
	let height = lines.len() as f64 * TOOLTIP_LINE + TOOLTIP_PADDING * 2.0;

	let left = (tooltip.x - width / 2.0).clamp(0.0, (canvas_width - width).max(0.0));
	let top = tooltip.y;

	ctx.set_fill_style_str(&theme.tooltip_background.to_css());
	ctx.fill_rect(left, top, width, height);
	ctx.set_stroke_style_str(&theme.label.with_alpha(0.2).to_css());
	ctx.set_line_width(1.0);
	ctx.stroke_rect(left, top, width, height);

	ctx.set_fill_style_str(&theme.tooltip_text.to_css());
	for (i, (text, bold)) in lines.iter().enumerate() {
		ctx.set_font(if *bold { "bold 13px sans-serif" } else { "12px sans-serif" });
		let _ = ctx.fill_text(text, left + TOOLTIP_PADDING, top + TOOLTIP_PADDING + i as f64 * TOOLTIP_LINE);
	}
}
