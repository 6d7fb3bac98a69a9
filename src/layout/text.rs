use tracing::trace;

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::ir::NodeRecord;
use crate::surface::{ElementId, Shape, Surface, TextStyle};
use crate::theme::Theme;

use super::ElementKeys;

/// Box style of a label, picked by level: top-level and second-level nodes get
/// a rounded box, deeper nodes an underline bar.
#[derive(Debug, Clone, PartialEq)]
struct LabelStyle {
    boxed: bool,
    fill: String,
    stroke: String,
    text_fill: String,
    accent: String,
}

fn label_style(level: usize, section: Option<usize>, theme: &Theme) -> LabelStyle {
    let accent = section
        .map(|section| theme.section_color(section).to_string())
        .unwrap_or_else(|| theme.line_stroke.clone());
    match level {
        1 => LabelStyle {
            boxed: true,
            fill: theme.root_fill.clone(),
            stroke: theme.box_stroke.clone(),
            text_fill: theme.root_text_color.clone(),
            accent,
        },
        2 => LabelStyle {
            boxed: true,
            fill: theme.background.clone(),
            stroke: accent.clone(),
            text_fill: theme.text_color.clone(),
            accent,
        },
        _ => LabelStyle {
            boxed: false,
            fill: "none".to_string(),
            stroke: "none".to_string(),
            text_fill: theme.text_color.clone(),
            accent,
        },
    }
}

/// Draws a node's label into its content zone and fits the box to the text.
///
/// The text extent is unknown until the surface realizes the primitive, so the
/// box starts at placeholder size and is resized once the realized signal fires.
/// A label removed while waiting is left alone.
pub(super) async fn fit_label<S: Surface + ?Sized>(
    surface: &mut S,
    keys: &ElementKeys,
    config: &LayoutConfig,
    theme: &Theme,
    content: &ElementId,
    node: &NodeRecord,
    level: usize,
    section: Option<usize>,
) -> Result<()> {
    let style = label_style(level, section, theme);
    let box_id = surface.create_shape(
        content,
        keys.label_box(&node.id),
        Shape::Rect {
            width: config.placeholder_width,
            height: config.placeholder_height,
            radius: if style.boxed { config.corner_radius } else { 0.0 },
        },
    )?;
    surface.set_attribute(&box_id, "fill", &style.fill)?;
    surface.set_attribute(&box_id, "stroke", &style.stroke)?;

    let underline = if style.boxed {
        None
    } else {
        let id = surface.create_shape(
            content,
            keys.underline(&node.id),
            Shape::Rect {
                width: config.placeholder_width,
                height: config.underline_height,
                radius: 0.0,
            },
        )?;
        let y = config.placeholder_height - config.underline_height;
        surface.set_attribute(&id, "y", &y.to_string())?;
        surface.set_attribute(&id, "fill", &style.accent)?;
        Some(id)
    };

    let text_id = surface.create_text(
        content,
        keys.label_text(&node.id),
        &node.name,
        &TextStyle {
            font_family: theme.font_family.clone(),
            font_size: theme.font_size,
            fill: style.text_fill.clone(),
            line_height: config.label_line_height,
        },
    )?;
    surface.set_attribute(&text_id, "x", &config.padding_x.to_string())?;
    surface.set_attribute(&text_id, "y", &config.padding_y.to_string())?;

    surface.realized(&text_id).await;

    if !surface.contains(&text_id) {
        trace!(node = %node.id, "label detached before it was realized");
        return Ok(());
    }
    let Some(text_box) = surface.bounding_box(&text_id) else {
        trace!(node = %node.id, "label realized without a measurable box");
        return Ok(());
    };

    let width = text_box.width + config.padding_x * 2.0;
    let height = text_box.height + config.padding_y * 2.0;
    surface.set_attribute(&box_id, "width", &width.to_string())?;
    surface.set_attribute(&box_id, "height", &height.to_string())?;
    if let Some(underline) = underline {
        surface.set_attribute(&underline, "width", &width.to_string())?;
        surface.set_attribute(&underline, "y", &(height - config.underline_height).to_string())?;
    }
    surface.set_attribute(&text_id, "x", &((width - text_box.width) / 2.0).to_string())?;
    surface.set_attribute(&text_id, "y", &((height - text_box.height) / 2.0).to_string())?;
    trace!(node = %node.id, width, height, "label fitted");
    Ok(())
}
