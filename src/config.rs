use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Horizontal gap between a node's zones (the connector run).
    pub line_width: f32,
    /// Vertical gap between stacked sibling subtrees.
    pub line_height: f32,
    pub placeholder_width: f32,
    pub placeholder_height: f32,
    pub corner_radius: f32,
    pub padding_x: f32,
    pub padding_y: f32,
    pub underline_height: f32,
    pub label_line_height: f32,
    pub marker_radius: f32,
    /// Pointer travel (per axis) below which a gesture is treated as jitter.
    pub drag_threshold: f32,
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_width: 40.0,
            line_height: 16.0,
            placeholder_width: 130.0,
            placeholder_height: 40.0,
            corner_radius: 5.0,
            padding_x: 14.0,
            padding_y: 8.0,
            underline_height: 2.0,
            label_line_height: 1.2,
            marker_radius: 3.0,
            drag_threshold: 3.0,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    text_color: Option<String>,
    root_fill: Option<String>,
    root_text_color: Option<String>,
    box_stroke: Option<String>,
    line_stroke: Option<String>,
    line_stroke_width: Option<f32>,
    marker_fill: Option<String>,
    background: Option<String>,
    section_colors: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    line_width: Option<f32>,
    line_height: Option<f32>,
    placeholder_width: Option<f32>,
    placeholder_height: Option<f32>,
    corner_radius: Option<f32>,
    padding_x: Option<f32>,
    padding_y: Option<f32>,
    underline_height: Option<f32>,
    label_line_height: Option<f32>,
    marker_radius: Option<f32>,
    drag_threshold: Option<f32>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlays a JSON config document on the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    match parsed.theme.as_deref() {
        Some("modern") => config.theme = Theme::modern(),
        Some("classic") | Some("default") | None => {}
        Some(other) => anyhow::bail!("unknown theme `{other}`"),
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.root_fill {
            config.theme.root_fill = v;
        }
        if let Some(v) = vars.root_text_color {
            config.theme.root_text_color = v;
        }
        if let Some(v) = vars.box_stroke {
            config.theme.box_stroke = v;
        }
        if let Some(v) = vars.line_stroke {
            config.theme.line_stroke = v;
        }
        if let Some(v) = vars.line_stroke_width {
            config.theme.line_stroke_width = v;
        }
        if let Some(v) = vars.marker_fill {
            config.theme.marker_fill = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.section_colors {
            config.theme.section_colors = v;
        }
    }
    config.render.background = config.theme.background.clone();

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.line_width {
            config.layout.line_width = v;
        }
        if let Some(v) = layout.line_height {
            config.layout.line_height = v;
        }
        if let Some(v) = layout.placeholder_width {
            config.layout.placeholder_width = v;
        }
        if let Some(v) = layout.placeholder_height {
            config.layout.placeholder_height = v;
        }
        if let Some(v) = layout.corner_radius {
            config.layout.corner_radius = v;
        }
        if let Some(v) = layout.padding_x {
            config.layout.padding_x = v;
        }
        if let Some(v) = layout.padding_y {
            config.layout.padding_y = v;
        }
        if let Some(v) = layout.underline_height {
            config.layout.underline_height = v;
        }
        if let Some(v) = layout.label_line_height {
            config.layout.label_line_height = v;
        }
        if let Some(v) = layout.marker_radius {
            config.layout.marker_radius = v;
        }
        if let Some(v) = layout.drag_threshold {
            config.layout.drag_threshold = v.max(0.0);
        }
        if let Some(v) = layout.fast_text_metrics {
            config.layout.fast_text_metrics = v;
        }
    }

    Ok(config)
}
