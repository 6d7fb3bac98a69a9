use crate::config::Config;
#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::engine::{Engine, MindEngine};
use crate::ir::NodeRecord;
use crate::parser::{parse_nodes_json, parse_outline};
use crate::surface::{PointerButton, PointerEvent, PressedButtons, SvgSurface};
use anyhow::Result;
use futures::executor::block_on;
use std::path::Path;

/// How to read diagram input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// JSON or JSON5 node records.
    Records,
    /// Indented outline text.
    Outline,
}

impl InputFormat {
    /// Picks the format from a file extension; anything but `.json`/`.json5`
    /// is an outline.
    pub fn from_path(path: Option<&Path>) -> Self {
        match path
            .and_then(|path| path.extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") | Some("json5") => Self::Records,
            _ => Self::Outline,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub config: Config,
    pub token: String,
    /// Canvas pan replayed as a secondary-button drag before serializing.
    pub pan: Option<(f32, f32)>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            config: Config::default(),
            token: "mindmap".to_string(),
            pan: None,
        }
    }
}

impl RenderOptions {
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_pan(mut self, dx: f32, dy: f32) -> Self {
        self.pan = Some((dx, dy));
        self
    }
}

/// Parses `input` and renders it to a standalone SVG document.
pub fn render_input(input: &str, format: InputFormat, options: &RenderOptions) -> Result<String> {
    let records = match format {
        InputFormat::Records => parse_nodes_json(input)?,
        InputFormat::Outline => parse_outline(input)?,
    };
    render_records(records, options)
}

/// Lays `records` out on a fresh [`SvgSurface`] and serializes it.
pub fn render_records(records: Vec<NodeRecord>, options: &RenderOptions) -> Result<String> {
    let config = &options.config;
    let surface = SvgSurface::new(config.render.width, config.render.height)
        .with_background(config.render.background.clone())
        .with_fast_text_metrics(config.layout.fast_text_metrics);
    let mut engine = MindEngine::new(surface, config.clone(), options.token.clone())?;
    engine.render_style()?;
    block_on(engine.render_body(records))?;

    if let Some((dx, dy)) = options.pan {
        let pressed = PressedButtons::only(PointerButton::Secondary);
        block_on(async {
            engine
                .handle_pointer(PointerEvent::down(PointerButton::Secondary, (0.0, 0.0), None))
                .await;
            engine.handle_pointer(PointerEvent::moved(pressed, (dx, dy))).await;
            engine
                .handle_pointer(PointerEvent::up(PointerButton::Secondary, (dx, dy)))
                .await;
        });
    }

    Ok(engine.surface().to_svg())
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .unwrap_or(usvg::Size::from_wh(800.0, 600.0).unwrap());

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_options() -> RenderOptions {
        let mut options = RenderOptions::default();
        options.config.layout.fast_text_metrics = true;
        options
    }

    #[test]
    fn render_outline_basic() {
        let svg = render_input("Root\n  Left & right\n  B\n", InputFormat::Outline, &fast_options())
            .unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("id=\"mindmap_node_1\""));
        assert!(svg.contains("Left &amp; right"));
        assert!(svg.contains("id=\"mindmap_line_1_1-1\""));
        assert!(svg.contains("<marker id=\"mindmap_marker\""));
    }

    #[test]
    fn pan_moves_the_group_root() {
        let options = fast_options().with_pan(40.0, 10.0);
        let svg = render_input("Root\n  A\n", InputFormat::Outline, &options).unwrap();
        assert!(svg.contains("transform=\"translate( 40 10 )\""));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(InputFormat::from_path(Some(Path::new("a.JSON"))), InputFormat::Records);
        assert_eq!(InputFormat::from_path(Some(Path::new("a.json5"))), InputFormat::Records);
        assert_eq!(InputFormat::from_path(Some(Path::new("a.mm"))), InputFormat::Outline);
        assert_eq!(InputFormat::from_path(None), InputFormat::Outline);
    }

    #[test]
    fn escape_xml_handles_quotes() {
        assert_eq!(escape_xml("a\"b'<c>&"), "a&quot;b&apos;&lt;c&gt;&amp;");
    }
}
