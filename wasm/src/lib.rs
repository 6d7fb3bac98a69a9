use mindmap_rs_canvas::{Config, InputFormat, RenderOptions, Theme, render_input};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MindmapRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    fast_text: Option<bool>,
    /// `"records"` for JSON node records; anything else is an outline.
    format: Option<String>,
    token: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
}

fn build_render_options(options: &MindmapRenderOptions) -> RenderOptions {
    let mut config = Config::default();
    if options.theme.as_deref() == Some("modern") {
        config.theme = Theme::modern();
    }
    if let Some(font_family) = &options.font_family {
        config.theme.font_family = font_family.clone();
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    // No system fonts in the browser sandbox.
    config.layout.fast_text_metrics = options.fast_text.unwrap_or(true);
    if let Some(width) = options.width {
        config.render.width = width;
    }
    if let Some(height) = options.height {
        config.render.height = height;
    }

    let mut render_options = RenderOptions::default().with_config(config);
    if let Some(token) = &options.token {
        render_options = render_options.with_token(token.clone());
    }
    render_options
}

fn input_format(options: &MindmapRenderOptions) -> InputFormat {
    match options.format.as_deref() {
        Some("records") | Some("json") => InputFormat::Records,
        _ => InputFormat::Outline,
    }
}

#[wasm_bindgen]
pub fn render_mindmap_svg(input: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<MindmapRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        MindmapRenderOptions::default()
    };

    render_input(input, input_format(&options), &build_render_options(&options))
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use mindmap_rs_canvas::render_input;

    use crate::{MindmapRenderOptions, build_render_options, input_format};

    #[test]
    fn renders_outline_with_both_sides() {
        let code = "mindmap\n  Plan\n    Scope\n    Risks\n      Budget\n";
        let options = MindmapRenderOptions::default();
        let svg = render_input(code, input_format(&options), &build_render_options(&options))
            .expect("outline should render");

        assert!(svg.contains("<svg"));
        assert!(svg.contains("Scope"));
        assert!(svg.contains("mindmap_right_1"));
        assert!(svg.contains("mindmap_line_1-2_1-2-1"));
    }

    #[test]
    fn renders_json_records() {
        let options = MindmapRenderOptions {
            format: Some("records".into()),
            token: Some("w".into()),
            ..Default::default()
        };
        let svg = render_input(
            r#"[{"Id": 1, "Name": "Root", "Children": [{"Id": 2, "Name": "Leaf"}]}]"#,
            input_format(&options),
            &build_render_options(&options),
        )
        .expect("records should render");
        assert!(svg.contains("w_line_1_2"));
    }
}
