use serde::{Deserialize, Serialize};

const SECTION_COLORS: [&str; 12] = [
    "hsl(240, 100%, 76.2745098039%)",
    "hsl(60, 100%, 73.5294117647%)",
    "hsl(80, 100%, 76.2745098039%)",
    "hsl(270, 100%, 76.2745098039%)",
    "hsl(300, 100%, 76.2745098039%)",
    "hsl(330, 100%, 76.2745098039%)",
    "hsl(0, 100%, 76.2745098039%)",
    "hsl(30, 100%, 76.2745098039%)",
    "hsl(90, 100%, 76.2745098039%)",
    "hsl(150, 100%, 76.2745098039%)",
    "hsl(180, 100%, 76.2745098039%)",
    "hsl(210, 100%, 76.2745098039%)",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub root_fill: String,
    pub root_text_color: String,
    pub box_stroke: String,
    pub line_fill: String,
    pub line_stroke: String,
    pub line_stroke_width: f32,
    pub marker_fill: String,
    pub background: String,
    pub section_colors: Vec<String>,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            text_color: "#333333".to_string(),
            root_fill: "rgb(115, 161, 191)".to_string(),
            root_text_color: "#FFFFFF".to_string(),
            box_stroke: "black".to_string(),
            line_fill: "none".to_string(),
            line_stroke: "rgb(115, 161, 191)".to_string(),
            line_stroke_width: 1.0,
            marker_fill: "rgb(115, 161, 191)".to_string(),
            background: "#FFFFFF".to_string(),
            section_colors: SECTION_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            text_color: "#1C2430".to_string(),
            root_fill: "#3B5BDB".to_string(),
            root_text_color: "#FFFFFF".to_string(),
            box_stroke: "#C7D2E5".to_string(),
            line_fill: "none".to_string(),
            line_stroke: "#7A8AA6".to_string(),
            line_stroke_width: 1.4,
            marker_fill: "#7A8AA6".to_string(),
            background: "#FFFFFF".to_string(),
            section_colors: SECTION_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Color of the `section`-th second-level branch.
    pub fn section_color(&self, section: usize) -> &str {
        if self.section_colors.is_empty() {
            return self.line_stroke.as_str();
        }
        &self.section_colors[section % self.section_colors.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
