use crate::text_metrics;

/// Size of a realized text primitive.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextExtent {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

pub(crate) fn measure_text(
    text: &str,
    font_size: f32,
    font_family: &str,
    line_height: f32,
    fast_metrics: bool,
) -> TextExtent {
    let mut lines = split_lines(text);
    if lines.is_empty() {
        lines.push(String::new());
    }
    let width = lines
        .iter()
        .map(|line| text_width(line, font_size, font_family, fast_metrics))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * line_height;
    TextExtent {
        lines,
        width,
        height,
    }
}

pub(crate) fn char_width_factor(ch: char) -> f32 {
    // Per-character advance as a fraction of the font size, for a typical
    // sans-serif face.
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'A' | 'B' | 'K' | 'X' | 'Y' | 'V' => 0.652,
        'C' | 'D' | 'G' | 'H' | 'N' | 'O' | 'Q' | 'U' => 0.742,
        'E' | 'F' | 'L' | 'P' | 'R' | 'S' | 'T' | 'Z' => 0.604,
        'I' => 0.272,
        'J' => 0.557,
        'M' => 0.903,
        'W' => 0.958,
        'f' | 'r' | 't' => 0.340,
        'i' | 'j' | 'l' => 0.235,
        'm' => 0.867,
        'w' => 0.811,
        'a'..='z' => 0.570,
        '0'..='9' => 0.600,
        '@' | '#' | '%' | '&' => 0.946,
        // CJK ideographs and other wide glyphs take a full em.
        ch if ch as u32 >= 0x2E80 => 1.0,
        _ => 0.568,
    }
}

pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.replace("\\n", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

pub(crate) fn text_width(text: &str, font_size: f32, font_family: &str, fast_metrics: bool) -> f32 {
    if fast_metrics {
        return fallback_text_width(text, font_size);
    }
    text_metrics::measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_handles_escaped_newlines() {
        assert_eq!(split_lines("a\\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("  hello  \n  world  "), vec!["hello", "world"]);
    }

    #[test]
    fn wide_glyphs_take_a_full_em() {
        assert_eq!(char_width_factor('\u{4e2d}'), 1.0);
        assert!(char_width_factor('i') < char_width_factor('m'));
    }

    #[test]
    fn fallback_width_scales_with_font_size() {
        let w16 = fallback_text_width("Hello", 16.0);
        let w32 = fallback_text_width("Hello", 32.0);
        assert!((w32 - w16 * 2.0).abs() < 0.01);
    }

    #[test]
    fn extent_uses_widest_line() {
        let extent = measure_text("ab\nabcdef", 10.0, "sans-serif", 1.2, true);
        assert_eq!(extent.lines.len(), 2);
        assert!((extent.width - fallback_text_width("abcdef", 10.0)).abs() < 0.001);
        assert!((extent.height - 24.0).abs() < 0.001);
    }

    #[test]
    fn empty_text_still_has_one_line() {
        let extent = measure_text("", 10.0, "sans-serif", 1.5, true);
        assert_eq!(extent.lines, vec![String::new()]);
        assert_eq!(extent.width, 0.0);
    }
}
