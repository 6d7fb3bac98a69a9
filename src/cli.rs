use crate::config::load_config;
use crate::render::{InputFormat, RenderOptions, render_input, write_output_svg};
#[cfg(feature = "png")]
use crate::render::write_output_png;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mmcanvas", version, about = "Bidirectional mind-map renderer")]
pub struct Args {
    /// Input file (.json/.json5 records, outline text, or .md with mindmap fences) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, layout)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// Instance token prefixed to every element id
    #[arg(long = "token", default_value = "mindmap")]
    pub token: String,

    /// Pan the canvas by DX DY before writing
    #[arg(long = "pan", num_args = 2, value_names = ["DX", "DY"], allow_hyphen_values = true)]
    pub pan: Option<Vec<f32>>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;

    let mut options = RenderOptions::default()
        .with_config(config)
        .with_token(args.token.clone());
    if let Some(&[dx, dy]) = args.pan.as_deref() {
        options = options.with_pan(dx, dy);
    }

    let (input, source) = read_input(args.input.as_deref())?;
    let diagrams: Vec<(String, InputFormat)> = match source {
        Source::Markdown => extract_mindmap_blocks(&input)
            .into_iter()
            .map(|block| (block, InputFormat::Outline))
            .collect(),
        Source::Plain(format) => vec![(input, format)],
    };

    if diagrams.is_empty() {
        return Err(anyhow::anyhow!("No mind maps found in input"));
    }

    if let [(diagram, format)] = diagrams.as_slice() {
        let svg = render_input(diagram, *format, &options)?;
        write_output(&svg, args.output_format, args.output.as_deref(), &options)?;
        return Ok(());
    }

    // Multiple diagrams (Markdown input)
    let outputs =
        resolve_multi_outputs(args.output.as_deref(), args.output_format, diagrams.len())?;
    for ((diagram, format), output) in diagrams.iter().zip(&outputs) {
        let svg = render_input(diagram, *format, &options)?;
        write_output(&svg, args.output_format, Some(output), &options)?;
        info!(output = %output.display(), "diagram written");
    }

    Ok(())
}

fn write_output(
    svg: &str,
    format: OutputFormat,
    output: Option<&Path>,
    options: &RenderOptions,
) -> Result<()> {
    match format {
        OutputFormat::Svg => write_output_svg(svg, output),
        #[cfg(feature = "png")]
        OutputFormat::Png => {
            let output = ensure_output(output, "png")?;
            write_output_png(svg, output, &options.config.render)
        }
        #[cfg(not(feature = "png"))]
        OutputFormat::Png => {
            let _ = options;
            Err(anyhow::anyhow!("PNG output requires the `png` feature"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Markdown,
    Plain(InputFormat),
}

fn read_input(path: Option<&Path>) -> Result<(String, Source)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, Source::Plain(InputFormat::Outline)));
        }
        let content = std::fs::read_to_string(path)?;
        return Ok((content, source_for(path)));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, Source::Plain(InputFormat::Outline)))
}

fn source_for(path: &Path) -> Source {
    let is_md = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| matches!(ext, "md" | "markdown"))
        .unwrap_or(false);
    if is_md {
        Source::Markdown
    } else {
        Source::Plain(InputFormat::from_path(Some(path)))
    }
}

#[cfg(feature = "png")]
fn ensure_output<'a>(output: Option<&'a Path>, ext: &str) -> Result<&'a Path> {
    output.ok_or_else(|| anyhow::anyhow!("Output path required for {} output", ext))
}

fn extract_mindmap_blocks(input: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut in_block = false;
    let mut current = Vec::new();
    let mut fence = String::new();

    for line in input.lines() {
        let trimmed = line.trim();
        if !in_block {
            if let Some(start_fence) = detect_mindmap_fence(trimmed) {
                in_block = true;
                fence = start_fence;
                continue;
            }
        } else if is_fence_end(trimmed, &fence) {
            in_block = false;
            blocks.push(current.join("\n"));
            current.clear();
            continue;
        }

        if in_block {
            current.push(line.to_string());
        }
    }

    blocks
}

fn detect_mindmap_fence(line: &str) -> Option<String> {
    for fence in ["```", "~~~"] {
        if let Some(rest) = line.strip_prefix(fence) {
            let info = rest.trim_start_matches(fence.chars().next()?).trim();
            if info.starts_with("mindmap") {
                return Some(fence.to_string());
            }
        }
    }
    None
}

fn is_fence_end(line: &str, fence: &str) -> bool {
    if !line.starts_with(fence) {
        return false;
    }
    line[fence.len()..].trim().is_empty()
}

fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    count: usize,
) -> Result<Vec<PathBuf>> {
    let ext = match format {
        OutputFormat::Svg => "svg",
        OutputFormat::Png => "png",
    };
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required for markdown input"))?;
    if base.is_dir() {
        let mut outputs = Vec::new();
        for idx in 0..count {
            outputs.push(base.join(format!("mindmap-{}.{}", idx + 1, ext)));
        }
        return Ok(outputs);
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("mindmap");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    let mut outputs = Vec::new();
    for idx in 0..count {
        outputs.push(parent.join(format!("{}-{}.{}", stem, idx + 1, ext)));
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_mindmap_blocks() {
        let input = r#"
text
``` mindmap
Root
  A
```
more
~~~mindmap
Other
~~~
```rust
fn main() {}
```
"#;
        let blocks = extract_mindmap_blocks(input);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("Root"));
        assert!(blocks[1].contains("Other"));
    }

    #[test]
    fn multi_outputs_number_the_stem() {
        let outputs =
            resolve_multi_outputs(Some(Path::new("out/map.svg")), OutputFormat::Svg, 2).unwrap();
        assert_eq!(
            outputs,
            vec![PathBuf::from("out/map-1.svg"), PathBuf::from("out/map-2.svg")]
        );
        assert!(resolve_multi_outputs(None, OutputFormat::Png, 2).is_err());
    }

    #[test]
    fn source_follows_extension() {
        assert_eq!(source_for(Path::new("notes.md")), Source::Markdown);
        assert_eq!(
            source_for(Path::new("tree.json")),
            Source::Plain(InputFormat::Records)
        );
        assert_eq!(
            source_for(Path::new("tree.txt")),
            Source::Plain(InputFormat::Outline)
        );
    }

    #[test]
    fn pan_takes_two_signed_values() {
        let args = Args::try_parse_from(["mmcanvas", "-i", "a.txt", "--pan", "-10", "5"]).unwrap();
        assert_eq!(args.pan, Some(vec![-10.0, 5.0]));
        assert_eq!(args.token, "mindmap");
    }
}
