#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod ir;
pub mod layout;
pub mod parser;
pub mod render;
pub mod surface;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, load_config, parse_config};
pub use engine::{Engine, MindEngine};
pub use error::{EngineError, Result};
pub use interaction::{Gesture, InteractionState};
pub use ir::{Direction, NodeId, NodeLocation, NodeRecord, NodeTree};
pub use layout::ElementKeys;
pub use render::{InputFormat, RenderOptions, render_input, render_records};
pub use surface::{
    BBox, ElementId, PointerButton, PointerEvent, PointerKind, PressedButtons, Surface,
    SurfaceError, SvgSurface, Translate,
};
pub use theme::Theme;
