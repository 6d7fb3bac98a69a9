//! Drawing-surface capabilities consumed by the layout engine, the connector
//! router and the drag/pan state machine.
//!
//! The core never touches a concrete canvas. Everything it needs (containers,
//! primitives, translations, bounding boxes, pointer listeners and the one-shot
//! "realized" signal for freshly inserted text) goes through [`Surface`].
//! [`SvgSurface`] is the in-memory implementation used by the CLI and tests.

mod geometry;
mod svg;
pub(crate) mod text;

pub use geometry::{BBox, Translate};
pub use svg::SvgSurface;

use futures::future::LocalBoxFuture;
use std::fmt;
use thiserror::Error;

/// Identifier of a surface element. Unique per surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SurfaceError {
    #[error("element `{0}` already exists")]
    DuplicateElement(ElementId),
    #[error("element `{0}` not found")]
    MissingElement(ElementId),
    #[error("element `{0}` cannot hold children")]
    NotAContainer(ElementId),
    #[error("invalid transform `{0}`")]
    InvalidTransform(String),
}

/// Non-text primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect { width: f32, height: f32, radius: f32 },
    Path { d: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub fill: String,
    pub line_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Enter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Buttons held while an event fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressedButtons {
    pub primary: bool,
    pub middle: bool,
    pub secondary: bool,
}

impl PressedButtons {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn only(button: PointerButton) -> Self {
        let mut pressed = Self::default();
        match button {
            PointerButton::Primary => pressed.primary = true,
            PointerButton::Middle => pressed.middle = true,
            PointerButton::Secondary => pressed.secondary = true,
        }
        pressed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    /// Button that changed state (down/up); `None` for move/enter.
    pub button: Option<PointerButton>,
    pub pressed: PressedButtons,
    /// Absolute pointer position.
    pub position: (f32, f32),
    /// Element under the pointer, if the surface resolved one.
    pub target: Option<ElementId>,
}

impl PointerEvent {
    pub fn down(button: PointerButton, position: (f32, f32), target: Option<ElementId>) -> Self {
        Self {
            kind: PointerKind::Down,
            button: Some(button),
            pressed: PressedButtons::only(button),
            position,
            target,
        }
    }

    pub fn moved(pressed: PressedButtons, position: (f32, f32)) -> Self {
        Self {
            kind: PointerKind::Move,
            button: None,
            pressed,
            position,
            target: None,
        }
    }

    pub fn up(button: PointerButton, position: (f32, f32)) -> Self {
        Self {
            kind: PointerKind::Up,
            button: Some(button),
            pressed: PressedButtons::none(),
            position,
            target: None,
        }
    }

    pub fn enter(pressed: PressedButtons, position: (f32, f32)) -> Self {
        Self {
            kind: PointerKind::Enter,
            button: None,
            pressed,
            position,
            target: None,
        }
    }
}

/// A retained 2D vector surface.
///
/// Bounding boxes are surface-local: every ancestor translation is applied.
/// Text primitives report no bounding box until the future returned by
/// [`Surface::realized`] has completed.
pub trait Surface {
    fn contains(&self, id: &ElementId) -> bool;

    /// Creates a grouping container under `parent`, or at the surface root.
    fn create_group(
        &mut self,
        parent: Option<&ElementId>,
        id: ElementId,
    ) -> Result<ElementId, SurfaceError>;

    fn create_shape(
        &mut self,
        parent: &ElementId,
        id: ElementId,
        shape: Shape,
    ) -> Result<ElementId, SurfaceError>;

    fn create_text(
        &mut self,
        parent: &ElementId,
        id: ElementId,
        text: &str,
        style: &TextStyle,
    ) -> Result<ElementId, SurfaceError>;

    /// Defines an end marker (a filled dot) that paths can reference.
    fn create_marker(
        &mut self,
        id: ElementId,
        radius: f32,
        fill: &str,
    ) -> Result<ElementId, SurfaceError>;

    /// Removes an element with its whole subtree and any listeners on it.
    fn remove(&mut self, id: &ElementId) -> Result<(), SurfaceError>;

    fn set_attribute(&mut self, id: &ElementId, name: &str, value: &str)
    -> Result<(), SurfaceError>;

    fn attribute(&self, id: &ElementId, name: &str) -> Option<String>;

    fn set_data(&mut self, id: &ElementId, key: &str, value: &str) -> Result<(), SurfaceError>;

    fn data(&self, id: &ElementId, key: &str) -> Option<String>;

    fn parent(&self, id: &ElementId) -> Option<ElementId>;

    /// Raises an element among its siblings; higher paints later.
    fn set_z_order(&mut self, id: &ElementId, z: u64) -> Result<(), SurfaceError>;

    fn bounding_box(&self, id: &ElementId) -> Option<BBox>;

    fn listen(&mut self, id: &ElementId, kind: PointerKind) -> Result<(), SurfaceError>;

    fn unlisten(&mut self, id: &ElementId, kind: PointerKind) -> Result<(), SurfaceError>;

    /// Completes once `id` has been realized and can be measured.
    fn realized(&mut self, id: &ElementId) -> LocalBoxFuture<'static, ()>;

    fn set_translate(&mut self, id: &ElementId, translate: Translate) -> Result<(), SurfaceError> {
        self.set_attribute(id, "transform", &translate.to_string())
    }

    /// Current translation, parsed back from the transform attribute. An element
    /// without one sits at the origin.
    fn translate(&self, id: &ElementId) -> Result<Translate, SurfaceError> {
        if !self.contains(id) {
            return Err(SurfaceError::MissingElement(id.clone()));
        }
        match self.attribute(id, "transform") {
            Some(raw) => raw.parse(),
            None => Ok(Translate::default()),
        }
    }
}
