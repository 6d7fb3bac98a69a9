use std::fmt::Write as _;

use tracing::{trace, warn};

use crate::error::{EngineError, Result};
use crate::ir::{Direction, NodeId, NodeRecord};
use crate::surface::{BBox, Shape, Surface};
use crate::theme::Theme;

use super::{ElementKeys, connector_id};

// ── Curve shaping ───────────────────────────────────────────────────
/// Horizontal position of the control point nearest the leftmost endpoint.
const EASE_LEAD: f32 = 0.42;
/// Horizontal position of the control point nearest the rightmost endpoint.
const EASE_TRAIL: f32 = 0.58;
/// Arc radii as a multiple of the endpoint span.
const ARC_RADIUS_SCALE: f32 = 2.0;

pub type Point = (f32, f32);

/// Geometry of one connector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectorPath {
    Line {
        from: Point,
        to: Point,
    },
    /// Elliptical arc; `sweep` is the SVG sweep flag.
    Arc {
        from: Point,
        to: Point,
        rx: f32,
        ry: f32,
        sweep: bool,
    },
    Cubic {
        from: Point,
        c1: Point,
        c2: Point,
        to: Point,
    },
}

impl ConnectorPath {
    /// Picks the path shape for a connector leaving a node at `level`.
    ///
    /// Horizontal connectors are straight. From a top-level root the connector
    /// is an arc bulging away from the root; deeper connectors are an eased
    /// cubic.
    pub fn route(from: Point, to: Point, level: usize) -> Self {
        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        if dy == 0.0 {
            return Self::Line { from, to };
        }
        if level <= 1 {
            let right_and_above = dx > 0.0 && dy < 0.0;
            let left_and_below = dx < 0.0 && dy > 0.0;
            return Self::Arc {
                from,
                to,
                rx: ARC_RADIUS_SCALE * dx.abs(),
                ry: ARC_RADIUS_SCALE * dy.abs(),
                sweep: right_and_above || left_and_below,
            };
        }
        let (lead, trail) = if from.0 <= to.0 { (from, to) } else { (to, from) };
        let span = trail.0 - lead.0;
        let near_lead = (lead.0 + span * EASE_LEAD, lead.1);
        let near_trail = (lead.0 + span * EASE_TRAIL, trail.1);
        if from == lead {
            Self::Cubic {
                from,
                c1: near_lead,
                c2: near_trail,
                to,
            }
        } else {
            Self::Cubic {
                from,
                c1: near_trail,
                c2: near_lead,
                to,
            }
        }
    }

    pub fn endpoints(&self) -> (Point, Point) {
        match *self {
            Self::Line { from, to } | Self::Arc { from, to, .. } | Self::Cubic { from, to, .. } => {
                (from, to)
            }
        }
    }

    /// SVG path data.
    pub fn to_path_data(&self) -> String {
        let mut d = String::new();
        match *self {
            Self::Line { from, to } => {
                let _ = write!(d, "M{:.2} {:.2}L{:.2} {:.2}", from.0, from.1, to.0, to.1);
            }
            Self::Arc {
                from,
                to,
                rx,
                ry,
                sweep,
            } => {
                let _ = write!(
                    d,
                    "M{:.2} {:.2}A{:.2} {:.2} 0 0 {} {:.2} {:.2}",
                    from.0,
                    from.1,
                    rx,
                    ry,
                    u8::from(sweep),
                    to.0,
                    to.1
                );
            }
            Self::Cubic { from, c1, c2, to } => {
                let _ = write!(
                    d,
                    "M{:.2} {:.2}C{:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
                    from.0, from.1, c1.0, c1.1, c2.0, c2.1, to.0, to.1
                );
            }
        }
        d
    }
}

/// Start anchor: the center of the first node's content box.
pub fn start_anchor(first: &BBox) -> Point {
    first.center()
}

/// End anchor: the second node's content edge facing its parent.
pub fn end_anchor(second: &BBox, direction: Direction) -> Point {
    let y = second.y + second.height / 2.0;
    match direction {
        Direction::Left => (second.right(), y),
        Direction::Right | Direction::Unset => (second.x, y),
    }
}

/// Draws parent/child connectors into the instance's line group.
pub struct LineRouter<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
    keys: &'a ElementKeys,
    theme: &'a Theme,
}

impl<'a, S: Surface + ?Sized> LineRouter<'a, S> {
    pub fn new(surface: &'a mut S, keys: &'a ElementKeys, theme: &'a Theme) -> Self {
        Self {
            surface,
            keys,
            theme,
        }
    }

    /// Connects every node in `nodes` (at `level`) to its children, recursively.
    ///
    /// Stops at the first failing connector; already drawn ones stay.
    pub fn render_lines(
        &mut self,
        nodes: &[NodeRecord],
        level: usize,
        rerender: bool,
    ) -> Result<()> {
        for node in nodes {
            if let Err(err) = self.render_one_node_line(node, level, rerender) {
                warn!(node = %node.id, error = %err, "connector pass aborted");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Connects `node` to each child, then recurses into the children.
    pub fn render_one_node_line(
        &mut self,
        node: &NodeRecord,
        level: usize,
        rerender: bool,
    ) -> Result<()> {
        for child in &node.children {
            self.render_two_node_line(node, child, level, rerender)?;
            self.render_one_node_line(child, level + 1, rerender)?;
        }
        Ok(())
    }

    /// Draws (or with `rerender`, updates) the connector `first` → `second`.
    /// `level` is the level of `first`.
    pub fn render_two_node_line(
        &mut self,
        first: &NodeRecord,
        second: &NodeRecord,
        level: usize,
        rerender: bool,
    ) -> Result<()> {
        let id = self.keys.connector(&first.id, &second.id);
        let exists = self.surface.contains(&id);
        if exists && !rerender {
            return Err(EngineError::ConnectorExists(connector_id(&first.id, &second.id)));
        }
        let lines = self.keys.line_group();
        if !self.surface.contains(&lines) {
            return Err(EngineError::MissingLineGroup(lines.to_string()));
        }

        let first_box = self.content_box(&first.id)?;
        let second_box = self.content_box(&second.id)?;
        let path = ConnectorPath::route(
            start_anchor(&first_box),
            end_anchor(&second_box, second.direction),
            level,
        );
        let d = path.to_path_data();

        if exists {
            self.surface.set_attribute(&id, "d", &d)?;
        } else {
            self.surface.create_shape(&lines, id.clone(), Shape::Path { d })?;
            self.surface.set_attribute(&id, "fill", &self.theme.line_fill)?;
            self.surface.set_attribute(&id, "stroke", &self.theme.line_stroke)?;
            self.surface
                .set_attribute(&id, "stroke-width", &self.theme.line_stroke_width.to_string())?;
            if second.is_leaf() {
                self.surface
                    .set_attribute(&id, "marker-end", &format!("url(#{})", self.keys.marker()))?;
            }
        }
        trace!(connector = %id, "connector drawn");
        Ok(())
    }

    fn content_box(&self, id: &NodeId) -> Result<BBox> {
        self.surface
            .bounding_box(&self.keys.content(id))
            .ok_or_else(|| EngineError::NodeNotRendered(id.clone()))
    }

    /// Removes the connector `first` → `second`; reports whether it existed.
    pub fn remove_line(&mut self, first: &NodeId, second: &NodeId) -> Result<bool> {
        let id = self.keys.connector(first, second);
        if !self.surface.contains(&id) {
            return Ok(false);
        }
        self.surface.remove(&id)?;
        Ok(true)
    }

    /// Removes every connector below `node` (not the one into it).
    pub fn remove_subtree_lines(&mut self, node: &NodeRecord) -> Result<()> {
        for child in &node.children {
            self.remove_line(&node.id, &child.id)?;
            self.remove_subtree_lines(child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{SvgSurface, Translate};

    #[test]
    fn horizontal_connector_is_straight() {
        let path = ConnectorPath::route((0.0, 10.0), (50.0, 10.0), 1);
        assert_eq!(path.to_path_data(), "M0.00 10.00L50.00 10.00");
    }

    #[test]
    fn root_connector_arcs_with_doubled_span() {
        let path = ConnectorPath::route((0.0, 0.0), (30.0, -20.0), 1);
        assert_eq!(
            path,
            ConnectorPath::Arc {
                from: (0.0, 0.0),
                to: (30.0, -20.0),
                rx: 60.0,
                ry: 40.0,
                sweep: true,
            }
        );
        assert!(path.to_path_data().contains("A60.00 40.00 0 0 1 30.00 -20.00"));
    }

    #[test]
    fn arc_sweep_depends_on_quadrant() {
        let sweep = |to: Point| match ConnectorPath::route((0.0, 0.0), to, 1) {
            ConnectorPath::Arc { sweep, .. } => sweep,
            other => panic!("expected arc, got {other:?}"),
        };
        assert!(sweep((10.0, -10.0)));
        assert!(sweep((-10.0, 10.0)));
        assert!(!sweep((10.0, 10.0)));
        assert!(!sweep((-10.0, -10.0)));
    }

    #[test]
    fn deep_connector_eases_from_leftmost_endpoint() {
        let path = ConnectorPath::route((100.0, 0.0), (0.0, 50.0), 2);
        assert_eq!(
            path,
            ConnectorPath::Cubic {
                from: (100.0, 0.0),
                c1: (58.0, 0.0),
                c2: (42.0, 50.0),
                to: (0.0, 50.0),
            }
        );
    }

    #[test]
    fn end_anchor_faces_the_parent() {
        let bbox = BBox::new(10.0, 20.0, 40.0, 10.0);
        assert_eq!(end_anchor(&bbox, Direction::Right), (10.0, 25.0));
        assert_eq!(end_anchor(&bbox, Direction::Left), (50.0, 25.0));
    }

    fn two_nodes() -> (SvgSurface, ElementKeys, NodeRecord) {
        let keys = ElementKeys::new("t").unwrap();
        let mut surface = SvgSurface::new(400.0, 400.0);
        let canvas = surface.create_group(None, "canvas".into()).unwrap();
        surface.create_group(None, keys.line_group()).unwrap();
        for (id, x, y) in [("p", 0.0, 0.0), ("c", 100.0, 40.0)] {
            let content = surface
                .create_group(Some(&canvas), keys.content(&NodeId::from(id)))
                .unwrap();
            surface
                .create_shape(
                    &content,
                    format!("rect_{id}").as_str().into(),
                    Shape::Rect {
                        width: 20.0,
                        height: 10.0,
                        radius: 0.0,
                    },
                )
                .unwrap();
            surface.set_translate(&content, Translate::new(x, y)).unwrap();
        }
        let mut child = NodeRecord::new("c", "p", "c");
        child.direction = Direction::Right;
        let parent = NodeRecord::new("p", "0", "p").with_children(vec![child]);
        (surface, keys, parent)
    }

    #[test]
    fn duplicate_connector_needs_rerender() {
        let (mut surface, keys, parent) = two_nodes();
        let theme = Theme::classic();
        let mut router = LineRouter::new(&mut surface, &keys, &theme);
        router.render_lines(std::slice::from_ref(&parent), 1, false).unwrap();
        let err = router
            .render_two_node_line(&parent, &parent.children[0], 1, false)
            .unwrap_err();
        assert!(matches!(err, EngineError::ConnectorExists(id) if id == "line_p_c"));
        router
            .render_two_node_line(&parent, &parent.children[0], 1, true)
            .unwrap();
        assert_eq!(surface.children(&keys.line_group()).len(), 1);
    }

    #[test]
    fn leaf_connectors_carry_the_marker() {
        let (mut surface, keys, parent) = two_nodes();
        let theme = Theme::classic();
        LineRouter::new(&mut surface, &keys, &theme)
            .render_lines(std::slice::from_ref(&parent), 1, false)
            .unwrap();
        let id = keys.connector(&NodeId::from("p"), &NodeId::from("c"));
        assert_eq!(surface.attribute(&id, "marker-end").as_deref(), Some("url(#t_marker)"));
        assert!(surface.attribute(&id, "d").unwrap().starts_with("M10.00 5.00A"));
    }

    #[test]
    fn missing_line_group_is_reported() {
        let (mut surface, keys, parent) = two_nodes();
        surface.remove(&keys.line_group()).unwrap();
        let theme = Theme::classic();
        let err = LineRouter::new(&mut surface, &keys, &theme)
            .render_lines(std::slice::from_ref(&parent), 1, false)
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingLineGroup(_)));
    }

    #[test]
    fn unrendered_node_is_reported() {
        let (mut surface, keys, mut parent) = two_nodes();
        parent.children.push(NodeRecord::new("ghost", "p", "ghost"));
        parent.children[1].direction = Direction::Left;
        let theme = Theme::classic();
        let err = LineRouter::new(&mut surface, &keys, &theme)
            .render_lines(std::slice::from_ref(&parent), 1, false)
            .unwrap_err();
        assert!(matches!(err, EngineError::NodeNotRendered(id) if id == NodeId::from("ghost")));
        // The first connector survives the aborted pass.
        assert_eq!(surface.children(&keys.line_group()).len(), 1);
    }
}
