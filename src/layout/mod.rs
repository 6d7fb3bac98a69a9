//! Recursive bidirectional tree layout.
//!
//! Every node becomes a root group with three child zones laid out left to
//! right: a left zone holding the subtrees that hang to the left, the content
//! zone with the label, and a right zone for subtrees hanging to the right.
//! Zones are measured after their children are placed, so the whole pass is
//! bottom-up and needs no global solver.

pub mod routing;
mod text;
pub(crate) mod types;

pub use types::*;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use tracing::{debug, trace};

use crate::config::LayoutConfig;
use crate::error::{EngineError, Result};
use crate::ir::{Direction, NodeRecord};
use crate::surface::{BBox, ElementId, PointerKind, Surface, SurfaceError, Translate};
use crate::theme::Theme;

/// Places nodes on a borrowed surface.
pub struct LayoutEngine<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
    keys: &'a ElementKeys,
    config: &'a LayoutConfig,
    theme: &'a Theme,
}

impl<'a, S: Surface + ?Sized> LayoutEngine<'a, S> {
    pub fn new(
        surface: &'a mut S,
        keys: &'a ElementKeys,
        config: &'a LayoutConfig,
        theme: &'a Theme,
    ) -> Self {
        Self {
            surface,
            keys,
            config,
            theme,
        }
    }

    /// Renders `node` and its whole subtree into `container`.
    ///
    /// Level-1 children get their direction from their position (odd right,
    /// even left); deeper children inherit their parent's. `section` is the
    /// index of the second-level branch the node belongs to and picks its
    /// accent color. The node's content zone gets a pointer-down listener.
    pub fn render_single_node<'b>(
        &'b mut self,
        level: usize,
        container: &'b ElementId,
        node: &'b mut NodeRecord,
        section: Option<usize>,
    ) -> LocalBoxFuture<'b, Result<()>> {
        async move {
            if level > 1 && !node.direction.is_set() {
                return Err(EngineError::MissingDirection {
                    id: node.id.clone(),
                    level,
                });
            }
            let root_id = self.keys.node_root(&node.id);
            if self.surface.contains(&root_id) {
                return Err(EngineError::DuplicateNode(node.id.clone()));
            }

            let root = self.surface.create_group(Some(container), root_id)?;
            self.surface.set_data(&root, DATA_NODE_ID, node.id.as_str())?;
            self.surface.set_data(&root, DATA_LEVEL, &level.to_string())?;
            if let Some(section) = section {
                self.surface.set_data(&root, DATA_SECTION, &section.to_string())?;
            }
            let left = self.create_zone(&root, Zone::Left, node)?;
            let content = self.create_zone(&root, Zone::Content, node)?;
            let right = self.create_zone(&root, Zone::Right, node)?;
            self.surface.listen(&content, PointerKind::Down)?;

            text::fit_label(
                &mut *self.surface,
                self.keys,
                self.config,
                self.theme,
                &content,
                node,
                level,
                section,
            )
            .await?;

            let inherited = node.direction;
            let mut left_children = Vec::new();
            let mut right_children = Vec::new();
            for (index, child) in node.children.iter_mut().enumerate() {
                let (direction, child_section) = if level == 1 {
                    (Direction::for_top_level_child(index + 1), Some(index))
                } else {
                    (inherited, section)
                };
                child.direction = direction;
                let (zone, placed) = match direction {
                    Direction::Left => (&left, &mut left_children),
                    Direction::Right => (&right, &mut right_children),
                    Direction::Unset => {
                        return Err(EngineError::MissingDirection {
                            id: child.id.clone(),
                            level: level + 1,
                        });
                    }
                };
                self.render_single_node(level + 1, zone, child, child_section)
                    .await?;
                placed.push(self.keys.node_root(&child.id));
            }

            // Left-hanging subtrees grow away from the parent, so they hug the
            // zone's right edge.
            self.stack(&left_children, true)?;
            self.stack(&right_children, false)?;
            self.arrange_zones(
                (&left, !left_children.is_empty()),
                &content,
                &right,
            )?;
            trace!(node = %node.id, level, "node placed");
            Ok(())
        }
        .boxed_local()
    }

    fn create_zone(
        &mut self,
        root: &ElementId,
        zone: Zone,
        node: &NodeRecord,
    ) -> Result<ElementId> {
        let id = self
            .surface
            .create_group(Some(root), self.keys.zone(zone, &node.id))?;
        self.surface.set_data(&id, DATA_ZONE, zone.as_str())?;
        Ok(id)
    }

    fn measure(&self, id: &ElementId) -> Result<BBox> {
        self.surface
            .bounding_box(id)
            .ok_or_else(|| SurfaceError::MissingElement(id.clone()).into())
    }

    /// Stacks sibling groups top to bottom with `line_height` between them.
    /// With `align_right` each group is pushed against the widest one's right
    /// edge.
    pub fn stack(&mut self, siblings: &[ElementId], align_right: bool) -> Result<()> {
        let boxes = siblings
            .iter()
            .map(|id| self.measure(id))
            .collect::<Result<Vec<_>>>()?;
        let widest = boxes.iter().map(|bbox| bbox.width).fold(0.0_f32, f32::max);
        let mut y = 0.0;
        for (id, bbox) in siblings.iter().zip(&boxes) {
            let x = if align_right { widest - bbox.width } else { 0.0 };
            self.surface.set_translate(id, Translate::new(x, y))?;
            y += bbox.height + self.config.line_height;
        }
        Ok(())
    }

    /// Centers the three zones on the tallest one and spaces them by
    /// `line_width`. An empty left zone takes no room.
    fn arrange_zones(
        &mut self,
        (left, has_left): (&ElementId, bool),
        content: &ElementId,
        right: &ElementId,
    ) -> Result<()> {
        let left_box = self.measure(left)?;
        let content_box = self.measure(content)?;
        let right_box = self.measure(right)?;
        let max_y = left_box
            .height
            .max(content_box.height)
            .max(right_box.height);
        let gap = self.config.line_width;
        let content_x = if has_left { left_box.width + gap } else { 0.0 };
        let right_x = content_x + content_box.width + gap;

        self.surface
            .set_translate(left, Translate::new(0.0, (max_y - left_box.height) / 2.0))?;
        self.surface.set_translate(
            content,
            Translate::new(content_x, (max_y - content_box.height) / 2.0),
        )?;
        self.surface.set_translate(
            right,
            Translate::new(right_x, (max_y - right_box.height) / 2.0),
        )?;
        Ok(())
    }

    /// Removes a node's subtree from the surface along with its listeners.
    pub fn remove_node(&mut self, node: &NodeRecord) -> Result<()> {
        let mut contents = Vec::new();
        node.walk(&mut |record| contents.push(self.keys.content(&record.id)));
        for content in contents {
            self.surface.unlisten(&content, PointerKind::Down)?;
        }
        let root = self.keys.node_root(&node.id);
        if self.surface.contains(&root) {
            self.surface.remove(&root)?;
        }
        debug!(node = %node.id, "node removed");
        Ok(())
    }

    /// Shifts a node root so its content zone lands on `target`'s origin.
    pub fn land_content(&mut self, node: &NodeRecord, target: BBox) -> Result<()> {
        let root = self.keys.node_root(&node.id);
        let now = self
            .surface
            .bounding_box(&self.keys.content(&node.id))
            .ok_or_else(|| EngineError::NodeNotRendered(node.id.clone()))?;
        let current = self.surface.translate(&root)?;
        self.surface
            .set_translate(&root, current.offset(target.x - now.x, target.y - now.y))?;
        Ok(())
    }
}
